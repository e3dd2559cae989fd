//! Slash-separated locations in the store tree

use crate::error::{Result, StoreError};
use std::fmt;

/// Characters the realtime database refuses inside a key.
const FORBIDDEN: &[char] = &['/', '.', '#', '$', '[', ']'];

/// A location in the store tree, e.g. `siteContent/roadmap`.
///
/// The root is the path with no segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path. Leading, trailing and doubled slashes are ignored.
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            validate_segment(segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a path from a layout constant.
    ///
    /// Segments are split on `/` without key validation, so this is only for
    /// literals written into the program.
    pub fn from_static(path: &'static str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Append one validated segment
    pub fn child(&self, segment: &str) -> Result<Self> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment (the key), if any
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True when `self` equals `other` or contains it.
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True when a change at one path can alter the value seen at the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Segments of `self` below `base`, or `None` when `base` does not contain `self`.
    pub fn relative_to(&self, base: &StorePath) -> Option<&[String]> {
        if base.contains(self) {
            Some(&self.segments[base.segments.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        f.write_str(&self.segments.join("/"))
    }
}

/// Check that a single key can be stored as one path segment.
pub fn validate_segment(segment: &str) -> Result<()> {
    let reason = if segment.is_empty() {
        Some("empty key")
    } else if segment.chars().any(|c| FORBIDDEN.contains(&c)) {
        Some("contains one of / . # $ [ ]")
    } else if segment.chars().any(char::is_control) {
        Some("contains control characters")
    } else if segment.len() > 768 {
        Some("longer than 768 bytes")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidPath {
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
