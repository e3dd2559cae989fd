//! Values delivered by store subscriptions

use crate::path::StorePath;
use serde_json::Value;
use std::fmt;

/// A point-in-time read of a path's subtree, possibly empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StorePath,
    value: Option<Value>,
}

impl Snapshot {
    /// Create a snapshot. A JSON `null` is treated as "no data".
    pub fn new(path: StorePath, value: Option<Value>) -> Self {
        let value = value.filter(|v| !v.is_null());
        Self { path, value }
    }

    pub fn empty(path: StorePath) -> Self {
        Self { path, value: None }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Whether any data exists at the path
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

/// Why a subscription stopped delivering data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionFault {
    /// Security rules refused the read, or the credential was revoked
    PermissionDenied,
    /// The connection ended
    Disconnected,
    /// The store sent an update that could not be applied
    Malformed,
}

impl SubscriptionFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::Disconnected => "disconnected",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for SubscriptionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification on a subscription.
///
/// An `Error` is always the last event a subscription delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Snapshot(Snapshot),
    Error(SubscriptionFault),
}
