//! Portal data model
//!
//! Collections ([`Pioneer`], [`RoadmapItem`]) implement [`Entity`]; singleton
//! documents ([`LiveStatus`], [`ServerStatus`]) implement [`Document`]. Each
//! entity has a raw-string form buffer implementing [`FormInput`] whose
//! `validate` produces the exact fields written to the store.

mod pioneer;
mod roadmap;
mod status;

pub use pioneer::{Pioneer, PioneerFields, PioneerInput, PioneerStatus};
pub use roadmap::{RoadmapFields, RoadmapIcon, RoadmapInput, RoadmapItem};
pub use status::{LiveStatus, ServerState, ServerStatus, ServerStatusInput};

use crate::error::{Field, ValidationError};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Order in which a collection is displayed relative to store iteration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOrder {
    /// Same as the store (creation order for push keys)
    Iteration,
    /// Newest first
    Reversed,
}

/// A keyed record in a store collection.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Stored representation (everything but the key)
    type Fields: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

    /// Editable form buffer for this entity
    type Input: FormInput<Fields = Self::Fields>;

    const ORDER: DisplayOrder;

    fn from_fields(id: String, fields: Self::Fields) -> Self;

    fn id(&self) -> &str;

    /// Text the list search matches against
    fn search_text(&self) -> [&str; 2];

    /// Form buffer prefilled from this entity
    fn to_input(&self) -> Self::Input;
}

/// Singleton document with a fallback used while the path is empty
pub trait Document: DeserializeOwned + Default + Clone + Debug + Send + Sync + 'static {}

/// Raw form values, validated into store fields.
pub trait FormInput: Default + Clone + Debug + Send + Sync {
    type Fields: Serialize;

    fn validate(&self) -> Result<Self::Fields, ValidationError>;
}

/// Trim a required text field
pub(crate) fn required(field: Field, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty(field));
    }
    Ok(trimmed.to_string())
}
