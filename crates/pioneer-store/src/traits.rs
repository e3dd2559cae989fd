//! The remote store capability consumed by the sync layer.

use crate::error::Result;
use crate::path::StorePath;
use crate::subscription::Subscription;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A realtime key-value tree with path-scoped subscriptions.
///
/// Writes complete when the store acknowledges them. They are not guaranteed
/// to show up in the very next event of any subscription; readers converge
/// eventually.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Subscribe to `path`.
    ///
    /// The first event is the current snapshot; afterwards one event is
    /// delivered per change that affects the subtree at `path`. An error event
    /// ends the subscription.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription>;

    /// Replace the value at `path`. Writing `null` removes it.
    async fn write_full(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Merge the named fields into the object at `path` without touching siblings.
    async fn write_partial(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()>;

    /// Store `value` under a newly generated key below `path` and return the key.
    async fn append(&self, path: &StorePath, value: Value) -> Result<String>;

    /// Remove the subtree at `path`.
    async fn delete(&self, path: &StorePath) -> Result<()>;
}
