//! In-process store for tests and local runs.
//!
//! Behaves like the realtime database as seen by a single client: writes are
//! applied immediately, every subscription whose value changed receives a new
//! snapshot, and appended children get time-ordered push keys. Every call is
//! recorded so callers can assert what reached the store, and faults can be
//! injected per path prefix.

use crate::error::{Result, StoreError};
use crate::path::StorePath;
use crate::push_id::PushIdGenerator;
use crate::subscription::Subscription;
use crate::traits::RemoteStore;
use crate::tree;
use crate::types::{Snapshot, StoreEvent, SubscriptionFault};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tracing::debug;

/// A call received by [`MemoryStore`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Subscribe { path: StorePath },
    WriteFull { path: StorePath, value: Value },
    WritePartial { path: StorePath, fields: Map<String, Value> },
    Append { path: StorePath, value: Value },
    Delete { path: StorePath },
}

impl StoreCall {
    pub fn path(&self) -> &StorePath {
        match self {
            Self::Subscribe { path }
            | Self::WriteFull { path, .. }
            | Self::WritePartial { path, .. }
            | Self::Append { path, .. }
            | Self::Delete { path } => path,
        }
    }

    /// Whether the call mutates the tree
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Subscribe { .. })
    }
}

struct Subscriber {
    id: u64,
    path: StorePath,
    tx: mpsc::UnboundedSender<StoreEvent>,
    muted: bool,
}

#[derive(Default)]
struct Inner {
    root: Value,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    push_ids: PushIdGenerator,
    calls: Vec<StoreCall>,
    rejected_writes: Vec<StorePath>,
    muted: Vec<StorePath>,
}

impl Inner {
    fn check_writable(&self, path: &StorePath) -> Result<()> {
        if self.rejected_writes.iter().any(|prefix| prefix.contains(path)) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    /// Apply an edit to the tree and notify subscribers whose value changed.
    fn apply(&mut self, path: &StorePath, edit: impl FnOnce(&mut Value)) {
        self.subscribers.retain(|subscriber| !subscriber.tx.is_closed());
        let before: Vec<Option<Value>> = self
            .subscribers
            .iter()
            .map(|s| {
                if !s.muted && s.path.overlaps(path) {
                    tree::get_at(&self.root, s.path.segments()).cloned()
                } else {
                    None
                }
            })
            .collect();

        edit(&mut self.root);

        let mut notified = 0usize;
        for (subscriber, previous) in self.subscribers.iter().zip(before) {
            if subscriber.muted || !subscriber.path.overlaps(path) {
                continue;
            }
            let current = tree::get_at(&self.root, subscriber.path.segments()).cloned();
            if current == previous {
                continue;
            }
            let snapshot = Snapshot::new(subscriber.path.clone(), current);
            if subscriber.tx.send(StoreEvent::Snapshot(snapshot)).is_ok() {
                notified += 1;
            }
        }
        debug!(path = %path, notified, "Applied write");
    }
}

/// In-memory [`RemoteStore`]
///
/// # Example
///
/// ```rust,no_run
/// use pioneer_store::{MemoryStore, RemoteStore, StorePath};
///
/// # async fn example() -> pioneer_store::Result<()> {
/// let store = MemoryStore::with_value(serde_json::json!({
///     "liveStatus": {"totalPioneers": 0, "totalCapacity": 100}
/// }));
///
/// store
///     .write_full(&StorePath::parse("liveStatus/totalCapacity")?, 120.into())
///     .await?;
/// assert_eq!(store.value_at(&StorePath::parse("liveStatus/totalCapacity")?), Some(120.into()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a whole tree
    pub fn with_value(root: Value) -> Self {
        let store = Self::new();
        store.lock().root = tree::normalize(root).unwrap_or(Value::Null);
        store
    }

    /// Read the current value at `path`
    pub fn value_at(&self, path: &StorePath) -> Option<Value> {
        tree::get_at(&self.lock().root, path.segments()).cloned()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Only the mutating calls received so far
    pub fn writes(&self) -> Vec<StoreCall> {
        self.lock().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of subscriptions that are still attached
    pub fn active_subscriptions(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|s| !s.tx.is_closed());
        inner.subscribers.len()
    }

    /// Reject writes at or below `prefix` with a permission error.
    pub fn reject_writes_under(&self, prefix: StorePath) {
        self.lock().rejected_writes.push(prefix);
    }

    /// Lift a rejection added with [`MemoryStore::reject_writes_under`].
    pub fn allow_writes_under(&self, prefix: &StorePath) {
        self.lock().rejected_writes.retain(|rejected| rejected != prefix);
    }

    /// New subscriptions at or below `prefix` receive nothing, not even the
    /// initial snapshot. Simulates a store that never answers.
    pub fn mute_subscriptions_under(&self, prefix: StorePath) {
        self.lock().muted.push(prefix);
    }

    /// Deliver `fault` to every live subscription at or below `prefix` and detach them.
    pub fn fail_subscriptions_under(&self, prefix: &StorePath, fault: SubscriptionFault) {
        let mut inner = self.lock();
        inner.subscribers.retain(|subscriber| {
            if prefix.contains(&subscriber.path) {
                let _ = subscriber.tx.send(StoreEvent::Error(fault));
                false
            } else {
                true
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn detach(inner: &Weak<Mutex<Inner>>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.subscribers.retain(|s| s.id != id);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Subscribe { path: path.clone() });

        let id = inner.next_subscriber;
        inner.next_subscriber += 1;

        // A muted subscriber keeps its sender so the subscription stays open but silent.
        let muted = inner.muted.iter().any(|prefix| prefix.contains(path));
        if !muted {
            let current = tree::get_at(&inner.root, path.segments()).cloned();
            let _ = tx.send(StoreEvent::Snapshot(Snapshot::new(path.clone(), current)));
        }
        inner.subscribers.push(Subscriber {
            id,
            path: path.clone(),
            tx,
            muted,
        });

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(path.clone(), rx, move || detach(&weak, id)))
    }

    async fn write_full(&self, path: &StorePath, value: Value) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::WriteFull {
            path: path.clone(),
            value: value.clone(),
        });
        inner.check_writable(path)?;
        inner.apply(path, |root| tree::set_at(root, path.segments(), value));
        Ok(())
    }

    async fn write_partial(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::WritePartial {
            path: path.clone(),
            fields: fields.clone(),
        });
        inner.check_writable(path)?;
        inner.apply(path, |root| tree::merge_at(root, path.segments(), fields));
        Ok(())
    }

    async fn append(&self, path: &StorePath, value: Value) -> Result<String> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Append {
            path: path.clone(),
            value: value.clone(),
        });
        inner.check_writable(path)?;

        let key = inner.push_ids.generate();
        let child = path.child(&key)?;
        inner.apply(&child, |root| tree::set_at(root, child.segments(), value));
        Ok(key)
    }

    async fn delete(&self, path: &StorePath) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Delete { path: path.clone() });
        inner.check_writable(path)?;
        inner.apply(path, |root| tree::remove_at(root, path.segments()));
        Ok(())
    }
}
