//! Entity synchronizers
//!
//! A [`SyncHandle`] owns one store subscription and one task. Every snapshot
//! the store delivers is run through a [`Projection`] and published whole on
//! a `watch` channel, so observers always see a complete list or document.
//!
//! Failures are terminal: a store fault, an undecodable snapshot or a missing
//! first snapshot publishes [`SyncState::Failed`] and ends the task. A new
//! [`SyncHandle::start`] is needed to try again.

use crate::error::{SyncError, SyncErrorKind};
use crate::projection::Projection;
use pioneer_store::{RemoteStore, StoreEvent, StorePath, Subscription};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Default bound on the wait for the first snapshot
pub const DEFAULT_FIRST_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Published synchronizer state
pub enum SyncState<T> {
    /// No snapshot yet
    Loading,
    Ready(Arc<T>),
    Failed(SyncError),
}

impl<T> SyncState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SyncState::Ready(_))
    }

    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            SyncState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> Clone for SyncState<T> {
    fn clone(&self) -> Self {
        match self {
            SyncState::Loading => SyncState::Loading,
            SyncState::Ready(value) => SyncState::Ready(Arc::clone(value)),
            SyncState::Failed(err) => SyncState::Failed(err.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Loading => f.write_str("Loading"),
            SyncState::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            SyncState::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Synchronizer options
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// How long to wait for the first snapshot before failing with `timeout`
    pub first_snapshot_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            first_snapshot_timeout: DEFAULT_FIRST_SNAPSHOT_TIMEOUT,
        }
    }
}

/// A running synchronizer for one store path.
///
/// Dropping the handle stops the task and releases the subscription;
/// [`SyncHandle::shutdown`] does the same and waits for it.
pub struct SyncHandle<T> {
    path: StorePath,
    state: watch::Receiver<SyncState<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T: fmt::Debug + Send + Sync + 'static> SyncHandle<T> {
    /// Subscribe to `path` and start publishing projected snapshots.
    ///
    /// A subscription the store refuses outright is reported as a
    /// `Failed` state rather than an error, like any later fault.
    pub async fn start<P>(
        store: Arc<dyn RemoteStore>,
        path: StorePath,
        projection: P,
        options: SyncOptions,
    ) -> Self
    where
        P: Projection<Output = T>,
    {
        let (tx, rx) = watch::channel(SyncState::Loading);

        let task = match store.subscribe(&path).await {
            Ok(subscription) => {
                info!(path = %path, "Subscription established");
                Some(tokio::spawn(run(
                    Arc::clone(&store),
                    subscription,
                    projection,
                    tx,
                    options.first_snapshot_timeout,
                )))
            }
            Err(e) => {
                let kind = if e.is_permission_denied() {
                    SyncErrorKind::PermissionDenied
                } else {
                    SyncErrorKind::Disconnected
                };
                let err = SyncError::new(kind, &path, e.to_string());
                warn!(path = %path, error = %err, "Subscription refused");
                tx.send_replace(SyncState::Failed(err));
                None
            }
        };

        Self {
            path,
            state: rx,
            task,
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Latest published state
    pub fn current(&self) -> SyncState<T> {
        self.state.borrow().clone()
    }

    /// Receiver for waiting on state changes
    pub fn observe(&self) -> watch::Receiver<SyncState<T>> {
        self.state.clone()
    }

    /// Stream of states, starting with the current one
    pub fn stream(&self) -> WatchStream<SyncState<T>> {
        WatchStream::new(self.state.clone())
    }

    /// Wait until the first `Ready` state, or the failure that prevents it
    pub async fn wait_ready(&self) -> Result<Arc<T>, SyncError> {
        wait_ready(self.observe(), &self.path).await
    }

    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the task and release the subscription. Idempotent.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!(path = %self.path, "Synchronizer stopped");
        }
    }
}

impl<T> Drop for SyncHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Wait on a state receiver until it is `Ready` or `Failed`
pub async fn wait_ready<T>(
    mut state: watch::Receiver<SyncState<T>>,
    path: &StorePath,
) -> Result<Arc<T>, SyncError> {
    loop {
        match &*state.borrow_and_update() {
            SyncState::Ready(value) => return Ok(Arc::clone(value)),
            SyncState::Failed(err) => return Err(err.clone()),
            SyncState::Loading => {}
        }
        if state.changed().await.is_err() {
            return Err(SyncError::new(
                SyncErrorKind::Disconnected,
                path,
                "synchronizer stopped",
            ));
        }
    }
}

// The task owns a store handle so the store outlives the subscription even
// when the caller dropped its own.
async fn run<P: Projection>(
    _store: Arc<dyn RemoteStore>,
    mut subscription: Subscription,
    projection: P,
    state: watch::Sender<SyncState<P::Output>>,
    first_snapshot_timeout: Duration,
) {
    let path = subscription.path().clone();

    let mut event = match tokio::time::timeout(first_snapshot_timeout, subscription.next_event()).await {
        Ok(event) => event,
        Err(_) => {
            let detail = format!("no snapshot within {:?}", first_snapshot_timeout);
            fail(&state, SyncError::new(SyncErrorKind::Timeout, &path, detail));
            subscription.unsubscribe();
            return;
        }
    };

    loop {
        match event {
            Some(StoreEvent::Snapshot(snapshot)) => match projection.project(&snapshot) {
                Ok(value) => {
                    debug!(path = %path, exists = snapshot.exists(), "Publishing snapshot");
                    state.send_replace(SyncState::Ready(Arc::new(value)));
                }
                Err(e) => {
                    fail(&state, SyncError::new(SyncErrorKind::Malformed, &path, e.to_string()));
                    break;
                }
            },
            Some(StoreEvent::Error(fault)) => {
                fail(&state, SyncError::new(fault.into(), &path, fault.to_string()));
                break;
            }
            None => {
                fail(
                    &state,
                    SyncError::new(SyncErrorKind::Disconnected, &path, "subscription closed"),
                );
                break;
            }
        }
        event = subscription.next_event().await;
    }

    subscription.unsubscribe();
}

fn fail<T>(state: &watch::Sender<SyncState<T>>, err: SyncError) {
    warn!(path = %err.path, kind = %err.kind, detail = %err.detail, "Synchronizer failed");
    state.send_replace(SyncState::Failed(err));
}
