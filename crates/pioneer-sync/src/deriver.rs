//! Aggregate deriver
//!
//! Keeps `liveStatus/totalPioneers` equal to the number of active pioneers.
//! Every `Ready` list from the pioneer synchronizer triggers one full write
//! of the count. Writes are fire-and-forget: a failure is logged and the next
//! snapshot writes again.

use crate::error::{Result, SdkError};
use crate::model::Pioneer;
use crate::sync::SyncState;
use pioneer_store::{RemoteStore, StorePath};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pioneers whose status is not `FROZEN`
pub fn active_count(pioneers: &[Pioneer]) -> u64 {
    pioneers.iter().filter(|p| p.status.is_active()).count() as u64
}

/// Running deriver task
pub struct AggregateDeriver {
    target: StorePath,
    task: Option<JoinHandle<()>>,
}

impl AggregateDeriver {
    /// Start deriving from the pioneer state published for `source`.
    ///
    /// Refuses a `target` that overlaps `source`: the write would change the
    /// observed collection and retrigger itself.
    pub fn start(
        store: Arc<dyn RemoteStore>,
        pioneers: watch::Receiver<SyncState<Vec<Pioneer>>>,
        source: &StorePath,
        target: StorePath,
    ) -> Result<Self> {
        if source.overlaps(&target) {
            return Err(SdkError::Config(format!(
                "derived counter {} overlaps observed collection {}",
                target, source
            )));
        }

        info!(source = %source, target = %target, "Starting aggregate deriver");
        let task = tokio::spawn(run(store, pioneers, target.clone()));

        Ok(Self {
            target,
            task: Some(task),
        })
    }

    pub fn target(&self) -> &StorePath {
        &self.target
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop deriving. Idempotent; an in-flight write is abandoned, not undone.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!(target = %self.target, "Aggregate deriver stopped");
        }
    }
}

impl Drop for AggregateDeriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    store: Arc<dyn RemoteStore>,
    mut pioneers: watch::Receiver<SyncState<Vec<Pioneer>>>,
    target: StorePath,
) {
    loop {
        let count = match &*pioneers.borrow_and_update() {
            SyncState::Loading => None,
            SyncState::Ready(list) => Some(active_count(list)),
            SyncState::Failed(err) => {
                info!(target = %target, error = %err, "Pioneer sync failed, deriver stopping");
                return;
            }
        };

        if let Some(count) = count {
            match store.write_full(&target, count.into()).await {
                Ok(()) => debug!(target = %target, count, "Wrote active pioneer count"),
                Err(e) => warn!(target = %target, count, error = %e, "Failed to write active pioneer count"),
            }
        }

        if pioneers.changed().await.is_err() {
            debug!(target = %target, "Pioneer sync torn down, deriver stopping");
            return;
        }
    }
}
