//! Subscription handle returned by [`RemoteStore::subscribe`](crate::RemoteStore::subscribe)

use crate::path::StorePath;
use crate::types::StoreEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

type Release = Box<dyn FnOnce() + Send + 'static>;

/// Stream of events for one store path.
///
/// Dropping the subscription releases it. [`Subscription::unsubscribe`] does
/// the same explicitly and may be called any number of times; once it has
/// returned, no further events are yielded, even ones already buffered.
pub struct Subscription {
    path: StorePath,
    events: mpsc::UnboundedReceiver<StoreEvent>,
    release: Option<Release>,
    closed: bool,
}

impl Subscription {
    /// Wrap a receiver. `release` runs once, on unsubscribe or drop.
    pub fn new(
        path: StorePath,
        events: mpsc::UnboundedReceiver<StoreEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            path,
            events,
            release: Some(Box::new(release)),
            closed: false,
        }
    }

    /// Create a linked sender/subscription pair with no release action.
    pub fn channel(path: StorePath) -> (mpsc::UnboundedSender<StoreEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(path, rx, || {}))
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Whether the subscription can still deliver events
    pub fn is_active(&self) -> bool {
        !self.closed
    }

    /// Wait for the next event. Returns `None` once released or when the
    /// store side has gone away.
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    /// Release the subscription. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.events.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Stream for Subscription {
    type Item = StoreEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("closed", &self.closed)
            .finish()
    }
}
