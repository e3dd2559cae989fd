//! Portal composition
//!
//! [`Portal::open`] wires everything a signed-in administrator works with:
//! four synchronizers, the aggregate deriver and the mutation gateway.
//! [`Portal::close`] tears them down together.

use crate::config::PortalConfig;
use crate::deriver::{active_count, AggregateDeriver};
use crate::error::{Result, SdkError, SyncError, SyncErrorKind};
use crate::gateway::MutationGateway;
use crate::model::{LiveStatus, Pioneer, RoadmapItem, ServerStatus};
use crate::paths;
use crate::projection::{EntityList, SingleDocument};
use crate::session::Session;
use crate::sync::{SyncHandle, SyncState};
use pioneer_store::{RemoteStore, User};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub type PioneerSync = SyncHandle<Vec<Pioneer>>;
pub type LiveStatusSync = SyncHandle<LiveStatus>;
pub type RoadmapSync = SyncHandle<Vec<RoadmapItem>>;
pub type ServerStatusSync = SyncHandle<ServerStatus>;

pub struct Portal {
    user: User,
    pioneers: PioneerSync,
    live_status: LiveStatusSync,
    roadmap: RoadmapSync,
    server_status: ServerStatusSync,
    deriver: AggregateDeriver,
    gateway: MutationGateway,
    settle_timeout: Duration,
    closed: bool,
}

impl Portal {
    /// Start the portal for the session's signed-in user.
    pub async fn open(
        session: &Session,
        store: Arc<dyn RemoteStore>,
        config: &PortalConfig,
    ) -> Result<Self> {
        let user = session.require_user()?;
        let options = config.sync_options();
        let settle_timeout = options.first_snapshot_timeout;

        let pioneers = SyncHandle::start(
            store.clone(),
            paths::pioneers(),
            EntityList::<Pioneer>::new(),
            options.clone(),
        )
        .await;
        let live_status = SyncHandle::start(
            store.clone(),
            paths::live_status(),
            SingleDocument::<LiveStatus>::new(),
            options.clone(),
        )
        .await;
        let roadmap = SyncHandle::start(
            store.clone(),
            paths::roadmap(),
            EntityList::<RoadmapItem>::new(),
            options.clone(),
        )
        .await;
        let server_status = SyncHandle::start(
            store.clone(),
            paths::server_status(),
            SingleDocument::<ServerStatus>::new(),
            options,
        )
        .await;

        let deriver = AggregateDeriver::start(
            store.clone(),
            pioneers.observe(),
            pioneers.path(),
            paths::total_pioneers(),
        )?;
        let gateway = MutationGateway::new(store, pioneers.observe());

        info!(uid = %user.uid, "Portal opened");
        Ok(Self {
            user,
            pioneers,
            live_status,
            roadmap,
            server_status,
            deriver,
            gateway,
            settle_timeout,
            closed: false,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn pioneers(&self) -> &PioneerSync {
        &self.pioneers
    }

    pub fn live_status(&self) -> &LiveStatusSync {
        &self.live_status
    }

    pub fn roadmap(&self) -> &RoadmapSync {
        &self.roadmap
    }

    pub fn server_status(&self) -> &ServerStatusSync {
        &self.server_status
    }

    pub fn deriver(&self) -> &AggregateDeriver {
        &self.deriver
    }

    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    /// Wait until the pioneer list satisfies `applied` and the published
    /// `totalPioneers` equals its active count. Returns that count.
    ///
    /// A one-shot caller uses this after a pioneer write so the deriver gets
    /// to publish the new count before [`Portal::close`] stops it. Bounded by
    /// the configured sync timeout.
    pub async fn settle_pioneers(&self, applied: impl Fn(&[Pioneer]) -> bool) -> Result<u64> {
        let mut pioneers = self.pioneers.observe();
        let mut live = self.live_status.observe();

        let settle = async {
            loop {
                let expected = match &*pioneers.borrow_and_update() {
                    SyncState::Ready(list) if applied(list) => Some(active_count(list)),
                    SyncState::Failed(err) => return Err(SdkError::from(err.clone())),
                    _ => None,
                };
                let published = match &*live.borrow_and_update() {
                    SyncState::Ready(status) => Some(status.total_pioneers),
                    SyncState::Failed(err) => return Err(SdkError::from(err.clone())),
                    SyncState::Loading => None,
                };
                if let (Some(expected), Some(published)) = (expected, published) {
                    if expected == published {
                        debug!(count = expected, "Active pioneer count settled");
                        return Ok(expected);
                    }
                }

                let changed = tokio::select! {
                    changed = pioneers.changed() => changed,
                    changed = live.changed() => changed,
                };
                if changed.is_err() {
                    return Err(SdkError::from(SyncError::new(
                        SyncErrorKind::Disconnected,
                        &paths::total_pioneers(),
                        "synchronizer stopped",
                    )));
                }
            }
        };

        match tokio::time::timeout(self.settle_timeout, settle).await {
            Ok(result) => result,
            Err(_) => Err(SdkError::from(SyncError::new(
                SyncErrorKind::Timeout,
                &paths::total_pioneers(),
                format!("count did not settle within {:?}", self.settle_timeout),
            ))),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the deriver and all synchronizers. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.deriver.shutdown().await;
        self.pioneers.shutdown().await;
        self.live_status.shutdown().await;
        self.roadmap.shutdown().await;
        self.server_status.shutdown().await;
        self.closed = true;
        info!(uid = %self.user.uid, "Portal closed");
    }
}
