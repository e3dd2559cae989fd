//! Pioneer Sync - live data core of the Pioneer Hub admin portal
//!
//! Keeps local state consistent with a remote, multi-writer key-value store
//! and derives the public counters from it.
//!
//! # Architecture
//!
//! ```text
//! RemoteStore ──► SyncHandle (per path) ──► AggregateDeriver ──► RemoteStore
//!                        │
//!                        └──► ViewState / StatusEditor ──► MutationGateway ──► RemoteStore
//! ```
//!
//! - [`SyncHandle`]: one subscription per path, publishing
//!   `Loading | Ready | Failed` on a `watch` channel.
//! - [`AggregateDeriver`]: writes `liveStatus/totalPioneers` on every pioneer
//!   list change.
//! - [`MutationGateway`]: validated create/update/delete.
//! - [`ViewState`]: modal, form buffer and search for one list screen.
//! - [`Session`] and [`Portal`]: sign-in and composition.
//!
//! # Example
//!
//! ```rust,no_run
//! use pioneer_store::{MemoryAuth, MemoryStore};
//! use pioneer_sync::{Portal, PortalConfig, PioneerInput, Session};
//! use std::sync::Arc;
//!
//! # async fn example() -> pioneer_sync::Result<()> {
//! let auth = MemoryAuth::new().with_account("admin@example.com", "secret");
//! let session = Session::start(Arc::new(auth));
//! session.sign_in("admin@example.com", "secret").await?;
//!
//! let mut portal = Portal::open(&session, Arc::new(MemoryStore::new()), &PortalConfig::default()).await?;
//! portal
//!     .gateway()
//!     .add_pioneer(&PioneerInput::new("Ann", "ann.page", "PIONEER"))
//!     .await?;
//!
//! let pioneers = portal.pioneers().wait_ready().await?;
//! println!("{} pioneers", pioneers.len());
//! portal.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deriver;
pub mod error;
pub mod gateway;
pub mod model;
pub mod paths;
pub mod portal;
pub mod projection;
pub mod session;
pub mod sync;
pub mod view;

// Re-export main types
pub use config::{PortalConfig, Presence};
pub use deriver::{active_count, AggregateDeriver};
pub use error::{Field, Reason, Result, SdkError, SyncError, SyncErrorKind, ValidationError};
pub use gateway::{Confirmation, MutationGateway, RemoveOutcome, Submission};
pub use model::{
    DisplayOrder, Document, Entity, FormInput, LiveStatus, Pioneer, PioneerInput, PioneerStatus,
    RoadmapIcon, RoadmapInput, RoadmapItem, ServerState, ServerStatus, ServerStatusInput,
};
pub use portal::Portal;
pub use projection::{EntityList, Projection, SingleDocument};
pub use session::Session;
pub use sync::{SyncHandle, SyncOptions, SyncState};
pub use view::{filter, Modal, StatusEditor, ViewState};
