//! Pioneer Store - remote data collaborators for the admin portal
//!
//! The admin portal keeps no data of its own. Everything it shows lives in a
//! realtime key-value tree, and access to that tree is gated by a password
//! sign-in. This crate defines both collaborators at their interface and
//! ships adapters for them:
//!
//! - [`RemoteStore`]: path-scoped subscriptions plus full/partial/append/delete
//!   writes. Implemented by [`MemoryStore`] (in-process, used by tests and
//!   local runs) and [`RestStore`] (realtime-database REST + Server-Sent Events).
//! - [`AuthProvider`]: sign-in, sign-out and a session-change stream.
//!   Implemented by [`MemoryAuth`] and [`PasswordAuth`] (identity-toolkit REST).
//!
//! # Example
//!
//! ```rust,no_run
//! use pioneer_store::{MemoryStore, RemoteStore, StoreEvent, StorePath};
//!
//! # async fn example() -> pioneer_store::Result<()> {
//! let store = MemoryStore::new();
//! let pioneers = StorePath::parse("pioneers")?;
//!
//! let mut subscription = store.subscribe(&pioneers).await?;
//! let key = store
//!     .append(&pioneers, serde_json::json!({"name": "Ann", "page": "ann.page", "status": "PIONEER"}))
//!     .await?;
//!
//! while let Some(StoreEvent::Snapshot(snapshot)) = subscription.next_event().await {
//!     if snapshot.exists() {
//!         println!("{key} stored");
//!         break;
//!     }
//! }
//! subscription.unsubscribe();
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod memory;
pub mod path;
pub mod push_id;
pub mod rest;
pub mod subscription;
pub mod traits;
pub mod tree;
pub mod types;

// Re-export main types
pub use auth::{AuthError, AuthErrorKind, AuthProvider, Credential, MemoryAuth, PasswordAuth, User};
pub use error::{Result, StoreError};
pub use memory::{MemoryStore, StoreCall};
pub use path::StorePath;
pub use push_id::PushIdGenerator;
pub use rest::{RestConfig, RestStore};
pub use subscription::Subscription;
pub use traits::RemoteStore;
pub use types::{Snapshot, StoreEvent, SubscriptionFault};
