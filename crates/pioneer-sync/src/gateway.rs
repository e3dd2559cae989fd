//! Mutation gateway
//!
//! Every operation validates its input before touching the store, and
//! returns as soon as the store acknowledges the write. Results reach the
//! screen through the synchronizers, not through these return values.

use crate::deriver::active_count;
use crate::error::{Field, Reason, Result, SdkError, ValidationError};
use crate::model::{
    FormInput, Pioneer, PioneerInput, RoadmapInput, ServerStatus, ServerStatusInput,
};
use crate::paths;
use crate::sync::SyncState;
use pioneer_store::{path::validate_segment, RemoteStore, StorePath};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Prompt shown before deleting a pioneer
pub const REMOVE_PIONEER_PROMPT: &str = "Are you sure? This will permanently delete the pioneer.";

/// Prompt shown before deleting a roadmap item
pub const REMOVE_ROADMAP_PROMPT: &str = "Are you sure you want to delete this roadmap item?";

/// Asks the operator a yes/no question before a destructive call.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmation for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Result of a remove request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Declined at the prompt; nothing was sent
    Cancelled,
}

/// A submitted form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<I> {
    Add(I),
    Edit { id: String, input: I },
}

/// Validated writes against the portal's store layout
#[derive(Clone)]
pub struct MutationGateway {
    store: Arc<dyn RemoteStore>,
    pioneers: watch::Receiver<SyncState<Vec<Pioneer>>>,
}

impl MutationGateway {
    /// `pioneers` is the state capacity checks read the active count from
    pub fn new(
        store: Arc<dyn RemoteStore>,
        pioneers: watch::Receiver<SyncState<Vec<Pioneer>>>,
    ) -> Self {
        Self { store, pioneers }
    }

    /// Append a pioneer; returns the store-assigned key.
    pub async fn add_pioneer(&self, input: &PioneerInput) -> Result<String> {
        let fields = input.validate()?;
        let key = self.store.append(&paths::pioneers(), to_value(&fields)?).await?;
        info!(key = %key, "Added pioneer");
        Ok(key)
    }

    /// Merge `name`, `page` and `status` into an existing key.
    ///
    /// The key is not checked for existence; a stale key creates the entry.
    pub async fn update_pioneer(&self, id: &str, input: &PioneerInput) -> Result<()> {
        let path = entity_path(&paths::pioneers(), id)?;
        let fields = input.validate()?;
        let fields = match to_value(&fields)? {
            Value::Object(map) => map,
            _ => return Err(SdkError::Config("pioneer fields must serialize to an object".into())),
        };
        self.store.write_partial(&path, fields).await?;
        info!(key = %id, "Updated pioneer");
        Ok(())
    }

    pub async fn remove_pioneer(
        &self,
        id: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<RemoveOutcome> {
        let path = entity_path(&paths::pioneers(), id)?;
        self.remove(path, REMOVE_PIONEER_PROMPT, confirmation).await
    }

    pub async fn submit_pioneer(&self, submission: &Submission<PioneerInput>) -> Result<String> {
        match submission {
            Submission::Add(input) => self.add_pioneer(input).await,
            Submission::Edit { id, input } => {
                self.update_pioneer(id, input).await?;
                Ok(id.clone())
            }
        }
    }

    /// Set the total capacity from raw form text.
    ///
    /// Must be a non-negative base-10 integer no lower than the active count
    /// in the locally synchronized pioneer list.
    pub async fn update_capacity(&self, raw: &str) -> Result<u64> {
        let capacity = self.validate_capacity(raw)?;
        self.store
            .write_full(&paths::total_capacity(), capacity.into())
            .await?;
        info!(capacity, "Updated capacity");
        Ok(capacity)
    }

    /// Capacity check without writing
    pub fn validate_capacity(&self, raw: &str) -> std::result::Result<u64, ValidationError> {
        let raw = raw.trim();
        let not_an_integer = || ValidationError::new(Field::Capacity, Reason::NotAnInteger);
        let digits = match raw.strip_prefix('-') {
            Some(magnitude) => {
                if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(not_an_integer());
                }
                if magnitude.bytes().any(|b| b != b'0') {
                    return Err(ValidationError::new(Field::Capacity, Reason::Negative));
                }
                magnitude
            }
            None => raw,
        };
        let capacity: u64 = digits.parse().map_err(|_| not_an_integer())?;

        let active = match &*self.pioneers.borrow() {
            SyncState::Ready(list) => active_count(list),
            _ => return Err(ValidationError::new(Field::Capacity, Reason::CountUnavailable)),
        };
        if capacity < active {
            return Err(ValidationError::new(
                Field::Capacity,
                Reason::BelowActiveCount { active },
            ));
        }
        Ok(capacity)
    }

    /// Overwrite the server status document
    pub async fn update_server_status(&self, input: &ServerStatusInput) -> Result<ServerStatus> {
        let document = input.validate()?;
        self.store
            .write_full(&paths::server_status(), to_value(&document)?)
            .await?;
        info!(status = %document.status, "Updated server status");
        Ok(document)
    }

    pub async fn add_roadmap_item(&self, input: &RoadmapInput) -> Result<String> {
        let fields = input.validate()?;
        let key = self.store.append(&paths::roadmap(), to_value(&fields)?).await?;
        info!(key = %key, "Added roadmap item");
        Ok(key)
    }

    /// Overwrite a roadmap item with all three fields.
    pub async fn update_roadmap_item(&self, id: &str, input: &RoadmapInput) -> Result<()> {
        let path = entity_path(&paths::roadmap(), id)?;
        let fields = input.validate()?;
        self.store.write_full(&path, to_value(&fields)?).await?;
        info!(key = %id, "Updated roadmap item");
        Ok(())
    }

    pub async fn remove_roadmap_item(
        &self,
        id: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<RemoveOutcome> {
        let path = entity_path(&paths::roadmap(), id)?;
        self.remove(path, REMOVE_ROADMAP_PROMPT, confirmation).await
    }

    pub async fn submit_roadmap(&self, submission: &Submission<RoadmapInput>) -> Result<String> {
        match submission {
            Submission::Add(input) => self.add_roadmap_item(input).await,
            Submission::Edit { id, input } => {
                self.update_roadmap_item(id, input).await?;
                Ok(id.clone())
            }
        }
    }

    async fn remove(
        &self,
        path: StorePath,
        prompt: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<RemoveOutcome> {
        if !confirmation.confirm(prompt) {
            debug!(path = %path, "Removal cancelled");
            return Ok(RemoveOutcome::Cancelled);
        }
        self.store.delete(&path).await?;
        info!(path = %path, "Removed");
        Ok(RemoveOutcome::Removed)
    }
}

/// `collection/<id>`, rejecting ids that are not a single key
fn entity_path(collection: &StorePath, id: &str) -> Result<StorePath> {
    validate_segment(id).map_err(|_| ValidationError::new(Field::Id, Reason::InvalidKey))?;
    collection
        .child(id)
        .map_err(|_| ValidationError::new(Field::Id, Reason::InvalidKey).into())
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| SdkError::Store(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PioneerStatus;
    use pioneer_store::{MemoryStore, StoreCall};
    use serde_json::json;

    fn gateway_with(store: &MemoryStore, state: SyncState<Vec<Pioneer>>) -> MutationGateway {
        // The last value stays readable after the sender is gone
        let (_, rx) = watch::channel(state);
        MutationGateway::new(Arc::new(store.clone()), rx)
    }

    fn ready(statuses: &[PioneerStatus]) -> SyncState<Vec<Pioneer>> {
        let list = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| Pioneer {
                id: format!("p{i}"),
                name: format!("Name {i}"),
                page: format!("page{i}"),
                status: *status,
            })
            .collect();
        SyncState::Ready(Arc::new(list))
    }

    #[tokio::test]
    async fn test_add_pioneer_writes_trimmed_fields() {
        let store = MemoryStore::new();
        let gateway = gateway_with(&store, SyncState::Loading);

        let key = gateway
            .add_pioneer(&PioneerInput::new(" Ann ", " ann.page ", "PIONEER"))
            .await
            .unwrap();
        assert_eq!(key.len(), 20);
        assert_eq!(
            store.writes(),
            vec![StoreCall::Append {
                path: paths::pioneers(),
                value: json!({"name": "Ann", "page": "ann.page", "status": "PIONEER"}),
            }]
        );
    }

    #[tokio::test]
    async fn test_update_pioneer_is_partial_merge() {
        let store = MemoryStore::with_value(json!({
            "pioneers": {"p1": {"name": "Ann", "page": "ann.page", "status": "PIONEER", "note": "vip"}}
        }));
        let gateway = gateway_with(&store, SyncState::Loading);

        gateway
            .update_pioneer("p1", &PioneerInput::new("Ann", "ann.page", "FROZEN"))
            .await
            .unwrap();
        assert_eq!(
            store.value_at(&StorePath::from_static("pioneers/p1")),
            Some(json!({"name": "Ann", "page": "ann.page", "status": "FROZEN", "note": "vip"}))
        );
    }

    #[tokio::test]
    async fn test_update_rejects_bad_id_before_store() {
        let store = MemoryStore::new();
        let gateway = gateway_with(&store, SyncState::Loading);

        for id in ["", "a/b", "a.b", "a#b", "a$b", "a[b", "a]b"] {
            let err = gateway
                .update_pioneer(id, &PioneerInput::new("Ann", "p", "PIONEER"))
                .await
                .unwrap_err();
            match err {
                SdkError::Validation(v) => {
                    assert_eq!(v.field, Field::Id);
                    assert_eq!(v.reason, Reason::InvalidKey);
                }
                other => panic!("unexpected error for {id:?}: {other}"),
            }
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_capacity_rules() {
        let store = MemoryStore::new();
        let gateway = gateway_with(
            &store,
            ready(&[PioneerStatus::Pioneer, PioneerStatus::Partner, PioneerStatus::Frozen]),
        );

        for (raw, reason) in [
            ("abc", Reason::NotAnInteger),
            ("1.5", Reason::NotAnInteger),
            ("", Reason::NotAnInteger),
            ("-3", Reason::Negative),
            ("1", Reason::BelowActiveCount { active: 2 }),
        ] {
            let err = gateway.update_capacity(raw).await.unwrap_err();
            match err {
                SdkError::Validation(v) => assert_eq!(v.reason, reason, "input {raw:?}"),
                other => panic!("unexpected error for {raw:?}: {other}"),
            }
        }
        assert!(store.writes().is_empty());

        assert_eq!(gateway.update_capacity(" 2 ").await.unwrap(), 2);
        assert_eq!(store.value_at(&paths::total_capacity()), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_capacity_accepts_full_unsigned_range() {
        let store = MemoryStore::new();
        let gateway = gateway_with(&store, ready(&[PioneerStatus::Pioneer]));

        let above_i64 = (i64::MAX as u64) + 1;
        assert_eq!(
            gateway.update_capacity(&above_i64.to_string()).await.unwrap(),
            above_i64
        );
        assert_eq!(
            gateway.validate_capacity("-9223372036854775809").unwrap_err().reason,
            Reason::Negative
        );
        assert_eq!(
            gateway.validate_capacity("-").unwrap_err().reason,
            Reason::NotAnInteger
        );
        assert_eq!(
            gateway.validate_capacity("18446744073709551616").unwrap_err().reason,
            Reason::NotAnInteger
        );
    }

    #[tokio::test]
    async fn test_capacity_rejected_while_loading() {
        let store = MemoryStore::new();
        let gateway = gateway_with(&store, SyncState::Loading);

        let err = gateway.update_capacity("50").await.unwrap_err();
        assert!(matches!(
            err,
            SdkError::Validation(ValidationError { reason: Reason::CountUnavailable, .. })
        ));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_roadmap_update_is_full_overwrite() {
        let store = MemoryStore::with_value(json!({
            "siteContent": {"roadmap": {"r1": {"title": "Old", "description": "d", "icon": "media", "extra": 1}}}
        }));
        let gateway = gateway_with(&store, SyncState::Loading);

        gateway
            .update_roadmap_item("r1", &RoadmapInput::new("New", "d2", "rocket"))
            .await
            .unwrap();
        assert_eq!(
            store.value_at(&StorePath::from_static("siteContent/roadmap/r1")),
            Some(json!({"title": "New", "description": "d2", "icon": "rocket"}))
        );
    }

    #[tokio::test]
    async fn test_remove_needs_confirmation() {
        let store = MemoryStore::with_value(json!({
            "siteContent": {"roadmap": {"r1": {"title": "T", "description": "d", "icon": "media"}}}
        }));
        let gateway = gateway_with(&store, SyncState::Loading);

        let outcome = gateway.remove_roadmap_item("r1", &|_: &str| false).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Cancelled);
        assert!(store.writes().is_empty());

        let asked = std::cell::RefCell::new(Vec::new());
        let outcome = gateway
            .remove_roadmap_item("r1", &|prompt: &str| {
                asked.borrow_mut().push(prompt.to_string());
                true
            })
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert_eq!(asked.into_inner(), vec![REMOVE_ROADMAP_PROMPT.to_string()]);
        assert_eq!(store.value_at(&paths::roadmap()), None);
    }

    #[tokio::test]
    async fn test_server_status_overwrite() {
        let store = MemoryStore::new();
        let gateway = gateway_with(&store, SyncState::Loading);

        gateway
            .update_server_status(&ServerStatusInput::new("Maintenance", "Back soon"))
            .await
            .unwrap();
        assert_eq!(
            store.value_at(&paths::server_status()),
            Some(json!({"status": "Maintenance", "message": "Back soon"}))
        );

        let err = gateway
            .update_server_status(&ServerStatusInput::new("Broken", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation(_)));
    }

    #[tokio::test]
    async fn test_store_rejection_is_returned() {
        let store = MemoryStore::new();
        store.reject_writes_under(paths::pioneers());
        let gateway = gateway_with(&store, SyncState::Loading);

        let err = gateway
            .add_pioneer(&PioneerInput::new("Ann", "ann.page", "PIONEER"))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Store(ref e) if e.is_permission_denied()));
    }
}
