//! Snapshot projections
//!
//! A projection turns the raw value at a subscribed path into the typed state
//! a synchronizer publishes: an ordered entity list for collections, a
//! decoded document for singletons.

use crate::model::{DisplayOrder, Document, Entity};
use pioneer_store::Snapshot;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Snapshot that does not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Child key that failed, if the failure is per entity
    pub key: Option<String>,
    pub reason: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "entry {:?}: {}", key, self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Maps snapshots to published state
pub trait Projection: Send + Sync + 'static {
    type Output: fmt::Debug + Send + Sync + 'static;

    fn project(&self, snapshot: &Snapshot) -> Result<Self::Output, DecodeError>;
}

/// Collection projection producing `Vec<E>` in display order
pub struct EntityList<E>(PhantomData<fn() -> E>);

impl<E> EntityList<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EntityList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Projection for EntityList<E> {
    type Output = Vec<E>;

    fn project(&self, snapshot: &Snapshot) -> Result<Vec<E>, DecodeError> {
        decode_entities(snapshot.value())
    }
}

/// Singleton projection; an empty path yields `D::default()`
pub struct SingleDocument<D>(PhantomData<fn() -> D>);

impl<D> SingleDocument<D> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<D> Default for SingleDocument<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> Projection for SingleDocument<D> {
    type Output = D;

    fn project(&self, snapshot: &Snapshot) -> Result<D, DecodeError> {
        match snapshot.value() {
            None => Ok(D::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| DecodeError {
                key: None,
                reason: e.to_string(),
            }),
        }
    }
}

/// Decode a collection value into entities in display order.
///
/// Children are taken in store iteration order (see [`store_key_order`]),
/// then reversed when the entity displays newest first.
pub fn decode_entities<E: Entity>(value: Option<&Value>) -> Result<Vec<E>, DecodeError> {
    let mut children: Vec<(String, &Value)> = match value {
        None => return Ok(Vec::new()),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        // Integer-like keys can come back as a sparse array
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Some(other) => {
            return Err(DecodeError {
                key: None,
                reason: format!("expected a keyed collection, found {}", kind_of(other)),
            })
        }
    };
    children.sort_by(|(a, _), (b, _)| store_key_order(a, b));

    let mut entities = Vec::with_capacity(children.len());
    for (key, raw) in children {
        let fields: E::Fields = serde_json::from_value(raw.clone()).map_err(|e| DecodeError {
            key: Some(key.clone()),
            reason: e.to_string(),
        })?;
        entities.push(E::from_fields(key, fields));
    }

    if E::ORDER == DisplayOrder::Reversed {
        entities.reverse();
    }
    Ok(entities)
}

/// Key ordering used by the store when iterating children: keys that are
/// 32-bit integers first, numerically, then everything else lexically.
pub fn store_key_order(a: &str, b: &str) -> Ordering {
    match (as_int_key(a), as_int_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn as_int_key(key: &str) -> Option<i32> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    let canonical = digits.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !digits.starts_with('0'));
    if !canonical {
        return None;
    }
    key.parse().ok()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LiveStatus, Pioneer, RoadmapItem};
    use pioneer_store::StorePath;
    use serde_json::json;

    fn ids<E: Entity>(list: &[E]) -> Vec<&str> {
        list.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_pioneers_are_reversed() {
        let value = json!({
            "p1": {"name": "Ann", "page": "ann.page", "status": "PIONEER"},
            "p2": {"name": "Bo", "page": "bo.shop", "status": "FROZEN"},
            "p3": {"name": "Cy", "page": "cy.io", "status": "PARTNER"}
        });
        let list: Vec<Pioneer> = decode_entities(Some(&value)).unwrap();
        assert_eq!(ids(&list), vec!["p3", "p2", "p1"]);
    }

    #[test]
    fn test_roadmap_keeps_iteration_order() {
        let value = json!({
            "-Nb": {"title": "B", "description": "b", "icon": "media"},
            "-Na": {"title": "A", "description": "a", "icon": "engine"}
        });
        let list: Vec<RoadmapItem> = decode_entities(Some(&value)).unwrap();
        assert_eq!(ids(&list), vec!["-Na", "-Nb"]);
    }

    #[test]
    fn test_absent_collection_is_empty() {
        let list: Vec<Pioneer> = decode_entities(None).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_bad_entry_names_key() {
        let value = json!({
            "p1": {"name": "Ann", "page": "ann.page", "status": "PIONEER"},
            "p2": {"name": "Bo", "page": "bo.shop"}
        });
        let err = decode_entities::<Pioneer>(Some(&value)).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("p2"));
        assert!(err.reason.contains("status"));
    }

    #[test]
    fn test_scalar_collection_is_malformed() {
        let err = decode_entities::<Pioneer>(Some(&json!(5))).unwrap_err();
        assert_eq!(err.key, None);
    }

    #[test]
    fn test_integer_keys_sort_first_numerically() {
        let mut keys = vec!["b", "10", "2", "a", "02"];
        keys.sort_by(|a, b| store_key_order(a, b));
        assert_eq!(keys, vec!["2", "10", "02", "a", "b"]);
    }

    #[test]
    fn test_document_defaults_when_absent() {
        let projection = SingleDocument::<LiveStatus>::new();
        let empty = Snapshot::empty(StorePath::from_static("liveStatus"));
        assert_eq!(projection.project(&empty).unwrap(), LiveStatus::default());

        let bad = Snapshot::new(StorePath::from_static("liveStatus"), Some(json!("oops")));
        assert!(projection.project(&bad).is_err());
    }
}
