//! JSON tree edits shared by the in-memory store and the event-stream cache.
//!
//! The tree follows realtime-database rules: `null` means absent, and objects
//! that become empty are pruned from their parent.

use serde_json::{Map, Value};

/// Read the value at `segments`, if present.
pub fn get_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Strip nulls and empty objects. Returns `None` when nothing remains.
pub fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        other => Some(other),
    }
}

/// Replace the value at `segments`. A null (after normalization) removes it.
pub fn set_at(root: &mut Value, segments: &[String], value: Value) {
    let Some(value) = normalize(value) else {
        remove_at(root, segments);
        return;
    };

    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.clone(), value);
}

/// Merge `fields` into the object at `segments`, one child write per field.
pub fn merge_at(root: &mut Value, segments: &[String], fields: Map<String, Value>) {
    for (key, value) in fields {
        let mut child = segments.to_vec();
        child.push(key);
        set_at(root, &child, value);
    }
}

/// Remove the subtree at `segments` and prune parents left empty.
pub fn remove_at(root: &mut Value, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        *root = Value::Null;
        return;
    };

    let Some(map) = root.as_object_mut() else {
        return;
    };

    if rest.is_empty() {
        map.remove(first);
    } else if let Some(child) = map.get_mut(first) {
        remove_at(child, rest);
        if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
            map.remove(first);
        }
    }

    if map.is_empty() {
        *root = Value::Null;
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        path.split('/').filter(|s| !s.is_empty()).map(String::from).collect()
    }

    #[test]
    fn test_set_creates_parents() {
        let mut root = Value::Null;
        set_at(&mut root, &segs("liveStatus/totalPioneers"), json!(3));
        assert_eq!(root, json!({"liveStatus": {"totalPioneers": 3}}));
        assert_eq!(get_at(&root, &segs("liveStatus/totalPioneers")), Some(&json!(3)));
    }

    #[test]
    fn test_set_null_prunes_empty_parents() {
        let mut root = json!({"pioneers": {"p1": {"name": "Ann"}}, "liveStatus": {"totalCapacity": 10}});
        set_at(&mut root, &segs("pioneers/p1"), Value::Null);
        assert_eq!(root, json!({"liveStatus": {"totalCapacity": 10}}));
    }

    #[test]
    fn test_merge_keeps_siblings() {
        let mut root = json!({"pioneers": {"p1": {"name": "Ann", "page": "ann.page", "status": "PIONEER"}}});
        let mut fields = Map::new();
        fields.insert("status".into(), json!("FROZEN"));
        merge_at(&mut root, &segs("pioneers/p1"), fields);
        assert_eq!(
            root["pioneers"]["p1"],
            json!({"name": "Ann", "page": "ann.page", "status": "FROZEN"})
        );
    }

    #[test]
    fn test_remove_last_entry_clears_root() {
        let mut root = json!({"pioneers": {"p1": {"name": "Ann"}}});
        remove_at(&mut root, &segs("pioneers/p1"));
        assert!(root.is_null());
        assert!(get_at(&root, &segs("pioneers")).is_none());
    }

    #[test]
    fn test_normalize_drops_nested_nulls() {
        let value = json!({"a": null, "b": {"c": null}, "d": 1});
        assert_eq!(normalize(value), Some(json!({"d": 1})));
        assert_eq!(normalize(json!({})), None);
    }
}
