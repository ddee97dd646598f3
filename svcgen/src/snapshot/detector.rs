//! Skip-or-proceed decisions based on schema content hashes.

use serde::Serialize;
use serde_json::Value;

use super::canonical::content_hash;
use super::store::SnapshotStore;

/// How an entity's representation compares to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeState {
    /// No hash recorded yet
    New,
    /// Hash differs from the recorded one
    Changed,
    /// Hash matches the recorded one
    Unchanged,
}

/// Result of comparing one entity against the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeCheck {
    pub state: ChangeState,
    /// Hash of the current representation, to be recorded after generation
    pub hash: String,
}

impl ChangeCheck {
    pub fn needs_update(&self) -> bool {
        self.state != ChangeState::Unchanged
    }
}

/// Read-only view over a snapshot store.
pub struct ChangeDetector<'a> {
    snapshot: &'a SnapshotStore,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(snapshot: &'a SnapshotStore) -> Self {
        Self { snapshot }
    }

    /// Compare the representation of `key` against the stored hash.
    pub fn check(&self, key: &str, representation: &Value) -> ChangeCheck {
        let hash = content_hash(representation);
        let state = match self.snapshot.hash(key) {
            None => ChangeState::New,
            Some(previous) if previous == hash => ChangeState::Unchanged,
            Some(_) => ChangeState::Changed,
        };
        ChangeCheck { state, hash }
    }

    /// True when no hash is recorded for `key` or it differs.
    pub fn needs_update(&self, key: &str, representation: &Value) -> bool {
        self.check(key, representation).needs_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotEntry;
    use serde_json::json;

    fn store_with(key: &str, repr: &Value) -> SnapshotStore {
        let mut store = SnapshotStore::empty("unused.json");
        store.set(
            key,
            SnapshotEntry {
                hash: content_hash(repr),
                artifact: "x.rs".to_string(),
            },
        );
        store
    }

    #[test]
    fn test_unknown_key_needs_update() {
        let store = SnapshotStore::empty("unused.json");
        let detector = ChangeDetector::new(&store);
        let check = detector.check("WidgetTable", &json!({"fields": []}));
        assert_eq!(check.state, ChangeState::New);
        assert!(check.needs_update());
    }

    #[test]
    fn test_identical_representation_is_unchanged() {
        let repr = json!({"key": "WidgetTable", "fields": [{"name": "id"}]});
        let store = store_with("WidgetTable", &repr);
        let detector = ChangeDetector::new(&store);
        assert!(!detector.needs_update("WidgetTable", &repr));
    }

    #[test]
    fn test_field_edits_are_detected() {
        let fields = |pairs: &[(&str, &str)]| {
            let fields: Vec<_> = pairs
                .iter()
                .map(|(name, ty)| json!({"name": name, "type": ty}))
                .collect();
            json!({ "fields": fields })
        };
        let repr = fields(&[("id", "i64"), ("name", "String")]);
        let store = store_with("WidgetTable", &repr);
        let detector = ChangeDetector::new(&store);

        let added = fields(&[("id", "i64"), ("name", "String"), ("sku", "String")]);
        let removed = fields(&[("id", "i64")]);
        let renamed = fields(&[("id", "i64"), ("title", "String")]);
        let retyped = fields(&[("id", "i32"), ("name", "String")]);

        for edited in [added, removed, renamed, retyped] {
            assert_eq!(detector.check("WidgetTable", &edited).state, ChangeState::Changed);
        }
    }
}
