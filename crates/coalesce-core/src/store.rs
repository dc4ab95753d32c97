//! Per-instance property storage
//!
//! `PropertyStore` keeps three views of an instance's accessor properties:
//!
//! - `current`: the live value of every property written so far
//! - `pending`: properties changed since the last flush, with their latest value
//! - `old`: for each pending property, its value before the first change of the batch
//!
//! `pending` and `old` only exist while a batch is open and are opened and
//! drained together.

use crate::detect::ChangeDetector;
use crate::schema::PropertySchema;
use crate::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// One delivered batch of changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Snapshot of every live value at drain time.
    ///
    /// Cloned on every drain, so each flush costs O(declared properties).
    pub current: ValueMap,
    /// Properties changed in this batch with their latest value
    pub changed: ValueMap,
    /// Value of each changed property before its first change in this batch
    pub old: ValueMap,
}

impl ChangeBatch {
    /// Number of changed properties
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Check whether `name` changed in this batch
    pub fn contains(&self, name: &str) -> bool {
        self.changed.contains_key(name)
    }
}

#[derive(Debug, Default)]
struct OpenBatch {
    pending: ValueMap,
    old: ValueMap,
}

/// Storage for current, pending and old values of one instance
#[derive(Debug, Default)]
pub struct PropertyStore {
    current: ValueMap,
    batch: Option<OpenBatch>,
    captured: Option<ValueMap>,
}

impl PropertyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to construction state, then move every plain field that shares a
    /// name with a declared accessor out of `fields` and into the captured
    /// overrides. Fields without an accessor stay in `fields`.
    pub fn initialize(&mut self, schema: &PropertySchema, fields: &mut ValueMap) {
        *self = Self::default();
        for name in schema.names() {
            if let Some(value) = fields.shift_remove(name) {
                trace!(property = name, "captured instance override");
                self.captured
                    .get_or_insert_with(ValueMap::new)
                    .insert(name.to_string(), value);
            }
        }
    }

    /// Captured overrides not yet replayed
    pub fn captured_overrides(&self) -> Option<&ValueMap> {
        self.captured.as_ref()
    }

    /// Take the captured overrides for replay; returns `None` once taken
    pub fn take_captured_overrides(&mut self) -> Option<ValueMap> {
        self.captured.take()
    }

    /// Record a write if `detector` reports a change.
    ///
    /// Opens a batch on the first change, keeps the pre-batch value of each
    /// property in `old`, and updates `current` and `pending`. Does not
    /// schedule anything.
    pub fn set_pending_property(
        &mut self,
        name: &str,
        value: Value,
        detector: &dyn ChangeDetector,
    ) -> bool {
        let old = self.get(name);
        if !detector.should_change(name, &value, &old) {
            trace!(property = name, "write ignored, value unchanged");
            return false;
        }

        let batch = self.batch.get_or_insert_with(|| {
            debug!(property = name, "opening batch");
            OpenBatch::default()
        });
        if !batch.old.contains_key(name) {
            batch.old.insert(name.to_string(), old);
        }
        batch.pending.insert(name.to_string(), value.clone());
        self.current.insert(name.to_string(), value);
        true
    }

    /// Close the open batch and hand it over, or `None` if no batch is open
    pub fn drain_pending(&mut self) -> Option<ChangeBatch> {
        let OpenBatch { pending, old } = self.batch.take()?;
        Some(ChangeBatch {
            current: self.current.clone(),
            changed: pending,
            old,
        })
    }

    /// Reopen a drained batch that could not be delivered. Changes recorded
    /// since the drain keep their newer pending value but not their old one.
    pub(crate) fn restore_pending(&mut self, batch: ChangeBatch) {
        let mut restored = OpenBatch {
            pending: batch.changed,
            old: batch.old,
        };
        if let Some(newer) = self.batch.take() {
            for (name, value) in newer.old {
                restored.old.entry(name).or_insert(value);
            }
            restored.pending.extend(newer.pending);
        }
        self.batch = Some(restored);
    }

    /// Current value of a property (`Undefined` if never written)
    pub fn get(&self, name: &str) -> Value {
        self.current.get(name).cloned().unwrap_or_default()
    }

    /// All live values
    pub fn current(&self) -> &ValueMap {
        &self.current
    }

    /// Pending changes of the open batch
    pub fn pending(&self) -> Option<&ValueMap> {
        self.batch.as_ref().map(|b| &b.pending)
    }

    /// Pre-batch values of the open batch
    pub fn old(&self) -> Option<&ValueMap> {
        self.batch.as_ref().map(|b| &b.old)
    }

    /// Check whether a batch is open
    pub fn has_pending(&self) -> bool {
        self.batch.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StrictEquality;

    fn schema() -> std::rc::Rc<PropertySchema> {
        PropertySchema::builder()
            .property("a")
            .and_then(|b| b.property("b"))
            .expect("schema")
            .build()
    }

    #[test]
    fn test_first_change_opens_batch() {
        let mut store = PropertyStore::new();
        assert!(!store.has_pending());
        assert!(store.pending().is_none() && store.old().is_none());

        assert!(store.set_pending_property("a", Value::Int(1), &StrictEquality));
        assert!(store.has_pending());
        assert_eq!(store.pending().map(|p| p.len()), Some(1));
        assert_eq!(store.old().and_then(|o| o.get("a")), Some(&Value::Undefined));
        assert_eq!(store.get("a"), Value::Int(1));
    }

    #[test]
    fn test_old_keeps_first_pre_batch_value() {
        let mut store = PropertyStore::new();
        store.set_pending_property("a", Value::Int(1), &StrictEquality);
        store.drain_pending();

        store.set_pending_property("a", Value::Int(2), &StrictEquality);
        store.set_pending_property("a", Value::Int(3), &StrictEquality);

        let batch = store.drain_pending().expect("batch");
        assert_eq!(batch.old.get("a"), Some(&Value::Int(1)));
        assert_eq!(batch.changed.get("a"), Some(&Value::Int(3)));
        assert_eq!(batch.current.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_unchanged_write_leaves_batch_closed() {
        let mut store = PropertyStore::new();
        store.set_pending_property("a", Value::Float(f64::NAN), &StrictEquality);
        store.drain_pending();

        assert!(!store.set_pending_property("a", Value::Float(f64::NAN), &StrictEquality));
        assert!(!store.has_pending());
    }

    #[test]
    fn test_drain_closes_both_maps() {
        let mut store = PropertyStore::new();
        assert!(store.drain_pending().is_none());

        store.set_pending_property("b", "x".into(), &StrictEquality);
        assert!(store.drain_pending().is_some());
        assert!(store.pending().is_none());
        assert!(store.old().is_none());
        assert!(store.drain_pending().is_none());
    }

    #[test]
    fn test_restore_keeps_first_old_value() {
        let mut store = PropertyStore::new();
        store.set_pending_property("a", Value::Int(1), &StrictEquality);
        let batch = store.drain_pending().expect("batch");

        store.set_pending_property("a", Value::Int(2), &StrictEquality);
        store.set_pending_property("b", Value::Int(5), &StrictEquality);
        store.restore_pending(batch);

        let merged = store.drain_pending().expect("merged");
        assert_eq!(merged.old.get("a"), Some(&Value::Undefined));
        assert_eq!(merged.changed.get("a"), Some(&Value::Int(2)));
        assert_eq!(merged.old.get("b"), Some(&Value::Undefined));
        assert_eq!(merged.changed.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_change_batch_ron_roundtrip() {
        let mut store = PropertyStore::new();
        let items = Value::list([Value::Int(1), Value::from("two")]);
        store.set_pending_property("items", items.clone(), &StrictEquality);
        store.set_pending_property("count", Value::Int(3), &StrictEquality);
        let batch = store.drain_pending().expect("batch");

        let serialized = ron::to_string(&batch).expect("serialize");
        let parsed: ChangeBatch = ron::from_str(&serialized).expect("deserialize");

        assert_eq!(parsed, batch);
        let parsed_items = parsed.changed.get("items").expect("items");
        assert_eq!(parsed_items, &items);
        assert!(!parsed_items.strict_eq(&items), "deserialized lists are new references");
    }

    #[test]
    fn test_initialize_captures_declared_fields_only() {
        let mut store = PropertyStore::new();
        store.set_pending_property("a", Value::Int(9), &StrictEquality);

        let mut fields = ValueMap::new();
        fields.insert("a".into(), "bar".into());
        fields.insert("plain".into(), Value::Bool(true));

        store.initialize(&schema(), &mut fields);

        assert!(!store.has_pending());
        assert!(store.current().is_empty());
        assert_eq!(
            store.captured_overrides().and_then(|c| c.get("a")),
            Some(&Value::from("bar"))
        );
        assert!(!fields.contains_key("a"));
        assert!(fields.contains_key("plain"));

        assert!(store.take_captured_overrides().is_some());
        assert!(store.take_captured_overrides().is_none());
    }
}
