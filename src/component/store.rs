//! StateStore - reference data manager for a component.
//!
//! Holds each key in its own signal and emits on the component's channels
//! the way a data manager does: every mutation fires the per-key channel
//! immediately, and `flush` fires one batched notification for everything
//! changed since the previous flush.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use spark_signals::{signal, Signal};
use tracing::trace;

use super::Component;
use crate::types::{ChangeOrigin, ChangeSet, ExtraDataConfig, KeyChange, Value};

/// Per-component state container that emits change notifications.
pub struct StateStore {
    component: Rc<Component>,
    values: RefCell<HashMap<String, Signal<Value>>>,
    pending: RefCell<ChangeSet>,
}

impl StateStore {
    pub fn new(component: Rc<Component>) -> Self {
        Self {
            component,
            values: RefCell::new(HashMap::new()),
            pending: RefCell::new(ChangeSet::new()),
        }
    }

    /// Store seeded with the fields a renderer asked for.
    pub fn with_extra(component: Rc<Component>, extra: Option<&ExtraDataConfig>) -> Self {
        let store = Self::new(component);
        if let Some(extra) = extra {
            let mut values = store.values.borrow_mut();
            for (name, initial) in extra.fields() {
                values.insert(name.to_string(), signal(initial.clone()));
            }
        }
        store
    }

    pub fn component(&self) -> &Rc<Component> {
        &self.component
    }

    /// Current value of a key (`Null` if never set).
    ///
    /// Creates a reactive dependency when called from an effect.
    pub fn get(&self, key: &str) -> Value {
        self.values
            .borrow()
            .get(key)
            .map(|s| s.get())
            .unwrap_or_default()
    }

    /// Signal for a key, created with `Null` if absent.
    pub fn watch(&self, key: &str) -> Signal<Value> {
        self.values
            .borrow_mut()
            .entry(key.to_string())
            .or_insert_with(|| signal(Value::Null))
            .clone()
    }

    /// Set a state key.
    pub fn set_state(&self, key: &str, value: impl Into<Value>) -> bool {
        self.set(key, value.into(), ChangeOrigin::State)
    }

    /// Set a prop key (input from the parent).
    pub fn set_prop(&self, key: &str, value: impl Into<Value>) -> bool {
        self.set(key, value.into(), ChangeOrigin::Prop)
    }

    /// Store a value and notify.
    ///
    /// Returns false (and emits nothing) if the value is unchanged.
    pub fn set(&self, key: &str, value: Value, origin: ChangeOrigin) -> bool {
        let slot = self.watch(key);
        let prev_val = slot.get();
        if prev_val == value {
            return false;
        }
        slot.set(value.clone());

        let change = KeyChange {
            key: key.to_string(),
            prev_val,
            new_val: value,
            origin,
        };
        trace!(component = self.component.name(), key, ?origin, "state key changed");

        self.pending.borrow_mut().record(change.clone());
        self.component.emit_state_key_changed(&change);
        true
    }

    /// Number of keys changed since the last flush.
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Emit one batched notification for everything changed since the
    /// previous flush. Returns the number of keys emitted.
    pub fn flush(&self) -> usize {
        let changes = std::mem::take(&mut *self.pending.borrow_mut());
        let count = changes.len();
        self.component.emit_state_changed(&changes);
        count
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("component", &self.component.name())
            .field("keys", &self.values.borrow().len())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_set_emits_per_key_and_batches_on_flush() {
        let component = Component::builder("Store").build();
        let store = StateStore::new(component.clone());

        let keys = Rc::new(RefCell::new(Vec::new()));
        let batches = Rc::new(RefCell::new(Vec::new()));

        let keys_clone = keys.clone();
        let _a = component
            .on_state_key_changed(move |c| keys_clone.borrow_mut().push(c.key.clone()))
            .unwrap();
        let batches_clone = batches.clone();
        let _b = component
            .on_state_changed(move |c| batches_clone.borrow_mut().push(c.clone()))
            .unwrap();

        assert!(store.set_state("a", 1));
        assert!(store.set_prop("b", "x"));
        assert!(store.set_state("a", 2));
        assert_eq!(*keys.borrow(), vec!["a", "b", "a"]);
        assert!(batches.borrow().is_empty());

        assert_eq!(store.flush(), 2);
        let batch = &batches.borrow()[0];
        assert_eq!(batch.get("a").unwrap().prev_val, Value::Null);
        assert_eq!(batch.get("a").unwrap().new_val, Value::Int(2));
        assert_eq!(batch.get("b").unwrap().origin, ChangeOrigin::Prop);

        // Nothing pending: no second batch.
        assert_eq!(store.flush(), 0);
        assert_eq!(batches.borrow().len(), 1);
    }

    #[test]
    fn test_unchanged_value_is_silent() {
        let component = Component::builder("Quiet").build();
        let store = StateStore::new(component.clone());
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let _a = component
            .on_state_key_changed(move |_| count_clone.set(count_clone.get() + 1))
            .unwrap();

        assert!(store.set_state("k", "v"));
        assert!(!store.set_state("k", "v"));
        assert_eq!(count.get(), 1);
        assert_eq!(store.get("k"), Value::from("v"));
    }

    #[test]
    fn test_with_extra_seeds_values() {
        let component = Component::builder("Extra").build();
        let extra = ExtraDataConfig::new().field("children", Value::List(Vec::new()));
        let store = StateStore::with_extra(component, Some(&extra));

        assert_eq!(store.get("children"), Value::List(Vec::new()));
        assert_eq!(store.get("unknown"), Value::Null);
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn test_watch_returns_live_signal() {
        let component = Component::builder("Watch").build();
        let store = StateStore::new(component);
        let title = store.watch("title");

        store.set_state("title", "hello");
        assert_eq!(title.get(), Value::from("hello"));
    }
}
