//! Core types for spark-jsx.
//!
//! These types flow between the data manager, the render coordinator and the
//! renderers. A state mutation becomes a [`KeyChange`] on the per-key channel
//! or part of a [`ChangeSet`] on the batched channel; whichever reaches the
//! renderer ends up as the change-set handed to `update`.

use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Value
// =============================================================================

/// A state or prop value as seen by the render pipeline.
///
/// The pipeline never interprets values; it only moves them between the
/// data manager and `update`, and compares them when diffing attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Change Records
// =============================================================================

/// Where a mutation came from.
///
/// Internal state and external input (props) are tracked as separate
/// change-sets by the JSX renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeOrigin {
    /// The component's own state.
    #[default]
    State,
    /// Input handed down by the parent.
    Prop,
}

/// Previous and new value of one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub prev_val: Value,
    pub new_val: Value,
    pub origin: ChangeOrigin,
}

impl Change {
    /// A state-origin change.
    pub fn new(prev_val: impl Into<Value>, new_val: impl Into<Value>) -> Self {
        Self {
            prev_val: prev_val.into(),
            new_val: new_val.into(),
            origin: ChangeOrigin::State,
        }
    }

    /// Same change, tagged with a different origin.
    pub fn with_origin(mut self, origin: ChangeOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// Payload of the per-key channel: one mutation, fired synchronously.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChange {
    pub key: String,
    pub prev_val: Value,
    pub new_val: Value,
    pub origin: ChangeOrigin,
}

impl KeyChange {
    /// A state-origin key change.
    pub fn state(
        key: impl Into<String>,
        prev_val: impl Into<Value>,
        new_val: impl Into<Value>,
    ) -> Self {
        Self {
            key: key.into(),
            prev_val: prev_val.into(),
            new_val: new_val.into(),
            origin: ChangeOrigin::State,
        }
    }

    /// A prop-origin key change.
    pub fn prop(
        key: impl Into<String>,
        prev_val: impl Into<Value>,
        new_val: impl Into<Value>,
    ) -> Self {
        Self {
            origin: ChangeOrigin::Prop,
            ..Self::state(key, prev_val, new_val)
        }
    }

    /// Split into the map key and its [`Change`].
    pub fn into_entry(self) -> (String, Change) {
        (
            self.key,
            Change {
                prev_val: self.prev_val,
                new_val: self.new_val,
                origin: self.origin,
            },
        )
    }
}

/// Mapping from changed key to its previous and new value.
///
/// Ordered so that logs and `update` callers see keys deterministically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeSet {
    entries: BTreeMap<String, Change>,
}

impl ChangeSet {
    /// Create an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A change-set holding exactly one key.
    pub fn singleton(change: KeyChange) -> Self {
        let mut set = Self::new();
        set.record(change);
        set
    }

    /// Insert or replace one key.
    pub fn insert(&mut self, key: impl Into<String>, change: Change) {
        self.entries.insert(key.into(), change);
    }

    /// Record a per-key notification.
    ///
    /// A key recorded twice keeps its first `prev_val` and takes the newest
    /// `new_val`, so the entry spans the whole cycle.
    pub fn record(&mut self, change: KeyChange) {
        let (key, change) = change.into_entry();
        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.new_val = change.new_val;
                existing.origin = change.origin;
            }
            None => {
                self.entries.insert(key, change);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Change> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge another change-set into this one, newest values winning.
    pub fn extend(&mut self, other: ChangeSet) {
        for (key, change) in other.entries {
            self.record(KeyChange {
                key,
                prev_val: change.prev_val,
                new_val: change.new_val,
                origin: change.origin,
            });
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, Change);
    type IntoIter = std::collections::btree_map::IntoIter<String, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<KeyChange> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = KeyChange>>(iter: I) -> Self {
        let mut set = Self::new();
        for change in iter {
            set.record(change);
        }
        set
    }
}

// =============================================================================
// Update Mode
// =============================================================================

/// How a component wants to hear about state mutations.
///
/// Fixed when the component is built and read once by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// One notification per macro-update carrying every changed key.
    #[default]
    Batched,
    /// One synchronous notification per individual key mutation.
    PerKey,
}

// =============================================================================
// Extra Data Config
// =============================================================================

/// Additional derived-state fields a renderer asks the data manager to track.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtraDataConfig {
    fields: BTreeMap<String, Value>,
}

impl ExtraDataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with its initial value.
    pub fn field(mut self, name: impl Into<String>, initial: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), initial.into());
        self
    }

    /// Initial value of a declared field.
    pub fn initial(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
