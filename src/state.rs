//! Composite state and slice records.
//!
//! The composite state is a keyed mapping from slice key to slice record.
//! Keys are fixed when the store is composed and never added or removed
//! afterward; only the contents of each record change. Every committed
//! transition produces a new composite state value derived from the
//! previous one plus one key's updated record, so readers holding an old
//! snapshot are never affected by later writes.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

// ============================================================================
// Record
// ============================================================================

/// One slice's record: an ordered map of named fields.
///
/// A record holds data fields plus zero or more action fields. Its shape
/// is determined once by its initializer's return value; partial updates
/// merge into the existing record rather than replacing it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Record(BTreeMap::new())
    }

    /// Builder-style: add a data field.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let rec = Record::new().field("count", 0).field("label", "items");
    /// ```
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Builder-style: add an action field.
    pub fn action(mut self, name: impl Into<String>, action: crate::value::SliceAction) -> Self {
        self.0.insert(name.into(), Value::Action(action));
        self
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Invoke an action field by name.
    ///
    /// Returns [`Error::NoSuchAction`] if the field is absent or holds a
    /// data value. Errors raised by the action itself propagate unchanged.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.0.get(name) {
            Some(Value::Action(a)) => a.call(args),
            _ => Err(Error::NoSuchAction(name.to_string())),
        }
    }

    /// Number of fields (data and actions).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Shallow-merge a partial record into this one, in place.
    ///
    /// Existing fields are retained unless named in `patch`; fields named
    /// in `patch` are replaced at object level (no deep merge); new fields
    /// are added. Merging an empty patch is the identity.
    pub fn merge(&mut self, patch: Record) {
        for (k, v) in patch.0 {
            self.0.insert(k, v);
        }
    }

    /// Shallow-merge, returning the merged record.
    pub fn merged(&self, patch: Record) -> Record {
        let mut next = self.clone();
        next.merge(patch);
        next
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let data = self.0.iter().filter(|(_, v)| !v.is_action());
        let mut map = serializer.serialize_map(None)?;
        for (k, v) in data {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        Ok(Record(BTreeMap::deserialize(d)?))
    }
}

// ============================================================================
// CompositeState
// ============================================================================

/// The full store state: a keyed mapping of all slices' records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeState(BTreeMap<String, Record>);

impl CompositeState {
    /// Create an empty composite state (used as the composition
    /// accumulator; a live store's key set never changes).
    pub fn new() -> Self {
        CompositeState(BTreeMap::new())
    }

    /// Insert a slice record at a key.
    pub fn insert(&mut self, key: impl Into<String>, record: Record) {
        self.0.insert(key.into(), record);
    }

    /// Get the record at a slice key.
    pub fn slice(&self, key: &str) -> Option<&Record> {
        self.0.get(key)
    }

    /// Check whether a slice key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of slices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no slices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slice keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate slices in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow-merge another composite state into this one, record by
    /// record, ignoring keys this state does not have.
    ///
    /// This is the rehydration entry point for persistence layers: persisted
    /// data fields overlay the freshly initialized records while action
    /// fields (which never persist) are left intact.
    pub fn overlay(&mut self, persisted: CompositeState) {
        for (key, record) in persisted.0 {
            if let Some(slot) = self.0.get_mut(&key) {
                slot.merge(record);
            }
        }
    }
}

impl FromIterator<(String, Record)> for CompositeState {
    fn from_iter<T: IntoIterator<Item = (String, Record)>>(iter: T) -> Self {
        CompositeState(iter.into_iter().collect())
    }
}

impl Serialize for CompositeState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CompositeState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        Ok(CompositeState(BTreeMap::deserialize(d)?))
    }
}

// ============================================================================
// StateDelta
// ============================================================================

/// The partial-or-full result of a transition function.
///
/// A delta maps slice keys to replacement records. Committing a delta
/// replaces exactly those keys' slots in the composite state; every key
/// absent from the delta carries over unchanged. The composition core only
/// ever emits single-key deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta(BTreeMap<String, Record>);

impl StateDelta {
    /// A delta touching no slots (commits as the identity transition).
    pub fn empty() -> Self {
        StateDelta(BTreeMap::new())
    }

    /// A delta replacing exactly one key's slot.
    pub fn single(key: impl Into<String>, record: Record) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), record);
        StateDelta(map)
    }

    /// Number of slots touched.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the delta touches no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply the delta to a composite state, replacing touched slots.
    pub fn apply_to(self, state: &mut CompositeState) {
        for (key, record) in self.0 {
            state.0.insert(key, record);
        }
    }
}
