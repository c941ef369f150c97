//! Value types for slice records.
//!
//! This module defines the dynamic `Value` type that slice records are
//! built from, plus [`SliceAction`], the callable stored inside a record
//! alongside its data fields.
//!
//! ## Equality rules
//!
//! - Different types are NEVER equal (no type coercion)
//! - `Int(1)` != `Float(1.0)`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Actions compare by identity, not by behavior
//!
//! ## Serialization
//!
//! Actions do not persist. Serializing a value drops action fields from
//! objects and flattens actions inside arrays to `Null`, so the output is
//! always a plain data mapping a persistence layer can round-trip.
//! Deserialized values never contain actions.

use crate::error::Result;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Dynamic value stored in a slice record.
///
/// ## The Eight Types
///
/// 1. `Null` - absence of value
/// 2. `Bool` - boolean true or false
/// 3. `Int` - 64-bit signed integer
/// 4. `Float` - 64-bit IEEE-754 floating point
/// 5. `Str` - UTF-8 encoded string
/// 6. `Array` - ordered sequence of values
/// 7. `Object` - string-keyed map of values
/// 8. `Action` - a slice's own callable, bound to its scoped capabilities
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of value
    Null,

    /// Boolean true or false
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit IEEE-754 floating point
    /// Supports: NaN, +Inf, -Inf, -0.0, subnormals
    Float(f64),

    /// UTF-8 encoded string
    Str(String),

    /// Ordered sequence of values
    Array(Vec<Value>),

    /// String-keyed map of values
    Object(BTreeMap<String, Value>),

    /// A slice action. Compares by identity and never persists.
    Action(SliceAction),
}

impl Value {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Action(_) => "Action",
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an action
    pub fn is_action(&self) -> bool {
        matches!(self, Value::Action(_))
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as array slice
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to get as object reference
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Try to get as an action
    pub fn as_action(&self) -> Option<&SliceAction> {
        match self {
            Value::Action(a) => Some(a),
            _ => None,
        }
    }
}

// ============================================================================
// Custom PartialEq Implementation (IEEE-754 semantics, no type coercion)
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Same types
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                // IEEE-754 equality: NaN != NaN, but -0.0 == 0.0
                a == b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Action(a), Value::Action(b)) => a == b,

            // Different types: NEVER equal (NO TYPE COERCION)
            _ => false,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<SliceAction> for Value {
    fn from(a: SliceAction) -> Self {
        Value::Action(a)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Object(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// ============================================================================
// SliceAction
// ============================================================================

/// A callable stored inside a slice record.
///
/// Actions are created by a slice initializer and close over that slice's
/// scoped mutator (and, when needed, the global reader). They are plain
/// single-threaded function values: cloning shares the same callable, and
/// equality is identity (`Rc::ptr_eq`), matching how function-valued
/// fields behave in the source protocol.
///
/// Any error an action raises is the action's own responsibility; the
/// composition core neither catches nor wraps it.
#[derive(Clone)]
pub struct SliceAction(Rc<dyn Fn(&[Value]) -> Result<Value>>);

impl SliceAction {
    /// Wrap a function as a slice action.
    pub fn new(f: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        SliceAction(Rc::new(f))
    }

    /// Invoke the action with the given arguments.
    ///
    /// Errors propagate synchronously to the caller, unchanged.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for SliceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SliceAction")
    }
}

impl PartialEq for SliceAction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// Serde (actions never persist)
// ============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for v in a {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Object(o) => {
                let data = o.iter().filter(|(_, v)| !v.is_action());
                let mut map = serializer.serialize_map(None)?;
                for (k, v) in data {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            // Positional contexts keep the slot, named contexts drop the
            // entry (see Value::Object above).
            Value::Action(_) => serializer.serialize_unit(),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a substore value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        d.deserialize_any(ValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> std::result::Result<Value, E> {
        i64::try_from(u)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer out of range: {u}")))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::Str(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::Str(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(v) = seq.next_element()? {
            out.push(v);
        }
        Ok(Value::Array(out))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut out = BTreeMap::new();
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            out.insert(k, v);
        }
        Ok(Value::Object(out))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        d.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_type_coercion() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bool(false), Value::Null);
        assert_ne!(Value::Str("1".into()), Value::Int(1));
    }

    #[test]
    fn float_follows_ieee754() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn actions_compare_by_identity() {
        let a = SliceAction::new(|_| Ok(Value::Null));
        let b = SliceAction::new(|_| Ok(Value::Null));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn json_conversion() {
        let v = Value::from(json!({"count": 1, "tags": ["a", null]}));
        let obj = v.as_object().unwrap();
        assert_eq!(obj["count"], Value::Int(1));
        assert_eq!(
            obj["tags"],
            Value::Array(vec![Value::Str("a".into()), Value::Null])
        );
    }

    #[test]
    fn actions_do_not_serialize() {
        let mut obj = BTreeMap::new();
        obj.insert("count".to_string(), Value::Int(2));
        obj.insert(
            "inc".to_string(),
            Value::Action(SliceAction::new(|_| Ok(Value::Null))),
        );
        let json = serde_json::to_string(&Value::Object(obj)).unwrap();
        assert_eq!(json, r#"{"count":2}"#);
    }

    #[test]
    fn action_in_array_flattens_to_null() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Action(SliceAction::new(|_| Ok(Value::Null))),
        ]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1,null]");
    }

    #[test]
    fn round_trip_preserves_data() {
        let v = Value::from(json!({"a": [1, 2.5, true], "b": "x"}));
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
