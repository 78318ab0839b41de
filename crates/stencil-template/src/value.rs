/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template tree values.
//!
//! A template and its resolved output are both [`TemplateValue`] trees:
//! JSON shapes whose objects remember insertion order, so a resolved
//! configuration serializes with the same key order the template author
//! wrote. Serialization goes through hand-written serde impls rather than
//! `serde_json::Value`, which would re-sort object keys.
//!
//! **Important**: an *undefined* value (a reference that did not resolve)
//! is represented as `Option::None` at resolution sites, never as a
//! variant of this enum. [`TemplateValue::Null`] is a concrete JSON
//! `null` that appears in trees.

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;
use std::fmt;

/// A node in a template or resolved configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// A string value (may contain `{{...}}` interpolation tokens).
    String(String),

    /// A boolean value.
    Bool(bool),

    /// A numeric value, kept in JSON representation so integers
    /// round-trip without a trailing `.0`.
    Number(Number),

    /// An array of values.
    Array(Vec<TemplateValue>),

    /// An object with insertion-ordered keys.
    Object(IndexMap<String, TemplateValue>),

    /// A JSON null.
    Null,
}

impl TemplateValue {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Truthiness rules:
    /// - `Null` is falsy
    /// - `false` and the empty string are falsy
    /// - The empty array is falsy; any non-empty array is truthy,
    ///   regardless of its contents
    /// - Every number is truthy, including zero
    /// - Every object is truthy, including the empty object
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::Bool(b) => *b,
            TemplateValue::Number(_) => true,
            TemplateValue::Array(items) => !items.is_empty(),
            TemplateValue::Object(_) => true,
            TemplateValue::Null => false,
        }
    }

    /// Get a nested field by path.
    ///
    /// For example, `get_path(&["media", "quality"])` on an object containing
    /// `{"media": {"quality": "high"}}` returns the quality value. Any
    /// non-object encountered before the path is exhausted yields `None`.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        if path.is_empty() {
            return Some(self);
        }

        match self {
            TemplateValue::Object(fields) => {
                let first = path[0];
                fields.get(first).and_then(|v| v.get_path(&path[1..]))
            }
            _ => None,
        }
    }

    /// Render this value as display text for string contexts
    /// (mixed-content interpolation, `==` comparisons, switch keys).
    ///
    /// - String: returned as-is
    /// - Bool: "true" or "false"
    /// - Number: JSON representation ("42", "4.5")
    /// - Array: elements rendered and comma-joined
    /// - Object: compact JSON
    /// - Null: ""
    pub fn display_text(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Bool(b) => b.to_string(),
            TemplateValue::Number(n) => n.to_string(),
            TemplateValue::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.display_text()).collect();
                rendered.join(",")
            }
            TemplateValue::Object(_) => serde_json::to_string(self).unwrap_or_default(),
            TemplateValue::Null => String::new(),
        }
    }

    /// Borrow the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TemplateValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the boolean content, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TemplateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric content as `f64`, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TemplateValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[TemplateValue]> {
        match self {
            TemplateValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the fields, if this is an object.
    pub fn as_object(&self) -> Option<&IndexMap<String, TemplateValue>> {
        match self {
            TemplateValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Check whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, TemplateValue::Null)
    }
}

impl Default for TemplateValue {
    fn default() -> Self {
        TemplateValue::Null
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        TemplateValue::Bool(value)
    }
}

impl From<i32> for TemplateValue {
    fn from(value: i32) -> Self {
        TemplateValue::Number(Number::from(value))
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        TemplateValue::Number(Number::from(value))
    }
}

impl From<u64> for TemplateValue {
    fn from(value: u64) -> Self {
        TemplateValue::Number(Number::from(value))
    }
}

impl From<f64> for TemplateValue {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(TemplateValue::Null, TemplateValue::Number)
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::String(value.to_owned())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::String(value)
    }
}

impl From<Vec<TemplateValue>> for TemplateValue {
    fn from(items: Vec<TemplateValue>) -> Self {
        TemplateValue::Array(items)
    }
}

impl From<serde_json::Value> for TemplateValue {
    /// `serde_json` maps iterate in sorted key order, so trees built via
    /// `serde_json::Value` (e.g. the `json!` macro) lose document order.
    /// Parse template text directly into `TemplateValue` to keep it.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => TemplateValue::Number(n),
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::Array(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(fields) => TemplateValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<TemplateValue> for serde_json::Value {
    fn from(value: TemplateValue) -> Self {
        match value {
            TemplateValue::Null => serde_json::Value::Null,
            TemplateValue::Bool(b) => serde_json::Value::Bool(b),
            TemplateValue::Number(n) => serde_json::Value::Number(n),
            TemplateValue::String(s) => serde_json::Value::String(s),
            TemplateValue::Array(items) => serde_json::Value::Array(
                items.into_iter().map(serde_json::Value::from).collect(),
            ),
            TemplateValue::Object(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for TemplateValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TemplateValue::String(s) => serializer.serialize_str(s),
            TemplateValue::Bool(b) => serializer.serialize_bool(*b),
            TemplateValue::Number(n) => n.serialize(serializer),
            TemplateValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            TemplateValue::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            TemplateValue::Null => serializer.serialize_unit(),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = TemplateValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_bool<E>(self, value: bool) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::Number(value.into()))
    }

    fn visit_u64<E>(self, value: u64) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::Number(value.into()))
    }

    fn visit_f64<E>(self, value: f64) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(Number::from_f64(value).map_or(TemplateValue::Null, TemplateValue::Number))
    }

    fn visit_str<E>(self, value: &str) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::String(value.to_owned()))
    }

    fn visit_string<E>(self, value: String) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::String(value))
    }

    fn visit_unit<E>(self) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::Null)
    }

    fn visit_none<E>(self) -> Result<TemplateValue, E>
    where
        E: de::Error,
    {
        Ok(TemplateValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<TemplateValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<TemplateValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(TemplateValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<TemplateValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = IndexMap::new();
        while let Some((key, value)) = map.next_entry::<String, TemplateValue>()? {
            fields.insert(key, value);
        }
        Ok(TemplateValue::Object(fields))
    }
}

impl<'de> Deserialize<'de> for TemplateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}
