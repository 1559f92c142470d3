//! Core value model for tfplug
//!
//! Terraform values are carried as [`Dynamic`], attribute maps as
//! [`ResourceData`] and problems reported back to Terraform as [`Diagnostics`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
/// IMPORTANT: Always use the typed accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    /// Ordered, allows duplicates
    List(Vec<Dynamic>),
    /// Objects are represented as maps
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_string(&self) -> Option<&String> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Dynamic>> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    /// Converts back to JSON. Unknown values become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Dynamic::Null | Dynamic::Unknown => serde_json::Value::Null,
            Dynamic::Bool(b) => serde_json::Value::Bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Dynamic::String(s) => serde_json::Value::String(s.clone()),
            Dynamic::List(l) => serde_json::Value::Array(l.iter().map(Dynamic::to_json).collect()),
            Dynamic::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Dynamic {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Dynamic::Null,
            serde_json::Value::Bool(b) => Dynamic::Bool(b),
            serde_json::Value::Number(n) => Dynamic::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Dynamic::String(s),
            serde_json::Value::Array(items) => {
                Dynamic::List(items.into_iter().map(Dynamic::from).collect())
            }
            serde_json::Value::Object(map) => {
                Dynamic::Map(map.into_iter().map(|(k, v)| (k, Dynamic::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Dynamic {
    fn from(s: &str) -> Self {
        Dynamic::String(s.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(s: String) -> Self {
        Dynamic::String(s)
    }
}

impl From<bool> for Dynamic {
    fn from(b: bool) -> Self {
        Dynamic::Bool(b)
    }
}

impl From<f64> for Dynamic {
    fn from(n: f64) -> Self {
        Dynamic::Number(n)
    }
}

impl From<i64> for Dynamic {
    fn from(n: i64) -> Self {
        Dynamic::Number(n as f64)
    }
}

impl From<u32> for Dynamic {
    fn from(n: u32) -> Self {
        Dynamic::Number(f64::from(n))
    }
}

impl From<Vec<Dynamic>> for Dynamic {
    fn from(items: Vec<Dynamic>) -> Self {
        Dynamic::List(items)
    }
}

impl From<HashMap<String, Dynamic>> for Dynamic {
    fn from(map: HashMap<String, Dynamic>) -> Self {
        Dynamic::Map(map)
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null | Dynamic::Unknown => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Dynamic::from)
    }
}

/// Attribute map handed to and returned from resources and data sources.
/// Keys are top-level attribute names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    pub values: HashMap<String, Dynamic>,
}

/// Configuration values as written by the user
pub type Config = ResourceData;

/// Values persisted by Terraform between runs
pub type State = ResourceData;

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: HashMap<String, Dynamic>) -> Self {
        Self { values }
    }

    /// Raw value, `None` for absent, null or unknown attributes
    pub fn get(&self, key: &str) -> Option<&Dynamic> {
        self.values
            .get(key)
            .filter(|v| !v.is_null() && !v.is_unknown())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_string()).cloned()
    }

    /// Like [`get_string`](Self::get_string) but treats `""` as unset
    pub fn get_non_empty_string(&self, key: &str) -> Option<String> {
        self.get_string(key).filter(|s| !s.is_empty())
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_number())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_number(key).map(|n| n as i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_list(&self, key: &str) -> Option<&Vec<Dynamic>> {
        self.get(key).and_then(|v| v.as_list())
    }

    pub fn get_map(&self, key: &str) -> Option<&HashMap<String, Dynamic>> {
        self.get(key).and_then(|v| v.as_map())
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get_list(key)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_string().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Dynamic>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn id(&self) -> Option<String> {
        self.get_non_empty_string("id")
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set("id", Dynamic::String(id.into()));
    }

    /// Whether `key` differs between `self` and `prior`
    pub fn has_change(&self, prior: &ResourceData, key: &str) -> bool {
        self.get(key) != prior.get(key)
    }
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: Option<String>,
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn new(summary: impl Into<String>, detail: Option<impl Into<String>>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-error diagnostics
    pub fn error(summary: impl Into<String>, detail: Option<impl Into<String>>) -> Self {
        let mut diags = Self::new();
        diags.add_error(summary, detail);
        diags
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.errors.push(Diagnostic::new(summary, detail));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.warnings.push(Diagnostic::new(summary, detail));
    }

    pub fn add_attribute_error(
        &mut self,
        attribute: &str,
        summary: impl Into<String>,
        detail: Option<impl Into<String>>,
    ) {
        self.errors
            .push(Diagnostic::new(summary, detail).with_attribute(attribute));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
