//! Runtime field values held in an instance's data store.
//!
//! An undefined field is simply absent from the store; [`Value::Null`] is an
//! explicit null.

use chrono::{DateTime, Utc};

use crate::instance::Instance;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    /// Free-form JSON-like object.
    Object(serde_json::Value),
    Model(Instance),
    Array(Vec<Value>),
}

impl Value {
    /// Returns the kind string used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Object(_) => "object",
            Self::Model(_) => "model",
            Self::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any numeric variant widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Uint(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral numeric value as `i64`, if it fits exactly.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Uint(n) => i64::try_from(*n).ok(),
            Self::Float(n) if n.fract() == 0.0 && n.is_finite() => {
                let v = *n as i64;
                (v as f64 == *n).then_some(v)
            }
            _ => None,
        }
    }

    /// Integral numeric value as `u64`, if it fits exactly.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(n) => u64::try_from(*n).ok(),
            Self::Uint(n) => Some(*n),
            Self::Float(n) if n.fract() == 0.0 && *n >= 0.0 && n.is_finite() => {
                let v = *n as u64;
                (v as f64 == *n).then_some(v)
            }
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_instance_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Length of a string (in chars) or an array.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::Array(items) => Some(items.len()),
            _ => None,
        }
    }

    /// A JSON rendering used in failure reports. Instances render as their
    /// model name.
    pub fn to_json_lossy(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(n) => Json::from(*n),
            Self::Uint(n) => Json::from(*n),
            Self::Float(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::String(s) => Json::String(s.clone()),
            Self::Date(d) => Json::String(d.to_rfc3339()),
            Self::Object(o) => o.clone(),
            Self::Model(m) => Json::String(format!("<{}>", m.model_name())),
            Self::Array(items) => Json::Array(items.iter().map(Self::to_json_lossy).collect()),
        }
    }
}

/// Epoch milliseconds for a date, as stored on the wire.
pub fn date_to_millis(date: &DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64
}

/// Inverse of [`date_to_millis`]. Fractional milliseconds are truncated.
pub fn date_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Self::Model(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}
