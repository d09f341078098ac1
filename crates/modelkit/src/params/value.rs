//! Parameter values - the closed set of kinds a parameter can carry
//!
//! Parameters are not arbitrary JSON: each registered parameter declares one
//! of these kinds, and assignments are checked against it. `Json` is the
//! escape hatch for structured payloads (arrays, objects, null).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared kind of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    Json,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Str => "str",
            ParamKind::Json => "json",
        };
        write!(f, "{}", label)
    }
}

/// A parameter value of one of the declared kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(Value),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::Json(_) => ParamKind::Json,
        }
    }

    /// Interpret a plain JSON value. Integral numbers become `Int`, other
    /// numbers `Float`; arrays, objects, and null land in `Json`.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Int(i)
                } else {
                    ParamValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ParamValue::Str(s),
            other => ParamValue::Json(other),
        }
    }

    /// Render back to a plain JSON value for storage in the document column.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::from(*b),
            ParamValue::Int(i) => Value::from(*i),
            ParamValue::Float(f) => Value::from(*f),
            ParamValue::Str(s) => Value::from(s.clone()),
            ParamValue::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}
