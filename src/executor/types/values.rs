//! Runtime value types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ast::Literal;

/// Runtime value type
///
/// `Int` is the raw integer produced by `int` and `cal`; it is the only
/// variant arithmetic accepts. Numbers inside `Json` nodes (query data,
/// extension output, `def x = 5`) are never treated as raw integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(JsonValue),
}

impl Value {
    /// Coerce a `def`/`set` literal
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Json(JsonValue::from(*n)),
            Literal::Float(v) => Value::Float(*v),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Json(_) => "json",
        }
    }

    /// Boolean view: `Bool` or a JSON boolean node
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Json(JsonValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// String view: `Str` or a JSON string node
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Json(JsonValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// True for `Null` and JSON null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Json(JsonValue::Null))
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Json(v) => v.clone(),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Json(value)
    }
}
