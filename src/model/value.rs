//! Cell values shared by fact rows and filter contexts.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single row of a fact or lookup table.
///
/// Missing keys read as [`Value::Null`] (see [`cell`]).
pub type Row = BTreeMap<String, Value>;

/// Read a cell from a row, treating an absent key as null.
pub fn cell<'a>(row: &'a Row, key: &str) -> &'a Value {
    row.get(key).unwrap_or(&Value::Null)
}

/// A primitive value: what a fact cell holds and what an equality filter compares against.
///
/// Equality is kind-sensitive: the string `"2025"` never equals the number `2025`.
/// `Int` and `Float` are both numbers and compare numerically.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Non-numbers yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compare two values of the same kind.
    ///
    /// Returns `None` across kinds (and for NaN), which makes any range check fail.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Shift a numeric value by `delta`, keeping integers integral.
    ///
    /// `None` for non-numbers and for integers that would overflow.
    pub fn offset(&self, delta: i64) -> Option<Value> {
        match self {
            Value::Int(i) => i.checked_add(delta).map(Value::Int),
            Value::Float(f) => Some(Value::Float(f + delta as f64)),
            _ => None,
        }
    }

    /// The canonical form used for grouping and cache keys: a whole float
    /// inside the `i64` range becomes an integer, so values that compare
    /// equal encode the same way.
    pub fn canonical(&self) -> Value {
        match self {
            Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Value::Int(*f as i64)
            }
            other => other.clone(),
        }
    }

    /// Parse a loosely typed token (CLI arguments, config values).
    ///
    /// Tries integer, float and boolean before falling back to a string.
    pub fn parse_token(token: &str) -> Value {
        let token = token.trim();
        if token.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if let Ok(i) = token.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = token.parse::<f64>() {
            // "inf" and "NaN" stay strings
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        match token {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(
                token
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
