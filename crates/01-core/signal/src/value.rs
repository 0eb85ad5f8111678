use serde::{Deserialize, Serialize};
use std::fmt;

use crate::screen::ScreenBuffer;

/// A polymorphic sample value.
///
/// Sequences must hold numbers, strings, and bitmaps uniformly; consumers
/// match on the tag exhaustively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Screen(ScreenBuffer),
}

impl Value {
    /// Numeric view of the value, when it has one.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value, when it has one. Reals truncate.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Real(v) => Some(*v as i64),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<ScreenBuffer> for Value {
    fn from(v: ScreenBuffer) -> Self {
        Value::Screen(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Screen(s) => write!(f, "<screen {}x{}>", s.width(), s.height()),
        }
    }
}
