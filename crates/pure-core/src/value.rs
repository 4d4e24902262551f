//! Statically known literal values.

use std::fmt;

use ordered_float::OrderedFloat;

/// A literal value known at analysis time.
///
/// Floats are wrapped in [`OrderedFloat`] so values can be compared and
/// hashed when the data-flow tracker merges branch states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Null,
}

impl LiteralValue {
    pub fn float(value: f64) -> Self {
        LiteralValue::Float(OrderedFloat(value))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            LiteralValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LiteralValue::Null)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(true) => write!(f, "yes"),
            LiteralValue::Bool(false) => write!(f, "no"),
            LiteralValue::Int(value) => write!(f, "{}", value),
            LiteralValue::Float(value) => {
                let value = value.into_inner();
                if value.is_finite() && value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            LiteralValue::String(value) => write!(f, "\"{}\"", value),
            LiteralValue::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_use_keyword_spelling() {
        assert_eq!(LiteralValue::Bool(true).to_string(), "yes");
        assert_eq!(LiteralValue::Bool(false).to_string(), "no");
    }

    #[test]
    fn floats_always_show_a_fraction() {
        assert_eq!(LiteralValue::float(2.1).to_string(), "2.1");
        assert_eq!(LiteralValue::float(3.0).to_string(), "3.0");
    }

    #[test]
    fn floats_compare_structurally() {
        assert_eq!(LiteralValue::float(0.5), LiteralValue::float(0.5));
        assert_ne!(LiteralValue::float(0.5), LiteralValue::Int(0));
    }
}
