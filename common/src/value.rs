//! The dynamically-typed row value. All comparisons and arithmetic are
//! explicit case analysis through this module rather than reflection,
//! per the "dynamic typing of row values" redesign note.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The small universe of runtime row values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion used by arithmetic and by mixed-type comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::DateTime(ms) => Some(*ms as f64),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null | Value::Blob(_) => None,
        }
    }

    pub fn as_str_lossy(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(ms) => ms.to_string(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Generic ordering used by Sort and MIN/MAX: numeric order for
    /// values that both parse as numbers, lexicographic otherwise. NULL
    /// sorts before every other value (MySQL's convention for ASC order).
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => {
                if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
                } else {
                    self.as_str_lossy().cmp(&other.as_str_lossy())
                }
            }
        }
    }

    /// Three-valued equality: returns `None` ("unknown") whenever either
    /// side is NULL, so callers excluding unknowns from a predicate can
    /// do so without special-casing NULL themselves.
    pub fn sql_eq(&self, other: &Value) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.compare(other) == Ordering::Equal)
    }

    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.compare(other))
    }

    pub fn add(&self, other: &Value) -> Option<Value> {
        Some(Value::Double(self.as_f64()? + other.as_f64()?))
    }

    /// MySQL `LIKE` matching with `%`/`_` wildcards (no escape char support
    /// beyond the literal characters themselves).
    pub fn like(&self, pattern: &str) -> bool {
        like_match(self.as_str_lossy().as_str(), pattern)
    }
}

fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_rec(&text, &pattern)
}

fn like_match_rec(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => {
            like_match_rec(text, &pattern[1..])
                || (!text.is_empty() && like_match_rec(&text[1..], pattern))
        }
        Some('_') => !text.is_empty() && like_match_rec(&text[1..], &pattern[1..]),
        Some(c) => {
            !text.is_empty() && text[0] == *c && like_match_rec(&text[1..], &pattern[1..])
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::DateTime(ms) => write!(f, "{ms}"),
            Value::Blob(b) => write!(f, "<blob:{}>", b.len()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.sql_eq(other).unwrap_or(false)
    }
}

/// The static declared type of a table column, distinct from the runtime
/// `Value` it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Null,
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    VarChar,
    Text,
    Date,
    Time,
    DateTime,
    Timestamp,
    Blob,
    Json,
}

impl ColumnType {
    /// The MySQL wire column-type byte used in column-definition packets.
    pub fn wire_type(&self) -> u8 {
        match self {
            ColumnType::Null => 0x06,
            ColumnType::TinyInt | ColumnType::Boolean => 0x01,
            ColumnType::SmallInt => 0x02,
            ColumnType::Int => 0x03,
            ColumnType::Float => 0x04,
            ColumnType::Double => 0x05,
            ColumnType::Timestamp => 0x07,
            ColumnType::BigInt => 0x08,
            ColumnType::Date => 0x0a,
            ColumnType::Time => 0x0b,
            ColumnType::DateTime => 0x0c,
            ColumnType::Json => 0xf5,
            ColumnType::Decimal => 0xf6,
            ColumnType::Blob => 0xfc,
            ColumnType::VarChar => 0x0f,
            ColumnType::Text => 0xfc,
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            ColumnType::Null => Value::Null,
            ColumnType::Boolean => Value::Bool(false),
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt => {
                Value::Int(0)
            }
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal => Value::Double(0.0),
            ColumnType::VarChar | ColumnType::Text | ColumnType::Json => {
                Value::String(String::new())
            }
            ColumnType::Date | ColumnType::Time | ColumnType::DateTime | ColumnType::Timestamp => {
                Value::DateTime(0)
            }
            ColumnType::Blob => Value::Blob(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_beats_lexicographic_comparison() {
        let a = Value::Int(9);
        let b = Value::String("10".into());
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn null_is_unknown_under_equality() {
        assert_eq!(Value::Null.sql_eq(&Value::Int(1)), None);
        assert_eq!(Value::Int(1).sql_eq(&Value::Int(1)), Some(true));
    }

    #[test]
    fn like_wildcards() {
        assert!(Value::String("hello".into()).like("h_l%"));
        assert!(!Value::String("hello".into()).like("hz%"));
        assert!(Value::String("abc".into()).like("%"));
    }

    #[test]
    fn null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Int(-100)), Ordering::Less);
    }
}
