//! Data types, cell values and field metadata.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute types supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Type of the NULL literal; compatible with every column.
    Undefined,
    Boolean,
    Integer,
    Float,
    Text,
}

impl DataType {
    /// Check if a value can be stored in a column of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Boolean, Value::Boolean(_)) => true,
            (DataType::Integer, Value::Integer(_)) => true,
            (DataType::Float, Value::Float(_) | Value::Integer(_)) => true,
            (DataType::Text, Value::Text(_)) => true,
            _ => false,
        }
    }

    /// Whether values of this type take part in arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Get the SQL name for this type.
    pub fn sql_name(&self) -> &'static str {
        match self {
            DataType::Undefined => "UNDEFINED",
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INT",
            DataType::Float => "FLOAT",
            DataType::Text => "CHAR",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// The static type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Undefined,
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by filters. NULL is false.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// SQL comparison. Returns `None` when either side is NULL or the types
    /// are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Total order used for sorting and grouping: NULL first, then booleans,
    /// numbers and text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Boolean(_) => 1,
                Value::Integer(_) | Value::Float(_) => 2,
                Value::Text(_) => 3,
            }
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if rank(a) == 2 && rank(b) == 2 => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.total_cmp(&y)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Column name.
    pub name: String,
    /// Data type.
    pub data_type: DataType,
    /// Whether NULL may be stored.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldMeta {
    /// Create a new nullable field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Mark the field NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Validate a value against this field.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            if !self.nullable {
                return Err(format!("field '{}' cannot be null", self.name));
            }
            return Ok(());
        }
        if !self.data_type.matches(value) {
            return Err(format!(
                "field '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.data_type()
            ));
        }
        Ok(())
    }
}

impl fmt::Display for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_matches() {
        assert!(DataType::Integer.matches(&Value::Integer(3)));
        assert!(!DataType::Integer.matches(&Value::Float(3.5)));
        assert!(DataType::Float.matches(&Value::Integer(3)));
        assert!(DataType::Text.matches(&Value::Null));
        assert!(!DataType::Boolean.matches(&Value::Text("true".into())));
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(Value::Integer(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Null.compare(&Value::Integer(1)), None);
        assert_eq!(Value::Text("a".into()).compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_total_cmp_puts_null_first() {
        let mut values = vec![Value::Integer(3), Value::Null, Value::Float(1.5)];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, vec![Value::Null, Value::Float(1.5), Value::Integer(3)]);
    }

    #[test]
    fn test_field_validation() {
        let field = FieldMeta::new("id", DataType::Integer).not_null();
        assert!(field.validate(&Value::Integer(1)).is_ok());
        assert!(field.validate(&Value::Null).is_err());
        assert!(field.validate(&Value::Text("x".into())).is_err());

        let nullable = FieldMeta::new("nickname", DataType::Text);
        assert!(nullable.validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_value_json() {
        let json = serde_json::to_string(&vec![Value::Integer(1), Value::Null]).unwrap();
        assert_eq!(json, "[1,null]");
    }
}
