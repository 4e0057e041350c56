//! XML-RPC value model and strict typed extraction.

use std::collections::BTreeMap;

/// A single XML-RPC value as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<int>`, `<i4>`, or `<i8>`.
    Int(i64),
    Boolean(bool),
    /// `<string>` or an untyped `<value>` body.
    String(String),
    Double(f64),
    /// Raw `<dateTime.iso8601>` text.
    DateTime(String),
    /// Raw `<base64>` text, not decoded.
    Base64(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    /// Short kind name used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
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

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(members: BTreeMap<String, Value>) -> Self {
        Value::Struct(members)
    }
}

/// Failure to interpret a [`Value`] as a Rust type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("integer {value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("missing struct member `{0}`")]
    MissingField(String),

    #[error("member `{field}`: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<ValueError>,
    },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ValueError>,
    },
}

impl ValueError {
    fn mismatch(expected: &'static str, found: &Value) -> Self {
        ValueError::Mismatch {
            expected,
            found: found.kind(),
        }
    }
}

/// Strict conversion from a decoded [`Value`] into a typed result.
///
/// Implementations never coerce between kinds: an `<int>` is not a boolean
/// and a scalar is not a one-element array.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value
            .as_bool()
            .ok_or_else(|| ValueError::mismatch("boolean", &value))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.as_i64().ok_or_else(|| ValueError::mismatch("int", &value))
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let n = i64::from_value(value)?;
        i32::try_from(n).map_err(|_| ValueError::OutOfRange {
            value: n,
            target: "i32",
        })
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(ValueError::mismatch("string", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    T::from_value(item).map_err(|e| ValueError::Element {
                        index,
                        source: Box::new(e),
                    })
                })
                .collect(),
            other => Err(ValueError::mismatch("array", &other)),
        }
    }
}

impl FromValue for BTreeMap<String, Value> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Struct(members) => Ok(members),
            other => Err(ValueError::mismatch("struct", &other)),
        }
    }
}

/// Field-by-field reader over a decoded `<struct>`.
///
/// Used by record types to pull typed members out one at a time, with
/// errors naming the offending member.
#[derive(Debug)]
pub struct Members {
    members: BTreeMap<String, Value>,
}

impl Members {
    pub fn new(value: Value) -> Result<Self, ValueError> {
        Ok(Self {
            members: BTreeMap::from_value(value)?,
        })
    }

    /// Take a member that must be present.
    pub fn required<T: FromValue>(&mut self, field: &str) -> Result<T, ValueError> {
        let value = self
            .members
            .remove(field)
            .ok_or_else(|| ValueError::MissingField(field.to_string()))?;
        Self::convert(field, value)
    }

    /// Take a member that may be absent. Present-but-mistyped is still an error.
    pub fn optional<T: FromValue>(&mut self, field: &str) -> Result<Option<T>, ValueError> {
        self.members
            .remove(field)
            .map(|value| Self::convert(field, value))
            .transpose()
    }

    fn convert<T: FromValue>(field: &str, value: Value) -> Result<T, ValueError> {
        T::from_value(value).map_err(|e| ValueError::Field {
            field: field.to_string(),
            source: Box::new(e),
        })
    }
}
