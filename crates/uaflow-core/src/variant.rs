//! Values, data types and status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scalar data types a variable or argument can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    UInt32,
    Double,
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Boolean => "Boolean",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Double => "Double",
            Self::String => "String",
        };
        write!(f, "{}", s)
    }
}

/// A dynamically typed value.
///
/// On the wire a variant is `{"dataType": "Double", "value": 10.0}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "value")]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    Int32(i32),
    UInt32(u32),
    Double(f64),
    String(String),
    /// A one-dimensional array of scalars.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns the scalar data type, or `None` for empty values and arrays.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Int32(_) => Some(DataType::Int32),
            Self::UInt32(_) => Some(DataType::UInt32),
            Self::Double(_) => Some(DataType::Double),
            Self::String(_) => Some(DataType::String),
            Self::Empty | Self::Array(_) => None,
        }
    }

    /// Numeric view of the value. Strings are parsed; non-finite results are rejected.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Self::Int32(v) => *v as f64,
            Self::UInt32(v) => *v as f64,
            Self::Double(v) => *v,
            Self::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Converts the value to `target` without losing information.
    pub fn coerce(&self, target: DataType) -> Option<Variant> {
        if self.data_type() == Some(target) {
            return Some(self.clone());
        }
        match target {
            DataType::Double => self.to_f64().map(Variant::Double),
            DataType::UInt32 => {
                let v = self.to_f64()?;
                (v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64)
                    .then(|| Variant::UInt32(v as u32))
            }
            DataType::Int32 => {
                let v = self.to_f64()?;
                (v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64)
                    .then(|| Variant::Int32(v as i32))
            }
            DataType::Boolean | DataType::String => None,
        }
    }

    /// Builds a variant from an untyped JSON value.
    pub fn from_json(value: &serde_json::Value) -> Variant {
        use serde_json::Value;
        match value {
            Value::Null => Variant::Empty,
            Value::Bool(b) => Variant::Boolean(*b),
            Value::Number(n) => n.as_f64().map(Variant::Double).unwrap_or_default(),
            Value::String(s) => Variant::String(s.clone()),
            Value::Array(items) => Variant::Array(items.iter().map(Variant::from_json).collect()),
            Value::Object(_) => Variant::String(value.to_string()),
        }
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Self::UInt32(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Outcome of a read, write or method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Good,
    BadNodeIdUnknown,
    BadAttributeIdInvalid,
    BadNotWritable,
    BadTypeMismatch,
    BadArgumentsMissing,
    BadTooManyArguments,
    BadMethodInvalid,
    BadOutOfRange,
    BadInternalError,
}

impl StatusCode {
    pub fn is_good(self) -> bool {
        self == Self::Good
    }

    pub fn is_bad(self) -> bool {
        !self.is_good()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
