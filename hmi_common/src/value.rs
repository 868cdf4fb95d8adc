//! Tag types and dynamically typed tag values.
//!
//! A [`TagType`] names the fixed wire representation of a slot; a [`TagValue`]
//! is a decoded scalar. Values arriving from outside (action documents, the
//! request layer, configuration) may be of any scalar kind and are coerced to
//! the slot's type on write with [`TagValue::coerce`].
//!
//! # Coercion Rules
//!
//! | Target      | Accepted sources                                   | Behavior                     |
//! |-------------|----------------------------------------------------|------------------------------|
//! | integers    | bool, any integer, finite float, numeric text      | truncate toward zero, wrap   |
//! | floats      | bool, any number, numeric text                     | narrow (`f64 as f32`)        |
//! | `bool`      | bool, any number, `"true"/"false"/"1"/"0"`         | numbers: `!= 0`              |
//! | `string`    | anything                                           | display form                 |
//!
//! Everything else is [`ValueError::Incompatible`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when a value cannot be represented as a tag type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Type name not recognized.
    #[error("Unknown tag type: {name}")]
    UnknownType {
        /// Offending type name
        name: String,
    },

    /// Value cannot be represented in the target type.
    #[error("Cannot convert '{value}' to {target}")]
    Incompatible {
        /// Display form of the rejected value
        value: String,
        /// Requested tag type
        target: TagType,
    },

    /// JSON value is not a scalar.
    #[error("Unsupported JSON value for a tag: {0}")]
    UnsupportedJson(String),
}

/// Wire type of a tag slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// 1 byte, `0` = false
    Bool,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// IEEE-754 single precision
    #[serde(alias = "float")]
    Float32,
    /// IEEE-754 double precision
    #[serde(alias = "double")]
    Float64,
    /// NUL-terminated UTF-8 text in a fixed-size slot
    String,
}

impl TagType {
    /// Fixed byte size of the type, `None` for `string` (size is declared per tag).
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::String => None,
        }
    }

    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
        }
    }

    /// Whether the type is an integer type.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" => Ok(Self::Bool),
            "int8" => Ok(Self::Int8),
            "uint8" => Ok(Self::UInt8),
            "int16" => Ok(Self::Int16),
            "uint16" => Ok(Self::UInt16),
            "int32" => Ok(Self::Int32),
            "uint32" => Ok(Self::UInt32),
            "int64" => Ok(Self::Int64),
            "uint64" => Ok(Self::UInt64),
            "float32" | "float" => Ok(Self::Float32),
            "float64" | "double" => Ok(Self::Float64),
            "string" => Ok(Self::String),
            _ => Err(ValueError::UnknownType {
                name: s.to_string(),
            }),
        }
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// `bool` slot
    Bool(bool),
    /// `int8` slot
    Int8(i8),
    /// `uint8` slot
    UInt8(u8),
    /// `int16` slot
    Int16(i16),
    /// `uint16` slot
    UInt16(u16),
    /// `int32` slot
    Int32(i32),
    /// `uint32` slot
    UInt32(u32),
    /// `int64` slot
    Int64(i64),
    /// `uint64` slot
    UInt64(u64),
    /// `float32` slot
    Float32(f32),
    /// `float64` slot
    Float64(f64),
    /// `string` slot
    String(String),
}

impl TagValue {
    /// Type-appropriate default (`false`, `0`, `0.0`, `""`).
    pub fn default_for(tag_type: TagType) -> Self {
        match tag_type {
            TagType::Bool => Self::Bool(false),
            TagType::Int8 => Self::Int8(0),
            TagType::UInt8 => Self::UInt8(0),
            TagType::Int16 => Self::Int16(0),
            TagType::UInt16 => Self::UInt16(0),
            TagType::Int32 => Self::Int32(0),
            TagType::UInt32 => Self::UInt32(0),
            TagType::Int64 => Self::Int64(0),
            TagType::UInt64 => Self::UInt64(0),
            TagType::Float32 => Self::Float32(0.0),
            TagType::Float64 => Self::Float64(0.0),
            TagType::String => Self::String(String::new()),
        }
    }

    /// Natural tag type of this value.
    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Bool(_) => TagType::Bool,
            Self::Int8(_) => TagType::Int8,
            Self::UInt8(_) => TagType::UInt8,
            Self::Int16(_) => TagType::Int16,
            Self::UInt16(_) => TagType::UInt16,
            Self::Int32(_) => TagType::Int32,
            Self::UInt32(_) => TagType::UInt32,
            Self::Int64(_) => TagType::Int64,
            Self::UInt64(_) => TagType::UInt64,
            Self::Float32(_) => TagType::Float32,
            Self::Float64(_) => TagType::Float64,
            Self::String(_) => TagType::String,
        }
    }

    /// Numeric view of the value.
    ///
    /// Booleans map to `1.0`/`0.0`; text is parsed after trimming. Empty or
    /// non-numeric text yields `None`, and so does text spelling `NaN`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int8(v) => Some(f64::from(*v)),
            Self::UInt8(v) => Some(f64::from(*v)),
            Self::Int16(v) => Some(f64::from(*v)),
            Self::UInt16(v) => Some(f64::from(*v)),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::UInt32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::UInt64(v) => Some(*v as f64),
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
                }
            }
        }
    }

    /// Convert to `target`, applying fixed-width truncation for integers.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Incompatible`] when the value has no
    /// representation in `target` (non-numeric text into a numeric slot,
    /// non-finite float into an integer slot, unrecognized boolean text).
    pub fn coerce(&self, target: TagType) -> Result<TagValue, ValueError> {
        if self.tag_type() == target {
            return Ok(self.clone());
        }

        match target {
            TagType::String => Ok(Self::String(self.to_string())),
            TagType::Bool => self
                .to_bool()
                .map(Self::Bool)
                .ok_or_else(|| self.incompatible(target)),
            TagType::Float32 => self
                .to_float()
                .map(|v| Self::Float32(v as f32))
                .ok_or_else(|| self.incompatible(target)),
            TagType::Float64 => self
                .to_float()
                .map(Self::Float64)
                .ok_or_else(|| self.incompatible(target)),
            _ => {
                let wide = self.to_wide_integer().ok_or_else(|| self.incompatible(target))?;
                // `as` between integer widths truncates to the low bits, i.e. wraps.
                Ok(match target {
                    TagType::Int8 => Self::Int8(wide as i8),
                    TagType::UInt8 => Self::UInt8(wide as u8),
                    TagType::Int16 => Self::Int16(wide as i16),
                    TagType::UInt16 => Self::UInt16(wide as u16),
                    TagType::Int32 => Self::Int32(wide as i32),
                    TagType::UInt32 => Self::UInt32(wide as u32),
                    TagType::Int64 => Self::Int64(wide as i64),
                    TagType::UInt64 => Self::UInt64(wide as u64),
                    _ => unreachable!("non-integer targets handled above"),
                })
            }
        }
    }

    /// Build a value from a JSON scalar.
    ///
    /// # Errors
    ///
    /// `null`, arrays and objects are rejected with [`ValueError::UnsupportedJson`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ValueError> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(Self::Int64(v))
                } else if let Some(v) = n.as_u64() {
                    Ok(Self::UInt64(v))
                } else {
                    Ok(Self::Float64(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            other => Err(ValueError::UnsupportedJson(other.to_string())),
        }
    }

    /// Convert to a JSON scalar. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int8(v) => (*v).into(),
            Self::UInt8(v) => (*v).into(),
            Self::Int16(v) => (*v).into(),
            Self::UInt16(v) => (*v).into(),
            Self::Int32(v) => (*v).into(),
            Self::UInt32(v) => (*v).into(),
            Self::Int64(v) => (*v).into(),
            Self::UInt64(v) => (*v).into(),
            Self::Float32(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Self::Float32(v) => Some(*v != 0.0),
            Self::Float64(v) => Some(*v != 0.0),
            other => other.to_wide_integer().map(|v| v != 0),
        }
    }

    fn to_float(&self) -> Option<f64> {
        match self {
            Self::String(s) => s.trim().parse::<f64>().ok(),
            other => other.as_number(),
        }
    }

    fn to_wide_integer(&self) -> Option<i128> {
        match self {
            Self::Bool(b) => Some(i128::from(*b)),
            Self::Int8(v) => Some(i128::from(*v)),
            Self::UInt8(v) => Some(i128::from(*v)),
            Self::Int16(v) => Some(i128::from(*v)),
            Self::UInt16(v) => Some(i128::from(*v)),
            Self::Int32(v) => Some(i128::from(*v)),
            Self::UInt32(v) => Some(i128::from(*v)),
            Self::Int64(v) => Some(i128::from(*v)),
            Self::UInt64(v) => Some(i128::from(*v)),
            Self::Float32(v) => float_to_wide(f64::from(*v)),
            Self::Float64(v) => float_to_wide(*v),
            Self::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i128>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_wide))
            }
        }
    }

    fn incompatible(&self, target: TagType) -> ValueError {
        ValueError::Incompatible {
            value: self.to_string(),
            target,
        }
    }
}

fn float_to_wide(v: f64) -> Option<i128> {
    if v.is_finite() {
        Some(v.trunc() as i128)
    } else {
        None
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<u64> for TagValue {
    fn from(v: u64) -> Self {
        Self::UInt64(v)
    }
}

impl From<f32> for TagValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int8(v) => serializer.serialize_i8(*v),
            Self::UInt8(v) => serializer.serialize_u8(*v),
            Self::Int16(v) => serializer.serialize_i16(*v),
            Self::UInt16(v) => serializer.serialize_u16(*v),
            Self::Int32(v) => serializer.serialize_i32(*v),
            Self::UInt32(v) => serializer.serialize_u32(*v),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::UInt64(v) => serializer.serialize_u64(*v),
            Self::Float32(v) => serializer.serialize_f32(*v),
            Self::Float64(v) => serializer.serialize_f64(*v),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Wire form accepted when deserializing a scalar from JSON or TOML.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarRepr {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ScalarRepr::deserialize(deserializer)? {
            ScalarRepr::Bool(b) => Self::Bool(b),
            ScalarRepr::Int(v) => Self::Int64(v),
            ScalarRepr::UInt(v) => Self::UInt64(v),
            ScalarRepr::Float(v) => Self::Float64(v),
            ScalarRepr::Text(s) => Self::String(s),
        })
    }
}
