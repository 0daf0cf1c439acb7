//! Literal values and object references flowing through the host API.

use std::fmt;

use crate::host::HostType;

/// A value passed to or returned from a host API member.
///
/// Literal variants are the input to constant materialization (field constants and optional
/// parameter defaults); [`HostValue::Object`] stands for an opaque object reference of a
/// known type, as used in facade dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// The null reference
    Null,
    /// `System.Boolean`
    Boolean(bool),
    /// `System.Char`
    Char(char),
    /// `System.SByte`
    Int8(i8),
    /// `System.Byte`
    UInt8(u8),
    /// `System.Int16`
    Int16(i16),
    /// `System.UInt16`
    UInt16(u16),
    /// `System.Int32`
    Int32(i32),
    /// `System.UInt32`
    UInt32(u32),
    /// `System.Int64`
    Int64(i64),
    /// `System.UInt64`
    UInt64(u64),
    /// `System.Single`
    Float32(f32),
    /// `System.Double`
    Float64(f64),
    /// `System.String`
    String(String),
    /// An object reference of the given type
    Object(HostType),
}

impl HostValue {
    /// Short name of the value's kind, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Boolean(_) => "bool",
            HostValue::Char(_) => "char",
            HostValue::Int8(_) => "sbyte",
            HostValue::UInt8(_) => "byte",
            HostValue::Int16(_) => "short",
            HostValue::UInt16(_) => "ushort",
            HostValue::Int32(_) => "int",
            HostValue::UInt32(_) => "uint",
            HostValue::Int64(_) => "long",
            HostValue::UInt64(_) => "ulong",
            HostValue::Float32(_) => "float",
            HostValue::Float64(_) => "double",
            HostValue::String(_) => "string",
            HostValue::Object(_) => "object",
        }
    }

    /// Returns the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns `true` for the null reference.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("null"),
            HostValue::Boolean(v) => write!(f, "{v}"),
            HostValue::Char(v) => write!(f, "'{v}'"),
            HostValue::Int8(v) => write!(f, "{v}"),
            HostValue::UInt8(v) => write!(f, "{v}"),
            HostValue::Int16(v) => write!(f, "{v}"),
            HostValue::UInt16(v) => write!(f, "{v}"),
            HostValue::Int32(v) => write!(f, "{v}"),
            HostValue::UInt32(v) => write!(f, "{v}"),
            HostValue::Int64(v) => write!(f, "{v}L"),
            HostValue::UInt64(v) => write!(f, "{v}UL"),
            HostValue::Float32(v) => write!(f, "{v}f"),
            HostValue::Float64(v) => write!(f, "{v}d"),
            HostValue::String(v) => write!(f, "\"{v}\""),
            HostValue::Object(ty) => write!(f, "<{ty}>"),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Boolean(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int32(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int64(value)
    }
}

impl From<f32> for HostValue {
    fn from(value: f32) -> Self {
        HostValue::Float32(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float64(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_and_accessors() {
        assert_eq!(HostValue::from("summer").as_str(), Some("summer"));
        assert_eq!(HostValue::from(true).as_bool(), Some(true));
        assert_eq!(HostValue::from(7).as_bool(), None);
        assert_eq!(HostValue::from(7_i64), HostValue::Int64(7));
        assert!(HostValue::Null.is_null());
        assert_eq!(HostValue::UInt16(3).kind_name(), "ushort");
    }

    #[test]
    fn display() {
        assert_eq!(HostValue::from("coop").to_string(), "\"coop\"");
        assert_eq!(HostValue::Int64(5).to_string(), "5L");
        assert_eq!(
            HostValue::Object(HostType::named("StardewValley", "Farm")).to_string(),
            "<StardewValley.Farm>"
        );
    }
}
