//! Element data types for tensors on the wire.

use std::fmt;

/// Data type of tensor elements.
///
/// The discriminant doubles as the wire tag; the set is closed and an
/// unknown tag never decodes to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DType {
    /// 32-bit floating point
    Float32 = 1,
    /// 16-bit IEEE 754 floating point
    Float16 = 2,
    /// 16-bit brain floating point
    BFloat16 = 3,
    /// 64-bit floating point
    Float64 = 4,
    /// 8-bit signed integer
    Int8 = 5,
    /// 32-bit signed integer
    Int32 = 6,
    /// 64-bit signed integer
    Int64 = 7,
    /// 8-bit unsigned integer
    UInt8 = 8,
    /// Boolean (1 byte per element)
    Bool = 9,
}

impl DType {
    /// Size in bytes of a single element of this data type.
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            Self::Float64 | Self::Int64 => 8,
            Self::Float32 | Self::Int32 => 4,
            Self::Float16 | Self::BFloat16 => 2,
            Self::Int8 | Self::UInt8 | Self::Bool => 1,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float16 => "float16",
            Self::BFloat16 => "bfloat16",
            Self::Float64 => "float64",
            Self::Int8 => "int8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::Bool => "bool",
        }
    }

    /// Convert from the wire tag byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Float32),
            2 => Some(Self::Float16),
            3 => Some(Self::BFloat16),
            4 => Some(Self::Float64),
            5 => Some(Self::Int8),
            6 => Some(Self::Int32),
            7 => Some(Self::Int64),
            8 => Some(Self::UInt8),
            9 => Some(Self::Bool),
            _ => None,
        }
    }

    /// Convert to the wire tag byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(DType::Float32.element_size(), 4);
        assert_eq!(DType::Float16.element_size(), 2);
        assert_eq!(DType::BFloat16.element_size(), 2);
        assert_eq!(DType::Float64.element_size(), 8);
        assert_eq!(DType::Int8.element_size(), 1);
        assert_eq!(DType::Int64.element_size(), 8);
        assert_eq!(DType::Bool.element_size(), 1);
    }

    #[test]
    fn test_tag_roundtrip() {
        for tag in 1..=9u8 {
            let dtype = DType::from_u8(tag).unwrap();
            assert_eq!(dtype.as_u8(), tag);
        }
        assert_eq!(DType::from_u8(0), None);
        assert_eq!(DType::from_u8(10), None);
    }
}
