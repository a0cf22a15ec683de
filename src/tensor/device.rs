//! Device affinity for tensors.

use std::fmt;

/// Kind of device a tensor lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DeviceKind {
    /// Host memory
    #[default]
    Cpu = 0,
    /// CUDA accelerator memory
    Cuda = 1,
}

impl DeviceKind {
    /// Convert from the wire tag byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Cpu),
            1 => Some(Self::Cuda),
            _ => None,
        }
    }

    /// Convert to the wire tag byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A device: kind plus ordinal index.
///
/// The index is meaningless for CPU and conventionally zero there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    /// Device kind
    pub kind: DeviceKind,
    /// Device ordinal (0-indexed)
    pub index: u16,
}

impl Device {
    /// The CPU device.
    pub const CPU: Self = Self {
        kind: DeviceKind::Cpu,
        index: 0,
    };

    /// A CUDA device with the given ordinal.
    #[must_use]
    pub const fn cuda(index: u16) -> Self {
        Self {
            kind: DeviceKind::Cuda,
            index,
        }
    }

    /// Check if this is the CPU.
    #[must_use]
    pub const fn is_cpu(self) -> bool {
        matches!(self.kind, DeviceKind::Cpu)
    }

    /// Check if this is an accelerator device.
    #[must_use]
    pub const fn is_accelerator(self) -> bool {
        !self.is_cpu()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Cuda => write!(f, "cuda:{}", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_roundtrip() {
        assert_eq!(DeviceKind::from_u8(0), Some(DeviceKind::Cpu));
        assert_eq!(DeviceKind::from_u8(1), Some(DeviceKind::Cuda));
        assert_eq!(DeviceKind::from_u8(2), None);
        assert_eq!(DeviceKind::Cuda.as_u8(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Device::CPU.to_string(), "cpu");
        assert_eq!(Device::cuda(3).to_string(), "cuda:3");
    }

    #[test]
    fn test_accelerator_check() {
        assert!(Device::cuda(0).is_accelerator());
        assert!(!Device::CPU.is_accelerator());
    }
}
