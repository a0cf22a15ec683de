//! tenwire error types

use thiserror::Error;

use crate::tensor::Device;

/// tenwire protocol errors
#[derive(Error, Debug)]
pub enum Error {
    /// Blob or field shorter than a declared length
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// A length field exceeds what the format can address
    #[error("length overflow in {what}")]
    LengthOverflow {
        /// Which field overflowed
        what: &'static str,
    },

    /// Unknown dtype tag in a tensor entry
    #[error("invalid dtype tag: {tag:#x}")]
    InvalidDtype {
        /// Invalid tag byte
        tag: u8,
    },

    /// Unknown device kind tag in a tensor entry
    #[error("invalid device tag: {tag:#x}")]
    InvalidDevice {
        /// Invalid tag byte
        tag: u8,
    },

    /// Tensor entry declares more dimensions than the format carries
    #[error("too many dimensions: {ndim} (max {max})")]
    TooManyDims {
        /// Declared rank
        ndim: usize,
        /// Maximum supported rank
        max: usize,
    },

    /// Shape and stride ranks disagree
    #[error("rank mismatch: shape has {shape} dims, strides has {strides}")]
    RankMismatch {
        /// Shape rank
        shape: usize,
        /// Strides rank
        strides: usize,
    },

    /// A view addresses bytes outside its storage block
    #[error("view out of bounds: addresses {needed} bytes, storage has {got}")]
    ViewOutOfBounds {
        /// Bytes the view would touch
        needed: usize,
        /// Bytes the storage holds
        got: usize,
    },

    /// Message tag maps to no known command variant
    #[error("unrecognized message type: {tag:#x}")]
    UnrecognizedType {
        /// Unknown tag byte
        tag: u8,
    },

    /// A known tag arrived on the wrong dispatch path
    #[error("unexpected message type {tag} on this path")]
    UnexpectedType {
        /// The offending tag
        tag: crate::protocol::MessageType,
    },

    /// Wrapped envelope is malformed (overrun or wrap-within-wrap)
    #[error("malformed wrapped payload: {reason}")]
    MalformedWrap {
        /// What went wrong
        reason: &'static str,
    },

    /// A structured command body ended before its fields did
    #[error("truncated {variant} body")]
    TruncatedBody {
        /// Variant being decoded
        variant: &'static str,
    },

    /// Message carries a different tensor count than the variant expects
    #[error("tensor count mismatch: expected {expected}, got {got}")]
    TensorCountMismatch {
        /// Expected count
        expected: usize,
        /// Actual count
        got: usize,
    },

    /// Stream factory could not produce a handle for a device
    #[error("device {device} unavailable: {reason}")]
    DeviceUnavailable {
        /// Requested device
        device: Device,
        /// Factory-reported reason
        reason: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
