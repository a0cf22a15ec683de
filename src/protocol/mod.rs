//! tenwire protocol core
//!
//! Wire framing, payload wrapping, trim heuristics, command dispatch,
//! and the lazy device stream table.

mod dispatch;
mod error;
mod message;
mod stream;
mod types;
pub mod trim;
pub mod wire;
pub mod wrap;

pub use dispatch::{
    deserialize_request, deserialize_response, wrap_response, Command, NoopHook, RecvHook,
};
pub use error::{Error, Result};
pub use message::Message;
pub use stream::{LazyStreamContext, NoAcceleratorProvider, StreamHandle, StreamProvider};
pub use trim::{trim, trim_default, TrimConfig};
pub use types::{MessageType, ALL_MESSAGE_TYPES};

/// Alignment boundary, in bytes, for each tensor's data section.
pub const TENSOR_ALIGNMENT: usize = 16;

/// Maximum tensor rank the fixed-size entry descriptor carries.
pub const MAX_TENSOR_DIMS: usize = 8;

/// Size of the tensor-count word at the front of a blob.
pub const TENSOR_COUNT_SIZE: usize = 4;

/// Size of one tensor entry in the blob header:
/// dtype, device kind, device index, element count, rank, then
/// [`MAX_TENSOR_DIMS`] shape and stride slots.
pub const TENSOR_ENTRY_SIZE: usize = 1 + 1 + 2 + 8 + 1 + MAX_TENSOR_DIMS * 8 * 2;

/// Width of the wrapped-envelope trailing length field.
pub const WRAP_LEN_SIZE: usize = 8;
