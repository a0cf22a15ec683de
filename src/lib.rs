//! tenwire - Wire-level message codec and command dispatch for
//! tensor-carrying RPC.
//!
//! The crate frames an opaque metadata payload plus a list of tensor
//! views into one self-describing blob, trims oversized backing storage
//! before it hits the wire, nests one message's payload inside another
//! for autograd forwarding, dispatches inbound messages onto a closed
//! set of command variants, and lazily reserves per-device execution
//! queues so received tensors are consumed in stream order.
//!
//! # Quick Start
//!
//! ```rust
//! use tenwire::{Message, MessageType, TensorView};
//!
//! let tensors = vec![TensorView::from_f32(&[1.0, 2.0, 3.0], vec![3])?];
//! let msg = Message::new(MessageType::ScriptResult, &b"result body"[..], tensors);
//!
//! // Frame to one blob, and back.
//! let blob = msg.encode()?;
//! let decoded = Message::decode(&blob)?;
//! assert_eq!(decoded.tag(), MessageType::ScriptResult);
//! # Ok::<(), tenwire::Error>(())
//! ```
//!
//! # Stability
//!
//! The wire format is RPC-only. It is not a storage format and carries
//! no compatibility guarantee across releases; both ends of a link must
//! run the same version of the tag set and frame layout.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod tensor;

pub use protocol::{
    deserialize_request, deserialize_response, trim, trim_default, wrap_response, Command, Error,
    LazyStreamContext, Message, MessageType, NoAcceleratorProvider, NoopHook, RecvHook, Result,
    StreamHandle, StreamProvider, TrimConfig,
};
pub use tensor::{Device, DeviceKind, DType, Storage, TensorView};
