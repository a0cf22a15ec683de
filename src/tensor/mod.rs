//! Tensor data model: dtypes, devices, shared storage, strided views.
//!
//! This is the codec-facing slice of a tensor library: just enough
//! structure to describe what a view addresses and to materialize its
//! bytes for the wire. The compute backend behind it is injected at the
//! protocol seams, never assumed.

mod device;
mod dtype;
mod storage;
mod view;

pub use device::{Device, DeviceKind};
pub use dtype::DType;
pub use storage::Storage;
pub use view::TensorView;
