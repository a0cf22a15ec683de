//! Lazy per-device execution-queue reservation.
//!
//! One context lives for one response materialization: it reserves at
//! most one stream per device it touches, and bridges each reserved
//! stream to the device's externally-current stream with a recorded
//! event rather than a blocking wait. The context is single-owner and
//! discarded once tensor ownership passes to the caller.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::trace;

use super::{Error, Result};
use crate::tensor::{Device, TensorView};

/// Handle to one device-scoped execution queue.
///
/// The id is assigned by the compute backend; this crate only ever
/// compares and carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    /// Device the queue belongs to
    pub device: Device,
    /// Backend-assigned queue id
    pub id: u64,
}

/// Compute-backend seam for queue creation and cross-queue barriers.
///
/// On a platform with no accelerator devices none of these are ever
/// called, since CPU tensors never reach the context's device table.
pub trait StreamProvider {
    /// Allocate a fresh queue on the given device.
    fn create_stream(&self, device: Device) -> Result<StreamHandle>;

    /// The queue currently active on the given device, if any.
    fn current_stream(&self, device: Device) -> Option<StreamHandle>;

    /// Record an event on `source` and make `target` wait for it.
    ///
    /// Non-blocking: the wait is queued, not performed on the calling
    /// thread.
    fn record_and_block(&self, source: &StreamHandle, target: &StreamHandle) -> Result<()>;
}

/// Lazily-populated table of one reserved stream per device.
///
/// Not safe for sharing across threads against one instance; a parallel
/// response path owns its own context.
pub struct LazyStreamContext<P: StreamProvider> {
    streams: BTreeMap<Device, StreamHandle>,
    provider: P,
}

impl<P: StreamProvider> LazyStreamContext<P> {
    /// Create an empty context over the given provider.
    pub fn new(provider: P) -> Self {
        Self {
            streams: BTreeMap::new(),
            provider,
        }
    }

    /// Get the reserved stream for `device`, creating one on first use.
    ///
    /// Idempotent: the factory runs at most once per device index for
    /// the lifetime of this context.
    pub fn reserve(&mut self, device: Device) -> Result<StreamHandle> {
        if let Some(handle) = self.streams.get(&device) {
            return Ok(*handle);
        }
        let handle = self.provider.create_stream(device)?;
        trace!(%device, id = handle.id, "reserved stream");
        self.streams.insert(device, handle);
        Ok(handle)
    }

    /// Make the reserved streams safe to consume `tensors` through.
    ///
    /// Reserves one stream per distinct accelerator device in the list,
    /// then bridges each reserved stream behind the device's current
    /// stream where the two differ. CPU tensors are skipped entirely.
    pub fn await_tensors(&mut self, tensors: &[TensorView]) -> Result<()> {
        for tensor in tensors {
            if tensor.device().is_accelerator() {
                self.reserve(tensor.device())?;
            }
        }

        for (&device, reserved) in &self.streams {
            if let Some(current) = self.provider.current_stream(device) {
                if current != *reserved {
                    self.provider.record_and_block(&current, reserved)?;
                    trace!(%device, from = current.id, to = reserved.id, "queued stream barrier");
                }
            }
        }
        Ok(())
    }

    /// All streams reserved so far, for downstream keep-alive.
    #[must_use]
    pub fn reserved_streams(&self) -> Vec<StreamHandle> {
        self.streams.values().copied().collect()
    }

    /// All device indices touched so far.
    #[must_use]
    pub fn devices(&self) -> BTreeSet<Device> {
        self.streams.keys().copied().collect()
    }

    /// Consume the context, handing the reserved streams to the caller.
    #[must_use]
    pub fn into_streams(self) -> Vec<StreamHandle> {
        self.streams.into_values().collect()
    }
}

/// Provider for builds without any accelerator backend.
///
/// Reserving a stream on such a platform is a configuration error, so
/// creation fails; it is never reached for CPU-only tensor lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAcceleratorProvider;

impl StreamProvider for NoAcceleratorProvider {
    fn create_stream(&self, device: Device) -> Result<StreamHandle> {
        Err(Error::DeviceUnavailable {
            device,
            reason: "no accelerator backend configured".to_string(),
        })
    }

    fn current_stream(&self, _device: Device) -> Option<StreamHandle> {
        None
    }

    fn record_and_block(&self, _source: &StreamHandle, _target: &StreamHandle) -> Result<()> {
        Ok(())
    }
}
