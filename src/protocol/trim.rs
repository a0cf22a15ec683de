//! Copy-vs-reference decisions before tensors hit the wire.
//!
//! A small view into a large storage block would otherwise drag the
//! whole block over the network. When the view addresses less than half
//! of its storage and the saving clears a minimum hurdle, it is rebased
//! onto a fresh tightly-sized block; otherwise it passes through
//! untouched. The decision is local per tensor.

use tracing::debug;

use crate::tensor::{Storage, TensorView};

/// Tunables for the trim heuristic.
///
/// The optimal hurdle is workload-dependent, so it is configuration
/// rather than a constant baked into the comparison.
#[derive(Debug, Clone, Copy)]
pub struct TrimConfig {
    /// Minimum absolute byte saving before a copy is worth the CPU.
    pub min_savings_bytes: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            min_savings_bytes: 32 * 1024,
        }
    }
}

/// Trim a tensor list with the given config.
///
/// Views that already cover their storage come back sharing the same
/// block, so trimming an already-trimmed list is a no-op.
#[must_use]
pub fn trim(tensors: &[TensorView], config: &TrimConfig) -> Vec<TensorView> {
    tensors
        .iter()
        .map(|tensor| {
            if should_copy(tensor, config) {
                rebase(tensor)
            } else {
                tensor.clone()
            }
        })
        .collect()
}

/// Trim with [`TrimConfig::default`].
#[must_use]
pub fn trim_default(tensors: &[TensorView]) -> Vec<TensorView> {
    trim(tensors, &TrimConfig::default())
}

fn should_copy(tensor: &TensorView, config: &TrimConfig) -> bool {
    let view_bytes = tensor.view_bytes();
    let storage_bytes = tensor.storage_bytes();
    view_bytes * 2 < storage_bytes && storage_bytes - view_bytes >= config.min_savings_bytes
}

fn rebase(tensor: &TensorView) -> TensorView {
    let bytes = tensor.gather_bytes();
    debug!(
        view_bytes = bytes.len(),
        storage_bytes = tensor.storage_bytes(),
        "rebasing view onto tight storage"
    );
    TensorView::contiguous(
        Storage::new(bytes),
        tensor.dtype(),
        tensor.device(),
        tensor.shape().to_vec(),
    )
    .expect("tight storage always fits its view")
}
