//! Shared backing storage for tensor views.

use std::sync::Arc;

/// A raw owned byte block backing one or more tensor views.
///
/// Cloning bumps a reference count; the bytes are immutable once the
/// block is constructed. Views into the same block alias each other
/// until one of them is re-based onto a fresh block (see the trimmer).
#[derive(Debug, Clone)]
pub struct Storage(Arc<Vec<u8>>);

impl Storage {
    /// Create a storage block owning the given bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(bytes))
    }

    /// Create a zero-filled storage block of `len` bytes.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self(Arc::new(vec![0u8; len]))
    }

    /// Length of the block in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw bytes of the block.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check whether two handles share the same allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl From<Vec<u8>> for Storage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
