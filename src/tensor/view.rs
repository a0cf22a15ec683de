//! Shaped, strided views over shared storage.

use super::{Device, DType, Storage};
use crate::protocol::{Error, Result};

/// A shaped, strided reference into a contiguous [`Storage`] block.
///
/// Multiple views may alias the same block. A view never addresses
/// bytes outside its storage; constructors enforce this up front so the
/// codec can index without re-checking.
#[derive(Debug, Clone)]
pub struct TensorView {
    storage: Storage,
    dtype: DType,
    device: Device,
    shape: Vec<u64>,
    strides: Vec<u64>,
    /// Offset into storage, in elements.
    offset: u64,
}

impl TensorView {
    /// Create a contiguous view covering `shape` from the start of `storage`.
    pub fn contiguous(
        storage: Storage,
        dtype: DType,
        device: Device,
        shape: Vec<u64>,
    ) -> Result<Self> {
        let strides = Self::contiguous_strides(&shape);
        Self::strided(storage, dtype, device, shape, strides, 0)
    }

    /// Create a view with explicit strides and element offset.
    pub fn strided(
        storage: Storage,
        dtype: DType,
        device: Device,
        shape: Vec<u64>,
        strides: Vec<u64>,
        offset: u64,
    ) -> Result<Self> {
        if shape.len() != strides.len() {
            return Err(Error::RankMismatch {
                shape: shape.len(),
                strides: strides.len(),
            });
        }
        let view = Self {
            storage,
            dtype,
            device,
            shape,
            strides,
            offset,
        };
        view.validate()?;
        Ok(view)
    }

    /// Convenience constructor: a contiguous CPU tensor from `f32` data.
    pub fn from_f32(data: &[f32], shape: Vec<u64>) -> Result<Self> {
        let mut bytes = Vec::with_capacity(data.len() * 4);
        for v in data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self::contiguous(Storage::new(bytes), DType::Float32, Device::CPU, shape)
    }

    /// Row-major strides for the given shape.
    #[must_use]
    pub fn contiguous_strides(shape: &[u64]) -> Vec<u64> {
        let mut strides = vec![1u64; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1].max(1);
        }
        strides
    }

    /// Backing storage handle.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Element data type.
    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device affinity.
    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Shape of the view.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Strides of the view, in elements.
    #[must_use]
    pub fn strides(&self) -> &[u64] {
        &self.strides
    }

    /// Element offset into storage.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total number of elements addressed by the view.
    #[must_use]
    pub fn numel(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Bytes addressed by the view (element count times element size).
    #[must_use]
    pub fn view_bytes(&self) -> usize {
        self.numel() as usize * self.dtype.element_size()
    }

    /// Bytes in the backing storage block.
    #[must_use]
    pub fn storage_bytes(&self) -> usize {
        self.storage.len()
    }

    /// Check if the view is a dense row-major window at offset zero.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.strides == Self::contiguous_strides(&self.shape)
    }

    /// Materialize the addressed elements in logical (row-major) order.
    ///
    /// Contiguous views are a single slice copy; strided views walk the
    /// index odometer element by element.
    #[must_use]
    pub fn gather_bytes(&self) -> Vec<u8> {
        let esz = self.dtype.element_size();
        let n = self.numel() as usize;
        let src = self.storage.as_bytes();

        if self.is_contiguous() {
            let start = self.offset as usize * esz;
            return src[start..start + n * esz].to_vec();
        }

        let mut out = Vec::with_capacity(n * esz);
        let mut index = vec![0u64; self.shape.len()];
        for _ in 0..n {
            let mut elem = self.offset;
            for (d, &ix) in index.iter().enumerate() {
                elem += ix * self.strides[d];
            }
            let byte = elem as usize * esz;
            out.extend_from_slice(&src[byte..byte + esz]);

            // Odometer advance, innermost dimension fastest.
            for d in (0..index.len()).rev() {
                index[d] += 1;
                if index[d] < self.shape[d] {
                    break;
                }
                index[d] = 0;
            }
        }
        out
    }

    /// Check the view against its storage with fully checked
    /// arithmetic, so shape, stride, and offset values taken from the
    /// wire can never wrap past a bounds check.
    fn validate(&self) -> Result<()> {
        let overflow = |what| Error::LengthOverflow { what };
        let esz = self.dtype.element_size() as u64;

        let numel = self
            .shape
            .iter()
            .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))
            .ok_or(overflow("tensor element count"))?;
        let nbytes = numel.checked_mul(esz).ok_or(overflow("tensor byte length"))?;
        usize::try_from(nbytes).map_err(|_| overflow("tensor byte length"))?;

        if numel == 0 {
            return Ok(());
        }

        let mut last = self.offset;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides) {
            let span = (dim - 1)
                .checked_mul(stride)
                .ok_or(overflow("tensor view extent"))?;
            last = last.checked_add(span).ok_or(overflow("tensor view extent"))?;
        }
        let needed = last
            .checked_add(1)
            .and_then(|elems| elems.checked_mul(esz))
            .ok_or(overflow("tensor view extent"))?;

        if needed > self.storage.len() as u64 {
            return Err(Error::ViewOutOfBounds {
                needed: usize::try_from(needed).unwrap_or(usize::MAX),
                got: self.storage.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_strides() {
        assert_eq!(
            TensorView::contiguous_strides(&[2, 3, 4]),
            vec![12, 4, 1]
        );
        assert_eq!(TensorView::contiguous_strides(&[]), Vec::<u64>::new());
    }

    #[test]
    fn test_contiguous_view() {
        let view = TensorView::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        assert_eq!(view.numel(), 6);
        assert_eq!(view.view_bytes(), 24);
        assert!(view.is_contiguous());
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let storage = Storage::zeros(8);
        let result = TensorView::contiguous(storage, DType::Float32, Device::CPU, vec![4]);
        assert!(matches!(result, Err(Error::ViewOutOfBounds { .. })));
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        let storage = Storage::zeros(16);
        let result = TensorView::strided(
            storage,
            DType::Float32,
            Device::CPU,
            vec![2, 2],
            vec![1],
            0,
        );
        assert!(matches!(result, Err(Error::RankMismatch { .. })));
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        // 2^61 Int64 elements overflow the byte length in u64.
        let result = TensorView::strided(
            Storage::zeros(8),
            DType::Int64,
            Device::CPU,
            vec![1 << 61],
            vec![1],
            0,
        );
        assert!(matches!(result, Err(Error::LengthOverflow { .. })));
    }

    #[test]
    fn test_overflowing_stride_rejected() {
        let result = TensorView::strided(
            Storage::zeros(16),
            DType::Int64,
            Device::CPU,
            vec![2],
            vec![u64::MAX],
            0,
        );
        assert!(matches!(result, Err(Error::LengthOverflow { .. })));
    }

    #[test]
    fn test_overflowing_offset_rejected() {
        let result = TensorView::strided(
            Storage::zeros(16),
            DType::Int64,
            Device::CPU,
            vec![2],
            vec![1],
            u64::MAX,
        );
        assert!(matches!(result, Err(Error::LengthOverflow { .. })));
    }

    #[test]
    fn test_gather_strided_column() {
        // 2x3 row-major matrix; view its first column: shape [2], stride [3].
        let view = TensorView::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let column = TensorView::strided(
            view.storage().clone(),
            DType::Float32,
            Device::CPU,
            vec![2],
            vec![3],
            0,
        )
        .unwrap();
        assert!(!column.is_contiguous());

        let bytes = column.gather_bytes();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&4.0f32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_gather_offset_window() {
        let view = TensorView::from_f32(&[0.0, 1.0, 2.0, 3.0], vec![4]).unwrap();
        let window = TensorView::strided(
            view.storage().clone(),
            DType::Float32,
            Device::CPU,
            vec![2],
            vec![1],
            1,
        )
        .unwrap();
        let bytes = window.gather_bytes();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&2.0f32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_zero_element_view() {
        let view =
            TensorView::contiguous(Storage::zeros(0), DType::Float32, Device::CPU, vec![0, 3])
                .unwrap();
        assert_eq!(view.numel(), 0);
        assert!(view.gather_bytes().is_empty());
    }

    #[test]
    fn test_scalar_view() {
        let view = TensorView::from_f32(&[7.5], vec![]).unwrap();
        assert_eq!(view.numel(), 1);
        assert_eq!(view.gather_bytes(), 7.5f32.to_le_bytes().to_vec());
    }
}
