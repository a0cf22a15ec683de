//! Wire framing for (payload, tensor list) blobs.
//!
//! One blob is: a tensor-entry header, the opaque payload, then each
//! tensor's raw element bytes. All integer fields are big-endian. The
//! format is RPC-only; it is not stable across releases and must not be
//! used for persistence.

use bytes::Bytes;
use tracing::trace;

use super::{
    Error, MAX_TENSOR_DIMS, Result, TENSOR_ALIGNMENT, TENSOR_COUNT_SIZE, TENSOR_ENTRY_SIZE,
};
use crate::tensor::{Device, DeviceKind, DType, Storage, TensorView};

/// Pack an opaque payload plus tensor views into one self-describing blob.
///
/// Each tensor's element bytes are gathered into logical order (so the
/// wire never carries stride gaps) and padded to [`TENSOR_ALIGNMENT`]
/// so typed reads over the blob stay well-defined.
pub fn serialize(payload: &[u8], tensors: &[TensorView]) -> Result<Vec<u8>> {
    let count = u32::try_from(tensors.len())
        .map_err(|_| Error::LengthOverflow { what: "tensor count" })?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| Error::LengthOverflow { what: "payload length" })?;

    let mut data_len = 0usize;
    for tensor in tensors {
        if tensor.shape().len() > MAX_TENSOR_DIMS {
            return Err(Error::TooManyDims {
                ndim: tensor.shape().len(),
                max: MAX_TENSOR_DIMS,
            });
        }
        data_len += padded_len(tensor.view_bytes());
    }

    let total = TENSOR_COUNT_SIZE
        + tensors.len() * TENSOR_ENTRY_SIZE
        + 4
        + payload.len()
        + data_len;
    let mut blob = Vec::with_capacity(total);

    blob.extend_from_slice(&count.to_be_bytes());
    for tensor in tensors {
        write_entry(&mut blob, tensor);
    }

    blob.extend_from_slice(&payload_len.to_be_bytes());
    blob.extend_from_slice(payload);

    for tensor in tensors {
        let bytes = tensor.gather_bytes();
        let padded = padded_len(bytes.len());
        blob.extend_from_slice(&bytes);
        blob.resize(blob.len() + (padded - bytes.len()), 0);
    }

    trace!(
        tensors = tensors.len(),
        payload_len = payload.len(),
        blob_len = blob.len(),
        "serialized frame"
    );
    Ok(blob)
}

/// Unpack a blob back into (payload, tensor list).
///
/// The header is parsed and validated in full before any tensor bytes
/// are touched. Each tensor comes back as a fresh contiguous view at
/// offset zero; the wire format carries no aliasing, so none is
/// reconstructed.
pub fn deserialize(blob: &[u8]) -> Result<(Bytes, Vec<TensorView>)> {
    let mut pos = 0usize;

    let count = read_u32(blob, &mut pos)? as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(read_entry(blob, &mut pos)?);
    }

    let payload_len = read_u32(blob, &mut pos)? as usize;
    let payload_end = pos
        .checked_add(payload_len)
        .ok_or(Error::LengthOverflow { what: "payload length" })?;
    if blob.len() < payload_end {
        return Err(Error::BufferTooSmall {
            needed: payload_end,
            got: blob.len(),
        });
    }
    let payload = Bytes::copy_from_slice(&blob[pos..payload_end]);
    pos = payload_end;

    let mut tensors = Vec::with_capacity(count);
    for entry in entries {
        // Size fields come off the wire; every step stays checked so a
        // hostile blob errors instead of wrapping.
        let nbytes = entry
            .numel
            .checked_mul(entry.dtype.element_size() as u64)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or(Error::LengthOverflow { what: "tensor data length" })?;
        let padded = nbytes
            .checked_next_multiple_of(TENSOR_ALIGNMENT)
            .ok_or(Error::LengthOverflow { what: "tensor data length" })?;
        let end = pos
            .checked_add(padded)
            .ok_or(Error::LengthOverflow { what: "tensor data length" })?;
        if blob.len() < end {
            return Err(Error::BufferTooSmall {
                needed: end,
                got: blob.len(),
            });
        }
        let storage = Storage::new(blob[pos..pos + nbytes].to_vec());
        tensors.push(TensorView::strided(
            storage,
            entry.dtype,
            entry.device,
            entry.shape,
            entry.strides,
            0,
        )?);
        pos = end;
    }

    trace!(tensors = count, payload_len, "deserialized frame");
    Ok((payload, tensors))
}

struct TensorEntry {
    dtype: DType,
    device: Device,
    numel: u64,
    shape: Vec<u64>,
    strides: Vec<u64>,
}

fn write_entry(blob: &mut Vec<u8>, tensor: &TensorView) {
    blob.push(tensor.dtype().as_u8());
    blob.push(tensor.device().kind.as_u8());
    blob.extend_from_slice(&tensor.device().index.to_be_bytes());
    blob.extend_from_slice(&tensor.numel().to_be_bytes());
    blob.push(tensor.shape().len() as u8);

    // The data section holds gathered row-major bytes, so the entry
    // carries contiguous strides regardless of the view's own layout.
    let strides = TensorView::contiguous_strides(tensor.shape());
    for slot in 0..MAX_TENSOR_DIMS {
        let dim = tensor.shape().get(slot).copied().unwrap_or(0);
        blob.extend_from_slice(&dim.to_be_bytes());
    }
    for slot in 0..MAX_TENSOR_DIMS {
        let stride = strides.get(slot).copied().unwrap_or(0);
        blob.extend_from_slice(&stride.to_be_bytes());
    }
}

fn read_entry(blob: &[u8], pos: &mut usize) -> Result<TensorEntry> {
    let dtype_tag = read_u8(blob, pos)?;
    let dtype = DType::from_u8(dtype_tag).ok_or(Error::InvalidDtype { tag: dtype_tag })?;

    let kind_tag = read_u8(blob, pos)?;
    let kind = DeviceKind::from_u8(kind_tag).ok_or(Error::InvalidDevice { tag: kind_tag })?;
    let index = read_u16(blob, pos)?;
    let device = Device { kind, index };

    let numel = read_u64(blob, pos)?;
    let ndim = read_u8(blob, pos)? as usize;
    if ndim > MAX_TENSOR_DIMS {
        return Err(Error::TooManyDims {
            ndim,
            max: MAX_TENSOR_DIMS,
        });
    }

    let mut slots = [0u64; MAX_TENSOR_DIMS];
    for slot in &mut slots {
        *slot = read_u64(blob, pos)?;
    }
    let shape = slots[..ndim].to_vec();
    for slot in &mut slots {
        *slot = read_u64(blob, pos)?;
    }
    let strides = slots[..ndim].to_vec();

    let declared_product = shape
        .iter()
        .try_fold(1u64, |acc, &dim| acc.checked_mul(dim))
        .ok_or(Error::LengthOverflow {
            what: "tensor element count",
        })?;
    if declared_product != numel {
        return Err(Error::LengthOverflow {
            what: "tensor element count",
        });
    }

    Ok(TensorEntry {
        dtype,
        device,
        numel,
        shape,
        strides,
    })
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(TENSOR_ALIGNMENT) * TENSOR_ALIGNMENT
}

fn read_u8(blob: &[u8], pos: &mut usize) -> Result<u8> {
    let end = *pos + 1;
    if blob.len() < end {
        return Err(Error::BufferTooSmall {
            needed: end,
            got: blob.len(),
        });
    }
    let value = blob[*pos];
    *pos = end;
    Ok(value)
}

fn read_u16(blob: &[u8], pos: &mut usize) -> Result<u16> {
    let end = *pos + 2;
    if blob.len() < end {
        return Err(Error::BufferTooSmall {
            needed: end,
            got: blob.len(),
        });
    }
    let value = u16::from_be_bytes(blob[*pos..end].try_into().expect("slice length checked"));
    *pos = end;
    Ok(value)
}

fn read_u32(blob: &[u8], pos: &mut usize) -> Result<u32> {
    let end = *pos + 4;
    if blob.len() < end {
        return Err(Error::BufferTooSmall {
            needed: end,
            got: blob.len(),
        });
    }
    let value = u32::from_be_bytes(blob[*pos..end].try_into().expect("slice length checked"));
    *pos = end;
    Ok(value)
}

fn read_u64(blob: &[u8], pos: &mut usize) -> Result<u64> {
    let end = *pos + 8;
    if blob.len() < end {
        return Err(Error::BufferTooSmall {
            needed: end,
            got: blob.len(),
        });
    }
    let value = u64::from_be_bytes(blob[*pos..end].try_into().expect("slice length checked"));
    *pos = end;
    Ok(value)
}
