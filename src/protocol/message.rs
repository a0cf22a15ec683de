//! tenwire message implementation

use bytes::Bytes;
use uuid::Uuid;

use super::MessageType;
use crate::tensor::TensorView;

/// One RPC message: a type tag, opaque metadata bytes, an ordered
/// tensor list, and an optional correlation id.
///
/// A message owns its parts until handed to the framer on send, and is
/// reconstructed whole by the framer on receive.
#[derive(Debug, Clone)]
pub struct Message {
    tag: MessageType,
    payload: Bytes,
    tensors: Vec<TensorView>,
    correlation_id: Option<u64>,
}

impl Message {
    /// Create a message with a fresh correlation id.
    pub fn new(
        tag: MessageType,
        payload: impl Into<Bytes>,
        tensors: Vec<TensorView>,
    ) -> Self {
        Self {
            tag,
            payload: payload.into(),
            tensors,
            correlation_id: Some(Self::generate_id()),
        }
    }

    /// Create a message with an explicit correlation id (or none).
    pub fn with_correlation_id(
        tag: MessageType,
        payload: impl Into<Bytes>,
        tensors: Vec<TensorView>,
        correlation_id: Option<u64>,
    ) -> Self {
        Self {
            tag,
            payload: payload.into(),
            tensors,
            correlation_id,
        }
    }

    /// Get the type tag.
    #[must_use]
    pub fn tag(&self) -> MessageType {
        self.tag
    }

    /// Get the opaque metadata payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Get the tensor list.
    #[must_use]
    pub fn tensors(&self) -> &[TensorView] {
        &self.tensors
    }

    /// Get the correlation id, if one was assigned.
    #[must_use]
    pub fn correlation_id(&self) -> Option<u64> {
        self.correlation_id
    }

    /// Decompose into (tag, payload, tensors).
    #[must_use]
    pub fn into_parts(self) -> (MessageType, Bytes, Vec<TensorView>) {
        (self.tag, self.payload, self.tensors)
    }

    /// Encode into one wire blob: the tag byte leads the framed payload.
    pub fn encode(&self) -> super::Result<Vec<u8>> {
        let mut metadata = Vec::with_capacity(1 + self.payload.len());
        metadata.push(self.tag.as_u8());
        metadata.extend_from_slice(&self.payload);
        super::wire::serialize(&metadata, &self.tensors)
    }

    /// Decode a wire blob back into a message.
    ///
    /// Fails with [`super::Error::UnrecognizedType`] when the leading
    /// tag byte maps to no known variant. Correlation ids are not
    /// carried on the wire.
    pub fn decode(blob: &[u8]) -> super::Result<Self> {
        let (metadata, tensors) = super::wire::deserialize(blob)?;
        let (&tag_byte, payload) = metadata.split_first().ok_or(super::Error::BufferTooSmall {
            needed: 1,
            got: 0,
        })?;
        let tag = MessageType::from_u8(tag_byte)
            .ok_or(super::Error::UnrecognizedType { tag: tag_byte })?;
        Ok(Self {
            tag,
            payload: Bytes::copy_from_slice(payload),
            tensors,
            correlation_id: None,
        })
    }

    /// Generate a random correlation id.
    fn generate_id() -> u64 {
        let uuid = Uuid::new_v4();
        let bytes = uuid.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}
