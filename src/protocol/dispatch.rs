//! Mapping messages onto typed command variants.
//!
//! One tag, one variant, one decode switch. The wrapped-response path
//! peels exactly one autograd envelope, hands every received tensor to
//! the injected backward-linkage hook, and reports the inner tag so the
//! caller knows what actually arrived. A failing decode returns no
//! partial command.

use bytes::Bytes;
use tracing::trace;

use super::{wrap, Error, Message, MessageType, Result};
use crate::tensor::TensorView;

/// One decoded command, request or response.
#[derive(Debug, Clone)]
pub enum Command {
    /// Run a script function, await the result
    ScriptCall {
        /// Opaque serialized call body
        body: Bytes,
        /// Argument tensors
        tensors: Vec<TensorView>,
    },
    /// Run a script function, keep the result remote
    ScriptRemoteCall {
        /// Opaque serialized call body
        body: Bytes,
        /// Argument tensors
        tensors: Vec<TensorView>,
    },
    /// Fetch the value behind a remote reference
    RrefFetch {
        /// Remote reference id
        rref_id: u64,
    },
    /// Drop a remote reference
    RrefDelete {
        /// Remote reference id
        rref_id: u64,
    },
    /// Request carrying autograd context around an inner call
    ForwardAutogradCall {
        /// Autograd context id
        context_id: u64,
        /// Opaque inner call body
        body: Bytes,
        /// Argument tensors
        tensors: Vec<TensorView>,
    },
    /// Result of a script call
    ScriptResult {
        /// Opaque serialized result body
        body: Bytes,
        /// Result tensors
        tensors: Vec<TensorView>,
    },
    /// Value fetched from a remote reference
    RrefFetchResult {
        /// Opaque serialized value body
        body: Bytes,
        /// Result tensors
        tensors: Vec<TensorView>,
    },
    /// Acknowledgment of a remote-reference operation
    RrefAck,
    /// Remote raised an exception
    RemoteException {
        /// Error description from the remote side
        message: String,
    },
}

impl Command {
    /// The tag this variant travels under.
    #[must_use]
    pub fn tag(&self) -> MessageType {
        match self {
            Self::ScriptCall { .. } => MessageType::ScriptCall,
            Self::ScriptRemoteCall { .. } => MessageType::ScriptRemoteCall,
            Self::RrefFetch { .. } => MessageType::RrefFetch,
            Self::RrefDelete { .. } => MessageType::RrefDelete,
            Self::ForwardAutogradCall { .. } => MessageType::ForwardAutogradCall,
            Self::ScriptResult { .. } => MessageType::ScriptResult,
            Self::RrefFetchResult { .. } => MessageType::RrefFetchResult,
            Self::RrefAck => MessageType::RrefAck,
            Self::RemoteException { .. } => MessageType::RemoteException,
        }
    }

    /// Encode this command into a message, the inverse of dispatch.
    ///
    /// The tag set is closed; this is the encode half that must stay in
    /// lockstep with the decode switch below.
    #[must_use]
    pub fn into_message(self) -> Message {
        let tag = self.tag();
        let (payload, tensors) = match self {
            Self::ScriptCall { body, tensors }
            | Self::ScriptRemoteCall { body, tensors }
            | Self::ScriptResult { body, tensors }
            | Self::RrefFetchResult { body, tensors } => (body.to_vec(), tensors),
            Self::RrefFetch { rref_id } | Self::RrefDelete { rref_id } => {
                (rref_id.to_be_bytes().to_vec(), Vec::new())
            }
            Self::ForwardAutogradCall {
                context_id,
                body,
                tensors,
            } => {
                let mut payload = context_id.to_be_bytes().to_vec();
                payload.extend_from_slice(&body);
                (payload, tensors)
            }
            Self::RrefAck => (Vec::new(), Vec::new()),
            Self::RemoteException { message } => (message.into_bytes(), Vec::new()),
        };
        Message::new(tag, payload, tensors)
    }
}

/// Backward-linkage attachment seam for received tensors.
///
/// The autograd subsystem implements this; the dispatcher only calls
/// it, once per tensor, on the wrapped-response path.
pub trait RecvHook {
    /// Record backward linkage for one received tensor.
    fn attach_recv(&mut self, tensor: &TensorView);

    /// Receive the autograd context bytes stripped from a wrapped
    /// response, before any tensors are attached.
    ///
    /// Defaults to ignoring them; implementations that track remote
    /// autograd contexts override this.
    fn recv_context(&mut self, context: &[u8]) {
        let _ = context;
    }
}

/// Hook that records nothing, for callers without autograd.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl RecvHook for NoopHook {
    fn attach_recv(&mut self, _tensor: &TensorView) {}
}

/// Decode a request message into its command variant.
///
/// Response tags on this path fail with [`Error::UnexpectedType`];
/// unknown tag bytes never get this far (see [`Message::decode`]).
pub fn deserialize_request(message: &Message) -> Result<Command> {
    let tag = message.tag();
    if !tag.is_request() {
        return Err(Error::UnexpectedType { tag });
    }

    let command = match tag {
        MessageType::ScriptCall => Command::ScriptCall {
            body: message.payload().clone(),
            tensors: message.tensors().to_vec(),
        },
        MessageType::ScriptRemoteCall => Command::ScriptRemoteCall {
            body: message.payload().clone(),
            tensors: message.tensors().to_vec(),
        },
        MessageType::RrefFetch => Command::RrefFetch {
            rref_id: read_id(message, "RrefFetch")?,
        },
        MessageType::RrefDelete => Command::RrefDelete {
            rref_id: read_id(message, "RrefDelete")?,
        },
        MessageType::ForwardAutogradCall => {
            let payload = message.payload();
            if payload.len() < 8 {
                return Err(Error::TruncatedBody {
                    variant: "ForwardAutogradCall",
                });
            }
            let context_id = u64::from_be_bytes(
                payload[..8].try_into().expect("slice length checked"),
            );
            Command::ForwardAutogradCall {
                context_id,
                body: payload.slice(8..),
                tensors: message.tensors().to_vec(),
            }
        }
        _ => unreachable!("is_request() covers exactly the arms above"),
    };

    trace!(%tag, tensors = message.tensors().len(), "decoded request");
    Ok(command)
}

/// Decode a response message, unwrapping one autograd envelope if the
/// tag calls for it.
///
/// Returns the command together with the tag it actually decoded as:
/// the message's own tag for plain responses, the inner tag for wrapped
/// ones. On the wrapped path every received tensor is handed to `hook`
/// before the command is returned.
pub fn deserialize_response<H: RecvHook>(
    message: &Message,
    hook: &mut H,
) -> Result<(Command, MessageType)> {
    let tag = message.tag();
    if !tag.is_response() {
        return Err(Error::UnexpectedType { tag });
    }

    if !tag.is_wrapped_response() {
        return Ok((decode_plain_response(tag, message)?, tag));
    }

    // The envelope holds [inner tag byte | inner payload]; the bytes in
    // front of it are autograd context metadata for the hook.
    let (context, envelope) = wrap::unwrap(message.payload())?;
    let (&inner_tag_byte, inner_payload) = envelope.split_first().ok_or(Error::MalformedWrap {
        reason: "envelope missing the inner type tag",
    })?;
    let inner_tag = MessageType::from_u8(inner_tag_byte)
        .ok_or(Error::UnrecognizedType { tag: inner_tag_byte })?;
    if inner_tag.is_wrapped_response() {
        return Err(Error::MalformedWrap {
            reason: "wrap-within-wrap is not a supported shape",
        });
    }
    if !inner_tag.is_response() {
        return Err(Error::UnexpectedType { tag: inner_tag });
    }

    let inner = Message::with_correlation_id(
        inner_tag,
        inner_payload.to_vec(),
        message.tensors().to_vec(),
        message.correlation_id(),
    );
    let command = decode_plain_response(inner_tag, &inner)?;

    hook.recv_context(&context);
    for tensor in message.tensors() {
        hook.attach_recv(tensor);
    }
    trace!(outer = %tag, inner = %inner_tag, "unwrapped autograd response");

    Ok((command, inner_tag))
}

/// Build a wrapped response: `inner` rides inside a
/// [`MessageType::ForwardAutogradResponse`] carrier together with the
/// autograd context bytes.
#[must_use]
pub fn wrap_response(inner: Message, context: &[u8]) -> Message {
    let (inner_tag, inner_payload, tensors) = inner.into_parts();

    let mut envelope = Vec::with_capacity(1 + inner_payload.len());
    envelope.push(inner_tag.as_u8());
    envelope.extend_from_slice(&inner_payload);

    let mut payload = context.to_vec();
    wrap::wrap(&mut payload, &envelope);

    Message::new(MessageType::ForwardAutogradResponse, payload, tensors)
}

fn decode_plain_response(tag: MessageType, message: &Message) -> Result<Command> {
    let command = match tag {
        MessageType::ScriptResult => Command::ScriptResult {
            body: message.payload().clone(),
            tensors: message.tensors().to_vec(),
        },
        MessageType::RrefFetchResult => Command::RrefFetchResult {
            body: message.payload().clone(),
            tensors: message.tensors().to_vec(),
        },
        MessageType::RrefAck => {
            expect_no_tensors(message, "RrefAck")?;
            Command::RrefAck
        }
        MessageType::RemoteException => {
            expect_no_tensors(message, "RemoteException")?;
            Command::RemoteException {
                message: String::from_utf8_lossy(message.payload()).into_owned(),
            }
        }
        _ => unreachable!("callers route only plain response tags here"),
    };
    Ok(command)
}

fn read_id(message: &Message, variant: &'static str) -> Result<u64> {
    expect_no_tensors(message, variant)?;
    let payload = message.payload();
    if payload.len() < 8 {
        return Err(Error::TruncatedBody { variant });
    }
    Ok(u64::from_be_bytes(
        payload[..8].try_into().expect("slice length checked"),
    ))
}

fn expect_no_tensors(message: &Message, _variant: &'static str) -> Result<()> {
    if message.tensors().is_empty() {
        Ok(())
    } else {
        Err(Error::TensorCountMismatch {
            expected: 0,
            got: message.tensors().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::ALL_MESSAGE_TYPES;
    use crate::tensor::TensorView;

    /// Hook that remembers the context bytes and how many bytes each
    /// attached tensor addressed.
    #[derive(Default)]
    struct RecordingHook {
        attached: Vec<usize>,
        context: Vec<u8>,
    }

    impl RecvHook for RecordingHook {
        fn attach_recv(&mut self, tensor: &TensorView) {
            self.attached.push(tensor.view_bytes());
        }

        fn recv_context(&mut self, context: &[u8]) {
            self.context = context.to_vec();
        }
    }

    fn sample_command(tag: MessageType) -> Command {
        let tensors = vec![TensorView::from_f32(&[1.0, 2.0], vec![2]).unwrap()];
        match tag {
            MessageType::ScriptCall => Command::ScriptCall {
                body: Bytes::from_static(b"call"),
                tensors,
            },
            MessageType::ScriptRemoteCall => Command::ScriptRemoteCall {
                body: Bytes::from_static(b"remote"),
                tensors,
            },
            MessageType::RrefFetch => Command::RrefFetch { rref_id: 7 },
            MessageType::RrefDelete => Command::RrefDelete { rref_id: 9 },
            MessageType::ForwardAutogradCall => Command::ForwardAutogradCall {
                context_id: 11,
                body: Bytes::from_static(b"wrapped call"),
                tensors,
            },
            MessageType::ScriptResult => Command::ScriptResult {
                body: Bytes::from_static(b"result"),
                tensors,
            },
            MessageType::RrefFetchResult => Command::RrefFetchResult {
                body: Bytes::from_static(b"value"),
                tensors,
            },
            MessageType::RrefAck => Command::RrefAck,
            MessageType::RemoteException => Command::RemoteException {
                message: "boom".to_string(),
            },
            MessageType::ForwardAutogradResponse => unreachable!("built via wrap_response"),
        }
    }

    #[test]
    fn test_request_totality() {
        for tag in ALL_MESSAGE_TYPES.into_iter().filter(|t| t.is_request()) {
            let message = sample_command(tag).into_message();
            let command = deserialize_request(&message).unwrap();
            assert_eq!(command.tag(), tag);
        }
    }

    #[test]
    fn test_response_totality() {
        let plain = ALL_MESSAGE_TYPES
            .into_iter()
            .filter(|t| t.is_response() && !t.is_wrapped_response());
        for tag in plain {
            let message = sample_command(tag).into_message();
            let (command, wrapped_tag) =
                deserialize_response(&message, &mut NoopHook).unwrap();
            assert_eq!(command.tag(), tag);
            assert_eq!(wrapped_tag, tag);
        }
    }

    #[test]
    fn test_request_tag_rejected_on_response_path() {
        let message = sample_command(MessageType::ScriptCall).into_message();
        let result = deserialize_response(&message, &mut NoopHook);
        assert!(matches!(result, Err(Error::UnexpectedType { .. })));
    }

    #[test]
    fn test_response_tag_rejected_on_request_path() {
        let message = sample_command(MessageType::ScriptResult).into_message();
        let result = deserialize_request(&message);
        assert!(matches!(result, Err(Error::UnexpectedType { .. })));
    }

    #[test]
    fn test_structured_bodies_roundtrip() {
        let message = sample_command(MessageType::RrefFetch).into_message();
        match deserialize_request(&message).unwrap() {
            Command::RrefFetch { rref_id } => assert_eq!(rref_id, 7),
            other => panic!("wrong variant: {other:?}"),
        }

        let message = sample_command(MessageType::ForwardAutogradCall).into_message();
        match deserialize_request(&message).unwrap() {
            Command::ForwardAutogradCall {
                context_id, body, ..
            } => {
                assert_eq!(context_id, 11);
                assert_eq!(body.as_ref(), b"wrapped call");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_rref_body_rejected() {
        let message =
            Message::new(MessageType::RrefFetch, vec![0u8; 4], vec![]);
        assert!(matches!(
            deserialize_request(&message),
            Err(Error::TruncatedBody { .. })
        ));
    }

    #[test]
    fn test_unexpected_tensors_rejected() {
        let tensors = vec![TensorView::from_f32(&[1.0], vec![1]).unwrap()];
        let message = Message::new(MessageType::RrefAck, vec![], tensors);
        assert!(matches!(
            deserialize_response(&message, &mut NoopHook),
            Err(Error::TensorCountMismatch { .. })
        ));
    }

    #[test]
    fn test_wrapped_response_unwraps_and_attaches() {
        let inner = sample_command(MessageType::ScriptResult).into_message();
        let wrapped = wrap_response(inner, b"autograd context");
        assert_eq!(wrapped.tag(), MessageType::ForwardAutogradResponse);

        let mut hook = RecordingHook::default();
        let (command, wrapped_tag) = deserialize_response(&wrapped, &mut hook).unwrap();

        assert_eq!(wrapped_tag, MessageType::ScriptResult);
        match command {
            Command::ScriptResult { body, tensors } => {
                assert_eq!(body.as_ref(), b"result");
                assert_eq!(tensors.len(), 1);
            }
            other => panic!("wrong variant: {other:?}"),
        }
        // Every tensor of the wrapped message got a backward attachment,
        // and the stripped context bytes reached the hook.
        assert_eq!(hook.attached, vec![8]);
        assert_eq!(hook.context, b"autograd context");
    }

    #[test]
    fn test_wrapped_matches_direct_decode() {
        let inner = sample_command(MessageType::RrefFetchResult).into_message();
        let (direct, _) = deserialize_response(&inner, &mut NoopHook).unwrap();

        let wrapped = wrap_response(inner, &[]);
        let (via_wrap, tag) = deserialize_response(&wrapped, &mut NoopHook).unwrap();

        assert_eq!(tag, MessageType::RrefFetchResult);
        match (direct, via_wrap) {
            (
                Command::RrefFetchResult { body: a, .. },
                Command::RrefFetchResult { body: b, .. },
            ) => assert_eq!(a, b),
            other => panic!("wrong variants: {other:?}"),
        }
    }

    #[test]
    fn test_wrap_within_wrap_rejected() {
        let inner = sample_command(MessageType::ScriptResult).into_message();
        let once = wrap_response(inner, b"ctx");
        let twice = wrap_response(once, b"ctx");

        let result = deserialize_response(&twice, &mut NoopHook);
        assert!(matches!(result, Err(Error::MalformedWrap { .. })));
    }

    #[test]
    fn test_unknown_inner_tag_rejected() {
        // Hand-build an envelope whose inner tag byte is unknown.
        let mut payload = b"ctx".to_vec();
        wrap::wrap(&mut payload, &[0x66, 1, 2, 3]);
        let message = Message::new(MessageType::ForwardAutogradResponse, payload, vec![]);

        let result = deserialize_response(&message, &mut NoopHook);
        assert!(matches!(result, Err(Error::UnrecognizedType { tag: 0x66 })));
    }

    #[test]
    fn test_empty_envelope_rejected() {
        let mut payload = b"ctx".to_vec();
        wrap::wrap(&mut payload, &[]);
        let message = Message::new(MessageType::ForwardAutogradResponse, payload, vec![]);

        let result = deserialize_response(&message, &mut NoopHook);
        assert!(matches!(result, Err(Error::MalformedWrap { .. })));
    }
}
