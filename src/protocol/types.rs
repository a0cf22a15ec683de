//! tenwire message type tags

use std::fmt;

/// Wire type tags for the closed command set.
///
/// The tag byte uniquely selects the command variant on decode; the set
/// must be extended in lockstep on the encode and decode sides. An
/// unknown byte is a decode error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageType {
    /// Run a script function remotely, await the result
    ScriptCall = 0x01,
    /// Run a script function remotely, result stays as a remote reference
    ScriptRemoteCall = 0x02,
    /// Fetch the value behind a remote reference
    RrefFetch = 0x03,
    /// Drop a remote reference
    RrefDelete = 0x04,
    /// Request carrying autograd context around an inner call
    ForwardAutogradCall = 0x05,

    /// Result of a script call
    ScriptResult = 0x10,
    /// Value fetched from a remote reference
    RrefFetchResult = 0x11,
    /// Acknowledgment of a remote-reference operation
    RrefAck = 0x12,
    /// Response wrapping an inner response plus autograd linkage
    ForwardAutogradResponse = 0x13,

    /// Remote raised an exception
    RemoteException = 0xF1,
}

impl MessageType {
    /// Convert from the wire tag byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ScriptCall),
            0x02 => Some(Self::ScriptRemoteCall),
            0x03 => Some(Self::RrefFetch),
            0x04 => Some(Self::RrefDelete),
            0x05 => Some(Self::ForwardAutogradCall),
            0x10 => Some(Self::ScriptResult),
            0x11 => Some(Self::RrefFetchResult),
            0x12 => Some(Self::RrefAck),
            0x13 => Some(Self::ForwardAutogradResponse),
            0xF1 => Some(Self::RemoteException),
            _ => None,
        }
    }

    /// Convert to the wire tag byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this tag names a request variant.
    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            Self::ScriptCall
                | Self::ScriptRemoteCall
                | Self::RrefFetch
                | Self::RrefDelete
                | Self::ForwardAutogradCall
        )
    }

    /// Check if this tag names a response variant.
    #[must_use]
    pub const fn is_response(self) -> bool {
        !self.is_request()
    }

    /// Check if this tag carries a wrapped inner response.
    #[must_use]
    pub const fn is_wrapped_response(self) -> bool {
        matches!(self, Self::ForwardAutogradResponse)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScriptCall => "ScriptCall",
            Self::ScriptRemoteCall => "ScriptRemoteCall",
            Self::RrefFetch => "RrefFetch",
            Self::RrefDelete => "RrefDelete",
            Self::ForwardAutogradCall => "ForwardAutogradCall",
            Self::ScriptResult => "ScriptResult",
            Self::RrefFetchResult => "RrefFetchResult",
            Self::RrefAck => "RrefAck",
            Self::ForwardAutogradResponse => "ForwardAutogradResponse",
            Self::RemoteException => "RemoteException",
        };
        write!(f, "{name}")
    }
}

/// Every tag in the closed set, for exhaustive tests.
pub const ALL_MESSAGE_TYPES: [MessageType; 10] = [
    MessageType::ScriptCall,
    MessageType::ScriptRemoteCall,
    MessageType::RrefFetch,
    MessageType::RrefDelete,
    MessageType::ForwardAutogradCall,
    MessageType::ScriptResult,
    MessageType::RrefFetchResult,
    MessageType::RrefAck,
    MessageType::ForwardAutogradResponse,
    MessageType::RemoteException,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for msg_type in ALL_MESSAGE_TYPES {
            let byte = msg_type.as_u8();
            assert_eq!(MessageType::from_u8(byte), Some(msg_type));
        }
    }

    #[test]
    fn test_unknown_tags_rejected() {
        assert_eq!(MessageType::from_u8(0x00), None);
        assert_eq!(MessageType::from_u8(0x42), None);
        assert_eq!(MessageType::from_u8(0xFF), None);
    }

    #[test]
    fn test_request_response_partition() {
        for msg_type in ALL_MESSAGE_TYPES {
            assert_ne!(msg_type.is_request(), msg_type.is_response());
        }
        assert!(MessageType::ScriptCall.is_request());
        assert!(MessageType::ScriptResult.is_response());
        assert!(MessageType::RemoteException.is_response());
        assert!(MessageType::ForwardAutogradResponse.is_wrapped_response());
        assert!(!MessageType::ScriptResult.is_wrapped_response());
    }
}
