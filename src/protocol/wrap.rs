//! Nesting one message's payload inside another's.
//!
//! The inner bytes ride at the tail of the outer payload, followed by a
//! fixed-width length word, so the receiver strips the envelope by
//! reading backwards from the end. Whether an envelope is present at
//! all is decided by the message's type tag; this module never sniffs
//! payload bytes for one.

use super::{Error, Result, WRAP_LEN_SIZE};

/// Append `inner` to `outer` as a trailing length-prefixed envelope.
pub fn wrap(outer: &mut Vec<u8>, inner: &[u8]) {
    outer.reserve(inner.len() + WRAP_LEN_SIZE);
    outer.extend_from_slice(inner);
    outer.extend_from_slice(&(inner.len() as u64).to_be_bytes());
}

/// Strip the trailing envelope, returning (original, inner).
///
/// Only call this when the message tag says an envelope is present.
pub fn unwrap(payload: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    if payload.len() < WRAP_LEN_SIZE {
        return Err(Error::MalformedWrap {
            reason: "payload shorter than the envelope length field",
        });
    }

    let len_at = payload.len() - WRAP_LEN_SIZE;
    let declared = u64::from_be_bytes(
        payload[len_at..].try_into().expect("slice length checked"),
    );
    let inner_len = usize::try_from(declared)
        .ok()
        .filter(|&len| len <= len_at)
        .ok_or(Error::MalformedWrap {
            reason: "envelope length exceeds remaining payload bytes",
        })?;

    let inner_at = len_at - inner_len;
    Ok((payload[..inner_at].to_vec(), payload[inner_at..len_at].to_vec()))
}
