//! Wire format for operation frames.
//!
//! Frames are `[length:4 LE][payload]` where the payload is the
//! codec-encoded [`Operation`] envelope. The length prefix covers the
//! payload only. Oversized frames and undecodable payloads are wire
//! errors; the session tears the connection down on them rather than
//! attempting to resynchronize mid-stream.

use liveline_core::{CodecError, MessageCodec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Size of the frame header (payload length prefix).
pub const HEADER_SIZE: usize = 4;

/// Maximum payload size accepted on either side of the connection.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Well-known operation names issued by the manager itself.
pub(crate) mod ops {
    /// Join the subject's room.
    pub const JOIN_ROOM: &str = "joinRoom";
    /// Register the subject's presence and contact address.
    pub const REGISTER_PRESENCE: &str = "registerPresence";
    /// Register the subject for notification delivery.
    pub const REGISTER_FOR_NOTIFICATIONS: &str = "registerForNotifications";
    /// Present a bearer token; first frame on a fresh connection.
    pub const AUTHENTICATE: &str = "authenticate";
}

/// A named operation with positional arguments.
///
/// This is the unit queued while disconnected, replayed on reconnect, and
/// framed onto the wire. Payload schemas are the caller's business; the
/// manager only inspects `joinRoom` operations for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation name, e.g. `"sendMessage"`.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl Operation {
    /// Create an operation with the given name and arguments.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Join the subject's room.
    pub fn join_room(subject_id: &str) -> Self {
        Self::new(ops::JOIN_ROOM, vec![Value::from(subject_id)])
    }

    /// Register presence with a contact address.
    pub fn register_presence(subject_id: &str, contact: &str) -> Self {
        Self::new(
            ops::REGISTER_PRESENCE,
            vec![Value::from(subject_id), Value::from(contact)],
        )
    }

    /// Register for notification delivery.
    pub fn register_for_notifications(subject_id: &str) -> Self {
        Self::new(ops::REGISTER_FOR_NOTIFICATIONS, vec![Value::from(subject_id)])
    }

    /// Present a bearer token.
    pub fn authenticate(token: &str) -> Self {
        Self::new(ops::AUTHENTICATE, vec![Value::from(token)])
    }

    /// Whether this is a join operation (subject to queue deduplication).
    pub fn is_join(&self) -> bool {
        self.name == ops::JOIN_ROOM
    }

    /// The subject id of a join operation, if this is one.
    pub fn join_subject(&self) -> Option<&str> {
        if !self.is_join() {
            return None;
        }
        self.args.first().and_then(Value::as_str)
    }
}

/// Errors in frame encoding or decoding.
#[derive(Debug, Error)]
pub enum WireError {
    /// Payload exceeds [`MAX_FRAME_SIZE`].
    #[error("frame payload of {size} bytes exceeds the {MAX_FRAME_SIZE} byte limit")]
    FrameTooLarge {
        /// Size of the offending payload.
        size: usize,
    },

    /// Payload could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Encode an operation into a length-prefixed frame.
///
/// # Errors
///
/// Returns [`WireError::FrameTooLarge`] for oversized payloads and
/// [`WireError::Codec`] if encoding fails.
pub fn encode_frame<C: MessageCodec>(codec: &C, op: &Operation) -> Result<Vec<u8>, WireError> {
    let payload = codec.encode(op)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: payload.len(),
        });
    }
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Try to decode one frame from the front of a read buffer.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame,
/// and `Ok(Some((operation, consumed)))` once it does; `consumed` bytes
/// should then be drained from the buffer.
///
/// # Errors
///
/// Returns [`WireError::FrameTooLarge`] if the header announces an
/// oversized payload and [`WireError::Codec`] if the payload does not
/// decode; both mean the stream is unusable.
pub fn try_decode_frame<C: MessageCodec>(
    codec: &C,
    buf: &[u8],
) -> Result<Option<(Operation, usize)>, WireError> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }
    let mut len_bytes = [0u8; HEADER_SIZE];
    len_bytes.copy_from_slice(&buf[..HEADER_SIZE]);
    let payload_len = u32::from_le_bytes(len_bytes) as usize;
    if payload_len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge { size: payload_len });
    }
    if buf.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }
    let op = codec.decode(&buf[HEADER_SIZE..HEADER_SIZE + payload_len])?;
    Ok(Some((op, HEADER_SIZE + payload_len)))
}
