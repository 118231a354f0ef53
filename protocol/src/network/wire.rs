//! # Wire Codec
//!
//! Bit-exact framing for every byte that crosses a P2P socket. A frame is
//! `[8-byte header][optional 32-byte SHA-256 hash for BROADCAST][body]`, with
//! the header laid out big-endian as `version(1) | start_byte(1) |
//! body_length(4) | reserved(2)`.

use crate::config::{
    BROADCAST_HASH_LENGTH, START_BYTE_BROADCAST, START_BYTE_GOSSIP, START_BYTE_NORMAL,
    WIRE_HEADER_LENGTH, WIRE_HEADER_VERSION,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors classifying a malformed inbound frame. Every variant here is a
/// protocol violation: the caller must blacklist the sender strictly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),
    #[error("unknown start byte: 0x{0:02x}")]
    UnknownStartByte(u8),
    #[error("body length {actual} exceeds maximum {max}")]
    BodyTooLarge { actual: u32, max: u32 },
    #[error("broadcast hash does not match body")]
    HashMismatch,
}

/// A single reassembled start byte, distinguishing the three message classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartByte {
    Normal,
    Broadcast,
    Gossip,
}

impl StartByte {
    pub fn to_byte(self) -> u8 {
        match self {
            StartByte::Normal => START_BYTE_NORMAL,
            StartByte::Broadcast => START_BYTE_BROADCAST,
            StartByte::Gossip => START_BYTE_GOSSIP,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            _ if b == START_BYTE_NORMAL => Some(StartByte::Normal),
            _ if b == START_BYTE_BROADCAST => Some(StartByte::Broadcast),
            _ if b == START_BYTE_GOSSIP => Some(StartByte::Gossip),
            _ => None,
        }
    }
}

/// A fully reassembled inbound frame.
///
/// `trace_info` is never carried on the wire itself (the header has no room
/// for it) — it exists so a caller that wants to correlate an inbound frame
/// with a distributed trace has a place to stash the correlation id it
/// derives locally (e.g. from connection metadata), the inbound mirror of
/// `frame`'s `inject_trace` parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub start_byte: StartByte,
    pub message: Bytes,
    pub broadcast_hash: Option<[u8; BROADCAST_HASH_LENGTH]>,
    pub trace_info: Option<String>,
}

/// Outcome of attempting to parse a buffer as a frame.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A full frame was parsed; `consumed` bytes should be dropped from the
    /// front of the caller's buffer.
    Success { frame: RawFrame, consumed: usize },
    /// Not enough bytes buffered yet; the caller should read more.
    NeedMore,
    /// The header or body violates the protocol.
    Malformed(WireError),
}

/// Frames `body` into header+body bytes (plus the hash segment for
/// `BROADCAST`). `max_message_size` bounds the caller's own message, not the
/// peer's — enforced here as a guard against accidentally emitting frames no
/// peer would accept. `inject_trace` carries a distributed-tracing
/// correlation id for the caller's own logging; the header has no field for
/// it, so it never reaches the produced bytes.
pub fn frame(
    body: &[u8],
    start_byte: StartByte,
    max_message_size: u32,
    inject_trace: Option<&str>,
) -> Result<Bytes, WireError> {
    if let Some(trace) = inject_trace {
        tracing::trace!(trace_id = trace, "framing outbound message");
    }

    let body_len = u32::try_from(body.len()).unwrap_or(u32::MAX);
    if body_len > max_message_size {
        return Err(WireError::BodyTooLarge {
            actual: body_len,
            max: max_message_size,
        });
    }

    let hash_len = if start_byte == StartByte::Broadcast {
        BROADCAST_HASH_LENGTH
    } else {
        0
    };

    let mut out = BytesMut::with_capacity(WIRE_HEADER_LENGTH + hash_len + body.len());
    out.put_u8(WIRE_HEADER_VERSION);
    out.put_u8(start_byte.to_byte());
    out.put_u32(body_len);
    out.put_u16(0); // reserved

    if start_byte == StartByte::Broadcast {
        let hash = Sha256::digest(body);
        out.put_slice(&hash);
    }

    out.put_slice(body);
    Ok(out.freeze())
}

/// Attempts to parse one frame from the front of `buf`. Never panics on
/// truncated or malformed input; see [`ReadOutcome`].
pub fn try_read(buf: &[u8], max_message_size: u32) -> ReadOutcome {
    if buf.len() < WIRE_HEADER_LENGTH {
        return ReadOutcome::NeedMore;
    }

    let mut header = &buf[..WIRE_HEADER_LENGTH];
    let version = header.get_u8();
    if version != WIRE_HEADER_VERSION {
        return ReadOutcome::Malformed(WireError::UnsupportedVersion(version));
    }

    let start_byte_raw = header.get_u8();
    let Some(start_byte) = StartByte::from_byte(start_byte_raw) else {
        return ReadOutcome::Malformed(WireError::UnknownStartByte(start_byte_raw));
    };

    let body_length = header.get_u32();
    if body_length > max_message_size {
        return ReadOutcome::Malformed(WireError::BodyTooLarge {
            actual: body_length,
            max: max_message_size,
        });
    }
    let _reserved = header.get_u16();

    let hash_len = if start_byte == StartByte::Broadcast {
        BROADCAST_HASH_LENGTH
    } else {
        0
    };

    let total_len = WIRE_HEADER_LENGTH + hash_len + body_length as usize;
    if buf.len() < total_len {
        return ReadOutcome::NeedMore;
    }

    let mut cursor = WIRE_HEADER_LENGTH;
    let broadcast_hash = if start_byte == StartByte::Broadcast {
        let mut hash = [0u8; BROADCAST_HASH_LENGTH];
        hash.copy_from_slice(&buf[cursor..cursor + BROADCAST_HASH_LENGTH]);
        cursor += BROADCAST_HASH_LENGTH;

        let body = &buf[cursor..cursor + body_length as usize];
        let computed = Sha256::digest(body);
        if computed.as_slice() != hash {
            return ReadOutcome::Malformed(WireError::HashMismatch);
        }
        Some(hash)
    } else {
        None
    };

    let body = Bytes::copy_from_slice(&buf[cursor..cursor + body_length as usize]);

    ReadOutcome::Success {
        frame: RawFrame {
            start_byte,
            message: body,
            broadcast_hash,
            trace_info: None,
        },
        consumed: total_len,
    }
}
