//! Beast binary framing — extract discrete Mode S frames from a byte stream.
//!
//! Each frame on the wire is:
//! - 0x1A escape byte
//! - one kind byte ('1' Mode A/C, '2' short Mode S, '3' long Mode S)
//! - 6-byte big-endian timestamp
//! - 1 signal level byte
//! - payload (2, 7, or 14 bytes depending on kind)
//!
//! Timestamp, signal level, and payload are byte-stuffed: a literal 0x1A is
//! doubled on the wire and collapsed back to a single byte on decode. The
//! decoder is incremental — feed it whatever the socket hands you, frames
//! fall out as they complete.

use serde::Serialize;
use thiserror::Error;

/// Frame delimiter / stuffing byte.
pub const ESCAPE: u8 = 0x1A;

/// Stream-level framing failures. Fatal to the connection.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream ended mid-frame, {0} more bytes expected")]
    TruncatedFrame(usize),
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Beast frame kind. Fixes the payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameKind {
    /// '1': Mode A/C, 2-byte payload
    ModeAc,
    /// '2': short Mode S, 7-byte payload
    ModeSShort,
    /// '3': long Mode S, 14-byte payload
    ModeSLong,
}

impl FrameKind {
    fn from_byte(b: u8) -> Option<FrameKind> {
        match b {
            b'1' => Some(FrameKind::ModeAc),
            b'2' => Some(FrameKind::ModeSShort),
            b'3' => Some(FrameKind::ModeSLong),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            FrameKind::ModeAc => b'1',
            FrameKind::ModeSShort => b'2',
            FrameKind::ModeSLong => b'3',
        }
    }

    /// Payload length in bytes for this kind.
    pub fn payload_len(self) -> usize {
        match self {
            FrameKind::ModeAc => 2,
            FrameKind::ModeSShort => 7,
            FrameKind::ModeSLong => 14,
        }
    }
}

/// One de-stuffed frame. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// 48-bit stream timestamp, big-endian on the wire
    pub timestamp: u64,
    pub signal_level: u8,
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

enum State {
    /// Hunting for an escape byte at a frame boundary.
    Sync,
    /// Escape seen, next byte selects the frame kind.
    Kind,
    /// Accumulating the stuffed body (timestamp + signal + payload).
    Body {
        kind: FrameKind,
        buf: Vec<u8>,
        escaped: bool,
    },
}

/// Incremental Beast frame decoder.
///
/// Carries its position across `feed` calls, so a frame may arrive split
/// over any number of reads and the escape byte may sit at any offset.
pub struct FrameDecoder {
    state: State,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder { state: State::Sync }
    }

    /// Consume a chunk of stream bytes, appending completed frames to `out`.
    ///
    /// Bytes before the first escape, and frames with an unknown kind byte,
    /// are skipped silently — the decoder resyncs on the next escape.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<Frame>) {
        for &b in bytes {
            if let Some(frame) = self.push(b) {
                out.push(frame);
            }
        }
    }

    /// Check for a clean stream end. Call once after EOF.
    pub fn finish(&self) -> std::result::Result<(), FramingError> {
        match &self.state {
            State::Sync => Ok(()),
            State::Kind => Err(FramingError::TruncatedFrame(1)),
            State::Body { kind, buf, .. } => {
                Err(FramingError::TruncatedFrame(body_len(*kind) - buf.len()))
            }
        }
    }

    fn push(&mut self, b: u8) -> Option<Frame> {
        let state = std::mem::replace(&mut self.state, State::Sync);
        let (next, frame) = step(state, b);
        self.state = next;
        frame
    }
}

/// Advance the state machine by one stream byte.
fn step(state: State, b: u8) -> (State, Option<Frame>) {
    match state {
        State::Sync => {
            if b == ESCAPE {
                (State::Kind, None)
            } else {
                (State::Sync, None)
            }
        }
        State::Kind => (kind_state(b), None),
        State::Body {
            kind,
            mut buf,
            escaped,
        } => {
            if escaped {
                if b != ESCAPE {
                    // Lone escape mid-body: a new frame header has started.
                    // Drop the partial frame; this byte is the kind byte of
                    // the next frame.
                    return (kind_state(b), None);
                }
                // Doubled escape collapses to a literal 0x1A.
                buf.push(ESCAPE);
            } else if b == ESCAPE {
                return (
                    State::Body {
                        kind,
                        buf,
                        escaped: true,
                    },
                    None,
                );
            } else {
                buf.push(b);
            }

            if buf.len() == body_len(kind) {
                (State::Sync, Some(assemble(kind, &buf)))
            } else {
                (
                    State::Body {
                        kind,
                        buf,
                        escaped: false,
                    },
                    None,
                )
            }
        }
    }
}

/// State after a kind byte is expected and `b` arrives.
///
/// ESCAPE ESCAPE at a header position means we are still expecting a kind
/// byte; anything unrecognized means we lost sync and hunt for the next
/// escape.
fn kind_state(b: u8) -> State {
    match FrameKind::from_byte(b) {
        Some(kind) => State::Body {
            kind,
            buf: Vec::with_capacity(body_len(kind)),
            escaped: false,
        },
        None if b == ESCAPE => State::Kind,
        None => State::Sync,
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        FrameDecoder::new()
    }
}

/// De-stuffed body length: 6-byte timestamp + signal + payload.
fn body_len(kind: FrameKind) -> usize {
    6 + 1 + kind.payload_len()
}

fn assemble(kind: FrameKind, buf: &[u8]) -> Frame {
    let mut timestamp = 0u64;
    for &b in &buf[..6] {
        timestamp = (timestamp << 8) | b as u64;
    }
    Frame {
        kind,
        timestamp,
        signal_level: buf[6],
        payload: buf[7..].to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encode a frame in Beast wire format, stuffing escape bytes.
///
/// Only the low 48 bits of the timestamp are carried.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + (7 + frame.payload.len()) * 2);
    buf.push(ESCAPE);
    buf.push(frame.kind.to_byte());

    for i in (0..6).rev() {
        push_stuffed(&mut buf, ((frame.timestamp >> (8 * i)) & 0xFF) as u8);
    }
    push_stuffed(&mut buf, frame.signal_level);
    for &b in &frame.payload {
        push_stuffed(&mut buf, b);
    }

    buf
}

fn push_stuffed(buf: &mut Vec<u8>, b: u8) {
    buf.push(b);
    if b == ESCAPE {
        buf.push(b);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
