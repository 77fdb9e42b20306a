//! skytrack-core: Pure decode + tracking library for Mode S / ADS-B.
//!
//! No async, no I/O — just algorithms. This crate is the shared core behind
//! the `skytrack` CLI: Beast stream framing, extended squitter decoding,
//! CPR position resolution, and the concurrent aircraft track store.

pub mod beast;
pub mod config;
pub mod cpr;
pub mod decode;
pub mod store;
pub mod types;

// Re-export commonly used types at crate root
pub use beast::{Frame, FrameDecoder, FrameKind, FramingError};
pub use decode::decode;
pub use store::{AircraftTrack, SweepStats, TrackStore};
pub use types::*;
