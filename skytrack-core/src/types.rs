//! Shared types, error enum, and decoded message types for skytrack-core.

use serde::Serialize;
use thiserror::Error;

use crate::beast::FramingError;

/// All errors produced by skytrack-core.
#[derive(Debug, Error)]
pub enum SkytrackError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SkytrackError>;

// ---------------------------------------------------------------------------
// ICAO address helpers
// ---------------------------------------------------------------------------

/// 3-byte ICAO address. Stored as raw bytes to avoid per-frame String allocation.
pub type Icao = [u8; 3];

/// Format ICAO address as 6-char uppercase hex string.
pub fn icao_to_string(icao: &Icao) -> String {
    format!("{:02X}{:02X}{:02X}", icao[0], icao[1], icao[2])
}

/// Parse a 6-char hex string into an ICAO address.
pub fn icao_from_hex(hex: &str) -> Option<Icao> {
    if hex.len() != 6 {
        return None;
    }
    let val = u32::from_str_radix(hex, 16).ok()?;
    Some(icao_from_u32(val))
}

/// Convert ICAO bytes to u32 for numeric comparisons.
pub fn icao_to_u32(icao: &Icao) -> u32 {
    ((icao[0] as u32) << 16) | ((icao[1] as u32) << 8) | (icao[2] as u32)
}

/// Build ICAO from a 24-bit integer.
pub fn icao_from_u32(val: u32) -> Icao {
    [
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ]
}

// ---------------------------------------------------------------------------
// ADS-B callsign character set
// ---------------------------------------------------------------------------

/// ICAO character set for callsign encoding (6 bits per character).
pub const CALLSIGN_CHARSET: &[u8; 64] =
    b"?ABCDEFGHIJKLMNOPQRSTUVWXYZ????? ???????????????0123456789??????";

// ---------------------------------------------------------------------------
// Decoded message types
// ---------------------------------------------------------------------------

/// A decoded DF17/18 extended squitter.
///
/// Header fields are always populated; `kind` carries the type-code-specific
/// payload. Consumed immediately by the track store, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMsg {
    /// Downlink Format (17 or 18)
    pub df: u8,
    /// Capability (DF17) or control field (DF18)
    pub ca: u8,
    /// 3-byte ICAO address, the track key
    pub icao: Icao,
    /// Signal level byte from the carrying frame
    pub signal_level: u8,
    /// Wall-clock arrival time, Unix seconds
    pub timestamp: f64,
    pub kind: MsgKind,
}

/// Type-code-specific payload of an extended squitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MsgKind {
    /// TC 1-4: aircraft identification (callsign).
    Identification { callsign: String, category: u8 },
    /// TC 5-8 (surface) or TC 9-18/20-22 (airborne): CPR-encoded position.
    Position {
        altitude_ft: Option<i32>,
        cpr_lat: u32,
        cpr_lon: u32,
        cpr_odd: bool,
        on_ground: bool,
        /// Ground-movement speed, surface frames only
        ground_speed_kt: Option<f64>,
        /// Ground track, surface frames only, gated by its status bit
        ground_track_deg: Option<f64>,
    },
    /// TC 19: airborne velocity.
    Velocity {
        speed_kt: Option<f64>,
        heading_deg: Option<f64>,
        vertical_rate_fpm: Option<i32>,
        speed_type: SpeedType,
    },
    /// Any other type code: header fields only, still refreshes the track.
    Other { type_code: u8 },
}

/// Speed type for velocity messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpeedType {
    Ground,
    IAS,
    TAS,
}

impl std::fmt::Display for SpeedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeedType::Ground => write!(f, "ground"),
            SpeedType::IAS => write!(f, "IAS"),
            SpeedType::TAS => write!(f, "TAS"),
        }
    }
}

impl DecodedMsg {
    /// True if this message carries a raw CPR position.
    pub fn has_position(&self) -> bool {
        matches!(self.kind, MsgKind::Position { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
