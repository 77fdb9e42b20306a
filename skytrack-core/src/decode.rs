//! Decode long Mode S frames into typed aircraft messages.
//!
//! Only DF17/18 extended squitters are interpreted. Type codes:
//! - TC 1-4:   Aircraft identification (callsign)
//! - TC 5-8:   Surface position (CPR lat/lon + ground movement/track)
//! - TC 9-18:  Airborne position, barometric altitude
//! - TC 19:    Airborne velocity (ground speed or airspeed + heading)
//! - TC 20-22: Airborne position, GNSS altitude
//!
//! Everything else — other downlink formats, other type codes — is a
//! filtering outcome, not an error. CRC is not validated; the input is
//! assumed well-formed.

use crate::beast::{Frame, FrameKind};
use crate::types::*;

/// Decode a frame into a typed message.
///
/// `arrival` is the wall-clock reception time in Unix seconds; it drives
/// CPR pairing and staleness downstream, not the 12 MHz stream timestamp.
/// Returns `None` for non-long frames and unsupported downlink formats.
pub fn decode(frame: &Frame, arrival: f64) -> Option<DecodedMsg> {
    if frame.kind != FrameKind::ModeSLong {
        return None;
    }
    let data = frame.payload.as_slice();
    if data.len() < 4 {
        return None;
    }

    let df = data[0] >> 3;
    if df != 17 && df != 18 {
        return None;
    }
    let ca = data[0] & 0x07;
    let icao: Icao = [data[1], data[2], data[3]];

    // A truncated extended-squitter body still yields ICAO + DF.
    let kind = if data.len() >= 5 {
        decode_extended_squitter(data)
    } else {
        MsgKind::Other { type_code: 0 }
    };

    Some(DecodedMsg {
        df,
        ca,
        icao,
        signal_level: frame.signal_level,
        timestamp: arrival,
        kind,
    })
}

fn decode_extended_squitter(data: &[u8]) -> MsgKind {
    let tc = data[4] >> 3;
    match tc {
        1..=4 => decode_identification(data),
        5..=8 => decode_surface_position(data),
        9..=18 | 20..=22 => decode_airborne_position(data),
        19 => decode_velocity(data),
        _ => Some(MsgKind::Other { type_code: tc }),
    }
    .unwrap_or(MsgKind::Other { type_code: tc })
}

// ---------------------------------------------------------------------------
// TC 1-4: identification
// ---------------------------------------------------------------------------

fn decode_identification(data: &[u8]) -> Option<MsgKind> {
    if data.len() < 11 {
        return None;
    }
    let category = data[4] & 0x07;
    let callsign = decode_callsign(&data[5..11]);
    Some(MsgKind::Identification { callsign, category })
}

/// Decode 8 six-bit callsign characters packed into 48 bits.
/// Trailing spaces are trimmed.
pub fn decode_callsign(data: &[u8]) -> String {
    if data.len() < 6 {
        return String::new();
    }

    let mut bits = 0u64;
    for &b in &data[..6] {
        bits = (bits << 8) | b as u64;
    }

    let mut callsign = String::with_capacity(8);
    for i in 0..8 {
        let idx = ((bits >> (42 - i * 6)) & 0x3F) as usize;
        callsign.push(CALLSIGN_CHARSET[idx] as char);
    }

    callsign.trim_end_matches(' ').to_string()
}

// ---------------------------------------------------------------------------
// TC 5-8 / 9-18 / 20-22: position
// ---------------------------------------------------------------------------

/// Raw 17-bit CPR lat/lon spanning bytes 6-10, odd/even flag in byte 6.
fn extract_cpr(data: &[u8]) -> (u32, u32, bool) {
    let cpr_lat = (((data[6] as u32) & 0x03) << 15) | ((data[7] as u32) << 7) | ((data[8] as u32) >> 1);
    let cpr_lon = (((data[8] as u32) & 0x01) << 16) | ((data[9] as u32) << 8) | (data[10] as u32);
    let cpr_odd = (data[6] & 0x04) != 0;
    (cpr_lat, cpr_lon, cpr_odd)
}

fn decode_airborne_position(data: &[u8]) -> Option<MsgKind> {
    if data.len() < 11 {
        return None;
    }

    let ac12 = ((data[5] as u32) << 4) | ((data[6] as u32) >> 4);
    let altitude_ft = decode_altitude_12bit(ac12);
    let (cpr_lat, cpr_lon, cpr_odd) = extract_cpr(data);

    Some(MsgKind::Position {
        altitude_ft,
        cpr_lat,
        cpr_lon,
        cpr_odd,
        on_ground: false,
        ground_speed_kt: None,
        ground_track_deg: None,
    })
}

fn decode_surface_position(data: &[u8]) -> Option<MsgKind> {
    if data.len() < 11 {
        return None;
    }

    let movement = ((data[4] & 0x07) << 4) | (data[5] >> 4);
    let ground_speed_kt = decode_ground_movement(movement);

    // 7-bit ground track, valid only when its status bit is set
    let ground_track_deg = if data[5] & 0x08 != 0 {
        let trk = (((data[5] as u32) & 0x07) << 4) | ((data[6] as u32) >> 4);
        Some(trk as f64 * 360.0 / 128.0)
    } else {
        None
    };

    let (cpr_lat, cpr_lon, cpr_odd) = extract_cpr(data);

    Some(MsgKind::Position {
        altitude_ft: None,
        cpr_lat,
        cpr_lon,
        cpr_odd,
        on_ground: true,
        ground_speed_kt,
        ground_track_deg,
    })
}

/// Decode the 7-bit surface movement code onto its quantized speed scale.
///
/// 0 and 125-127 are invalid/reserved; 1 is "stopped"; 124 is 175 kt.
pub fn decode_ground_movement(code: u8) -> Option<f64> {
    let c = code as f64;
    match code {
        1 => Some(0.0),
        2..=8 => Some(0.125 + (c - 2.0) * 0.125),
        9..=12 => Some(1.0 + (c - 9.0) * 0.25),
        13..=38 => Some(2.0 + (c - 13.0) * 0.5),
        39..=93 => Some(15.0 + (c - 39.0)),
        94..=108 => Some(70.0 + (c - 94.0) * 2.0),
        109..=123 => Some(100.0 + (c - 109.0) * 5.0),
        124 => Some(175.0),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Altitude
// ---------------------------------------------------------------------------

/// Decode the 12-bit altitude field from an airborne position message.
///
/// Q-bit set: 25-ft resolution, `n * 25 - 1000` feet.
/// Q-bit clear: Gillham-coded; not decoded here, reported as unavailable.
pub fn decode_altitude_12bit(ac12: u32) -> Option<i32> {
    if ac12 == 0 {
        return None;
    }

    if ac12 & 0x10 != 0 {
        // Remove the Q-bit to get the 11-bit code
        let n = ((ac12 & 0x0FE0) >> 1) | (ac12 & 0x000F);
        Some(n as i32 * 25 - 1000)
    } else {
        None
    }
}

/// Decode the 13-bit altitude field used by surveillance replies.
///
/// Same Q-bit rule as the 12-bit variant, with the meters bit (M) removed;
/// metric and Gillham encodings are reported as unavailable.
pub fn decode_altitude_13bit(ac13: u32) -> Option<i32> {
    if ac13 == 0 {
        return None;
    }

    let m_bit = (ac13 >> 6) & 1;
    let q_bit = (ac13 >> 4) & 1;
    if m_bit == 1 || q_bit == 0 {
        return None;
    }

    let n = ((ac13 & 0x1F80) >> 2) | ((ac13 & 0x0020) >> 1) | (ac13 & 0x000F);
    Some(n as i32 * 25 - 1000)
}

// ---------------------------------------------------------------------------
// TC 19: velocity
// ---------------------------------------------------------------------------

fn decode_velocity(data: &[u8]) -> Option<MsgKind> {
    if data.len() < 10 {
        return None;
    }

    let subtype = data[4] & 0x07;
    match subtype {
        1 | 2 => Some(decode_ground_velocity(data, subtype == 2)),
        3 | 4 => Some(decode_airspeed(data, subtype == 4)),
        _ => None,
    }
}

fn decode_ground_velocity(data: &[u8], supersonic: bool) -> MsgKind {
    let ew_sign = data[5] & 0x04 != 0;
    let ew_raw = (((data[5] as i32) & 0x03) << 8) | data[6] as i32;
    let ns_sign = data[7] & 0x80 != 0;
    let ns_raw = (((data[7] as i32) & 0x7F) << 3) | ((data[8] as i32) >> 5);

    // Zero magnitude means "not available"
    let (speed_kt, heading_deg) = if ew_raw > 0 && ns_raw > 0 {
        let scale = if supersonic { 4.0 } else { 1.0 };
        let vx = (ew_raw - 1) as f64 * scale * if ew_sign { -1.0 } else { 1.0 };
        let vy = (ns_raw - 1) as f64 * scale * if ns_sign { -1.0 } else { 1.0 };
        let speed = (vx * vx + vy * vy).sqrt();
        let heading = vx.atan2(vy).to_degrees().rem_euclid(360.0);
        (Some(round2(speed)), Some(round2(heading)))
    } else {
        (None, None)
    };

    MsgKind::Velocity {
        speed_kt,
        heading_deg,
        vertical_rate_fpm: decode_vertical_rate(data),
        speed_type: SpeedType::Ground,
    }
}

fn decode_airspeed(data: &[u8], supersonic: bool) -> MsgKind {
    let heading_deg = if data[5] & 0x04 != 0 {
        let hdg_raw = (((data[5] as u32) & 0x03) << 8) | data[6] as u32;
        Some(round2(hdg_raw as f64 * 360.0 / 1024.0))
    } else {
        None
    };

    let speed_raw = (((data[7] as i32) & 0x7F) << 3) | ((data[8] as i32) >> 5);
    let speed_kt = if speed_raw > 0 {
        let scale = if supersonic { 4.0 } else { 1.0 };
        Some((speed_raw - 1) as f64 * scale)
    } else {
        None
    };

    MsgKind::Velocity {
        speed_kt,
        heading_deg,
        vertical_rate_fpm: decode_vertical_rate(data),
        speed_type: if data[7] & 0x80 != 0 {
            SpeedType::TAS
        } else {
            SpeedType::IAS
        },
    }
}

/// 9-bit vertical rate shared by all velocity subtypes.
/// Magnitude-1 scaled by 64 ft/min; zero magnitude is "not available."
fn decode_vertical_rate(data: &[u8]) -> Option<i32> {
    let down = data[8] & 0x08 != 0;
    let raw = (((data[8] as i32) & 0x07) << 6) | ((data[9] as i32) >> 2);
    if raw == 0 {
        return None;
    }
    let rate = (raw - 1) * 64;
    Some(if down { -rate } else { rate })
}

/// Round to 2 decimal places.
fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beast::FrameKind;

    fn hex_frame(hex: &str) -> Frame {
        let payload: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect();
        assert_eq!(payload.len(), 14);
        Frame {
            kind: FrameKind::ModeSLong,
            timestamp: 0,
            signal_level: 0xC8,
            payload,
        }
    }

    // -- Identification --

    #[test]
    fn test_decode_identification_klm() {
        let msg = decode(&hex_frame("8D4840D6202CC371C32CE0576098"), 1.0).unwrap();
        assert_eq!(msg.df, 17);
        assert_eq!(icao_to_string(&msg.icao), "4840D6");
        match msg.kind {
            MsgKind::Identification { callsign, .. } => assert_eq!(callsign, "KLM1023"),
            other => panic!("expected identification, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_identification_ezy() {
        let msg = decode(&hex_frame("8D406B902015A678D4D220AA4BDA"), 1.0).unwrap();
        match msg.kind {
            MsgKind::Identification { callsign, .. } => assert_eq!(callsign, "EZY85MH"),
            other => panic!("expected identification, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_callsign_trims_trailing_spaces() {
        // "KLM1023 " on the wire; the trailing space must be trimmed
        let data = [0x2C, 0xC3, 0x71, 0xC3, 0x2C, 0xE0];
        assert_eq!(decode_callsign(&data), "KLM1023");
    }

    // -- Position --

    #[test]
    fn test_decode_position_even() {
        let msg = decode(&hex_frame("8D40621D58C382D690C8AC2863A7"), 1.0).unwrap();
        assert_eq!(icao_to_string(&msg.icao), "40621D");
        match msg.kind {
            MsgKind::Position {
                altitude_ft,
                cpr_lat,
                cpr_lon,
                cpr_odd,
                on_ground,
                ..
            } => {
                assert_eq!(altitude_ft, Some(38000));
                assert!(!cpr_odd);
                assert_eq!(cpr_lat, 93000);
                assert_eq!(cpr_lon, 51372);
                assert!(!on_ground);
            }
            other => panic!("expected position, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_position_odd() {
        let msg = decode(&hex_frame("8D40621D58C386435CC412692AD6"), 2.0).unwrap();
        match msg.kind {
            MsgKind::Position {
                altitude_ft,
                cpr_lat,
                cpr_lon,
                cpr_odd,
                ..
            } => {
                assert_eq!(altitude_ft, Some(38000));
                assert!(cpr_odd);
                assert_eq!(cpr_lat, 74158);
                assert_eq!(cpr_lon, 50194);
            }
            other => panic!("expected position, got {other:?}"),
        }
    }

    // -- Velocity --

    #[test]
    fn test_decode_velocity_ground() {
        let msg = decode(&hex_frame("8D485020994409940838175B284F"), 1.0).unwrap();
        assert_eq!(icao_to_string(&msg.icao), "485020");
        match msg.kind {
            MsgKind::Velocity {
                speed_kt,
                heading_deg,
                vertical_rate_fpm,
                speed_type,
            } => {
                let speed = speed_kt.unwrap();
                assert!((speed - 159.0).abs() < 1.0, "speed ~159, got {speed}");
                let heading = heading_deg.unwrap();
                assert!(
                    (heading - 182.88).abs() < 0.1,
                    "heading ~182.88, got {heading}"
                );
                assert_eq!(vertical_rate_fpm, Some(-832));
                assert_eq!(speed_type, SpeedType::Ground);
            }
            other => panic!("expected velocity, got {other:?}"),
        }
    }

    // -- Altitude --

    #[test]
    fn test_altitude_q_bit_n100() {
        // Q-bit set, n = 100: (100 * 25) - 1000 = 1500 ft
        let ac12 = ((100 >> 4) << 5) | 0x10 | (100 & 0x0F);
        assert_eq!(decode_altitude_12bit(ac12), Some(1500));
    }

    #[test]
    fn test_altitude_38000() {
        assert_eq!(decode_altitude_12bit(0xC38), Some(38000));
    }

    #[test]
    fn test_altitude_zero_unavailable() {
        assert_eq!(decode_altitude_12bit(0), None);
    }

    #[test]
    fn test_altitude_gillham_unavailable() {
        // Q-bit clear: Gillham-coded, reported as unavailable
        assert_eq!(decode_altitude_12bit(0x800), None);
    }

    #[test]
    fn test_altitude_13bit() {
        assert_eq!(decode_altitude_13bit(0), None);
        // M-bit set: metric, unavailable
        assert_eq!(decode_altitude_13bit(0x40 | 0x10), None);
        // Q-bit set, M clear: n = 100 -> 1500 ft
        let n = 100u32;
        let ac13 = ((n & 0x7E0) << 2) | ((n & 0x10) << 1) | 0x10 | (n & 0x0F);
        assert_eq!(decode_altitude_13bit(ac13), Some(1500));
    }

    // -- Surface --

    #[test]
    fn test_ground_movement_scale() {
        assert_eq!(decode_ground_movement(0), None);
        assert_eq!(decode_ground_movement(1), Some(0.0));
        assert_eq!(decode_ground_movement(2), Some(0.125));
        assert_eq!(decode_ground_movement(13), Some(2.0));
        assert_eq!(decode_ground_movement(39), Some(15.0));
        assert_eq!(decode_ground_movement(93), Some(69.0));
        assert_eq!(decode_ground_movement(124), Some(175.0));
        assert_eq!(decode_ground_movement(125), None);
        assert_eq!(decode_ground_movement(127), None);
    }

    #[test]
    fn test_decode_surface_position() {
        // TC 7 surface frame: movement code 29, track valid, on ground
        let mut payload = vec![0u8; 14];
        payload[0] = 17 << 3;
        payload[1] = 0x48;
        payload[2] = 0x40;
        payload[3] = 0xD6;
        payload[4] = (7 << 3) | 0x01; // TC 7, movement[6:4] = 1
        payload[5] = 0xD0 | 0x08 | 0x02; // movement[3:0] = 13, track valid, track[6:4] = 2
        payload[6] = 0x40 | 0x04 | 0x01; // track[3:0] = 4, odd flag, lat bits
        let frame = Frame {
            kind: FrameKind::ModeSLong,
            timestamp: 0,
            signal_level: 0,
            payload,
        };
        let msg = decode(&frame, 1.0).unwrap();
        match msg.kind {
            MsgKind::Position {
                on_ground,
                ground_speed_kt,
                ground_track_deg,
                cpr_odd,
                altitude_ft,
                ..
            } => {
                assert!(on_ground);
                assert!(cpr_odd);
                assert_eq!(altitude_ft, None);
                // movement code 0b0011101 = 29 -> 2 + 16 * 0.5 = 10 kt
                assert_eq!(ground_speed_kt, Some(10.0));
                // track 0b0100100 = 36 -> 101.25 degrees
                assert_eq!(ground_track_deg, Some(36.0 * 360.0 / 128.0));
            }
            other => panic!("expected position, got {other:?}"),
        }
    }

    // -- Filtering --

    #[test]
    fn test_short_frame_ignored() {
        let frame = Frame {
            kind: FrameKind::ModeSShort,
            timestamp: 0,
            signal_level: 0,
            payload: vec![0x28; 7],
        };
        assert!(decode(&frame, 1.0).is_none());
    }

    #[test]
    fn test_unsupported_df_skipped() {
        // DF11 all-call reply in a long frame: filtered, not an error
        let mut payload = vec![0u8; 14];
        payload[0] = 11 << 3;
        let frame = Frame {
            kind: FrameKind::ModeSLong,
            timestamp: 0,
            signal_level: 0,
            payload,
        };
        assert!(decode(&frame, 1.0).is_none());
    }

    #[test]
    fn test_unhandled_type_code_yields_icao_and_df() {
        // TC 28 (aircraft status): header survives as Other
        let mut payload = vec![0u8; 14];
        payload[0] = (17 << 3) | 0x05;
        payload[1] = 0x48;
        payload[2] = 0x40;
        payload[3] = 0xD6;
        payload[4] = 28 << 3;
        let frame = Frame {
            kind: FrameKind::ModeSLong,
            timestamp: 0,
            signal_level: 0,
            payload,
        };
        let msg = decode(&frame, 1.0).unwrap();
        assert_eq!(msg.df, 17);
        assert_eq!(msg.ca, 5);
        assert_eq!(icao_to_string(&msg.icao), "4840D6");
        assert_eq!(msg.kind, MsgKind::Other { type_code: 28 });
    }

    #[test]
    fn test_df18_decoded() {
        let mut payload = vec![0u8; 14];
        payload[0] = (18 << 3) | 0x02;
        payload[4] = 28 << 3;
        let frame = Frame {
            kind: FrameKind::ModeSLong,
            timestamp: 0,
            signal_level: 0,
            payload,
        };
        let msg = decode(&frame, 1.0).unwrap();
        assert_eq!(msg.df, 18);
        assert_eq!(msg.ca, 2);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let frame = hex_frame("8D40621D58C382D690C8AC2863A7");
        let a = decode(&frame, 5.0).unwrap();
        let b = decode(&frame, 5.0).unwrap();
        assert_eq!(a, b);
    }
}
