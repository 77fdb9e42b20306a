//! Compact Position Reporting — global CPR decode for ADS-B positions.
//!
//! A position is recoverable only from an even/odd frame pair received
//! within [`MAX_PAIR_AGE`] of each other. Each frame carries 17-bit
//! latitude/longitude fractions of a zone; the pair disambiguates which
//! zone the aircraft is in.
//!
//! Key constants:
//! - NZ = 15 (latitude zones per hemisphere for even frames)
//! - Dlat_even = 360 / 60 = 6.0 degrees
//! - Dlat_odd = 360 / 59 ≈ 6.1017 degrees

/// Maximum CPR value (2^17 = 131072).
const CPR_MAX: f64 = 131072.0;

/// Maximum time between even/odd frames for a global decode (seconds).
pub const MAX_PAIR_AGE: f64 = 10.0;

/// NL lookup table indexed by rounded absolute latitude in degrees.
///
/// Derived from the CPR zone-count function; used uniformly for both the
/// zone-consistency check and the longitude zone count so the two can
/// never disagree.
const NL_TABLE: [u8; 90] = [
    59, 59, 59, 59, 59, 59, 59, 59, 59, 59, 59, 58, 58, 58, 58, 57, 57, 57,
    57, 56, 56, 56, 55, 55, 54, 54, 53, 53, 52, 52, 51, 51, 50, 50, 49, 49,
    48, 47, 47, 46, 45, 45, 44, 43, 43, 42, 41, 40, 40, 39, 38, 37, 36, 36,
    35, 34, 33, 32, 31, 30, 29, 29, 28, 27, 26, 25, 24, 23, 22, 21, 20, 19,
    18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 5, 4, 3, 1, 1, 1,
];

/// Number of longitude zones at a latitude (the NL function).
/// Ranges from 59 at the equator down to 1 near the poles.
pub fn nl(lat: f64) -> i32 {
    let deg = lat.abs().round();
    if deg >= NL_TABLE.len() as f64 {
        return 1;
    }
    NL_TABLE[deg as usize] as i32
}

/// Modulo that always returns a non-negative result.
fn modulo(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

/// Global CPR decode from an even/odd frame pair.
///
/// `t_even`/`t_odd` are wall-clock reception times; the more recent frame
/// selects which parity's encoding resolves the final position. Returns
/// `None` when the pair is stale, the candidate latitudes straddle a zone
/// boundary, or the result is out of range — all expected steady-state
/// outcomes, not errors.
pub fn global_decode(
    lat_even: u32,
    lon_even: u32,
    lat_odd: u32,
    lon_odd: u32,
    t_even: f64,
    t_odd: f64,
) -> Option<(f64, f64)> {
    if (t_even - t_odd).abs() > MAX_PAIR_AGE {
        return None;
    }

    let dlat_even = 360.0 / 60.0;
    let dlat_odd = 360.0 / 59.0;

    let rlat_even = lat_even as f64 / CPR_MAX;
    let rlon_even = lon_even as f64 / CPR_MAX;
    let rlat_odd = lat_odd as f64 / CPR_MAX;
    let rlon_odd = lon_odd as f64 / CPR_MAX;

    // Latitude zone index
    let j = (59.0 * rlat_even - 60.0 * rlat_odd + 0.5).floor();

    // Candidate latitudes; the raw formula yields 0-360
    let mut lat_e = dlat_even * (modulo(j, 60.0) + rlat_even);
    let mut lat_o = dlat_odd * (modulo(j, 59.0) + rlat_odd);
    if lat_e >= 270.0 {
        lat_e -= 360.0;
    }
    if lat_o >= 270.0 {
        lat_o -= 360.0;
    }

    // Both candidates must land in the same latitude zone
    if nl(lat_e) != nl(lat_o) {
        return None;
    }

    // The more recently received parity wins
    let use_odd = t_odd > t_even;
    let lat = if use_odd { lat_o } else { lat_e };
    if !(-90.0..=90.0).contains(&lat) {
        return None;
    }

    let nl_val = nl(lat);
    let n_zones = if use_odd { nl_val - 1 } else { nl_val };
    if n_zones == 0 {
        return None;
    }

    // Longitude zone index
    let m = (rlon_even * (nl_val - 1) as f64 - rlon_odd * nl_val as f64 + 0.5).floor();
    let dlon = 360.0 / n_zones as f64;
    let rlon = if use_odd { rlon_odd } else { rlon_even };
    let mut lon = dlon * (modulo(m, n_zones as f64) + rlon);
    if lon >= 180.0 {
        lon -= 360.0;
    }

    Some((round6(lat), round6(lon)))
}

/// Round to 6 decimal places.
fn round6(val: f64) -> f64 {
    (val * 1_000_000.0).round() / 1_000_000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nl_equator() {
        assert_eq!(nl(0.0), 59);
    }

    #[test]
    fn test_nl_poles() {
        assert_eq!(nl(87.0), 1);
        assert_eq!(nl(-87.0), 1);
        assert_eq!(nl(90.0), 1);
        assert_eq!(nl(95.0), 1);
    }

    #[test]
    fn test_nl_mid_latitude() {
        // ~52 degrees N (Netherlands) sits in the 36-zone band
        assert_eq!(nl(52.0), 36);
        assert_eq!(nl(52.2572), 36);
        assert_eq!(nl(-52.2572), 36);
    }

    #[test]
    fn test_nl_symmetric() {
        for deg in 0..90 {
            assert_eq!(nl(deg as f64), nl(-(deg as f64)));
        }
    }

    #[test]
    fn test_nl_monotonic_decreasing() {
        for deg in 1..90 {
            assert!(nl(deg as f64) <= nl((deg - 1) as f64));
        }
    }

    #[test]
    fn test_global_decode_known_pair_even_recent() {
        // Canonical worked example: even frame received last
        let result = global_decode(93000, 51372, 74158, 50194, 1.0, 0.0);
        let (lat, lon) = result.expect("pair should resolve");
        assert!((lat - 52.25713).abs() < 1e-3, "lat ~52.25713, got {lat}");
        assert!((lon - 3.91937).abs() < 1e-3, "lon ~3.91937, got {lon}");
    }

    #[test]
    fn test_global_decode_known_pair_odd_recent() {
        // Odd frame received last: the odd parity's latitude is selected
        let result = global_decode(93000, 51372, 74158, 50194, 0.0, 1.0);
        let (lat, lon) = result.expect("pair should resolve");
        assert!((lat - 52.26578).abs() < 1e-3, "lat ~52.26578, got {lat}");
        assert!((lon - 3.91937).abs() < 0.05, "lon near 3.92, got {lon}");
    }

    #[test]
    fn test_global_decode_stale_pair_rejected() {
        // 11 seconds apart: rejected regardless of field values
        assert!(global_decode(93000, 51372, 74158, 50194, 11.0, 0.0).is_none());
        assert!(global_decode(93000, 51372, 74158, 50194, 0.0, 11.0).is_none());
    }

    #[test]
    fn test_global_decode_boundary_age_accepted() {
        assert!(global_decode(93000, 51372, 74158, 50194, 10.0, 0.0).is_some());
    }

    #[test]
    fn test_global_decode_out_of_range_rejected() {
        // Wildly inconsistent raw latitudes produce a candidate outside
        // [-90, 90] and must be rejected, not wrapped
        let lat_even = (0.3 * CPR_MAX) as u32;
        let lat_odd = (0.9 * CPR_MAX) as u32;
        assert!(global_decode(lat_even, 0, lat_odd, 0, 1.0, 0.0).is_none());
    }

    #[test]
    fn test_modulo_positive() {
        assert!((modulo(7.0, 3.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_modulo_negative() {
        assert!((modulo(-1.0, 60.0) - 59.0).abs() < 1e-10);
    }
}
