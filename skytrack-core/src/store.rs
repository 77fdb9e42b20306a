//! Concurrent per-aircraft track store.
//!
//! One writer (the decode thread) applies messages; any number of readers
//! take snapshots or iterate. The map-level `RwLock` guards insert, delete,
//! and iteration; each track carries its own `Mutex`, so updating aircraft A
//! never blocks a reader copying aircraft B. Readers only ever receive
//! clones — no mutable alias escapes the store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::cpr;
use crate::types::*;

/// Signal-level ring buffer capacity per track.
pub const SIGNAL_HISTORY: usize = 8;

/// Default trail capacity per track.
pub const DEFAULT_TRAIL_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Aircraft track
// ---------------------------------------------------------------------------

/// One raw CPR report of a single parity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CprSample {
    pub lat: u32,
    pub lon: u32,
    /// Wall-clock reception time, Unix seconds
    pub timestamp: f64,
}

/// A historical position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailPoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: i32,
    pub heading_deg: f64,
    pub timestamp: f64,
}

/// Mutable per-aircraft state, keyed by ICAO address.
///
/// `lat`/`lon` are only populated through the CPR resolver, so they are
/// `Some` exactly when `last_position_seen` is.
#[derive(Debug, Clone, Serialize)]
pub struct AircraftTrack {
    pub icao: Icao,
    /// Callsign; last non-empty decode wins
    pub flight: Option<String>,

    // Kinematics, each overwritten by the relevant message type
    pub altitude_ft: Option<i32>,
    pub speed_kt: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    pub on_ground: bool,

    // Position, valid only once both CPR parities paired
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub even_cpr: Option<CprSample>,
    pub odd_cpr: Option<CprSample>,

    /// Recent per-message signal strengths, oldest overwritten first
    pub signal_levels: [u8; SIGNAL_HISTORY],
    /// Historical positions, oldest evicted once full
    pub trail: VecDeque<TrailPoint>,

    pub first_seen: f64,
    pub last_seen: f64,
    pub last_position_seen: Option<f64>,
    pub messages: u64,
}

impl AircraftTrack {
    fn new(icao: Icao, now: f64) -> Self {
        AircraftTrack {
            icao,
            flight: None,
            altitude_ft: None,
            speed_kt: None,
            heading_deg: None,
            vertical_rate_fpm: None,
            on_ground: false,
            lat: None,
            lon: None,
            even_cpr: None,
            odd_cpr: None,
            signal_levels: [0; SIGNAL_HISTORY],
            trail: VecDeque::new(),
            first_seen: now,
            last_seen: now,
            last_position_seen: None,
            messages: 0,
        }
    }

    pub fn has_position(&self) -> bool {
        self.last_position_seen.is_some()
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_seen
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StatsAccum {
    messages: u64,
    signal_sum: f64,
    cycle_start: f64,
}

/// Per-sweep statistics, recomputed from accumulators reset each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepStats {
    /// Messages per second since the previous sweep
    pub message_rate: f64,
    /// Mean signal level of those messages
    pub mean_signal: f64,
}

// ---------------------------------------------------------------------------
// Track store
// ---------------------------------------------------------------------------

type Shared<T> = Arc<Mutex<T>>;

/// Concurrent keyed collection of aircraft tracks.
pub struct TrackStore {
    tracks: RwLock<HashMap<Icao, Shared<AircraftTrack>>>,
    trail_len: usize,
    stats: Mutex<StatsAccum>,
}

impl TrackStore {
    pub fn new(trail_len: usize) -> Self {
        TrackStore {
            tracks: RwLock::new(HashMap::new()),
            trail_len: trail_len.max(1),
            stats: Mutex::new(StatsAccum::default()),
        }
    }

    /// Fetch the track for an ICAO, creating it on first sight.
    pub fn get_or_create(&self, icao: Icao, now: f64) -> Shared<AircraftTrack> {
        if let Some(track) = self.tracks.read().unwrap().get(&icao) {
            return Arc::clone(track);
        }
        let mut tracks = self.tracks.write().unwrap();
        Arc::clone(
            tracks
                .entry(icao)
                .or_insert_with(|| Arc::new(Mutex::new(AircraftTrack::new(icao, now)))),
        )
    }

    /// Apply one decoded message to its track.
    ///
    /// Partial update: only the fields the message carries are touched.
    /// Position fields go through the CPR resolver — the raw report is
    /// stored per parity and resolution is attempted whenever both
    /// parities are present.
    pub fn apply(&self, msg: &DecodedMsg) {
        let track = self.get_or_create(msg.icao, msg.timestamp);
        let mut t = track.lock().unwrap();

        t.last_seen = msg.timestamp;
        let signal_idx = (t.messages % SIGNAL_HISTORY as u64) as usize;
        t.signal_levels[signal_idx] = msg.signal_level;
        t.messages += 1;

        match &msg.kind {
            MsgKind::Identification { callsign, .. } => {
                if !callsign.is_empty() {
                    t.flight = Some(callsign.clone());
                }
            }
            MsgKind::Position {
                altitude_ft,
                cpr_lat,
                cpr_lon,
                cpr_odd,
                on_ground,
                ground_speed_kt,
                ground_track_deg,
            } => {
                if let Some(alt) = altitude_ft {
                    t.altitude_ft = Some(*alt);
                }
                t.on_ground = *on_ground;
                if let Some(spd) = ground_speed_kt {
                    t.speed_kt = Some(*spd);
                }
                if let Some(trk) = ground_track_deg {
                    t.heading_deg = Some(*trk);
                }

                let sample = CprSample {
                    lat: *cpr_lat,
                    lon: *cpr_lon,
                    timestamp: msg.timestamp,
                };
                if *cpr_odd {
                    t.odd_cpr = Some(sample);
                } else {
                    t.even_cpr = Some(sample);
                }

                self.try_resolve_position(&mut t);
            }
            MsgKind::Velocity {
                speed_kt,
                heading_deg,
                vertical_rate_fpm,
                ..
            } => {
                if let Some(spd) = speed_kt {
                    t.speed_kt = Some(*spd);
                }
                if let Some(hdg) = heading_deg {
                    t.heading_deg = Some(*hdg);
                }
                if let Some(vr) = vertical_rate_fpm {
                    t.vertical_rate_fpm = Some(*vr);
                }
            }
            MsgKind::Other { .. } => {}
        }

        let mut stats = self.stats.lock().unwrap();
        stats.messages += 1;
        stats.signal_sum += msg.signal_level as f64;
    }

    /// Run the CPR resolver if both parities are buffered. Non-resolution
    /// leaves the previous position untouched.
    fn try_resolve_position(&self, t: &mut AircraftTrack) {
        let (even, odd) = match (t.even_cpr, t.odd_cpr) {
            (Some(e), Some(o)) => (e, o),
            _ => return,
        };

        if let Some((lat, lon)) = cpr::global_decode(
            even.lat,
            even.lon,
            odd.lat,
            odd.lon,
            even.timestamp,
            odd.timestamp,
        ) {
            let resolved_at = even.timestamp.max(odd.timestamp);
            t.lat = Some(lat);
            t.lon = Some(lon);
            t.last_position_seen = Some(resolved_at);

            if t.trail.len() >= self.trail_len {
                t.trail.pop_front();
            }
            t.trail.push_back(TrailPoint {
                lat,
                lon,
                altitude_ft: t.altitude_ft.unwrap_or(0),
                heading_deg: t.heading_deg.unwrap_or(0.0),
                timestamp: resolved_at,
            });
        }
    }

    /// Remove tracks not heard from within `ttl_secs`. Returns count removed.
    ///
    /// Meant to run at a bounded cadence (the sweep loop), not per message.
    pub fn remove_stale(&self, now: f64, ttl_secs: f64) -> usize {
        let mut tracks = self.tracks.write().unwrap();
        let before = tracks.len();
        tracks.retain(|_, track| now - track.lock().unwrap().last_seen <= ttl_secs);
        before - tracks.len()
    }

    /// Point-in-time deep copy of every track. Readers never observe a
    /// record torn mid-update.
    pub fn snapshot(&self) -> HashMap<Icao, AircraftTrack> {
        let tracks = self.tracks.read().unwrap();
        tracks
            .iter()
            .map(|(icao, track)| (*icao, track.lock().unwrap().clone()))
            .collect()
    }

    /// Visit every track under the shared lock.
    pub fn for_each<F: FnMut(&AircraftTrack)>(&self, mut f: F) {
        let tracks = self.tracks.read().unwrap();
        for track in tracks.values() {
            f(&track.lock().unwrap());
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.read().unwrap().is_empty()
    }

    /// `(total, with_position)` track counts for status display.
    pub fn counts(&self) -> (usize, usize) {
        let mut total = 0;
        let mut with_position = 0;
        self.for_each(|t| {
            total += 1;
            if t.has_position() {
                with_position += 1;
            }
        });
        (total, with_position)
    }

    /// Message rate and mean signal level since the previous sweep.
    /// Resets the accumulators for the next cycle.
    pub fn sweep_stats(&self, now: f64) -> SweepStats {
        let mut stats = self.stats.lock().unwrap();
        let elapsed = now - stats.cycle_start;
        let out = SweepStats {
            message_rate: if elapsed > 0.0 && stats.cycle_start > 0.0 {
                stats.messages as f64 / elapsed
            } else {
                stats.messages as f64
            },
            mean_signal: if stats.messages > 0 {
                stats.signal_sum / stats.messages as f64
            } else {
                0.0
            },
        };
        stats.messages = 0;
        stats.signal_sum = 0.0;
        stats.cycle_start = now;
        out
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        TrackStore::new(DEFAULT_TRAIL_LEN)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
