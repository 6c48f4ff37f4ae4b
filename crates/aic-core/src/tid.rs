//! Monotonic time identifiers
//!
//! A TID is a microsecond timestamp encoded as eleven fixed-width
//! [`s32`](crate::s32) symbols followed by a two-symbol clock id, grouped as
//! `aaaa-bbb-cccc-dd`. Because the encoding is fixed-width and the alphabet
//! is ASCII-sorted, TIDs compare as strings exactly as their timestamps
//! compare as integers, and the chain order of a diff map is just its key
//! order.
//!
//! [`TidClock`] is the only mutable shared state in the ledger. It is an
//! explicit object with an injected [`WallClock`] so tests can drive it
//! through regressions and repeated readings.

use crate::errors::{AicError, Result};
use crate::s32;
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp symbols in a formatted TID
const TIMESTAMP_SYMBOLS: usize = 11;

/// Length of `aaaa-bbb-cccc-dd`
const FORMATTED_LEN: usize = 16;

/// Dash positions in the formatted form
const DASHES: [usize; 3] = [4, 8, 13];

/// First clock-id symbol of a clock that is not a registered consensus clock
pub const UNREGISTERED_CLOCK_GUARD: char = '2';

/// Source of wall-clock time in microseconds since the Unix epoch
pub trait WallClock: Send + Sync + fmt::Debug {
    /// Current time in microseconds
    fn now_micros(&self) -> u64;
}

/// Wall clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_micros(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_micros() as u64
    }
}

impl<T: WallClock + ?Sized> WallClock for Arc<T> {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }
}

/// Two-symbol suffix identifying the clock that minted a TID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClockId([char; 2]);

impl ClockId {
    /// Unregistered clock id: guard symbol plus one random symbol
    pub fn unregistered<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut byte = [0u8; 1];
        rng.fill_bytes(&mut byte);
        Self([UNREGISTERED_CLOCK_GUARD, s32::symbol(byte[0])])
    }

    /// Clock id from two alphabet symbols
    pub fn parse(value: &str) -> Result<Self> {
        let mut chars = value.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None)
                if s32::index_of(a).is_some() && s32::index_of(b).is_some() =>
            {
                Ok(Self([a, b]))
            }
            _ => Err(AicError::invalid_tid(value)),
        }
    }

    /// Whether this id carries the unregistered-clock guard
    pub fn is_unregistered(&self) -> bool {
        self.0[0] == UNREGISTERED_CLOCK_GUARD
    }
}

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0], self.0[1])
    }
}

/// Time identifier.
///
/// Chain maps order entries by comparing TIDs as strings, and diff maps
/// received from clients may use any string key, so construction through
/// [`Tid::new`] and deserialization do not validate. Use [`Tid::parse`] where
/// the clock format is required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(String);

impl Tid {
    /// Wrap a string without validation
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a formatted `aaaa-bbb-cccc-dd` TID
    pub fn parse(value: &str) -> Result<Self> {
        let tid = Self::new(value);
        if tid.is_formatted() {
            Ok(tid)
        } else {
            Err(AicError::invalid_tid(value))
        }
    }

    /// Format a timestamp and clock id
    pub fn from_parts(micros: u64, clock_id: &ClockId) -> Self {
        let ts = s32::encode_u64(micros, TIMESTAMP_SYMBOLS);
        Self(format!(
            "{}-{}-{}-{clock_id}",
            &ts[0..4],
            &ts[4..7],
            &ts[7..11]
        ))
    }

    /// Whether the string has the clock format
    pub fn is_formatted(&self) -> bool {
        self.0.len() == FORMATTED_LEN
            && self.0.char_indices().all(|(i, c)| {
                if DASHES.contains(&i) {
                    c == '-'
                } else {
                    s32::index_of(c).is_some()
                }
            })
    }

    /// Timestamp in microseconds, `None` if not formatted
    pub fn micros(&self) -> Option<u64> {
        if !self.is_formatted() {
            return None;
        }
        let digits: String = self
            .0
            .chars()
            .filter(|c| *c != '-')
            .take(TIMESTAMP_SYMBOLS)
            .collect();
        s32::decode_u64(&digits)
    }

    /// Clock id suffix, `None` if not formatted
    pub fn clock_id(&self) -> Option<ClockId> {
        if !self.is_formatted() {
            return None;
        }
        ClockId::parse(&self.0[14..]).ok()
    }

    /// String form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Process-local monotonic TID generator
#[derive(Debug)]
pub struct TidClock {
    wall: Box<dyn WallClock>,
    clock_id: ClockId,
    latest_micros: Mutex<u64>,
}

impl TidClock {
    /// Create a clock over an injected wall clock and clock id
    pub fn new(wall: impl WallClock + 'static, clock_id: ClockId) -> Self {
        Self {
            wall: Box::new(wall),
            clock_id,
            latest_micros: Mutex::new(0),
        }
    }

    /// System wall clock with a random unregistered clock id
    pub fn system() -> Self {
        Self::new(
            SystemWallClock,
            ClockId::unregistered(&mut rand::thread_rng()),
        )
    }

    /// Next TID, strictly greater than every TID this clock returned before.
    ///
    /// `latest = max(now, latest + 1)` keeps the sequence increasing when the
    /// wall clock repeats a reading or goes backwards.
    pub fn next(&self) -> Tid {
        let now = self.wall.now_micros();
        let mut latest = self.latest_micros.lock();
        *latest = now.max(latest.saturating_add(1));
        Tid::from_parts(*latest, &self.clock_id)
    }

    /// Clock id stamped on every TID
    pub fn clock_id(&self) -> &ClockId {
        &self.clock_id
    }

    /// Last timestamp handed out, zero before the first call
    pub fn latest_micros(&self) -> u64 {
        *self.latest_micros.lock()
    }
}

impl Default for TidClock {
    fn default() -> Self {
        Self::system()
    }
}
