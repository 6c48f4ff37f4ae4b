//! Time control for deterministic testing

use aic_core::WallClock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Wall clock that only moves when told to.
///
/// Clones share the same reading, so a test can keep a handle while a
/// `TidClock` owns another.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    micros: Arc<AtomicU64>,
}

impl FixedClock {
    /// Clock frozen at `micros`
    pub fn at(micros: u64) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(micros)),
        }
    }

    /// Jump to `micros`, backwards included
    pub fn set(&self, micros: u64) {
        self.micros.store(micros, Ordering::SeqCst);
    }

    /// Move forward
    pub fn advance(&self, micros: u64) {
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }

    /// Move backward, saturating at zero
    pub fn rewind(&self, micros: u64) {
        let _ = self
            .micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_sub(micros))
            });
    }
}

impl WallClock for FixedClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aic_core::{ClockId, TidClock};

    #[test]
    fn test_shared_handle_drives_tid_clock() {
        let wall = FixedClock::at(1_000);
        let clock = TidClock::new(wall.clone(), ClockId::parse("2a").unwrap());
        assert_eq!(clock.next().micros(), Some(1_000));

        wall.advance(500);
        assert_eq!(clock.next().micros(), Some(1_500));

        wall.rewind(10_000);
        assert_eq!(wall.now_micros(), 0);
        assert_eq!(clock.next().micros(), Some(1_501));
    }
}
