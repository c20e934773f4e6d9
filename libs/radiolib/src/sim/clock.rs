// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Instant;

use parking_lot::Mutex;

use crate::core::TimeSpec;

/// Motherboard time base.
///
/// Device time is the host monotonic clock plus an offset. PPS edges fall
/// on whole seconds of the monotonic clock measured from `epoch`.
pub struct SimClock {
    epoch: Instant,
    offset: Mutex<f64>,
}

impl SimClock {
    pub fn new(epoch: Instant) -> Self {
        Self {
            epoch,
            offset: Mutex::new(0.0),
        }
    }

    fn elapsed(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    pub fn now(&self) -> TimeSpec {
        TimeSpec::from_secs(self.elapsed() + *self.offset.lock())
    }

    pub fn last_pps(&self) -> TimeSpec {
        TimeSpec::from_secs(self.elapsed().floor() + *self.offset.lock())
    }

    pub fn set_now(&self, time: TimeSpec) {
        *self.offset.lock() = time.real_secs() - self.elapsed();
    }

    /// Make the next PPS edge read `time`.
    pub fn set_next_pps(&self, time: TimeSpec) {
        let edge = self.elapsed().floor() + 1.0;
        *self.offset.lock() = time.real_secs() - edge;
    }

    pub fn offset(&self) -> f64 {
        *self.offset.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_now() {
        let clock = SimClock::new(Instant::now());
        clock.set_now(TimeSpec::new(100, 0.25));
        let now = clock.now().real_secs();
        assert!((100.25..100.5).contains(&now), "{}", now);
        assert!(clock.last_pps().real_secs() <= now);
    }

    #[test]
    fn test_next_pps_lands_on_whole_seconds() {
        let clock = SimClock::new(Instant::now());
        clock.set_next_pps(TimeSpec::new(10, 0.0));
        // The edge has not happened yet, so the last one read 9 s.
        let last = clock.last_pps();
        assert_eq!(last.full_secs(), 9);
        assert!(last.frac_secs() < 1e-9);
    }
}
