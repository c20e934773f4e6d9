// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::cmp::Ordering;

/// Device time as whole seconds plus a fractional part in `[0, 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeSpec {
    full_secs: i64,
    frac_secs: f64,
}

impl TimeSpec {
    /// Build a time spec, carrying any whole seconds out of `frac_secs`.
    pub fn new(full_secs: i64, frac_secs: f64) -> Self {
        let carry = frac_secs.floor();
        Self {
            full_secs: full_secs + carry as i64,
            frac_secs: frac_secs - carry,
        }
    }

    pub fn from_secs(secs: f64) -> Self {
        Self::new(0, secs)
    }

    pub fn full_secs(&self) -> i64 {
        self.full_secs
    }

    pub fn frac_secs(&self) -> f64 {
        self.frac_secs
    }

    pub fn real_secs(&self) -> f64 {
        self.full_secs as f64 + self.frac_secs
    }

    pub fn add_secs(&self, secs: f64) -> Self {
        Self::new(self.full_secs, self.frac_secs + secs)
    }

    /// Seconds from `self` to `later` (negative when `later` is earlier).
    pub fn secs_until(&self, later: &TimeSpec) -> f64 {
        (later.full_secs - self.full_secs) as f64 + (later.frac_secs - self.frac_secs)
    }

    /// Sample tick count at `rate`, rounded to the nearest tick.
    pub fn to_ticks(&self, rate: f64) -> i64 {
        self.full_secs * rate.round() as i64 + (self.frac_secs * rate).round() as i64
    }
}

impl PartialOrd for TimeSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.full_secs.cmp(&other.full_secs) {
            Ordering::Equal => self.frac_secs.partial_cmp(&other.frac_secs),
            ord => Some(ord),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_fraction() {
        let ts = TimeSpec::new(1, 2.25);
        assert_eq!(ts.full_secs(), 3);
        assert!((ts.frac_secs() - 0.25).abs() < 1e-12);

        let neg = TimeSpec::new(5, -0.5);
        assert_eq!(neg.full_secs(), 4);
        assert!((neg.frac_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ordering_and_difference() {
        let a = TimeSpec::new(10, 0.1);
        let b = TimeSpec::new(10, 0.6);
        let c = TimeSpec::new(11, 0.0);
        assert!(a < b && b < c);
        assert!((a.secs_until(&c) - 0.9).abs() < 1e-9);
        assert!(c.secs_until(&a) < 0.0);
    }

    #[test]
    fn test_add_secs_crosses_second() {
        let ts = TimeSpec::new(1, 0.75).add_secs(0.5);
        assert_eq!(ts.full_secs(), 2);
        assert!((ts.frac_secs() - 0.25).abs() < 1e-12);
        assert!((ts.real_secs() - 2.25).abs() < 1e-12);
    }
}
