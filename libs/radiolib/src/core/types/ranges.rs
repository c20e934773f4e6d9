// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::{RadioError, Result};

/// Closed interval with an optional step (`0.0` = continuous).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Range {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    pub fn point(value: f64) -> Self {
        Self::new(value, value, 0.0)
    }
}

/// Ordered, non-overlapping list of ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaRange {
    ranges: Vec<Range>,
}

impl MetaRange {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    pub fn single(start: f64, stop: f64, step: f64) -> Self {
        Self::new(vec![Range::new(start, stop, step)])
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.ranges.is_empty() {
            return Err(RadioError::Runtime("meta-range cannot be empty".into()));
        }
        Ok(())
    }

    pub fn start(&self) -> Result<f64> {
        self.check()?;
        Ok(self
            .ranges
            .iter()
            .map(|r| r.start)
            .fold(f64::INFINITY, f64::min))
    }

    pub fn stop(&self) -> Result<f64> {
        self.check()?;
        Ok(self
            .ranges
            .iter()
            .map(|r| r.stop)
            .fold(f64::NEG_INFINITY, f64::max))
    }

    /// Smallest non-zero step across the ranges, or `0.0` when continuous.
    pub fn step(&self) -> Result<f64> {
        self.check()?;
        Ok(self
            .ranges
            .iter()
            .map(|r| r.step)
            .filter(|s| *s > 0.0)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
            .unwrap_or(0.0))
    }

    /// Clip `value` into the closest covered point, optionally snapping to the
    /// containing range's step.
    pub fn clip(&self, value: f64, clip_step: bool) -> Result<f64> {
        self.check()?;
        let mut best = self.ranges[0].start;
        let mut best_dist = f64::INFINITY;
        for r in &self.ranges {
            let mut candidate = value.clamp(r.start, r.stop);
            if clip_step && r.step > 0.0 {
                let steps = ((candidate - r.start) / r.step).round();
                candidate = (r.start + steps * r.step).min(r.stop);
            }
            let dist = (candidate - value).abs();
            if dist < best_dist {
                best = candidate;
                best_dist = dist;
            }
        }
        Ok(best)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.ranges
            .iter()
            .any(|r| value >= r.start && value <= r.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let mr = MetaRange::new(vec![Range::new(10.0, 20.0, 1.0), Range::new(30.0, 40.0, 0.5)]);
        assert_eq!(mr.start().unwrap(), 10.0);
        assert_eq!(mr.stop().unwrap(), 40.0);
        assert_eq!(mr.step().unwrap(), 0.5);
        assert!(mr.contains(35.0));
        assert!(!mr.contains(25.0));
    }

    #[test]
    fn test_clip() {
        let mr = MetaRange::new(vec![Range::new(0.0, 10.0, 2.0), Range::new(20.0, 30.0, 0.0)]);
        assert_eq!(mr.clip(-5.0, false).unwrap(), 0.0);
        assert_eq!(mr.clip(13.0, false).unwrap(), 10.0);
        assert_eq!(mr.clip(17.0, false).unwrap(), 20.0);
        assert_eq!(mr.clip(5.1, true).unwrap(), 6.0);
        assert_eq!(mr.clip(25.5, true).unwrap(), 25.5);
    }

    #[test]
    fn test_empty_is_error() {
        let mr = MetaRange::default();
        assert!(mr.start().is_err());
        assert!(mr.clip(1.0, false).is_err());
    }
}
