// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::{DeviceAddr, RadioError, Result};

/// How one stage of the tuning chain (RF front end or DSP) is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TunePolicy {
    /// Leave the stage where it is.
    None,
    /// Let the driver pick.
    #[default]
    Auto,
    /// Use the frequency supplied in the request.
    Manual,
}

impl TunePolicy {
    pub fn as_raw(self) -> i32 {
        match self {
            Self::None => b'N' as i32,
            Self::Auto => b'A' as i32,
            Self::Manual => b'M' as i32,
        }
    }
}

impl TryFrom<i32> for TunePolicy {
    type Error = RadioError;

    fn try_from(raw: i32) -> Result<Self> {
        match u8::try_from(raw).ok() {
            Some(b'N') => Ok(Self::None),
            Some(b'A') => Ok(Self::Auto),
            Some(b'M') => Ok(Self::Manual),
            _ => Err(RadioError::Value(format!("invalid tune policy {}", raw))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuneRequest {
    pub target_freq: f64,
    pub rf_freq_policy: TunePolicy,
    pub rf_freq: f64,
    pub dsp_freq_policy: TunePolicy,
    pub dsp_freq: f64,
    pub args: DeviceAddr,
}

impl TuneRequest {
    pub fn new(target_freq: f64) -> Self {
        Self {
            target_freq,
            rf_freq_policy: TunePolicy::Auto,
            rf_freq: 0.0,
            dsp_freq_policy: TunePolicy::Auto,
            dsp_freq: 0.0,
            args: DeviceAddr::new(),
        }
    }

    /// Tune the front end `lo_offset` away from the target and let the DSP
    /// make up the difference.
    pub fn with_lo_offset(target_freq: f64, lo_offset: f64) -> Self {
        Self {
            rf_freq_policy: TunePolicy::Manual,
            rf_freq: target_freq + lo_offset,
            ..Self::new(target_freq)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TuneResult {
    pub clipped_rf_freq: f64,
    pub target_rf_freq: f64,
    pub actual_rf_freq: f64,
    pub target_dsp_freq: f64,
    pub actual_dsp_freq: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_raw() {
        assert_eq!(TunePolicy::Auto.as_raw(), 65);
        assert_eq!(TunePolicy::try_from(77).unwrap(), TunePolicy::Manual);
        assert!(TunePolicy::try_from(0).is_err());
    }

    #[test]
    fn test_lo_offset_request() {
        let req = TuneRequest::with_lo_offset(915e6, 1e6);
        assert_eq!(req.rf_freq_policy, TunePolicy::Manual);
        assert_eq!(req.rf_freq, 916e6);
        assert_eq!(req.dsp_freq_policy, TunePolicy::Auto);
    }
}
