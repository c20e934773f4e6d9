// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-channel RF frontend and DSP state of the simulated device.

use crate::core::{
    Direction, MetaRange, Range, RadioError, Result, SensorValue, TunePolicy, TuneRequest,
    TuneResult,
};

pub const FE_FREQ_MIN: f64 = 70e6;
pub const FE_FREQ_MAX: f64 = 6e9;
/// LO synthesizer resolution.
pub const FE_FREQ_STEP: f64 = 1e3;
pub const BANDWIDTH_MIN: f64 = 200e3;
pub const BANDWIDTH_MAX: f64 = 56e6;

/// One named gain stage.
#[derive(Debug, Clone)]
pub struct GainElement {
    pub name: &'static str,
    pub range: Range,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct FrontendState {
    pub dir: Direction,
    pub rate: f64,
    pub rf_freq: f64,
    pub dsp_freq: f64,
    pub gains: Vec<GainElement>,
    pub antenna: String,
    pub bandwidth: f64,
    pub dc_offset_enabled: bool,
    pub iq_balance_enabled: bool,
    pub agc_enabled: bool,
}

impl FrontendState {
    pub fn new(dir: Direction, master_clock_rate: f64) -> Self {
        let gains = match dir {
            Direction::Rx => vec![
                GainElement {
                    name: "LNA",
                    range: Range::new(0.0, 30.0, 1.0),
                    value: 0.0,
                },
                GainElement {
                    name: "PGA",
                    range: Range::new(0.0, 46.0, 0.5),
                    value: 0.0,
                },
            ],
            Direction::Tx => vec![GainElement {
                name: "PGA",
                range: Range::new(0.0, 89.75, 0.25),
                value: 0.0,
            }],
        };
        Self {
            dir,
            rate: master_clock_rate / 32.0,
            rf_freq: 1e9,
            dsp_freq: 0.0,
            gains,
            antenna: Self::antennas(dir)[0].to_string(),
            bandwidth: BANDWIDTH_MAX,
            dc_offset_enabled: true,
            iq_balance_enabled: true,
            agc_enabled: false,
        }
    }

    pub fn antennas(dir: Direction) -> &'static [&'static str] {
        match dir {
            Direction::Rx => &["RX2", "TX/RX", "CAL"],
            Direction::Tx => &["TX/RX", "CAL"],
        }
    }

    // ---- Rate -----------------------------------------------------------

    /// Rates reachable by integer decimation of the master clock.
    pub fn rate_range(master_clock_rate: f64) -> MetaRange {
        MetaRange::single(master_clock_rate / 512.0, master_clock_rate, 0.0)
    }

    pub fn set_rate(&mut self, rate: f64, master_clock_rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(RadioError::Value(format!("invalid sample rate {}", rate)));
        }
        let clipped = Self::rate_range(master_clock_rate).clip(rate, false)?;
        let decim = (master_clock_rate / clipped).round().max(1.0);
        self.rate = master_clock_rate / decim;
        if (self.rate - rate).abs() > 1.0 {
            tracing::debug!(
                "{} rate {} coerced to {}",
                self.dir.as_str(),
                rate,
                self.rate
            );
        }
        Ok(())
    }

    // ---- Frequency ------------------------------------------------------

    pub fn fe_freq_range() -> MetaRange {
        MetaRange::single(FE_FREQ_MIN, FE_FREQ_MAX, FE_FREQ_STEP)
    }

    pub fn dsp_freq_range(master_clock_rate: f64) -> MetaRange {
        MetaRange::single(-master_clock_rate / 2.0, master_clock_rate / 2.0, 0.0)
    }

    /// Overall tunable range: RF range widened by the DSP range.
    pub fn freq_range(master_clock_rate: f64) -> MetaRange {
        MetaRange::single(
            FE_FREQ_MIN - master_clock_rate / 2.0,
            FE_FREQ_MAX + master_clock_rate / 2.0,
            0.0,
        )
    }

    /// Center frequency seen by the host.
    pub fn freq(&self) -> f64 {
        match self.dir {
            Direction::Rx => self.rf_freq - self.dsp_freq,
            Direction::Tx => self.rf_freq + self.dsp_freq,
        }
    }

    /// Split `request` between the RF LO and the DSP mixer.
    pub fn tune(&mut self, request: &TuneRequest, master_clock_rate: f64) -> Result<TuneResult> {
        if !request.target_freq.is_finite() {
            return Err(RadioError::Value(format!(
                "invalid target frequency {}",
                request.target_freq
            )));
        }
        let fe_range = Self::fe_freq_range();

        let target_rf_freq = match request.rf_freq_policy {
            TunePolicy::Auto => request.target_freq,
            TunePolicy::Manual => request.rf_freq,
            TunePolicy::None => self.rf_freq,
        };
        let clipped_rf_freq = fe_range.clip(target_rf_freq, false)?;
        let actual_rf_freq = if request.rf_freq_policy == TunePolicy::None {
            self.rf_freq
        } else {
            fe_range.clip(target_rf_freq, true)?
        };

        let target_dsp_freq = match request.dsp_freq_policy {
            TunePolicy::Auto => match self.dir {
                Direction::Rx => actual_rf_freq - request.target_freq,
                Direction::Tx => request.target_freq - actual_rf_freq,
            },
            TunePolicy::Manual => request.dsp_freq,
            TunePolicy::None => self.dsp_freq,
        };
        let actual_dsp_freq = Self::dsp_freq_range(master_clock_rate).clip(target_dsp_freq, false)?;

        self.rf_freq = actual_rf_freq;
        self.dsp_freq = actual_dsp_freq;

        Ok(TuneResult {
            clipped_rf_freq,
            target_rf_freq,
            actual_rf_freq,
            target_dsp_freq,
            actual_dsp_freq,
        })
    }

    // ---- Gain -----------------------------------------------------------

    pub fn gain_names(&self) -> Vec<String> {
        self.gains.iter().map(|g| g.name.to_string()).collect()
    }

    fn element(&self, name: &str) -> Result<&GainElement> {
        self.gains.iter().find(|g| g.name == name).ok_or_else(|| {
            RadioError::Key(format!(
                "no {} gain element named '{}'",
                self.dir.as_str(),
                name
            ))
        })
    }

    pub fn gain_range(&self, name: &str) -> Result<MetaRange> {
        if !name.is_empty() {
            let range = self.element(name)?.range;
            return Ok(MetaRange::new(vec![range]));
        }
        let stop = self.gains.iter().map(|g| g.range.stop).sum();
        let step = self
            .gains
            .iter()
            .map(|g| g.range.step)
            .fold(f64::INFINITY, f64::min);
        Ok(MetaRange::single(0.0, stop, step))
    }

    pub fn gain(&self, name: &str) -> Result<f64> {
        if name.is_empty() {
            return Ok(self.gains.iter().map(|g| g.value).sum());
        }
        Ok(self.element(name)?.value)
    }

    /// Set one element, or distribute an overall gain across elements in
    /// order, filling each before moving to the next.
    pub fn set_gain(&mut self, gain: f64, name: &str) -> Result<()> {
        if !gain.is_finite() {
            return Err(RadioError::Value(format!("invalid gain {}", gain)));
        }
        if !name.is_empty() {
            let range = MetaRange::new(vec![self.element(name)?.range]);
            let value = range.clip(gain, true)?;
            if let Some(element) = self.gains.iter_mut().find(|g| g.name == name) {
                element.value = value;
            }
            return Ok(());
        }
        let mut remaining = self.gain_range("")?.clip(gain, false)?;
        for element in &mut self.gains {
            let share = remaining.min(element.range.stop);
            element.value = MetaRange::new(vec![element.range]).clip(share, true)?;
            remaining -= element.value;
        }
        Ok(())
    }

    // ---- Misc -----------------------------------------------------------

    pub fn set_antenna(&mut self, antenna: &str) -> Result<()> {
        if !Self::antennas(self.dir).contains(&antenna) {
            return Err(RadioError::Value(format!(
                "Invalid {} antenna '{}', choose from {:?}",
                self.dir.as_str(),
                antenna,
                Self::antennas(self.dir)
            )));
        }
        self.antenna = antenna.to_string();
        Ok(())
    }

    pub fn bandwidth_range() -> MetaRange {
        MetaRange::single(BANDWIDTH_MIN, BANDWIDTH_MAX, 0.0)
    }

    pub fn set_bandwidth(&mut self, bandwidth: f64) -> Result<()> {
        if !bandwidth.is_finite() {
            return Err(RadioError::Value(format!("invalid bandwidth {}", bandwidth)));
        }
        self.bandwidth = Self::bandwidth_range().clip(bandwidth, false)?;
        Ok(())
    }

    pub fn sensor_names(&self) -> Vec<String> {
        match self.dir {
            Direction::Rx => vec!["lo_locked".to_string(), "rssi".to_string()],
            Direction::Tx => vec!["lo_locked".to_string()],
        }
    }

    pub fn sensor(&self, name: &str) -> Result<SensorValue> {
        match (name, self.dir) {
            ("lo_locked", _) => Ok(SensorValue::boolean("lo_locked", true, "locked", "unlocked")),
            ("rssi", Direction::Rx) => Ok(SensorValue::real(
                "rssi",
                -90.0 + self.gain("").unwrap_or_default() * 0.5,
                "dBm",
            )),
            _ => Err(RadioError::Lookup(format!(
                "{} sensor '{}' not found",
                self.dir.as_str(),
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MCLK: f64 = 32e6;

    #[test]
    fn test_rate_coerced_to_decimation() {
        let mut fe = FrontendState::new(Direction::Rx, MCLK);
        fe.set_rate(1e6, MCLK).unwrap();
        assert_eq!(fe.rate, 1e6);
        fe.set_rate(3e6, MCLK).unwrap();
        assert_eq!(fe.rate, MCLK / 11.0);
        fe.set_rate(1e12, MCLK).unwrap();
        assert_eq!(fe.rate, MCLK);
        assert!(fe.set_rate(-5.0, MCLK).is_err());
    }

    #[test]
    fn test_auto_tune_rx() {
        let mut fe = FrontendState::new(Direction::Rx, MCLK);
        let result = fe.tune(&TuneRequest::new(2.4e9 + 300.0), MCLK).unwrap();
        assert_eq!(result.target_rf_freq, 2.4e9 + 300.0);
        assert_eq!(result.actual_rf_freq, 2.4e9);
        assert_eq!(result.target_dsp_freq, -300.0);
        assert_eq!(fe.freq(), 2.4e9 + 300.0);
    }

    #[test]
    fn test_lo_offset_tune_tx() {
        let mut fe = FrontendState::new(Direction::Tx, MCLK);
        let result = fe
            .tune(&TuneRequest::with_lo_offset(915e6, 2e6), MCLK)
            .unwrap();
        assert_eq!(result.actual_rf_freq, 917e6);
        assert_eq!(result.actual_dsp_freq, -2e6);
        assert_eq!(fe.freq(), 915e6);
    }

    #[test]
    fn test_out_of_range_tune_is_clipped() {
        let mut fe = FrontendState::new(Direction::Rx, MCLK);
        let result = fe.tune(&TuneRequest::new(10e9), MCLK).unwrap();
        assert_eq!(result.clipped_rf_freq, FE_FREQ_MAX);
        assert_eq!(result.actual_dsp_freq, -MCLK / 2.0);
    }

    #[test]
    fn test_overall_gain_fills_stages_in_order() {
        let mut fe = FrontendState::new(Direction::Rx, MCLK);
        assert_eq!(fe.gain_range("").unwrap().stop().unwrap(), 76.0);
        fe.set_gain(40.0, "").unwrap();
        assert_eq!(fe.gain("LNA").unwrap(), 30.0);
        assert_eq!(fe.gain("PGA").unwrap(), 10.0);
        assert_eq!(fe.gain("").unwrap(), 40.0);

        fe.set_gain(12.3, "PGA").unwrap();
        assert_eq!(fe.gain("PGA").unwrap(), 12.5);
        assert!(matches!(fe.set_gain(1.0, "VGA"), Err(RadioError::Key(_))));
    }

    #[test]
    fn test_antenna_and_sensors() {
        let mut fe = FrontendState::new(Direction::Tx, MCLK);
        assert_eq!(fe.antenna, "TX/RX");
        assert!(fe.set_antenna("RX2").is_err());
        fe.set_antenna("CAL").unwrap();
        assert!(fe.sensor("rssi").is_err());
        assert_eq!(fe.sensor_names(), vec!["lo_locked"]);
    }
}
