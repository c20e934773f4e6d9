// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Simulated radio backend (`type=sim`).
//!
//! Devices are pure software: a monotonic clock per motherboard, a
//! property tree seeded with EEPROM records, rx streamers that synthesize
//! a tone, and tx streamers that swallow samples and report burst status.
//! Discovery and default geometry come from the `sim` section of
//! [`RadioConfig`](crate::core::RadioConfig); any of those keys can be
//! overridden per device in the address (`type=sim,rx_channels=4`).

mod clock;
mod device;
mod frontend;
mod rx;
mod tx;

use std::sync::Arc;
use std::time::Duration;

pub use clock::SimClock;
pub use device::SimDevice;
pub use rx::SimRxStreamer;
pub use tx::SimTxStreamer;

use crate::core::config::{SimConfig, global_config};
use crate::core::driver::{Driver, DriverRegistration};
use crate::core::{DeviceAddr, RadioDevice, RadioError, Result};

/// Geometry of one simulated device.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub num_mboards: usize,
    /// Channels per motherboard.
    pub rx_channels: usize,
    pub tx_channels: usize,
    pub master_clock_rate: f64,
    pub frame_size: usize,
}

impl SimParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            num_mboards: config.num_mboards,
            rx_channels: config.rx_channels,
            tx_channels: config.tx_channels,
            master_clock_rate: config.master_clock_rate,
            frame_size: config.frame_size,
        }
    }

    /// Config defaults overridden by keys present in `addr`.
    pub fn from_addr(config: &SimConfig, addr: &DeviceAddr) -> Result<Self> {
        let defaults = Self::from_config(config);
        let params = Self {
            num_mboards: addr
                .get_parsed("num_mboards")?
                .unwrap_or(defaults.num_mboards),
            rx_channels: addr
                .get_parsed("rx_channels")?
                .unwrap_or(defaults.rx_channels),
            tx_channels: addr
                .get_parsed("tx_channels")?
                .unwrap_or(defaults.tx_channels),
            master_clock_rate: addr
                .get_parsed("master_clock_rate")?
                .unwrap_or(defaults.master_clock_rate),
            frame_size: addr
                .get_parsed("frame_size")?
                .unwrap_or(defaults.frame_size),
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<()> {
        if self.num_mboards == 0 || self.rx_channels == 0 || self.tx_channels == 0 {
            return Err(RadioError::Value(
                "simulated device needs at least one mboard and one channel per direction"
                    .to_string(),
            ));
        }
        if self.rx_channels > 26 || self.tx_channels > 26 {
            return Err(RadioError::Value(
                "simulated device supports at most 26 channels per mboard".to_string(),
            ));
        }
        if !(self.master_clock_rate.is_finite() && self.master_clock_rate > 0.0) {
            return Err(RadioError::Value(format!(
                "invalid master clock rate {}",
                self.master_clock_rate
            )));
        }
        if self.frame_size == 0 {
            return Err(RadioError::Value("frame_size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Marketing name, e.g. `SIM-2x2`.
    pub fn product(&self) -> String {
        format!("SIM-{}x{}", self.rx_channels, self.tx_channels)
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

#[derive(Default)]
pub struct SimDriver;

impl Driver for SimDriver {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn find(&self, hint: &DeviceAddr) -> Result<Vec<DeviceAddr>> {
        let config = &global_config().sim;
        if !config.enabled {
            return Ok(Vec::new());
        }
        let product = SimParams::from_config(config).product();
        let found = (0..config.num_devices)
            .map(|i| {
                DeviceAddr::new()
                    .with("type", "sim")
                    .with("serial", format!("SIM{:04}", i + 1))
                    .with("name", format!("sim{}", i))
                    .with("product", product.as_str())
            })
            .filter(|addr| addr.matches_hint(hint))
            .collect();
        Ok(found)
    }

    fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn RadioDevice>> {
        let params = SimParams::from_addr(&global_config().sim, addr)?;
        tracing::debug!("Opening simulated {} ({})", params.product(), addr);
        Ok(Arc::new(SimDevice::with_params(addr, params)))
    }
}

inventory::submit! {
    DriverRegistration::new::<SimDriver>()
}

/// Turn a caller timeout in seconds into a bounded `Duration`.
pub(crate) fn timeout_duration(timeout: f64) -> Duration {
    const MAX_WAIT_SECS: f64 = 86_400.0;
    if timeout.is_nan() || timeout <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(timeout.min(MAX_WAIT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_filters_by_hint() {
        let all = SimDriver.find(&DeviceAddr::new()).unwrap();
        assert_eq!(all.len(), global_config().sim.num_devices);
        assert!(all.iter().all(|a| a.get("type") == Some("sim")));

        let one = SimDriver
            .find(&DeviceAddr::parse("type=sim,serial=SIM0001"))
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].get("name"), Some("sim0"));

        let none = SimDriver.find(&DeviceAddr::parse("serial=nope")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_params_from_addr() {
        let config = SimConfig::default();
        let params =
            SimParams::from_addr(&config, &DeviceAddr::parse("rx_channels=4,frame_size=64"))
                .unwrap();
        assert_eq!(params.rx_channels, 4);
        assert_eq!(params.frame_size, 64);
        assert_eq!(params.tx_channels, config.tx_channels);
        assert_eq!(params.product(), "SIM-4x2");

        let err = SimParams::from_addr(&config, &DeviceAddr::parse("rx_channels=lots"))
            .unwrap_err();
        assert!(matches!(err, RadioError::Value(_)));
        assert!(SimParams::from_addr(&config, &DeviceAddr::parse("tx_channels=0")).is_err());
    }

    #[test]
    fn test_timeout_duration() {
        assert_eq!(timeout_duration(-1.0), Duration::ZERO);
        assert_eq!(timeout_duration(f64::NAN), Duration::ZERO);
        assert_eq!(timeout_duration(0.5), Duration::from_millis(500));
        assert_eq!(timeout_duration(f64::INFINITY), Duration::from_secs(86_400));
    }
}
