// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Device and streamer traits implemented by radio drivers.
//!
//! Every method takes `&self`: a device is shared behind an `Arc` and may be
//! called from any thread, so implementations keep their mutable state behind
//! their own locks. Motherboard-scoped methods take an explicit `mboard`
//! index; frontend methods take a [`Direction`] and a channel.

use std::sync::Arc;

use super::tree::PropertyTree;
use super::types::{
    AsyncMetadata, Direction, MetaRange, RxMetadata, SensorValue, StreamArgs, StreamCmd,
    SubdevSpec, TimeSpec, TuneRequest, TuneResult, TxMetadata, UsrpInfo,
};
use super::{RadioError, Result};

/// A multi-channel radio.
pub trait RadioDevice: Send + Sync {
    /// Human-readable summary of the whole device.
    fn pp_string(&self) -> Result<String>;

    /// Identification of the hardware behind `chan`.
    fn usrp_info(&self, dir: Direction, chan: usize) -> Result<UsrpInfo>;

    fn tree(&self) -> &PropertyTree;

    // ---- Motherboard ----------------------------------------------------

    fn get_num_mboards(&self) -> Result<usize>;
    fn get_mboard_name(&self, mboard: usize) -> Result<String>;
    fn get_master_clock_rate(&self, mboard: usize) -> Result<f64>;
    fn set_master_clock_rate(&self, rate: f64, mboard: usize) -> Result<()>;

    fn get_time_now(&self, mboard: usize) -> Result<TimeSpec>;
    fn get_time_last_pps(&self, mboard: usize) -> Result<TimeSpec>;
    fn set_time_now(&self, time: TimeSpec, mboard: usize) -> Result<()>;
    fn set_time_next_pps(&self, time: TimeSpec, mboard: usize) -> Result<()>;
    /// Latch `time` on every motherboard at an unknown PPS edge.
    fn set_time_unknown_pps(&self, time: TimeSpec) -> Result<()>;
    fn get_time_synchronized(&self) -> Result<bool>;
    fn set_command_time(&self, time: TimeSpec, mboard: usize) -> Result<()>;
    fn clear_command_time(&self, mboard: usize) -> Result<()>;

    /// Issue a stream command to the receive DSP behind `chan`.
    fn issue_stream_cmd(&self, cmd: &StreamCmd, chan: usize) -> Result<()>;

    fn get_time_source(&self, mboard: usize) -> Result<String>;
    fn set_time_source(&self, source: &str, mboard: usize) -> Result<()>;
    fn get_time_sources(&self, mboard: usize) -> Result<Vec<String>>;
    fn get_clock_source(&self, mboard: usize) -> Result<String>;
    fn set_clock_source(&self, source: &str, mboard: usize) -> Result<()>;
    fn get_clock_sources(&self, mboard: usize) -> Result<Vec<String>>;
    fn set_clock_source_out(&self, enable: bool, mboard: usize) -> Result<()>;

    fn get_mboard_sensor(&self, name: &str, mboard: usize) -> Result<SensorValue>;
    fn get_mboard_sensor_names(&self, mboard: usize) -> Result<Vec<String>>;
    fn set_user_register(&self, addr: u8, data: u32, mboard: usize) -> Result<()>;

    // ---- Frontends ------------------------------------------------------

    fn get_subdev_spec(&self, dir: Direction, mboard: usize) -> Result<SubdevSpec>;
    fn set_subdev_spec(&self, dir: Direction, spec: &SubdevSpec, mboard: usize) -> Result<()>;
    fn get_num_channels(&self, dir: Direction) -> Result<usize>;
    fn get_subdev_name(&self, dir: Direction, chan: usize) -> Result<String>;

    fn get_rate(&self, dir: Direction, chan: usize) -> Result<f64>;
    fn set_rate(&self, dir: Direction, rate: f64, chan: usize) -> Result<()>;
    fn get_rates(&self, dir: Direction, chan: usize) -> Result<MetaRange>;

    fn set_freq(&self, dir: Direction, request: &TuneRequest, chan: usize) -> Result<TuneResult>;
    fn get_freq(&self, dir: Direction, chan: usize) -> Result<f64>;
    fn get_freq_range(&self, dir: Direction, chan: usize) -> Result<MetaRange>;
    fn get_fe_freq_range(&self, dir: Direction, chan: usize) -> Result<MetaRange>;

    /// Gain of the element `name`; an empty name means the overall gain.
    fn get_gain(&self, dir: Direction, name: &str, chan: usize) -> Result<f64>;
    fn set_gain(&self, dir: Direction, gain: f64, name: &str, chan: usize) -> Result<()>;
    fn get_gain_range(&self, dir: Direction, name: &str, chan: usize) -> Result<MetaRange>;
    fn get_gain_names(&self, dir: Direction, chan: usize) -> Result<Vec<String>>;

    /// Overall gain mapped onto `[0, 1]` across the overall gain range.
    fn get_normalized_gain(&self, dir: Direction, chan: usize) -> Result<f64> {
        let range = self.get_gain_range(dir, "", chan)?;
        let (start, stop) = (range.start()?, range.stop()?);
        if stop <= start {
            return Ok(0.0);
        }
        let gain = self.get_gain(dir, "", chan)?;
        Ok(((gain - start) / (stop - start)).clamp(0.0, 1.0))
    }

    fn set_normalized_gain(&self, dir: Direction, gain: f64, chan: usize) -> Result<()> {
        if !(0.0..=1.0).contains(&gain) {
            return Err(RadioError::Runtime(
                "Normalized gain out of range, must be in [0, 1].".to_string(),
            ));
        }
        let range = self.get_gain_range(dir, "", chan)?;
        let (start, stop) = (range.start()?, range.stop()?);
        self.set_gain(dir, start + gain * (stop - start), "", chan)
    }

    fn get_antenna(&self, dir: Direction, chan: usize) -> Result<String>;
    fn set_antenna(&self, dir: Direction, antenna: &str, chan: usize) -> Result<()>;
    fn get_antennas(&self, dir: Direction, chan: usize) -> Result<Vec<String>>;

    fn get_bandwidth(&self, dir: Direction, chan: usize) -> Result<f64>;
    fn set_bandwidth(&self, dir: Direction, bandwidth: f64, chan: usize) -> Result<()>;
    fn get_bandwidth_range(&self, dir: Direction, chan: usize) -> Result<MetaRange>;

    fn get_sensor(&self, dir: Direction, name: &str, chan: usize) -> Result<SensorValue>;
    fn get_sensor_names(&self, dir: Direction, chan: usize) -> Result<Vec<String>>;

    fn set_dc_offset_enabled(&self, dir: Direction, enable: bool, chan: usize) -> Result<()>;
    fn set_iq_balance_enabled(&self, dir: Direction, enable: bool, chan: usize) -> Result<()>;

    fn set_rx_agc(&self, _enable: bool, _chan: usize) -> Result<()> {
        Err(RadioError::NotImplemented(
            "AGC is not available on this device".to_string(),
        ))
    }

    // ---- GPIO -----------------------------------------------------------

    fn get_gpio_banks(&self, mboard: usize) -> Result<Vec<String>>;
    fn set_gpio_attr(
        &self,
        bank: &str,
        attr: &str,
        value: u32,
        mask: u32,
        mboard: usize,
    ) -> Result<()>;
    fn get_gpio_attr(&self, bank: &str, attr: &str, mboard: usize) -> Result<u32>;

    // ---- Streaming ------------------------------------------------------

    fn get_rx_stream(&self, args: &StreamArgs) -> Result<Arc<dyn RxStreamer>>;
    fn get_tx_stream(&self, args: &StreamArgs) -> Result<Arc<dyn TxStreamer>>;
}

/// Receive half of a stream.
pub trait RxStreamer: Send + Sync {
    fn num_channels(&self) -> usize;

    /// Largest number of samples one packet can carry.
    fn max_num_samps(&self) -> usize;

    /// Host-side bytes per sample.
    fn item_size(&self) -> usize;

    /// Fill up to `nsamps_per_buff` samples into each of `buffs` (one per
    /// channel). Timeouts are reported in `md`, not as an error.
    fn recv(
        &self,
        buffs: &mut [&mut [u8]],
        nsamps_per_buff: usize,
        md: &mut RxMetadata,
        timeout: f64,
        one_packet: bool,
    ) -> Result<usize>;

    fn issue_stream_cmd(&self, cmd: &StreamCmd) -> Result<()>;
}

/// Transmit half of a stream.
pub trait TxStreamer: Send + Sync {
    fn num_channels(&self) -> usize;
    fn max_num_samps(&self) -> usize;
    fn item_size(&self) -> usize;

    fn send(
        &self,
        buffs: &[&[u8]],
        nsamps_per_buff: usize,
        md: &TxMetadata,
        timeout: f64,
    ) -> Result<usize>;

    /// Wait up to `timeout` seconds for an async event. Returns `false` on
    /// timeout, leaving `md` untouched.
    fn recv_async_msg(&self, md: &mut AsyncMetadata, timeout: f64) -> Result<bool>;
}

/// Check that every buffer can hold `nsamps` samples of `item_size` bytes.
pub fn check_buffers(
    num_buffs: usize,
    channels: usize,
    lens: impl Iterator<Item = usize>,
    nsamps: usize,
    item_size: usize,
) -> Result<()> {
    if num_buffs != channels {
        return Err(RadioError::Value(format!(
            "expected {} buffers (one per channel), got {}",
            channels, num_buffs
        )));
    }
    let needed = nsamps.saturating_mul(item_size);
    for (i, len) in lens.enumerate() {
        if len < needed {
            return Err(RadioError::Value(format!(
                "buffer {} holds {} bytes, {} required",
                i, len, needed
            )));
        }
    }
    Ok(())
}
