// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::frontend::FrontendState;
use super::rx::StreamControl;
use super::{SimClock, SimParams, SimRxStreamer, SimTxStreamer};
use crate::core::config::global_config;
use crate::core::{
    DboardEeprom, DeviceAddr, Direction, MboardEeprom, MetaRange, PropertyTree, RadioDevice,
    RadioError, Result, RxStreamer, SensorValue, StreamArgs, StreamCmd, SubdevSpec,
    SubdevSpecPair, TimeSpec, TuneRequest, TuneResult, TxStreamer, UsrpInfo, dboard_eeprom_path,
    mboard_eeprom_path,
};

const SOURCES: [&str; 3] = ["internal", "external", "gpsdo"];
const GPIO_BANK: &str = "FP0";
const GPIO_ATTRS: [&str; 8] = [
    "CTRL", "DDR", "OUT", "ATR_0X", "ATR_RX", "ATR_TX", "ATR_XX", "READBACK",
];
const RX_DBOARD_ID: u16 = 0x0101;
const TX_DBOARD_ID: u16 = 0x0102;

fn slot_name(slot: usize) -> String {
    char::from(b'A' + slot as u8).to_string()
}

fn default_spec(channels: usize) -> SubdevSpec {
    SubdevSpec::new(
        (0..channels)
            .map(|slot| SubdevSpecPair::new(&slot_name(slot), "0"))
            .collect(),
    )
}

struct MboardState {
    master_clock_rate: f64,
    time_source: String,
    clock_source: String,
    clock_source_out: bool,
    command_time: Option<TimeSpec>,
    user_registers: HashMap<u8, u32>,
    gpio: BTreeMap<&'static str, u32>,
    rx_spec: SubdevSpec,
    tx_spec: SubdevSpec,
}

impl MboardState {
    fn spec(&self, dir: Direction) -> &SubdevSpec {
        match dir {
            Direction::Rx => &self.rx_spec,
            Direction::Tx => &self.tx_spec,
        }
    }
}

struct SimMboard {
    clock: Arc<SimClock>,
    state: Mutex<MboardState>,
}

/// Software-only multi-channel radio.
pub struct SimDevice {
    addr: DeviceAddr,
    params: SimParams,
    tree: PropertyTree,
    mboards: Vec<SimMboard>,
    rx_frontends: Vec<Mutex<FrontendState>>,
    tx_frontends: Vec<Mutex<FrontendState>>,
    rx_controls: Vec<Arc<StreamControl>>,
}

impl SimDevice {
    /// Device with the geometry from the global configuration.
    pub fn new(addr: &DeviceAddr) -> Self {
        Self::with_params(addr, SimParams::from_config(&global_config().sim))
    }

    pub fn with_params(addr: &DeviceAddr, params: SimParams) -> Self {
        let epoch = Instant::now();
        let serial = addr.get("serial").unwrap_or("SIM0000").to_string();
        let name = addr.get("name").unwrap_or_default().to_string();
        let tree = PropertyTree::new();
        let mut mboards = Vec::with_capacity(params.num_mboards);

        for mb in 0..params.num_mboards {
            let mb_serial = if mb == 0 {
                serial.clone()
            } else {
                format!("{}-{}", serial, mb)
            };
            let eeprom: MboardEeprom = DeviceAddr::new()
                .with("serial", mb_serial.as_str())
                .with("name", name.as_str())
                .with("product", params.product());
            // Paths are unique per mboard, so creation cannot collide.
            let _ = tree.create(&format!("/mboards/{}/name", mb), params.product());
            let _ = tree.create(&mboard_eeprom_path(mb), eeprom);
            for slot in 0..params.rx_channels.max(params.tx_channels) {
                let slot_name = slot_name(slot);
                let db_serial = format!("{}{}{}", mb_serial, mb, slot_name);
                if slot < params.rx_channels {
                    let _ = tree.create(
                        &dboard_eeprom_path(mb, &slot_name, "rx"),
                        DboardEeprom::new(RX_DBOARD_ID, &db_serial, 1),
                    );
                }
                if slot < params.tx_channels {
                    let _ = tree.create(
                        &dboard_eeprom_path(mb, &slot_name, "tx"),
                        DboardEeprom::new(TX_DBOARD_ID, &db_serial, 1),
                    );
                }
            }

            let gpio = GPIO_ATTRS
                .iter()
                .filter(|a| **a != "READBACK")
                .map(|a| (*a, 0u32))
                .collect();
            mboards.push(SimMboard {
                clock: Arc::new(SimClock::new(epoch)),
                state: Mutex::new(MboardState {
                    master_clock_rate: params.master_clock_rate,
                    time_source: SOURCES[0].to_string(),
                    clock_source: SOURCES[0].to_string(),
                    clock_source_out: false,
                    command_time: None,
                    user_registers: HashMap::new(),
                    gpio,
                    rx_spec: default_spec(params.rx_channels),
                    tx_spec: default_spec(params.tx_channels),
                }),
            });
        }

        let rx_count = params.num_mboards * params.rx_channels;
        let tx_count = params.num_mboards * params.tx_channels;
        Self {
            addr: addr.clone(),
            tree,
            mboards,
            rx_frontends: (0..rx_count)
                .map(|_| Mutex::new(FrontendState::new(Direction::Rx, params.master_clock_rate)))
                .collect(),
            tx_frontends: (0..tx_count)
                .map(|_| Mutex::new(FrontendState::new(Direction::Tx, params.master_clock_rate)))
                .collect(),
            rx_controls: (0..rx_count)
                .map(|_| Arc::new(StreamControl::default()))
                .collect(),
            params,
        }
    }

    pub fn addr(&self) -> &DeviceAddr {
        &self.addr
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Last value written to a user register.
    pub fn user_register(&self, addr: u8, mboard: usize) -> Result<Option<u32>> {
        Ok(self
            .mboard(mboard)?
            .state
            .lock()
            .user_registers
            .get(&addr)
            .copied())
    }

    pub fn command_time(&self, mboard: usize) -> Result<Option<TimeSpec>> {
        Ok(self.mboard(mboard)?.state.lock().command_time)
    }

    pub fn clock_source_out(&self, mboard: usize) -> Result<bool> {
        Ok(self.mboard(mboard)?.state.lock().clock_source_out)
    }

    fn mboard(&self, mboard: usize) -> Result<&SimMboard> {
        self.mboards.get(mboard).ok_or_else(|| {
            RadioError::Index(format!(
                "Invalid mboard index {} (only {} available)",
                mboard,
                self.mboards.len()
            ))
        })
    }

    fn slots_per_mboard(&self, dir: Direction) -> usize {
        match dir {
            Direction::Rx => self.params.rx_channels,
            Direction::Tx => self.params.tx_channels,
        }
    }

    fn frontends(&self, dir: Direction) -> &[Mutex<FrontendState>] {
        match dir {
            Direction::Rx => &self.rx_frontends,
            Direction::Tx => &self.tx_frontends,
        }
    }

    /// Map a device-wide channel to `(mboard, frontend index, slot)` through
    /// the subdev specs.
    fn locate(&self, dir: Direction, chan: usize) -> Result<(usize, usize, usize)> {
        let mut remaining = chan;
        for (mb, board) in self.mboards.iter().enumerate() {
            let state = board.state.lock();
            let spec = state.spec(dir);
            if remaining < spec.len() {
                let slot = self.slot_index(dir, &spec.get(remaining)?.db_name)?;
                return Ok((mb, mb * self.slots_per_mboard(dir) + slot, slot));
            }
            remaining -= spec.len();
        }
        Err(RadioError::Index(format!(
            "Invalid {} channel {} (only {} available)",
            dir.as_str(),
            chan,
            chan - remaining
        )))
    }

    fn slot_index(&self, dir: Direction, db_name: &str) -> Result<usize> {
        let slot = match db_name.as_bytes() {
            [c @ b'A'..=b'Z'] => usize::from(c - b'A'),
            _ => usize::MAX,
        };
        if slot >= self.slots_per_mboard(dir) {
            return Err(RadioError::Value(format!(
                "No {} daughterboard in slot '{}'",
                dir.as_str(),
                db_name
            )));
        }
        Ok(slot)
    }

    fn with_frontend<T>(
        &self,
        dir: Direction,
        chan: usize,
        f: impl FnOnce(&mut FrontendState, f64) -> Result<T>,
    ) -> Result<T> {
        let (mb, index, _) = self.locate(dir, chan)?;
        let master_clock_rate = self.mboards[mb].state.lock().master_clock_rate;
        let mut frontend = self.frontends(dir)[index].lock();
        f(&mut frontend, master_clock_rate)
    }

    fn check_source(kind: &str, source: &str) -> Result<()> {
        if SOURCES.contains(&source) {
            Ok(())
        } else {
            Err(RadioError::Value(format!(
                "Invalid {} source '{}', choose from {:?}",
                kind, source, SOURCES
            )))
        }
    }

    fn check_gpio(bank: &str, attr: &str) -> Result<()> {
        if bank != GPIO_BANK {
            return Err(RadioError::Lookup(format!("Unknown GPIO bank '{}'", bank)));
        }
        if !GPIO_ATTRS.contains(&attr) {
            return Err(RadioError::Value(format!("Unknown GPIO attribute '{}'", attr)));
        }
        Ok(())
    }

    /// Channels plus the shared state a streamer on them needs.
    fn stream_setup(
        &self,
        dir: Direction,
        args: &StreamArgs,
    ) -> Result<(Vec<usize>, Vec<usize>, Arc<SimClock>, f64, usize)> {
        let channels = args.effective_channels();
        let mut indices = Vec::with_capacity(channels.len());
        for &chan in &channels {
            indices.push(self.locate(dir, chan)?);
        }
        let (mb, first, _) = indices[0];
        let rate = self.frontends(dir)[first].lock().rate;
        let frame_size = match args.args.get_parsed::<usize>("spp")? {
            Some(0) => return Err(RadioError::Value("spp must be non-zero".to_string())),
            Some(spp) => spp.min(self.params.frame_size),
            None => self.params.frame_size,
        };
        Ok((
            channels,
            indices.into_iter().map(|(_, index, _)| index).collect(),
            self.mboards[mb].clock.clone(),
            rate,
            frame_size,
        ))
    }
}

impl RadioDevice for SimDevice {
    fn pp_string(&self) -> Result<String> {
        let mut out = String::new();
        let kind = if self.mboards.len() > 1 { "Multi" } else { "Single" };
        out.push_str(&format!("{} USRP:\n", kind));
        out.push_str(&format!("  Device: Simulated Radio ({})\n", self.addr));
        for mb in 0..self.mboards.len() {
            out.push_str(&format!("  Mboard {}: {}\n", mb, self.get_mboard_name(mb)?));
        }
        for dir in [Direction::Rx, Direction::Tx] {
            let label = dir.as_str().to_uppercase();
            for chan in 0..self.get_num_channels(dir)? {
                let (_, _, slot) = self.locate(dir, chan)?;
                out.push_str(&format!("  {} Channel: {}\n", label, chan));
                out.push_str(&format!("    {} DSP: {}\n", label, chan));
                out.push_str(&format!("    {} Dboard: {}\n", label, slot_name(slot)));
                out.push_str(&format!(
                    "    {} Subdev: {}\n",
                    label,
                    self.get_subdev_name(dir, chan)?
                ));
            }
        }
        Ok(out)
    }

    fn usrp_info(&self, dir: Direction, chan: usize) -> Result<UsrpInfo> {
        let (mb, index, slot) = self.locate(dir, chan)?;
        let mboard_eeprom: MboardEeprom = self.tree.get(&mboard_eeprom_path(mb))?;
        let dboard_eeprom: DboardEeprom = self
            .tree
            .get(&dboard_eeprom_path(mb, &slot_name(slot), dir.as_str()))?;
        let subdev_spec = self.mboards[mb].state.lock().spec(dir).to_string();
        Ok(UsrpInfo {
            mboard_id: self.get_mboard_name(mb)?,
            mboard_serial: mboard_eeprom.get("serial").unwrap_or_default().to_string(),
            frontend_id: format!("SIMDB ({:#06x})", dboard_eeprom.id),
            subdev_name: self.get_subdev_name(dir, chan)?,
            subdev_spec,
            frontend_serial: dboard_eeprom.serial,
            antenna: self.frontends(dir)[index].lock().antenna.clone(),
        })
    }

    fn tree(&self) -> &PropertyTree {
        &self.tree
    }

    fn get_num_mboards(&self) -> Result<usize> {
        Ok(self.mboards.len())
    }

    fn get_mboard_name(&self, mboard: usize) -> Result<String> {
        self.mboard(mboard)?;
        self.tree.get(&format!("/mboards/{}/name", mboard))
    }

    fn get_master_clock_rate(&self, mboard: usize) -> Result<f64> {
        Ok(self.mboard(mboard)?.state.lock().master_clock_rate)
    }

    fn set_master_clock_rate(&self, rate: f64, mboard: usize) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(RadioError::Value(format!("invalid master clock rate {}", rate)));
        }
        self.mboard(mboard)?.state.lock().master_clock_rate = rate;
        Ok(())
    }

    fn get_time_now(&self, mboard: usize) -> Result<TimeSpec> {
        Ok(self.mboard(mboard)?.clock.now())
    }

    fn get_time_last_pps(&self, mboard: usize) -> Result<TimeSpec> {
        Ok(self.mboard(mboard)?.clock.last_pps())
    }

    fn set_time_now(&self, time: TimeSpec, mboard: usize) -> Result<()> {
        self.mboard(mboard)?.clock.set_now(time);
        Ok(())
    }

    fn set_time_next_pps(&self, time: TimeSpec, mboard: usize) -> Result<()> {
        self.mboard(mboard)?.clock.set_next_pps(time);
        Ok(())
    }

    fn set_time_unknown_pps(&self, time: TimeSpec) -> Result<()> {
        for board in &self.mboards {
            board.clock.set_next_pps(time);
        }
        Ok(())
    }

    fn get_time_synchronized(&self) -> Result<bool> {
        let Some(first) = self.mboards.first() else {
            return Ok(true);
        };
        let reference = first.clock.offset();
        Ok(self
            .mboards
            .iter()
            .all(|b| (b.clock.offset() - reference).abs() < 1e-6))
    }

    fn set_command_time(&self, time: TimeSpec, mboard: usize) -> Result<()> {
        self.mboard(mboard)?.state.lock().command_time = Some(time);
        Ok(())
    }

    fn clear_command_time(&self, mboard: usize) -> Result<()> {
        self.mboard(mboard)?.state.lock().command_time = None;
        Ok(())
    }

    fn issue_stream_cmd(&self, cmd: &StreamCmd, chan: usize) -> Result<()> {
        let (mb, index, _) = self.locate(Direction::Rx, chan)?;
        self.rx_controls[index].issue(cmd, self.mboards[mb].clock.now());
        Ok(())
    }

    fn get_time_source(&self, mboard: usize) -> Result<String> {
        Ok(self.mboard(mboard)?.state.lock().time_source.clone())
    }

    fn set_time_source(&self, source: &str, mboard: usize) -> Result<()> {
        Self::check_source("time", source)?;
        self.mboard(mboard)?.state.lock().time_source = source.to_string();
        Ok(())
    }

    fn get_time_sources(&self, mboard: usize) -> Result<Vec<String>> {
        self.mboard(mboard)?;
        Ok(SOURCES.iter().map(|s| s.to_string()).collect())
    }

    fn get_clock_source(&self, mboard: usize) -> Result<String> {
        Ok(self.mboard(mboard)?.state.lock().clock_source.clone())
    }

    fn set_clock_source(&self, source: &str, mboard: usize) -> Result<()> {
        Self::check_source("clock", source)?;
        self.mboard(mboard)?.state.lock().clock_source = source.to_string();
        Ok(())
    }

    fn get_clock_sources(&self, mboard: usize) -> Result<Vec<String>> {
        self.mboard(mboard)?;
        Ok(SOURCES.iter().map(|s| s.to_string()).collect())
    }

    fn set_clock_source_out(&self, enable: bool, mboard: usize) -> Result<()> {
        self.mboard(mboard)?.state.lock().clock_source_out = enable;
        Ok(())
    }

    fn get_mboard_sensor(&self, name: &str, mboard: usize) -> Result<SensorValue> {
        let board = self.mboard(mboard)?;
        match name {
            "ref_locked" => {
                // No reference is ever wired to a simulated board.
                let locked = board.state.lock().clock_source != "external";
                Ok(SensorValue::boolean(name, locked, "locked", "unlocked"))
            }
            "temp" => Ok(SensorValue::real(name, 42.0, "C")),
            _ => Err(RadioError::Lookup(format!(
                "mboard sensor '{}' not found",
                name
            ))),
        }
    }

    fn get_mboard_sensor_names(&self, mboard: usize) -> Result<Vec<String>> {
        self.mboard(mboard)?;
        Ok(vec!["ref_locked".to_string(), "temp".to_string()])
    }

    fn set_user_register(&self, addr: u8, data: u32, mboard: usize) -> Result<()> {
        self.mboard(mboard)?
            .state
            .lock()
            .user_registers
            .insert(addr, data);
        Ok(())
    }

    fn get_subdev_spec(&self, dir: Direction, mboard: usize) -> Result<SubdevSpec> {
        Ok(self.mboard(mboard)?.state.lock().spec(dir).clone())
    }

    fn set_subdev_spec(&self, dir: Direction, spec: &SubdevSpec, mboard: usize) -> Result<()> {
        let board = self.mboard(mboard)?;
        if spec.is_empty() {
            return Err(RadioError::Value("subdev spec cannot be empty".to_string()));
        }
        let mut seen = Vec::with_capacity(spec.len());
        for pair in spec.pairs() {
            let slot = self.slot_index(dir, &pair.db_name)?;
            if !matches!(pair.sd_name.as_str(), "" | "0") {
                return Err(RadioError::Value(format!(
                    "No subdevice '{}' on daughterboard {}",
                    pair.sd_name, pair.db_name
                )));
            }
            if seen.contains(&slot) {
                return Err(RadioError::Value(format!(
                    "Daughterboard {} listed twice in subdev spec",
                    pair.db_name
                )));
            }
            seen.push(slot);
        }
        let mut state = board.state.lock();
        match dir {
            Direction::Rx => state.rx_spec = spec.clone(),
            Direction::Tx => state.tx_spec = spec.clone(),
        }
        Ok(())
    }

    fn get_num_channels(&self, dir: Direction) -> Result<usize> {
        Ok(self
            .mboards
            .iter()
            .map(|b| b.state.lock().spec(dir).len())
            .sum())
    }

    fn get_subdev_name(&self, dir: Direction, chan: usize) -> Result<String> {
        let (_, _, slot) = self.locate(dir, chan)?;
        Ok(format!(
            "SIM-{} {}",
            dir.as_str().to_uppercase(),
            slot_name(slot)
        ))
    }

    fn get_rate(&self, dir: Direction, chan: usize) -> Result<f64> {
        self.with_frontend(dir, chan, |fe, _| Ok(fe.rate))
    }

    fn set_rate(&self, dir: Direction, rate: f64, chan: usize) -> Result<()> {
        self.with_frontend(dir, chan, |fe, mclk| fe.set_rate(rate, mclk))
    }

    fn get_rates(&self, dir: Direction, chan: usize) -> Result<MetaRange> {
        self.with_frontend(dir, chan, |_, mclk| Ok(FrontendState::rate_range(mclk)))
    }

    fn set_freq(&self, dir: Direction, request: &TuneRequest, chan: usize) -> Result<TuneResult> {
        self.with_frontend(dir, chan, |fe, mclk| fe.tune(request, mclk))
    }

    fn get_freq(&self, dir: Direction, chan: usize) -> Result<f64> {
        self.with_frontend(dir, chan, |fe, _| Ok(fe.freq()))
    }

    fn get_freq_range(&self, dir: Direction, chan: usize) -> Result<MetaRange> {
        self.with_frontend(dir, chan, |_, mclk| Ok(FrontendState::freq_range(mclk)))
    }

    fn get_fe_freq_range(&self, dir: Direction, chan: usize) -> Result<MetaRange> {
        self.with_frontend(dir, chan, |_, _| Ok(FrontendState::fe_freq_range()))
    }

    fn get_gain(&self, dir: Direction, name: &str, chan: usize) -> Result<f64> {
        self.with_frontend(dir, chan, |fe, _| fe.gain(name))
    }

    fn set_gain(&self, dir: Direction, gain: f64, name: &str, chan: usize) -> Result<()> {
        self.with_frontend(dir, chan, |fe, _| fe.set_gain(gain, name))
    }

    fn get_gain_range(&self, dir: Direction, name: &str, chan: usize) -> Result<MetaRange> {
        self.with_frontend(dir, chan, |fe, _| fe.gain_range(name))
    }

    fn get_gain_names(&self, dir: Direction, chan: usize) -> Result<Vec<String>> {
        self.with_frontend(dir, chan, |fe, _| Ok(fe.gain_names()))
    }

    fn get_antenna(&self, dir: Direction, chan: usize) -> Result<String> {
        self.with_frontend(dir, chan, |fe, _| Ok(fe.antenna.clone()))
    }

    fn set_antenna(&self, dir: Direction, antenna: &str, chan: usize) -> Result<()> {
        self.with_frontend(dir, chan, |fe, _| fe.set_antenna(antenna))
    }

    fn get_antennas(&self, dir: Direction, chan: usize) -> Result<Vec<String>> {
        self.locate(dir, chan)?;
        Ok(FrontendState::antennas(dir)
            .iter()
            .map(|a| a.to_string())
            .collect())
    }

    fn get_bandwidth(&self, dir: Direction, chan: usize) -> Result<f64> {
        self.with_frontend(dir, chan, |fe, _| Ok(fe.bandwidth))
    }

    fn set_bandwidth(&self, dir: Direction, bandwidth: f64, chan: usize) -> Result<()> {
        self.with_frontend(dir, chan, |fe, _| fe.set_bandwidth(bandwidth))
    }

    fn get_bandwidth_range(&self, dir: Direction, chan: usize) -> Result<MetaRange> {
        self.locate(dir, chan)?;
        Ok(FrontendState::bandwidth_range())
    }

    fn get_sensor(&self, dir: Direction, name: &str, chan: usize) -> Result<SensorValue> {
        self.with_frontend(dir, chan, |fe, _| fe.sensor(name))
    }

    fn get_sensor_names(&self, dir: Direction, chan: usize) -> Result<Vec<String>> {
        self.with_frontend(dir, chan, |fe, _| Ok(fe.sensor_names()))
    }

    fn set_dc_offset_enabled(&self, dir: Direction, enable: bool, chan: usize) -> Result<()> {
        self.with_frontend(dir, chan, |fe, _| {
            fe.dc_offset_enabled = enable;
            Ok(())
        })
    }

    fn set_iq_balance_enabled(&self, dir: Direction, enable: bool, chan: usize) -> Result<()> {
        self.with_frontend(dir, chan, |fe, _| {
            fe.iq_balance_enabled = enable;
            Ok(())
        })
    }

    fn set_rx_agc(&self, enable: bool, chan: usize) -> Result<()> {
        self.with_frontend(Direction::Rx, chan, |fe, _| {
            fe.agc_enabled = enable;
            Ok(())
        })
    }

    fn get_gpio_banks(&self, mboard: usize) -> Result<Vec<String>> {
        self.mboard(mboard)?;
        Ok(vec![GPIO_BANK.to_string()])
    }

    fn set_gpio_attr(
        &self,
        bank: &str,
        attr: &str,
        value: u32,
        mask: u32,
        mboard: usize,
    ) -> Result<()> {
        let board = self.mboard(mboard)?;
        Self::check_gpio(bank, attr)?;
        let mut state = board.state.lock();
        let Some(current) = state.gpio.get_mut(attr) else {
            return Err(RadioError::Value(format!("GPIO attribute '{}' is read-only", attr)));
        };
        *current = (*current & !mask) | (value & mask);
        Ok(())
    }

    fn get_gpio_attr(&self, bank: &str, attr: &str, mboard: usize) -> Result<u32> {
        let board = self.mboard(mboard)?;
        Self::check_gpio(bank, attr)?;
        let state = board.state.lock();
        let read = |name: &str| state.gpio.get(name).copied().unwrap_or_default();
        if attr == "READBACK" {
            // Inputs float low; only driven outputs read back.
            return Ok(read("OUT") & read("DDR"));
        }
        Ok(read(attr))
    }

    fn get_rx_stream(&self, args: &StreamArgs) -> Result<Arc<dyn RxStreamer>> {
        let (cpu_format, _) = args.formats()?;
        let (channels, indices, clock, rate, frame_size) = self.stream_setup(Direction::Rx, args)?;
        let controls = indices
            .iter()
            .map(|&index| self.rx_controls[index].clone())
            .collect();
        tracing::debug!(
            "Sim rx stream {}/{} on channels {:?}",
            args.cpu_format,
            args.otw_format,
            channels
        );
        Ok(Arc::new(SimRxStreamer::new(
            controls, channels, clock, cpu_format, rate, frame_size,
        )))
    }

    fn get_tx_stream(&self, args: &StreamArgs) -> Result<Arc<dyn TxStreamer>> {
        let (cpu_format, _) = args.formats()?;
        let (channels, _, clock, rate, frame_size) = self.stream_setup(Direction::Tx, args)?;
        tracing::debug!(
            "Sim tx stream {}/{} on channels {:?}",
            args.cpu_format,
            args.otw_format,
            channels
        );
        Ok(Arc::new(SimTxStreamer::new(
            channels, clock, cpu_format, rate, frame_size,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RxMetadata;

    fn device(extra: &str) -> SimDevice {
        let addr = DeviceAddr::parse(&format!("type=sim,serial=SIM0042,name=bench,{}", extra));
        let params = SimParams::from_addr(&Default::default(), &addr).unwrap();
        SimDevice::with_params(&addr, params)
    }

    #[test]
    fn test_channels_follow_subdev_spec() {
        let dev = device("num_mboards=2,rx_channels=2");
        assert_eq!(dev.get_num_channels(Direction::Rx).unwrap(), 4);
        assert_eq!(dev.get_subdev_name(Direction::Rx, 3).unwrap(), "SIM-RX B");

        dev.set_subdev_spec(Direction::Rx, &"B:0".parse().unwrap(), 0)
            .unwrap();
        assert_eq!(dev.get_num_channels(Direction::Rx).unwrap(), 3);
        assert_eq!(dev.get_subdev_name(Direction::Rx, 0).unwrap(), "SIM-RX B");

        let err = dev
            .set_subdev_spec(Direction::Rx, &"C:0".parse().unwrap(), 0)
            .unwrap_err();
        assert!(matches!(err, RadioError::Value(_)));
        assert!(matches!(
            dev.get_rate(Direction::Rx, 3),
            Err(RadioError::Index(_))
        ));
    }

    #[test]
    fn test_info_and_eeproms() {
        let dev = device("");
        let info = dev.usrp_info(Direction::Tx, 1).unwrap();
        assert_eq!(info.mboard_id, "SIM-2x2");
        assert_eq!(info.mboard_serial, "SIM0042");
        assert_eq!(info.frontend_id, "SIMDB (0x0102)");
        assert_eq!(info.subdev_spec, "A:0 B:0");
        assert_eq!(info.antenna, "TX/RX");

        let eeprom: DboardEeprom = dev
            .tree()
            .get(&dboard_eeprom_path(0, "B", "rx"))
            .unwrap();
        assert_eq!(eeprom.id, RX_DBOARD_ID);
        assert_eq!(eeprom.serial, "SIM00420B");
    }

    #[test]
    fn test_sources_and_sensors() {
        let dev = device("");
        assert_eq!(dev.get_clock_source(0).unwrap(), "internal");
        dev.set_clock_source("external", 0).unwrap();
        let locked = dev.get_mboard_sensor("ref_locked", 0).unwrap();
        assert_eq!(locked.to_string(), "ref_locked: unlocked");
        assert!(dev.set_time_source("sundial", 0).is_err());
        assert!(matches!(dev.get_time_source(3), Err(RadioError::Index(_))));
        assert!(matches!(
            dev.get_mboard_sensor("humidity", 0),
            Err(RadioError::Lookup(_))
        ));
    }

    #[test]
    fn test_gpio_masking() {
        let dev = device("");
        dev.set_gpio_attr("FP0", "DDR", 0x0ff, 0xfff, 0).unwrap();
        dev.set_gpio_attr("FP0", "OUT", 0xabc, 0x0f0, 0).unwrap();
        assert_eq!(dev.get_gpio_attr("FP0", "OUT", 0).unwrap(), 0x0b0);
        assert_eq!(dev.get_gpio_attr("FP0", "READBACK", 0).unwrap(), 0x0b0);
        assert!(dev.set_gpio_attr("FP0", "READBACK", 1, 1, 0).is_err());
        assert!(matches!(
            dev.get_gpio_attr("FP9", "OUT", 0),
            Err(RadioError::Lookup(_))
        ));
    }

    #[test]
    fn test_time_and_registers() {
        let dev = device("num_mboards=2");
        assert!(dev.get_time_synchronized().unwrap());
        dev.set_time_now(TimeSpec::new(50, 0.0), 1).unwrap();
        assert!(!dev.get_time_synchronized().unwrap());
        dev.set_time_unknown_pps(TimeSpec::new(0, 0.0)).unwrap();
        assert!(dev.get_time_synchronized().unwrap());

        dev.set_command_time(TimeSpec::new(5, 0.5), 1).unwrap();
        assert_eq!(dev.command_time(1).unwrap(), Some(TimeSpec::new(5, 0.5)));
        dev.clear_command_time(1).unwrap();
        assert_eq!(dev.command_time(1).unwrap(), None);

        dev.set_user_register(7, 0xdead_beef, 0).unwrap();
        assert_eq!(dev.user_register(7, 0).unwrap(), Some(0xdead_beef));
    }

    #[test]
    fn test_device_stream_cmd_reaches_streamer() {
        let dev = device("frame_size=64");
        let args = StreamArgs::new("sc16", "sc16").with_channels(vec![1]);
        let rx = dev.get_rx_stream(&args).unwrap();
        assert_eq!(rx.max_num_samps(), 64);
        dev.issue_stream_cmd(&StreamCmd::num_samps_and_done(10), 1)
            .unwrap();

        let mut buf = vec![0u8; 10 * 4];
        let mut buffs = [buf.as_mut_slice()];
        let mut md = RxMetadata::default();
        assert_eq!(rx.recv(&mut buffs, 10, &mut md, 0.1, false).unwrap(), 10);
        assert!(md.end_of_burst);
    }

    #[test]
    fn test_stream_arg_validation() {
        let dev = device("");
        let bad_chan = StreamArgs::new("fc32", "sc16").with_channels(vec![0, 5]);
        assert!(matches!(
            dev.get_rx_stream(&bad_chan).map(|_| ()),
            Err(RadioError::Index(_))
        ));
        let bad_otw = StreamArgs::new("fc32", "fc32");
        assert!(matches!(
            dev.get_tx_stream(&bad_otw).map(|_| ()),
            Err(RadioError::Value(_))
        ));
        let spp = StreamArgs::new("fc32", "sc8").with_args(DeviceAddr::parse("spp=100"));
        assert_eq!(dev.get_tx_stream(&spp).unwrap().max_num_samps(), 100);
    }
}
