// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! `#[repr(C)]` types shared with C callers, plus conversions to and from
//! the `radiolib` value types.

use std::ffi::{c_char, c_int};

use libc::time_t;
use radiolib::marshal::copy_str_into;
use radiolib::{
    AsyncMetadata, DboardEeprom, DeviceAddr, HandleId, Range, RadioError, Result, RxMetadata,
    SensorDataType, SensorValue, StreamArgs, StreamCmd, StreamMode, TimeSpec, TunePolicy,
    TuneRequest, TuneResult, TxMetadata, UsrpInfo,
};

use crate::capture::input_str;

/// Capacity of every fixed-size text field, terminator included.
pub const RADIO_TEXT_LEN: usize = 64;

pub type RadioText = [c_char; RADIO_TEXT_LEN];

fn text(s: &str) -> RadioText {
    let mut bytes = [0u8; RADIO_TEXT_LEN];
    copy_str_into(&mut bytes, s);
    bytes.map(|b| b as c_char)
}

fn text_to_string(field: &RadioText) -> Result<String> {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8(bytes).map_err(|_| RadioError::Value("text field is not UTF-8".to_string()))
}

pub(crate) fn time_to_c(time: TimeSpec) -> (time_t, f64) {
    (time.full_secs() as time_t, time.frac_secs())
}

pub(crate) fn time_from_c(full_secs: time_t, frac_secs: f64) -> TimeSpec {
    TimeSpec::new(full_secs as i64, frac_secs)
}

// ============================================================================
// Handles
// ============================================================================

/// Opaque device token. The value is the registry index; zero is null.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RadioDeviceHandle(pub u64);

/// Opaque receive-streamer token; zero is null.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RadioRxStreamerHandle(pub HandleId);

/// Opaque transmit-streamer token; zero is null.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RadioTxStreamerHandle(pub HandleId);

impl RadioDeviceHandle {
    pub const NULL: Self = Self(0);
}

impl RadioRxStreamerHandle {
    pub const NULL: Self = Self(0);
}

impl RadioTxStreamerHandle {
    pub const NULL: Self = Self(0);
}

// ============================================================================
// Streaming
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioStreamArgs {
    pub cpu_format: *const c_char,
    pub otw_format: *const c_char,
    /// Optional `k=v,...` driver arguments; null means none.
    pub args: *const c_char,
    pub channel_list: *const usize,
    pub n_channels: usize,
}

impl RadioStreamArgs {
    /// # Safety
    ///
    /// Every non-null pointer must be valid; `channel_list` must hold
    /// `n_channels` entries.
    pub(crate) unsafe fn to_stream_args(&self) -> Result<StreamArgs> {
        let cpu_format = unsafe { input_str(self.cpu_format, "cpu_format") }?;
        let otw_format = unsafe { input_str(self.otw_format, "otw_format") }?;
        let args = if self.args.is_null() {
            DeviceAddr::new()
        } else {
            DeviceAddr::parse(unsafe { input_str(self.args, "args") }?)
        };
        let channels = match (self.channel_list.is_null(), self.n_channels) {
            (_, 0) => Vec::new(),
            (true, _) => {
                return Err(RadioError::Value(
                    "channel_list is null but n_channels is non-zero".to_string(),
                ));
            }
            (false, n) => unsafe { std::slice::from_raw_parts(self.channel_list, n) }.to_vec(),
        };
        Ok(StreamArgs::new(cpu_format, otw_format)
            .with_args(args)
            .with_channels(channels))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioStreamCmd {
    /// `'a'` start continuous, `'o'` stop continuous, `'d'` num samps and
    /// done, `'m'` num samps and more.
    pub stream_mode: c_int,
    pub num_samps: usize,
    pub stream_now: bool,
    pub time_spec_full_secs: time_t,
    pub time_spec_frac_secs: f64,
}

impl TryFrom<&RadioStreamCmd> for StreamCmd {
    type Error = RadioError;

    fn try_from(cmd: &RadioStreamCmd) -> Result<Self> {
        Ok(StreamCmd {
            mode: StreamMode::try_from(cmd.stream_mode)?,
            num_samps: cmd.num_samps,
            stream_now: cmd.stream_now,
            time_spec: time_from_c(cmd.time_spec_full_secs, cmd.time_spec_frac_secs),
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadioRxMetadata {
    pub has_time_spec: bool,
    pub time_spec_full_secs: time_t,
    pub time_spec_frac_secs: f64,
    pub more_fragments: bool,
    pub fragment_offset: usize,
    pub start_of_burst: bool,
    pub end_of_burst: bool,
    pub out_of_sequence: bool,
    /// One of the `RxErrorCode` values (`0x1` timeout, ...).
    pub error_code: c_int,
}

impl From<&RxMetadata> for RadioRxMetadata {
    fn from(md: &RxMetadata) -> Self {
        let (full, frac) = time_to_c(md.time_spec);
        Self {
            has_time_spec: md.has_time_spec,
            time_spec_full_secs: full,
            time_spec_frac_secs: frac,
            more_fragments: md.more_fragments,
            fragment_offset: md.fragment_offset,
            start_of_burst: md.start_of_burst,
            end_of_burst: md.end_of_burst,
            out_of_sequence: md.out_of_sequence,
            error_code: md.error_code as c_int,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadioTxMetadata {
    pub has_time_spec: bool,
    pub time_spec_full_secs: time_t,
    pub time_spec_frac_secs: f64,
    pub start_of_burst: bool,
    pub end_of_burst: bool,
}

impl From<&RadioTxMetadata> for TxMetadata {
    fn from(md: &RadioTxMetadata) -> Self {
        Self {
            has_time_spec: md.has_time_spec,
            time_spec: time_from_c(md.time_spec_full_secs, md.time_spec_frac_secs),
            start_of_burst: md.start_of_burst,
            end_of_burst: md.end_of_burst,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadioAsyncMetadata {
    pub channel: usize,
    pub has_time_spec: bool,
    pub time_spec_full_secs: time_t,
    pub time_spec_frac_secs: f64,
    /// One of the `AsyncEventCode` values (`0x1` burst ack, ...).
    pub event_code: c_int,
}

impl From<&AsyncMetadata> for RadioAsyncMetadata {
    fn from(md: &AsyncMetadata) -> Self {
        let (full, frac) = time_to_c(md.time_spec);
        Self {
            channel: md.channel,
            has_time_spec: md.has_time_spec,
            time_spec_full_secs: full,
            time_spec_frac_secs: frac,
            event_code: md.event_code as c_int,
        }
    }
}

// ============================================================================
// Tuning and ranges
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioTuneRequest {
    pub target_freq: f64,
    /// `'N'` none, `'A'` auto, `'M'` manual.
    pub rf_freq_policy: c_int,
    pub rf_freq: f64,
    pub dsp_freq_policy: c_int,
    pub dsp_freq: f64,
    /// Optional `k=v,...` tuning arguments; null means none.
    pub args: *const c_char,
}

impl RadioTuneRequest {
    /// # Safety
    ///
    /// `args` must be null or a valid NUL-terminated string.
    pub(crate) unsafe fn to_tune_request(&self) -> Result<TuneRequest> {
        let args = if self.args.is_null() {
            DeviceAddr::new()
        } else {
            DeviceAddr::parse(unsafe { input_str(self.args, "args") }?)
        };
        Ok(TuneRequest {
            target_freq: self.target_freq,
            rf_freq_policy: TunePolicy::try_from(self.rf_freq_policy)?,
            rf_freq: self.rf_freq,
            dsp_freq_policy: TunePolicy::try_from(self.dsp_freq_policy)?,
            dsp_freq: self.dsp_freq,
            args,
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadioTuneResult {
    pub clipped_rf_freq: f64,
    pub target_rf_freq: f64,
    pub actual_rf_freq: f64,
    pub target_dsp_freq: f64,
    pub actual_dsp_freq: f64,
}

impl From<TuneResult> for RadioTuneResult {
    fn from(result: TuneResult) -> Self {
        Self {
            clipped_rf_freq: result.clipped_rf_freq,
            target_rf_freq: result.target_rf_freq,
            actual_rf_freq: result.actual_rf_freq,
            target_dsp_freq: result.target_dsp_freq,
            actual_dsp_freq: result.actual_dsp_freq,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadioRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl From<&Range> for RadioRange {
    fn from(range: &Range) -> Self {
        Self {
            start: range.start,
            stop: range.stop,
            step: range.step,
        }
    }
}

// ============================================================================
// Sensors, EEPROMs, info
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioSensorValue {
    pub name: RadioText,
    /// Reading formatted as text (`"true"`, `"42"`, ...).
    pub value: RadioText,
    pub unit: RadioText,
    pub data_type: SensorDataType,
    /// Numeric view of the reading; booleans read as 0 or 1.
    pub realnum: f64,
}

impl From<&SensorValue> for RadioSensorValue {
    fn from(sensor: &SensorValue) -> Self {
        Self {
            name: text(&sensor.name),
            value: text(&sensor.value_string()),
            unit: text(&sensor.unit),
            data_type: sensor.data_type(),
            realnum: sensor.to_real(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioDboardEeprom {
    pub id: u16,
    pub serial: RadioText,
    pub revision: i32,
}

impl From<&DboardEeprom> for RadioDboardEeprom {
    fn from(eeprom: &DboardEeprom) -> Self {
        Self {
            id: eeprom.id,
            serial: text(&eeprom.serial),
            revision: eeprom.revision,
        }
    }
}

impl TryFrom<&RadioDboardEeprom> for DboardEeprom {
    type Error = RadioError;

    fn try_from(eeprom: &RadioDboardEeprom) -> Result<Self> {
        Ok(DboardEeprom::new(
            eeprom.id,
            &text_to_string(&eeprom.serial)?,
            eeprom.revision,
        ))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioUsrpRxInfo {
    pub mboard_id: RadioText,
    pub mboard_serial: RadioText,
    pub rx_id: RadioText,
    pub rx_subdev_name: RadioText,
    pub rx_subdev_spec: RadioText,
    pub rx_serial: RadioText,
    pub rx_antenna: RadioText,
}

impl From<&UsrpInfo> for RadioUsrpRxInfo {
    fn from(info: &UsrpInfo) -> Self {
        Self {
            mboard_id: text(&info.mboard_id),
            mboard_serial: text(&info.mboard_serial),
            rx_id: text(&info.frontend_id),
            rx_subdev_name: text(&info.subdev_name),
            rx_subdev_spec: text(&info.subdev_spec),
            rx_serial: text(&info.frontend_serial),
            rx_antenna: text(&info.antenna),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RadioUsrpTxInfo {
    pub mboard_id: RadioText,
    pub mboard_serial: RadioText,
    pub tx_id: RadioText,
    pub tx_subdev_name: RadioText,
    pub tx_subdev_spec: RadioText,
    pub tx_serial: RadioText,
    pub tx_antenna: RadioText,
}

impl From<&UsrpInfo> for RadioUsrpTxInfo {
    fn from(info: &UsrpInfo) -> Self {
        Self {
            mboard_id: text(&info.mboard_id),
            mboard_serial: text(&info.mboard_serial),
            tx_id: text(&info.frontend_id),
            tx_subdev_name: text(&info.subdev_name),
            tx_subdev_spec: text(&info.subdev_spec),
            tx_serial: text(&info.frontend_serial),
            tx_antenna: text(&info.antenna),
        }
    }
}

/// Read a fixed-size text field back as a Rust string.
pub fn text_field(field: &RadioText) -> String {
    // Fields written by this crate are always valid UTF-8.
    text_to_string(field).unwrap_or_default()
}
