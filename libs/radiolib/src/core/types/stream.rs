// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Stream configuration, stream commands, and per-transfer metadata.

use std::fmt;
use std::str::FromStr;

use super::TimeSpec;
use crate::core::{DeviceAddr, RadioError, Result};

/// Sample representation on the host or on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Complex double.
    Fc64,
    /// Complex float.
    Fc32,
    /// Complex int16.
    Sc16,
    /// Complex int8.
    Sc8,
}

impl SampleFormat {
    /// Bytes per complex sample.
    pub fn item_size(self) -> usize {
        match self {
            Self::Fc64 => 16,
            Self::Fc32 => 8,
            Self::Sc16 => 4,
            Self::Sc8 => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fc64 => "fc64",
            Self::Fc32 => "fc32",
            Self::Sc16 => "sc16",
            Self::Sc8 => "sc8",
        }
    }

    /// Formats a link can carry.
    pub fn is_wire_format(self) -> bool {
        matches!(self, Self::Sc16 | Self::Sc8)
    }
}

impl FromStr for SampleFormat {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fc64" => Ok(Self::Fc64),
            "fc32" => Ok(Self::Fc32),
            "sc16" => Ok(Self::Sc16),
            "sc8" => Ok(Self::Sc8),
            other => Err(RadioError::Value(format!(
                "unsupported sample format '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streamer construction request.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamArgs {
    /// Host-side sample format (`fc32`, ...).
    pub cpu_format: String,
    /// Over-the-wire sample format (`sc16`, ...).
    pub otw_format: String,
    /// Free-form driver arguments.
    pub args: DeviceAddr,
    /// Channel indices; empty means channel 0.
    pub channels: Vec<usize>,
}

impl StreamArgs {
    pub fn new(cpu_format: &str, otw_format: &str) -> Self {
        Self {
            cpu_format: cpu_format.to_string(),
            otw_format: otw_format.to_string(),
            args: DeviceAddr::new(),
            channels: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_args(mut self, args: DeviceAddr) -> Self {
        self.args = args;
        self
    }

    /// Parse and check both formats.
    pub fn formats(&self) -> Result<(SampleFormat, SampleFormat)> {
        let cpu: SampleFormat = self.cpu_format.parse()?;
        let otw: SampleFormat = self.otw_format.parse()?;
        if !otw.is_wire_format() {
            return Err(RadioError::Value(format!(
                "'{}' is not a valid over-the-wire format",
                otw
            )));
        }
        Ok((cpu, otw))
    }

    /// Requested channels, defaulting to `[0]`.
    pub fn effective_channels(&self) -> Vec<usize> {
        if self.channels.is_empty() {
            vec![0]
        } else {
            self.channels.clone()
        }
    }
}

/// How a receive stream should start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    StartContinuous,
    StopContinuous,
    NumSampsAndDone,
    NumSampsAndMore,
}

impl StreamMode {
    /// Boundary encoding (ASCII mnemonic).
    pub fn as_raw(self) -> i32 {
        match self {
            Self::StartContinuous => b'a' as i32,
            Self::StopContinuous => b'o' as i32,
            Self::NumSampsAndDone => b'd' as i32,
            Self::NumSampsAndMore => b'm' as i32,
        }
    }
}

impl TryFrom<i32> for StreamMode {
    type Error = RadioError;

    fn try_from(raw: i32) -> Result<Self> {
        match u8::try_from(raw).ok() {
            Some(b'a') => Ok(Self::StartContinuous),
            Some(b'o') => Ok(Self::StopContinuous),
            Some(b'd') => Ok(Self::NumSampsAndDone),
            Some(b'm') => Ok(Self::NumSampsAndMore),
            _ => Err(RadioError::Value(format!("invalid stream mode {}", raw))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamCmd {
    pub mode: StreamMode,
    pub num_samps: usize,
    pub stream_now: bool,
    pub time_spec: TimeSpec,
}

impl StreamCmd {
    pub fn new(mode: StreamMode) -> Self {
        Self {
            mode,
            num_samps: 0,
            stream_now: true,
            time_spec: TimeSpec::default(),
        }
    }

    pub fn start_continuous() -> Self {
        Self::new(StreamMode::StartContinuous)
    }

    pub fn stop_continuous() -> Self {
        Self::new(StreamMode::StopContinuous)
    }

    pub fn num_samps_and_done(num_samps: usize) -> Self {
        Self {
            num_samps,
            ..Self::new(StreamMode::NumSampsAndDone)
        }
    }

    pub fn at(mut self, time_spec: TimeSpec) -> Self {
        self.stream_now = false;
        self.time_spec = time_spec;
        self
    }
}

/// Receive-side error conditions reported through metadata.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RxErrorCode {
    #[default]
    None = 0x0,
    Timeout = 0x1,
    LateCommand = 0x2,
    BrokenChain = 0x4,
    Overflow = 0x8,
    Alignment = 0xc,
    BadPacket = 0xf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RxMetadata {
    pub has_time_spec: bool,
    pub time_spec: TimeSpec,
    pub more_fragments: bool,
    pub fragment_offset: usize,
    pub start_of_burst: bool,
    pub end_of_burst: bool,
    pub out_of_sequence: bool,
    pub error_code: RxErrorCode,
}

impl RxMetadata {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxMetadata {
    pub has_time_spec: bool,
    pub time_spec: TimeSpec,
    pub start_of_burst: bool,
    pub end_of_burst: bool,
}

/// Out-of-band transmit status events.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AsyncEventCode {
    #[default]
    BurstAck = 0x1,
    Underflow = 0x2,
    SeqError = 0x4,
    TimeError = 0x8,
    UnderflowInPacket = 0x10,
    SeqErrorInBurst = 0x20,
    UserPayload = 0x40,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsyncMetadata {
    pub channel: usize,
    pub has_time_spec: bool,
    pub time_spec: TimeSpec,
    pub event_code: AsyncEventCode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("fc32".parse::<SampleFormat>().unwrap(), SampleFormat::Fc32);
        assert_eq!(SampleFormat::Fc32.item_size(), 8);
        assert_eq!(SampleFormat::Sc16.item_size(), 4);
        assert!("fc33".parse::<SampleFormat>().is_err());
    }

    #[test]
    fn test_stream_args_formats() {
        let args = StreamArgs::new("fc32", "sc16");
        assert_eq!(
            args.formats().unwrap(),
            (SampleFormat::Fc32, SampleFormat::Sc16)
        );
        assert_eq!(args.effective_channels(), vec![0]);

        let bad_wire = StreamArgs::new("fc32", "fc32");
        assert!(matches!(bad_wire.formats(), Err(RadioError::Value(_))));
    }

    #[test]
    fn test_stream_mode_raw() {
        for mode in [
            StreamMode::StartContinuous,
            StreamMode::StopContinuous,
            StreamMode::NumSampsAndDone,
            StreamMode::NumSampsAndMore,
        ] {
            assert_eq!(StreamMode::try_from(mode.as_raw()).unwrap(), mode);
        }
        assert_eq!(StreamMode::StartContinuous.as_raw(), 97);
        assert!(StreamMode::try_from(0).is_err());
        assert!(StreamMode::try_from(-1).is_err());
    }

    #[test]
    fn test_stream_cmd_builders() {
        let cmd = StreamCmd::num_samps_and_done(512).at(TimeSpec::new(3, 0.5));
        assert_eq!(cmd.mode, StreamMode::NumSampsAndDone);
        assert_eq!(cmd.num_samps, 512);
        assert!(!cmd.stream_now);
        assert_eq!(cmd.time_spec.full_secs(), 3);
    }
}
