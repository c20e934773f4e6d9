// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Value types passed to and returned from devices and streamers.

pub mod eeprom;
pub mod info;
pub mod ranges;
pub mod sensors;
pub mod stream;
pub mod subdev_spec;
pub mod time_spec;
pub mod tune;

pub use eeprom::{dboard_eeprom_path, mboard_eeprom_path, DboardEeprom, MboardEeprom};
pub use info::{Direction, UsrpInfo};
pub use ranges::{MetaRange, Range};
pub use sensors::{SensorData, SensorDataType, SensorValue};
pub use stream::{
    AsyncEventCode, AsyncMetadata, RxErrorCode, RxMetadata, SampleFormat, StreamArgs, StreamCmd,
    StreamMode, TxMetadata,
};
pub use subdev_spec::{SubdevSpec, SubdevSpecPair};
pub use time_spec::TimeSpec;
pub use tune::{TunePolicy, TuneRequest, TuneResult};
