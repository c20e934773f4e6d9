// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

/// Signal direction of a frontend or streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rx => "rx",
            Self::Tx => "tx",
        }
    }
}

/// Identification of the hardware behind one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsrpInfo {
    pub mboard_id: String,
    pub mboard_serial: String,
    pub frontend_id: String,
    pub subdev_name: String,
    pub subdev_spec: String,
    pub frontend_serial: String,
    pub antenna: String,
}
