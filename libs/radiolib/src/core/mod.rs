// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod config;
pub mod device;
pub mod device_addr;
pub mod driver;
pub mod error;
pub mod handles;
pub mod logging;
pub mod marshal;
pub mod registry;
pub mod session;
pub mod tree;
pub mod types;

pub use config::{RadioConfig, config_status, global_config};
pub use device::{RadioDevice, RxStreamer, TxStreamer};
pub use device_addr::DeviceAddr;
pub use driver::{Driver, DriverRegistration, register_driver};
pub use error::*;
pub use handles::{BindingState, ErrorSlot, HandleId, HandleTable, StreamerBinding, StreamerRecord};
pub use logging::init_logging;
pub use registry::{DeviceIndex, DeviceRegistry, RegistryEntry, StreamerSlots};
pub use session::{Session, global_session, guarded};
pub use tree::PropertyTree;
pub use types::*;
