// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handle registry and dispatch layer for software-defined radios.
//!
//! Devices come from drivers discovered by name (`type=...` in the device
//! address). Live devices and their streamers are owned by a [`Session`];
//! callers refer to them by plain integer handles, which is what lets
//! `radiolib-native` expose everything through a flat C ABI.

#![allow(clippy::too_many_arguments)] // Driver entry points mirror the hardware API

pub use inventory;

pub mod core;
pub mod sim;

pub use self::core::*;
