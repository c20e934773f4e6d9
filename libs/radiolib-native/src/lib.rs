// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

// FFI cdylib: all public functions are unsafe extern "C" called from C hosts.
#![allow(clippy::missing_safety_doc)]

//! C ABI over `radiolib`.
//!
//! Exposes `radio_*` functions that operate on opaque 64-bit handles. Every
//! function returns a [`RadioErrorCode`] and hands values back through
//! output pointers, which are written only when the call succeeds.
//!
//! Calls tied to a handle record their outcome in that handle's error slot
//! (`radio_device_last_error`, `radio_rx_streamer_last_error`, ...). Every
//! failure is also mirrored into a thread-local string readable with
//! [`radio_get_last_error`].

use std::ffi::c_char;

pub use radiolib::RadioErrorCode;

mod capture;
pub mod device;
mod dispatch;
pub mod frontend;
pub mod streamer;
pub mod types;

pub use types::*;

use capture::{StrOut, boundary};

/// Bumped whenever a signature or `#[repr(C)]` layout changes.
pub const RADIO_ABI_VERSION: u32 = 1;

// ============================================================================
// C ABI: Library
// ============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn radio_abi_version() -> u32 {
    RADIO_ABI_VERSION
}

/// Copy the most recent failure on the calling thread into `buf`.
///
/// Reading does not clear it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_get_last_error(buf: *mut c_char, len: usize) -> RadioErrorCode {
    // Read before `boundary` so a bad buffer cannot overwrite the message.
    let message = capture::last_error();
    boundary("radio_get_last_error", || {
        let out = StrOut::new(buf, len)?;
        unsafe { out.write(&message) };
        Ok(())
    })
}
