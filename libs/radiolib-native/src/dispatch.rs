// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Resolve → forward → marshal helpers behind the device entry points.
//!
//! Each helper resolves the handle, checks output pointers inside the
//! forwarded call (so a bad pointer is recorded like any other failure),
//! and writes outputs only after the call returned `Ok`.

use std::ffi::c_char;

use radiolib::{MetaRange, RadioDevice, RadioError, RadioErrorCode, Result, global_session};

use crate::capture::{ListOut, Out, StrOut, boundary};
use crate::types::{RadioDeviceHandle, RadioRange};

/// Forward `f` to the device behind `h`, recording the outcome in the
/// device's error slot.
pub(crate) fn forward<T>(
    h: RadioDeviceHandle,
    f: impl FnOnce(&dyn RadioDevice) -> Result<T>,
) -> Result<T> {
    global_session().device_call(h.0, f)
}

/// Call with no outputs.
pub(crate) fn device_set(
    name: &'static str,
    h: RadioDeviceHandle,
    f: impl FnOnce(&dyn RadioDevice) -> Result<()>,
) -> RadioErrorCode {
    boundary(name, || forward(h, f))
}

/// Call producing one value.
///
/// # Safety
///
/// `out` must be null or valid for writes.
pub(crate) unsafe fn device_get<T>(
    name: &'static str,
    h: RadioDeviceHandle,
    out: *mut T,
    f: impl FnOnce(&dyn RadioDevice) -> Result<T>,
) -> RadioErrorCode {
    boundary(name, || {
        let (out, value) = forward(h, |dev| {
            let out = Out::new(out, "output pointer")?;
            Ok((out, f(dev)?))
        })?;
        unsafe { out.write(value) };
        Ok(())
    })
}

/// Call producing a string copied into `(buf, len)`.
///
/// # Safety
///
/// `buf` must be null or valid for `len` bytes of writes.
pub(crate) unsafe fn device_get_string(
    name: &'static str,
    h: RadioDeviceHandle,
    buf: *mut c_char,
    len: usize,
    f: impl FnOnce(&dyn RadioDevice) -> Result<String>,
) -> RadioErrorCode {
    boundary(name, || {
        let (out, value) = forward(h, |dev| {
            let out = StrOut::new(buf, len)?;
            Ok((out, f(dev)?))
        })?;
        unsafe { out.write(&value) };
        Ok(())
    })
}

/// Call producing a list, written as an encoded string plus count.
///
/// # Safety
///
/// `buf` must be null or valid for `len` bytes; `count` must be null or
/// valid for writes.
pub(crate) unsafe fn device_get_list(
    name: &'static str,
    h: RadioDeviceHandle,
    buf: *mut c_char,
    len: usize,
    count: *mut usize,
    f: impl FnOnce(&dyn RadioDevice) -> Result<Vec<String>>,
) -> RadioErrorCode {
    boundary(name, || {
        let (out, items) = forward(h, |dev| {
            let out = ListOut::new(buf, len, count)?;
            Ok((out, f(dev)?))
        })?;
        unsafe { out.write(&items) };
        Ok(())
    })
}

/// Call producing a range set. Writes the first `capacity` ranges and
/// reports the total in `count`.
///
/// # Safety
///
/// `ranges` must be null or valid for `capacity` writes; `count` must be
/// null or valid for writes.
pub(crate) unsafe fn device_get_ranges(
    name: &'static str,
    h: RadioDeviceHandle,
    ranges: *mut RadioRange,
    capacity: usize,
    count: *mut usize,
    f: impl FnOnce(&dyn RadioDevice) -> Result<MetaRange>,
) -> RadioErrorCode {
    boundary(name, || {
        let (count, meta) = forward(h, |dev| {
            let count = Out::new(count, "range count output")?;
            if ranges.is_null() && capacity > 0 {
                return Err(RadioError::Value("range buffer must not be null".to_string()));
            }
            Ok((count, f(dev)?))
        })?;
        for (i, range) in meta.ranges().iter().take(capacity).enumerate() {
            unsafe { ranges.add(i).write(RadioRange::from(range)) };
        }
        unsafe { count.write(meta.len()) };
        Ok(())
    })
}

/// Call producing a time spec as `(full_secs, frac_secs)`.
///
/// # Safety
///
/// Both outputs must be null or valid for writes.
pub(crate) unsafe fn device_get_time(
    name: &'static str,
    h: RadioDeviceHandle,
    full_secs_out: *mut libc::time_t,
    frac_secs_out: *mut f64,
    f: impl FnOnce(&dyn RadioDevice) -> Result<radiolib::TimeSpec>,
) -> RadioErrorCode {
    boundary(name, || {
        let (full_out, frac_out, time) = forward(h, |dev| {
            let full_out = Out::new(full_secs_out, "full_secs output")?;
            let frac_out = Out::new(frac_secs_out, "frac_secs output")?;
            Ok((full_out, frac_out, f(dev)?))
        })?;
        let (full, frac) = crate::types::time_to_c(time);
        unsafe {
            full_out.write(full);
            frac_out.write(frac);
        }
        Ok(())
    })
}
