// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Device lifecycle plus motherboard, EEPROM and GPIO calls.

use std::ffi::c_char;

use libc::time_t;
use radiolib::{
    DboardEeprom, DeviceAddr, Direction, MboardEeprom, RadioErrorCode, Result, StreamArgs,
    StreamCmd, dboard_eeprom_path, global_session, mboard_eeprom_path,
};

use crate::capture::{ListOut, Out, StrOut, boundary, input_ref, input_str};
use crate::dispatch::{device_get, device_get_list, device_get_string, device_get_time, device_set};
use crate::types::{
    RadioDboardEeprom, RadioDeviceHandle, RadioRxStreamerHandle, RadioSensorValue,
    RadioStreamArgs, RadioStreamCmd, RadioTxStreamerHandle, RadioUsrpRxInfo, RadioUsrpTxInfo,
    time_from_c,
};

// ============================================================================
// C ABI: Discovery and lifecycle
// ============================================================================

/// List reachable devices matching `args`. Each element is an address in
/// `k=v,...` markup.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_find(
    args: *const c_char,
    addrs_out: *mut c_char,
    len: usize,
    num_found: *mut usize,
) -> RadioErrorCode {
    boundary("radio_find", || {
        let args = unsafe { input_str(args, "args") }?;
        let out = ListOut::new(addrs_out, len, num_found)?;
        let found = global_session().find(args)?;
        let markup: Vec<String> = found.iter().map(DeviceAddr::to_string).collect();
        unsafe { out.write(&markup) };
        Ok(())
    })
}

/// Open the first device matching `args` and store its handle in `*h`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_make(
    h: *mut RadioDeviceHandle,
    args: *const c_char,
) -> RadioErrorCode {
    boundary("radio_device_make", || {
        let out = Out::new(h, "device handle pointer")?;
        let args = unsafe { input_str(args, "args") }?;
        let index = global_session().make_device(args)?;
        unsafe { out.write(RadioDeviceHandle(index)) };
        Ok(())
    })
}

/// Destroy the device in `*h` along with its streamers, then null `*h`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_free(h: *mut RadioDeviceHandle) -> RadioErrorCode {
    boundary("radio_device_free", || {
        let handle = *unsafe { input_ref(h, "device handle pointer") }?;
        global_session().free_device(handle.0)?;
        unsafe { h.write(RadioDeviceHandle::NULL) };
        Ok(())
    })
}

/// Copy the device's last error message. Does not modify it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_last_error(
    h: RadioDeviceHandle,
    error_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    boundary("radio_device_last_error", || {
        let message = global_session().device_last_error(h.0)?;
        let out = StrOut::new(error_out, len)?;
        unsafe { out.write(&message) };
        Ok(())
    })
}

/// Convert stream args after the device resolved, recording a bad struct in
/// the device's error slot.
unsafe fn attach_args(h: RadioDeviceHandle, args: *const RadioStreamArgs) -> Result<StreamArgs> {
    let entry = global_session().devices().resolve(h.0)?;
    let converted = unsafe { input_ref(args, "stream args") }
        .and_then(|args| unsafe { args.to_stream_args() });
    if let Err(e) = &converted {
        entry.last_error().set(e.to_string());
    }
    converted
}

/// Build an rx streamer on the device and bind `streamer` to it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_rx_stream(
    h: RadioDeviceHandle,
    args: *const RadioStreamArgs,
    streamer: RadioRxStreamerHandle,
) -> RadioErrorCode {
    boundary("radio_device_get_rx_stream", || {
        let args = unsafe { attach_args(h, args) }?;
        global_session().attach_rx_stream(h.0, streamer.0, &args)?;
        Ok(())
    })
}

/// Build a tx streamer on the device and bind `streamer` to it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_tx_stream(
    h: RadioDeviceHandle,
    args: *const RadioStreamArgs,
    streamer: RadioTxStreamerHandle,
) -> RadioErrorCode {
    boundary("radio_device_get_tx_stream", || {
        let args = unsafe { attach_args(h, args) }?;
        global_session().attach_tx_stream(h.0, streamer.0, &args)?;
        Ok(())
    })
}

// ============================================================================
// C ABI: Info
// ============================================================================

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_rx_info(
    h: RadioDeviceHandle,
    chan: usize,
    info_out: *mut RadioUsrpRxInfo,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_rx_info", h, info_out, |dev| {
            Ok(RadioUsrpRxInfo::from(&dev.usrp_info(Direction::Rx, chan)?))
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_tx_info(
    h: RadioDeviceHandle,
    chan: usize,
    info_out: *mut RadioUsrpTxInfo,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_tx_info", h, info_out, |dev| {
            Ok(RadioUsrpTxInfo::from(&dev.usrp_info(Direction::Tx, chan)?))
        })
    }
}

// ============================================================================
// C ABI: Motherboard
// ============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_master_clock_rate(
    h: RadioDeviceHandle,
    rate: f64,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_master_clock_rate", h, |dev| {
        dev.set_master_clock_rate(rate, mboard)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_master_clock_rate(
    h: RadioDeviceHandle,
    mboard: usize,
    rate_out: *mut f64,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_master_clock_rate", h, rate_out, |dev| {
            dev.get_master_clock_rate(mboard)
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_pp_string(
    h: RadioDeviceHandle,
    pp_string_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe {
        device_get_string("radio_device_get_pp_string", h, pp_string_out, len, |dev| {
            dev.pp_string()
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_mboard_name(
    h: RadioDeviceHandle,
    mboard: usize,
    name_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe {
        device_get_string("radio_device_get_mboard_name", h, name_out, len, |dev| {
            dev.get_mboard_name(mboard)
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_num_mboards(
    h: RadioDeviceHandle,
    num_mboards_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_num_mboards", h, num_mboards_out, |dev| {
            dev.get_num_mboards()
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_time_now(
    h: RadioDeviceHandle,
    mboard: usize,
    full_secs_out: *mut time_t,
    frac_secs_out: *mut f64,
) -> RadioErrorCode {
    unsafe {
        device_get_time(
            "radio_device_get_time_now",
            h,
            full_secs_out,
            frac_secs_out,
            |dev| dev.get_time_now(mboard),
        )
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_time_last_pps(
    h: RadioDeviceHandle,
    mboard: usize,
    full_secs_out: *mut time_t,
    frac_secs_out: *mut f64,
) -> RadioErrorCode {
    unsafe {
        device_get_time(
            "radio_device_get_time_last_pps",
            h,
            full_secs_out,
            frac_secs_out,
            |dev| dev.get_time_last_pps(mboard),
        )
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_time_now(
    h: RadioDeviceHandle,
    full_secs: time_t,
    frac_secs: f64,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_time_now", h, |dev| {
        dev.set_time_now(time_from_c(full_secs, frac_secs), mboard)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_time_next_pps(
    h: RadioDeviceHandle,
    full_secs: time_t,
    frac_secs: f64,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_time_next_pps", h, |dev| {
        dev.set_time_next_pps(time_from_c(full_secs, frac_secs), mboard)
    })
}

/// Set the time at the next PPS edge on every motherboard.
#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_time_unknown_pps(
    h: RadioDeviceHandle,
    full_secs: time_t,
    frac_secs: f64,
) -> RadioErrorCode {
    device_set("radio_device_set_time_unknown_pps", h, |dev| {
        dev.set_time_unknown_pps(time_from_c(full_secs, frac_secs))
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_time_synchronized(
    h: RadioDeviceHandle,
    result_out: *mut bool,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_time_synchronized", h, result_out, |dev| {
            dev.get_time_synchronized()
        })
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_command_time(
    h: RadioDeviceHandle,
    full_secs: time_t,
    frac_secs: f64,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_command_time", h, |dev| {
        dev.set_command_time(time_from_c(full_secs, frac_secs), mboard)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_clear_command_time(
    h: RadioDeviceHandle,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_clear_command_time", h, |dev| {
        dev.clear_command_time(mboard)
    })
}

/// Issue a stream command to the receive DSP behind `chan`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_issue_stream_cmd(
    h: RadioDeviceHandle,
    stream_cmd: *const RadioStreamCmd,
    chan: usize,
) -> RadioErrorCode {
    device_set("radio_device_issue_stream_cmd", h, |dev| {
        let cmd = StreamCmd::try_from(unsafe { input_ref(stream_cmd, "stream command") }?)?;
        dev.issue_stream_cmd(&cmd, chan)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_set_time_source(
    h: RadioDeviceHandle,
    time_source: *const c_char,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_time_source", h, |dev| {
        dev.set_time_source(unsafe { input_str(time_source, "time source") }?, mboard)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_time_source(
    h: RadioDeviceHandle,
    mboard: usize,
    time_source_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe {
        device_get_string("radio_device_get_time_source", h, time_source_out, len, |dev| {
            dev.get_time_source(mboard)
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_time_sources(
    h: RadioDeviceHandle,
    mboard: usize,
    time_sources_out: *mut c_char,
    len: usize,
    num_time_sources_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(
            "radio_device_get_time_sources",
            h,
            time_sources_out,
            len,
            num_time_sources_out,
            |dev| dev.get_time_sources(mboard),
        )
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_set_clock_source(
    h: RadioDeviceHandle,
    clock_source: *const c_char,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_clock_source", h, |dev| {
        dev.set_clock_source(unsafe { input_str(clock_source, "clock source") }?, mboard)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_clock_source(
    h: RadioDeviceHandle,
    mboard: usize,
    clock_source_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe {
        device_get_string("radio_device_get_clock_source", h, clock_source_out, len, |dev| {
            dev.get_clock_source(mboard)
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_clock_sources(
    h: RadioDeviceHandle,
    mboard: usize,
    clock_sources_out: *mut c_char,
    len: usize,
    num_clock_sources_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(
            "radio_device_get_clock_sources",
            h,
            clock_sources_out,
            len,
            num_clock_sources_out,
            |dev| dev.get_clock_sources(mboard),
        )
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_clock_source_out(
    h: RadioDeviceHandle,
    enable: bool,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_clock_source_out", h, |dev| {
        dev.set_clock_source_out(enable, mboard)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_mboard_sensor(
    h: RadioDeviceHandle,
    name: *const c_char,
    mboard: usize,
    sensor_out: *mut RadioSensorValue,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_mboard_sensor", h, sensor_out, |dev| {
            let name = input_str(name, "sensor name")?;
            Ok(RadioSensorValue::from(&dev.get_mboard_sensor(name, mboard)?))
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_mboard_sensor_names(
    h: RadioDeviceHandle,
    mboard: usize,
    names_out: *mut c_char,
    len: usize,
    num_names_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(
            "radio_device_get_mboard_sensor_names",
            h,
            names_out,
            len,
            num_names_out,
            |dev| dev.get_mboard_sensor_names(mboard),
        )
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_user_register(
    h: RadioDeviceHandle,
    addr: u8,
    data: u32,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_user_register", h, |dev| {
        dev.set_user_register(addr, data, mboard)
    })
}

// ============================================================================
// C ABI: EEPROM
// ============================================================================

/// Motherboard EEPROM as `k=v,...` markup.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_mboard_eeprom(
    h: RadioDeviceHandle,
    mboard: usize,
    eeprom_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe {
        device_get_string("radio_device_get_mboard_eeprom", h, eeprom_out, len, |dev| {
            let eeprom: MboardEeprom = dev.tree().get(&mboard_eeprom_path(mboard))?;
            Ok(eeprom.to_string())
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_set_mboard_eeprom(
    h: RadioDeviceHandle,
    eeprom: *const c_char,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_mboard_eeprom", h, |dev| {
        let eeprom: MboardEeprom = DeviceAddr::parse(unsafe { input_str(eeprom, "eeprom") }?);
        dev.tree().set(&mboard_eeprom_path(mboard), eeprom)
    })
}

/// Daughterboard EEPROM at `/mboards/<mboard>/dboards/<slot>/<unit>_eeprom`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_dboard_eeprom(
    h: RadioDeviceHandle,
    eeprom_out: *mut RadioDboardEeprom,
    unit: *const c_char,
    slot: *const c_char,
    mboard: usize,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_dboard_eeprom", h, eeprom_out, |dev| {
            let path = dboard_eeprom_path(
                mboard,
                input_str(slot, "slot")?,
                input_str(unit, "unit")?,
            );
            let eeprom: DboardEeprom = dev.tree().get(&path)?;
            Ok(RadioDboardEeprom::from(&eeprom))
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_set_dboard_eeprom(
    h: RadioDeviceHandle,
    eeprom: *const RadioDboardEeprom,
    unit: *const c_char,
    slot: *const c_char,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_dboard_eeprom", h, |dev| {
        let (eeprom, slot, unit) = unsafe {
            (
                input_ref(eeprom, "eeprom")?,
                input_str(slot, "slot")?,
                input_str(unit, "unit")?,
            )
        };
        let path = dboard_eeprom_path(mboard, slot, unit);
        dev.tree().set(&path, DboardEeprom::try_from(eeprom)?)
    })
}

// ============================================================================
// C ABI: GPIO
// ============================================================================

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_gpio_banks(
    h: RadioDeviceHandle,
    mboard: usize,
    banks_out: *mut c_char,
    len: usize,
    num_banks_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(
            "radio_device_get_gpio_banks",
            h,
            banks_out,
            len,
            num_banks_out,
            |dev| dev.get_gpio_banks(mboard),
        )
    }
}

/// Write the bits of `value` selected by `mask`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_set_gpio_attr(
    h: RadioDeviceHandle,
    bank: *const c_char,
    attr: *const c_char,
    value: u32,
    mask: u32,
    mboard: usize,
) -> RadioErrorCode {
    device_set("radio_device_set_gpio_attr", h, |dev| {
        let (bank, attr) = unsafe { (input_str(bank, "bank")?, input_str(attr, "attr")?) };
        dev.set_gpio_attr(bank, attr, value, mask, mboard)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_device_get_gpio_attr(
    h: RadioDeviceHandle,
    bank: *const c_char,
    attr: *const c_char,
    mboard: usize,
    attr_out: *mut u32,
) -> RadioErrorCode {
    unsafe {
        device_get("radio_device_get_gpio_attr", h, attr_out, |dev| {
            dev.get_gpio_attr(input_str(bank, "bank")?, input_str(attr, "attr")?, mboard)
        })
    }
}
