// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-channel frontend calls. Receive and transmit share one body each;
//! the exported pairs only differ by [`Direction`].

use std::ffi::c_char;

use radiolib::{Direction, RadioErrorCode, SubdevSpec};

use crate::capture::{boundary, input_ref, input_str};
use crate::dispatch::{
    device_get, device_get_list, device_get_ranges, device_get_string, device_set, forward,
};
use crate::types::{
    RadioDeviceHandle, RadioRange, RadioSensorValue, RadioTuneRequest, RadioTuneResult,
};

/// Emit the rx and tx entry points for one shared body. The body receives
/// the exported name, the direction, the device handle and the remaining
/// arguments in order.
macro_rules! rx_tx {
    ($rx:ident, $tx:ident => unsafe $body:ident($($arg:ident: $ty:ty),* $(,)?)) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $rx(h: RadioDeviceHandle, $($arg: $ty),*) -> RadioErrorCode {
            unsafe { $body(stringify!($rx), Direction::Rx, h, $($arg),*) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $tx(h: RadioDeviceHandle, $($arg: $ty),*) -> RadioErrorCode {
            unsafe { $body(stringify!($tx), Direction::Tx, h, $($arg),*) }
        }
    };
    ($rx:ident, $tx:ident => $body:ident($($arg:ident: $ty:ty),* $(,)?)) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $rx(h: RadioDeviceHandle, $($arg: $ty),*) -> RadioErrorCode {
            $body(stringify!($rx), Direction::Rx, h, $($arg),*)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn $tx(h: RadioDeviceHandle, $($arg: $ty),*) -> RadioErrorCode {
            $body(stringify!($tx), Direction::Tx, h, $($arg),*)
        }
    };
}

/// Gain element name; null and `""` both select the overall gain.
unsafe fn gain_name<'a>(name: *const c_char) -> radiolib::Result<&'a str> {
    if name.is_null() {
        return Ok("");
    }
    unsafe { input_str(name, "gain name") }
}

// ============================================================================
// C ABI: Subdevice specification
// ============================================================================

unsafe fn set_subdev_spec(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    spec: *const c_char,
    mboard: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| {
        let spec: SubdevSpec = unsafe { input_str(spec, "subdev spec") }?.parse()?;
        dev.set_subdev_spec(dir, &spec, mboard)
    })
}

unsafe fn get_subdev_spec(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    mboard: usize,
    spec_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe {
        device_get_string(name, h, spec_out, len, |dev| {
            Ok(dev.get_subdev_spec(dir, mboard)?.to_string())
        })
    }
}

unsafe fn get_num_channels(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    num_channels_out: *mut usize,
) -> RadioErrorCode {
    unsafe { device_get(name, h, num_channels_out, |dev| dev.get_num_channels(dir)) }
}

unsafe fn get_subdev_name(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    name_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe { device_get_string(name, h, name_out, len, |dev| dev.get_subdev_name(dir, chan)) }
}

rx_tx!(radio_device_set_rx_subdev_spec, radio_device_set_tx_subdev_spec
    => unsafe set_subdev_spec(spec: *const c_char, mboard: usize));
rx_tx!(radio_device_get_rx_subdev_spec, radio_device_get_tx_subdev_spec
    => unsafe get_subdev_spec(mboard: usize, spec_out: *mut c_char, len: usize));
rx_tx!(radio_device_get_rx_num_channels, radio_device_get_tx_num_channels
    => unsafe get_num_channels(num_channels_out: *mut usize));
rx_tx!(radio_device_get_rx_subdev_name, radio_device_get_tx_subdev_name
    => unsafe get_subdev_name(chan: usize, name_out: *mut c_char, len: usize));

// ============================================================================
// C ABI: Sample rate
// ============================================================================

fn set_rate(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    rate: f64,
    chan: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| dev.set_rate(dir, rate, chan))
}

unsafe fn get_rate(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    rate_out: *mut f64,
) -> RadioErrorCode {
    unsafe { device_get(name, h, rate_out, |dev| dev.get_rate(dir, chan)) }
}

unsafe fn get_rates(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    ranges_out: *mut RadioRange,
    capacity: usize,
    num_ranges_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_ranges(name, h, ranges_out, capacity, num_ranges_out, |dev| {
            dev.get_rates(dir, chan)
        })
    }
}

rx_tx!(radio_device_set_rx_rate, radio_device_set_tx_rate
    => set_rate(rate: f64, chan: usize));
rx_tx!(radio_device_get_rx_rate, radio_device_get_tx_rate
    => unsafe get_rate(chan: usize, rate_out: *mut f64));
rx_tx!(radio_device_get_rx_rates, radio_device_get_tx_rates
    => unsafe get_rates(
        chan: usize,
        ranges_out: *mut RadioRange,
        capacity: usize,
        num_ranges_out: *mut usize,
    ));

// ============================================================================
// C ABI: Frequency
// ============================================================================

/// Tune `chan` and report how the request was split between the LO and
/// the DSP. `tune_result` is written only on success.
unsafe fn set_freq(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    tune_request: *const RadioTuneRequest,
    chan: usize,
    tune_result: *mut RadioTuneResult,
) -> RadioErrorCode {
    unsafe {
        device_get(name, h, tune_result, |dev| {
            let request = input_ref(tune_request, "tune request")?.to_tune_request()?;
            Ok(RadioTuneResult::from(dev.set_freq(dir, &request, chan)?))
        })
    }
}

unsafe fn get_freq(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    freq_out: *mut f64,
) -> RadioErrorCode {
    unsafe { device_get(name, h, freq_out, |dev| dev.get_freq(dir, chan)) }
}

unsafe fn get_freq_range(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    ranges_out: *mut RadioRange,
    capacity: usize,
    num_ranges_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_ranges(name, h, ranges_out, capacity, num_ranges_out, |dev| {
            dev.get_freq_range(dir, chan)
        })
    }
}

unsafe fn get_fe_freq_range(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    ranges_out: *mut RadioRange,
    capacity: usize,
    num_ranges_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_ranges(name, h, ranges_out, capacity, num_ranges_out, |dev| {
            dev.get_fe_freq_range(dir, chan)
        })
    }
}

rx_tx!(radio_device_set_rx_freq, radio_device_set_tx_freq
    => unsafe set_freq(
        tune_request: *const RadioTuneRequest,
        chan: usize,
        tune_result: *mut RadioTuneResult,
    ));
rx_tx!(radio_device_get_rx_freq, radio_device_get_tx_freq
    => unsafe get_freq(chan: usize, freq_out: *mut f64));
rx_tx!(radio_device_get_rx_freq_range, radio_device_get_tx_freq_range
    => unsafe get_freq_range(
        chan: usize,
        ranges_out: *mut RadioRange,
        capacity: usize,
        num_ranges_out: *mut usize,
    ));
rx_tx!(radio_device_get_fe_rx_freq_range, radio_device_get_fe_tx_freq_range
    => unsafe get_fe_freq_range(
        chan: usize,
        ranges_out: *mut RadioRange,
        capacity: usize,
        num_ranges_out: *mut usize,
    ));

// ============================================================================
// C ABI: Gain
// ============================================================================

unsafe fn set_gain(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    gain: f64,
    chan: usize,
    gain_name_in: *const c_char,
) -> RadioErrorCode {
    device_set(name, h, |dev| {
        let element = unsafe { gain_name(gain_name_in) }?;
        dev.set_gain(dir, gain, element, chan)
    })
}

unsafe fn get_gain(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    gain_name_in: *const c_char,
    gain_out: *mut f64,
) -> RadioErrorCode {
    unsafe {
        device_get(name, h, gain_out, |dev| {
            dev.get_gain(dir, gain_name(gain_name_in)?, chan)
        })
    }
}

fn set_normalized_gain(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    gain: f64,
    chan: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| dev.set_normalized_gain(dir, gain, chan))
}

unsafe fn get_normalized_gain(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    gain_out: *mut f64,
) -> RadioErrorCode {
    unsafe { device_get(name, h, gain_out, |dev| dev.get_normalized_gain(dir, chan)) }
}

#[allow(clippy::too_many_arguments)]
unsafe fn get_gain_range(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    gain_name_in: *const c_char,
    chan: usize,
    ranges_out: *mut RadioRange,
    capacity: usize,
    num_ranges_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_ranges(name, h, ranges_out, capacity, num_ranges_out, |dev| {
            dev.get_gain_range(dir, gain_name(gain_name_in)?, chan)
        })
    }
}

unsafe fn get_gain_names(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    names_out: *mut c_char,
    len: usize,
    num_names_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(name, h, names_out, len, num_names_out, |dev| {
            dev.get_gain_names(dir, chan)
        })
    }
}

rx_tx!(radio_device_set_rx_gain, radio_device_set_tx_gain
    => unsafe set_gain(gain: f64, chan: usize, gain_name: *const c_char));
rx_tx!(radio_device_get_rx_gain, radio_device_get_tx_gain
    => unsafe get_gain(chan: usize, gain_name: *const c_char, gain_out: *mut f64));
rx_tx!(radio_device_set_normalized_rx_gain, radio_device_set_normalized_tx_gain
    => set_normalized_gain(gain: f64, chan: usize));
rx_tx!(radio_device_get_normalized_rx_gain, radio_device_get_normalized_tx_gain
    => unsafe get_normalized_gain(chan: usize, gain_out: *mut f64));
rx_tx!(radio_device_get_rx_gain_range, radio_device_get_tx_gain_range
    => unsafe get_gain_range(
        gain_name: *const c_char,
        chan: usize,
        ranges_out: *mut RadioRange,
        capacity: usize,
        num_ranges_out: *mut usize,
    ));
rx_tx!(radio_device_get_rx_gain_names, radio_device_get_tx_gain_names
    => unsafe get_gain_names(
        chan: usize,
        names_out: *mut c_char,
        len: usize,
        num_names_out: *mut usize,
    ));

// ============================================================================
// C ABI: Antenna and bandwidth
// ============================================================================

unsafe fn set_antenna(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    antenna: *const c_char,
    chan: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| {
        dev.set_antenna(dir, unsafe { input_str(antenna, "antenna") }?, chan)
    })
}

unsafe fn get_antenna(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    antenna_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    unsafe { device_get_string(name, h, antenna_out, len, |dev| dev.get_antenna(dir, chan)) }
}

unsafe fn get_antennas(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    antennas_out: *mut c_char,
    len: usize,
    num_antennas_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(name, h, antennas_out, len, num_antennas_out, |dev| {
            dev.get_antennas(dir, chan)
        })
    }
}

fn set_bandwidth(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    bandwidth: f64,
    chan: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| dev.set_bandwidth(dir, bandwidth, chan))
}

unsafe fn get_bandwidth(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    bandwidth_out: *mut f64,
) -> RadioErrorCode {
    unsafe { device_get(name, h, bandwidth_out, |dev| dev.get_bandwidth(dir, chan)) }
}

unsafe fn get_bandwidth_range(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    ranges_out: *mut RadioRange,
    capacity: usize,
    num_ranges_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_ranges(name, h, ranges_out, capacity, num_ranges_out, |dev| {
            dev.get_bandwidth_range(dir, chan)
        })
    }
}

rx_tx!(radio_device_set_rx_antenna, radio_device_set_tx_antenna
    => unsafe set_antenna(antenna: *const c_char, chan: usize));
rx_tx!(radio_device_get_rx_antenna, radio_device_get_tx_antenna
    => unsafe get_antenna(chan: usize, antenna_out: *mut c_char, len: usize));
rx_tx!(radio_device_get_rx_antennas, radio_device_get_tx_antennas
    => unsafe get_antennas(
        chan: usize,
        antennas_out: *mut c_char,
        len: usize,
        num_antennas_out: *mut usize,
    ));
rx_tx!(radio_device_set_rx_bandwidth, radio_device_set_tx_bandwidth
    => set_bandwidth(bandwidth: f64, chan: usize));
rx_tx!(radio_device_get_rx_bandwidth, radio_device_get_tx_bandwidth
    => unsafe get_bandwidth(chan: usize, bandwidth_out: *mut f64));
rx_tx!(radio_device_get_rx_bandwidth_range, radio_device_get_tx_bandwidth_range
    => unsafe get_bandwidth_range(
        chan: usize,
        ranges_out: *mut RadioRange,
        capacity: usize,
        num_ranges_out: *mut usize,
    ));

// ============================================================================
// C ABI: Sensors and corrections
// ============================================================================

unsafe fn get_sensor(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    sensor_name: *const c_char,
    chan: usize,
    sensor_out: *mut RadioSensorValue,
) -> RadioErrorCode {
    unsafe {
        device_get(name, h, sensor_out, |dev| {
            let sensor_name = input_str(sensor_name, "sensor name")?;
            Ok(RadioSensorValue::from(&dev.get_sensor(dir, sensor_name, chan)?))
        })
    }
}

unsafe fn get_sensor_names(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    chan: usize,
    names_out: *mut c_char,
    len: usize,
    num_names_out: *mut usize,
) -> RadioErrorCode {
    unsafe {
        device_get_list(name, h, names_out, len, num_names_out, |dev| {
            dev.get_sensor_names(dir, chan)
        })
    }
}

fn set_dc_offset_enabled(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    enable: bool,
    chan: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| dev.set_dc_offset_enabled(dir, enable, chan))
}

fn set_iq_balance_enabled(
    name: &'static str,
    dir: Direction,
    h: RadioDeviceHandle,
    enable: bool,
    chan: usize,
) -> RadioErrorCode {
    device_set(name, h, |dev| dev.set_iq_balance_enabled(dir, enable, chan))
}

rx_tx!(radio_device_get_rx_sensor, radio_device_get_tx_sensor
    => unsafe get_sensor(
        sensor_name: *const c_char,
        chan: usize,
        sensor_out: *mut RadioSensorValue,
    ));
rx_tx!(radio_device_get_rx_sensor_names, radio_device_get_tx_sensor_names
    => unsafe get_sensor_names(
        chan: usize,
        names_out: *mut c_char,
        len: usize,
        num_names_out: *mut usize,
    ));
rx_tx!(radio_device_set_rx_dc_offset_enabled, radio_device_set_tx_dc_offset_enabled
    => set_dc_offset_enabled(enable: bool, chan: usize));
rx_tx!(radio_device_set_rx_iq_balance_enabled, radio_device_set_tx_iq_balance_enabled
    => set_iq_balance_enabled(enable: bool, chan: usize));

/// Enable or disable automatic gain control on an rx channel.
#[unsafe(no_mangle)]
pub extern "C" fn radio_device_set_rx_agc(
    h: RadioDeviceHandle,
    enable: bool,
    chan: usize,
) -> RadioErrorCode {
    boundary("radio_device_set_rx_agc", || {
        forward(h, |dev| dev.set_rx_agc(enable, chan))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{radio_device_free, radio_device_last_error, radio_device_make};
    use radiolib::marshal::decode_list;
    use serial_test::serial;
    use std::ffi::CStr;

    fn make() -> RadioDeviceHandle {
        let mut h = RadioDeviceHandle::NULL;
        assert_eq!(
            unsafe { radio_device_make(&mut h, c"type=sim".as_ptr()) },
            RadioErrorCode::None
        );
        h
    }

    fn free(mut h: RadioDeviceHandle) {
        assert_eq!(unsafe { radio_device_free(&mut h) }, RadioErrorCode::None);
    }

    fn c_string(buf: &[c_char]) -> String {
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    #[serial]
    fn test_subdev_spec_controls_channel_count() {
        let h = make();
        let mut n = 0usize;
        assert_eq!(
            unsafe { radio_device_get_rx_num_channels(h, &mut n) },
            RadioErrorCode::None
        );
        assert_eq!(n, 2);

        let code = unsafe { radio_device_set_rx_subdev_spec(h, c"B:0".as_ptr(), 0) };
        assert_eq!(code, RadioErrorCode::None);
        unsafe { radio_device_get_rx_num_channels(h, &mut n) };
        assert_eq!(n, 1);

        let mut buf = [0 as c_char; 64];
        let code =
            unsafe { radio_device_get_rx_subdev_spec(h, 0, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(c_string(&buf), "B:0");

        // tx keeps its own spec.
        unsafe { radio_device_get_tx_num_channels(h, &mut n) };
        assert_eq!(n, 2);
        free(h);
    }

    #[test]
    #[serial]
    fn test_gain_by_element_and_overall() {
        let h = make();
        assert_eq!(
            unsafe { radio_device_set_rx_gain(h, 10.0, 0, c"LNA".as_ptr()) },
            RadioErrorCode::None
        );
        let mut lna = 0.0;
        unsafe { radio_device_get_rx_gain(h, 0, c"LNA".as_ptr(), &mut lna) };
        assert_eq!(lna, 10.0);

        let mut overall = 0.0;
        let code = unsafe { radio_device_get_rx_gain(h, 0, std::ptr::null(), &mut overall) };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(overall, 10.0);

        let mut names = [0 as c_char; 64];
        let mut count = 0usize;
        let code = unsafe {
            radio_device_get_rx_gain_names(h, 0, names.as_mut_ptr(), names.len(), &mut count)
        };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(decode_list(&c_string(&names), count), vec!["LNA", "PGA"]);

        let mut unchanged = -1.0;
        let code = unsafe { radio_device_get_rx_gain(h, 0, c"VGA".as_ptr(), &mut unchanged) };
        assert_eq!(code, RadioErrorCode::Key);
        assert_eq!(unchanged, -1.0);
        free(h);
    }

    #[test]
    #[serial]
    fn test_normalized_gain_out_of_range_is_runtime_error() {
        let h = make();
        assert_eq!(
            radio_device_set_normalized_tx_gain(h, 1.5, 0),
            RadioErrorCode::Runtime
        );
        assert_eq!(
            radio_device_set_normalized_tx_gain(h, 1.0, 0),
            RadioErrorCode::None
        );
        let mut gain = 0.0;
        unsafe { radio_device_get_normalized_tx_gain(h, 0, &mut gain) };
        assert_eq!(gain, 1.0);
        free(h);
    }

    #[test]
    #[serial]
    fn test_tune_writes_result() {
        let h = make();
        let request = RadioTuneRequest {
            target_freq: 2.45e9,
            rf_freq_policy: 'A' as i32,
            rf_freq: 0.0,
            dsp_freq_policy: 'A' as i32,
            dsp_freq: 0.0,
            args: std::ptr::null(),
        };
        let mut result = RadioTuneResult::default();
        let code = unsafe { radio_device_set_rx_freq(h, &request, 0, &mut result) };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(result.actual_rf_freq, 2.45e9);

        let mut freq = 0.0;
        unsafe { radio_device_get_rx_freq(h, 0, &mut freq) };
        assert_eq!(freq, 2.45e9);

        let bad = RadioTuneRequest {
            rf_freq_policy: 'Z' as i32,
            ..request
        };
        let mut untouched = RadioTuneResult::default();
        let code = unsafe { radio_device_set_rx_freq(h, &bad, 0, &mut untouched) };
        assert_eq!(code, RadioErrorCode::Value);
        assert_eq!(untouched, RadioTuneResult::default());
        free(h);
    }

    #[test]
    #[serial]
    fn test_ranges_report_total_count() {
        let h = make();
        let mut count = 0usize;
        // Zero capacity only asks for the count.
        let code = unsafe {
            radio_device_get_fe_rx_freq_range(h, 0, std::ptr::null_mut(), 0, &mut count)
        };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(count, 1);

        let mut ranges = [RadioRange::default(); 4];
        let code = unsafe {
            radio_device_get_tx_bandwidth_range(h, 0, ranges.as_mut_ptr(), ranges.len(), &mut count)
        };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(count, 1);
        assert!(ranges[0].stop > ranges[0].start);
        assert_eq!(ranges[1], RadioRange::default());
        free(h);
    }

    #[test]
    #[serial]
    fn test_antenna_selection() {
        let h = make();
        let mut buf = [0 as c_char; 128];
        let mut count = 0usize;
        unsafe { radio_device_get_rx_antennas(h, 1, buf.as_mut_ptr(), buf.len(), &mut count) };
        assert_eq!(decode_list(&c_string(&buf), count), vec!["RX2", "TX/RX", "CAL"]);

        let code = unsafe { radio_device_set_rx_antenna(h, c"TX/RX".as_ptr(), 1) };
        assert_eq!(code, RadioErrorCode::None);
        unsafe { radio_device_get_rx_antenna(h, 1, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(c_string(&buf), "TX/RX");

        let code = unsafe { radio_device_set_rx_antenna(h, c"TX/RX".as_ptr(), 9) };
        assert_eq!(code, RadioErrorCode::Index);
        let mut msg = [0 as c_char; 256];
        unsafe { radio_device_last_error(h, msg.as_mut_ptr(), msg.len()) };
        assert!(!c_string(&msg).is_empty());
        assert_ne!(c_string(&msg), "None");
        free(h);
    }

    #[test]
    #[serial]
    fn test_rx_agc_and_corrections() {
        let h = make();
        assert_eq!(radio_device_set_rx_agc(h, true, 0), RadioErrorCode::None);
        assert_eq!(
            radio_device_set_tx_dc_offset_enabled(h, false, 1),
            RadioErrorCode::None
        );
        assert_eq!(
            radio_device_set_rx_iq_balance_enabled(h, false, 5),
            RadioErrorCode::Index
        );
        free(h);
        assert_eq!(
            radio_device_set_rx_agc(h, true, 0),
            RadioErrorCode::InvalidDevice
        );
    }
}
