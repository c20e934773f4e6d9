// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Streamer handles: creation, sample transfer and async messages.
//!
//! A streamer handle is usable only after `radio_device_get_rx_stream` (or
//! the tx twin) bound it to a device. Until then, and after its device is
//! freed, every call returns `INVALID_DEVICE`.

use std::ffi::{c_char, c_void};

use radiolib::{
    AsyncMetadata, RadioError, RadioErrorCode, Result, RxMetadata, StreamCmd, TxMetadata,
    global_session,
};

use crate::capture::{Out, StrOut, boundary, input_ref};
use crate::types::{
    RadioAsyncMetadata, RadioRxMetadata, RadioRxStreamerHandle, RadioStreamCmd,
    RadioTxMetadata, RadioTxStreamerHandle,
};

/// Byte length of one channel buffer holding `nsamps` items.
fn buffer_len(nsamps: usize, item_size: usize) -> Result<usize> {
    nsamps.checked_mul(item_size).ok_or_else(|| {
        RadioError::Value(format!("{} samples overflow the buffer size", nsamps))
    })
}

/// Borrow the caller's per-channel pointer array.
///
/// # Safety
///
/// `buffs` must be null or hold `channels` pointers.
unsafe fn channel_ptrs<'a, P>(buffs: *const P, channels: usize) -> Result<&'a [P]> {
    if buffs.is_null() {
        return Err(RadioError::Value("buffer array must not be null".to_string()));
    }
    Ok(unsafe { std::slice::from_raw_parts(buffs, channels) })
}

// ============================================================================
// C ABI: RX streamer
// ============================================================================

/// Allocate an unbound rx streamer handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_make(h: *mut RadioRxStreamerHandle) -> RadioErrorCode {
    boundary("radio_rx_streamer_make", || {
        let out = Out::new(h, "rx streamer handle pointer")?;
        let handle = global_session().make_rx_streamer();
        unsafe { out.write(RadioRxStreamerHandle(handle)) };
        Ok(())
    })
}

/// Release `*h` and null it. Freeing an unknown handle fails with
/// `INVALID_DEVICE` and leaves `*h` alone.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_free(h: *mut RadioRxStreamerHandle) -> RadioErrorCode {
    boundary("radio_rx_streamer_free", || {
        let handle = *unsafe { input_ref(h, "rx streamer handle pointer") }?;
        global_session().free_rx_streamer(handle.0)?;
        unsafe { h.write(RadioRxStreamerHandle::NULL) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_num_channels(
    h: RadioRxStreamerHandle,
    num_channels_out: *mut usize,
) -> RadioErrorCode {
    boundary("radio_rx_streamer_num_channels", || {
        let (out, n) = global_session().rx_call(h.0, |rx| {
            Ok((Out::new(num_channels_out, "num_channels output")?, rx.num_channels()))
        })?;
        unsafe { out.write(n) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_max_num_samps(
    h: RadioRxStreamerHandle,
    max_num_samps_out: *mut usize,
) -> RadioErrorCode {
    boundary("radio_rx_streamer_max_num_samps", || {
        let (out, n) = global_session().rx_call(h.0, |rx| {
            Ok((Out::new(max_num_samps_out, "max_num_samps output")?, rx.max_num_samps()))
        })?;
        unsafe { out.write(n) };
        Ok(())
    })
}

/// Receive up to `samps_per_buff` samples into each channel buffer.
///
/// `buffs` holds one pointer per channel, each with room for
/// `samps_per_buff` host-format items. A timeout is a success reported
/// through `md->error_code`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_recv(
    h: RadioRxStreamerHandle,
    buffs: *const *mut c_void,
    samps_per_buff: usize,
    md: *mut RadioRxMetadata,
    timeout: f64,
    one_packet: bool,
    items_recvd: *mut usize,
) -> RadioErrorCode {
    boundary("radio_rx_streamer_recv", || {
        let (md_out, items_out, meta, n) = global_session().rx_call(h.0, |rx| {
            let md_out = Out::new(md, "rx metadata output")?;
            let items_out = Out::new(items_recvd, "items_recvd output")?;
            let ptrs = unsafe { channel_ptrs(buffs, rx.num_channels()) }?;
            let len = buffer_len(samps_per_buff, rx.item_size())?;
            let mut slices = ptrs
                .iter()
                .enumerate()
                .map(|(i, &ptr)| {
                    if ptr.is_null() {
                        return Err(RadioError::Value(format!("buffer {} is null", i)));
                    }
                    Ok(unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), len) })
                })
                .collect::<Result<Vec<&mut [u8]>>>()?;
            let mut meta = RxMetadata::default();
            let n = rx.recv(&mut slices, samps_per_buff, &mut meta, timeout, one_packet)?;
            Ok((md_out, items_out, RadioRxMetadata::from(&meta), n))
        })?;
        unsafe {
            md_out.write(meta);
            items_out.write(n);
        }
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_issue_stream_cmd(
    h: RadioRxStreamerHandle,
    stream_cmd: *const RadioStreamCmd,
) -> RadioErrorCode {
    boundary("radio_rx_streamer_issue_stream_cmd", || {
        global_session().rx_call(h.0, |rx| {
            let cmd = StreamCmd::try_from(unsafe { input_ref(stream_cmd, "stream command") }?)?;
            rx.issue_stream_cmd(&cmd)
        })
    })
}

/// Copy the streamer's last error message. Does not modify it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_rx_streamer_last_error(
    h: RadioRxStreamerHandle,
    error_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    boundary("radio_rx_streamer_last_error", || {
        let message = global_session().rx_last_error(h.0)?;
        let out = StrOut::new(error_out, len)?;
        unsafe { out.write(&message) };
        Ok(())
    })
}

// ============================================================================
// C ABI: TX streamer
// ============================================================================

/// Allocate an unbound tx streamer handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_make(h: *mut RadioTxStreamerHandle) -> RadioErrorCode {
    boundary("radio_tx_streamer_make", || {
        let out = Out::new(h, "tx streamer handle pointer")?;
        let handle = global_session().make_tx_streamer();
        unsafe { out.write(RadioTxStreamerHandle(handle)) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_free(h: *mut RadioTxStreamerHandle) -> RadioErrorCode {
    boundary("radio_tx_streamer_free", || {
        let handle = *unsafe { input_ref(h, "tx streamer handle pointer") }?;
        global_session().free_tx_streamer(handle.0)?;
        unsafe { h.write(RadioTxStreamerHandle::NULL) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_num_channels(
    h: RadioTxStreamerHandle,
    num_channels_out: *mut usize,
) -> RadioErrorCode {
    boundary("radio_tx_streamer_num_channels", || {
        let (out, n) = global_session().tx_call(h.0, |tx| {
            Ok((Out::new(num_channels_out, "num_channels output")?, tx.num_channels()))
        })?;
        unsafe { out.write(n) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_max_num_samps(
    h: RadioTxStreamerHandle,
    max_num_samps_out: *mut usize,
) -> RadioErrorCode {
    boundary("radio_tx_streamer_max_num_samps", || {
        let (out, n) = global_session().tx_call(h.0, |tx| {
            Ok((Out::new(max_num_samps_out, "max_num_samps output")?, tx.max_num_samps()))
        })?;
        unsafe { out.write(n) };
        Ok(())
    })
}

/// Send `samps_per_buff` samples from each channel buffer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_send(
    h: RadioTxStreamerHandle,
    buffs: *const *const c_void,
    samps_per_buff: usize,
    md: *const RadioTxMetadata,
    timeout: f64,
    items_sent: *mut usize,
) -> RadioErrorCode {
    boundary("radio_tx_streamer_send", || {
        let (items_out, n) = global_session().tx_call(h.0, |tx| {
            let items_out = Out::new(items_sent, "items_sent output")?;
            let meta = TxMetadata::from(unsafe { input_ref(md, "tx metadata") }?);
            let ptrs = unsafe { channel_ptrs(buffs, tx.num_channels()) }?;
            let len = buffer_len(samps_per_buff, tx.item_size())?;
            let slices = ptrs
                .iter()
                .enumerate()
                .map(|(i, &ptr)| {
                    if ptr.is_null() {
                        return Err(RadioError::Value(format!("buffer {} is null", i)));
                    }
                    Ok(unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) })
                })
                .collect::<Result<Vec<&[u8]>>>()?;
            let n = tx.send(&slices, samps_per_buff, &meta, timeout)?;
            Ok((items_out, n))
        })?;
        unsafe { items_out.write(n) };
        Ok(())
    })
}

/// Wait up to `timeout` seconds for an async event. On timeout `*valid`
/// is false and `md` is left untouched.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_recv_async_msg(
    h: RadioTxStreamerHandle,
    md: *mut RadioAsyncMetadata,
    timeout: f64,
    valid: *mut bool,
) -> RadioErrorCode {
    boundary("radio_tx_streamer_recv_async_msg", || {
        let (md_out, valid_out, event) = global_session().tx_call(h.0, |tx| {
            let md_out = Out::new(md, "async metadata output")?;
            let valid_out = Out::new(valid, "valid output")?;
            let mut meta = AsyncMetadata::default();
            let event = tx
                .recv_async_msg(&mut meta, timeout)?
                .then(|| RadioAsyncMetadata::from(&meta));
            Ok((md_out, valid_out, event))
        })?;
        unsafe {
            valid_out.write(event.is_some());
            if let Some(event) = event {
                md_out.write(event);
            }
        }
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn radio_tx_streamer_last_error(
    h: RadioTxStreamerHandle,
    error_out: *mut c_char,
    len: usize,
) -> RadioErrorCode {
    boundary("radio_tx_streamer_last_error", || {
        let message = global_session().tx_last_error(h.0)?;
        let out = StrOut::new(error_out, len)?;
        unsafe { out.write(&message) };
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        radio_device_free, radio_device_get_rx_stream, radio_device_get_tx_stream,
        radio_device_make,
    };
    use crate::types::{RadioDeviceHandle, RadioStreamArgs};
    use serial_test::serial;
    use std::ffi::CStr;

    fn make_device() -> RadioDeviceHandle {
        let mut h = RadioDeviceHandle::NULL;
        assert_eq!(
            unsafe { radio_device_make(&mut h, c"type=sim".as_ptr()) },
            RadioErrorCode::None
        );
        h
    }

    fn stream_args(channels: &[usize]) -> RadioStreamArgs {
        RadioStreamArgs {
            cpu_format: c"fc32".as_ptr(),
            otw_format: c"sc16".as_ptr(),
            args: std::ptr::null(),
            channel_list: channels.as_ptr(),
            n_channels: channels.len(),
        }
    }

    fn rx_error(h: RadioRxStreamerHandle) -> String {
        let mut buf = [0 as c_char; 256];
        unsafe { radio_rx_streamer_last_error(h, buf.as_mut_ptr(), buf.len()) };
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    #[serial]
    fn test_unbound_streamer_is_invalid() {
        let mut rx = RadioRxStreamerHandle::NULL;
        assert_eq!(unsafe { radio_rx_streamer_make(&mut rx) }, RadioErrorCode::None);
        assert_ne!(rx, RadioRxStreamerHandle::NULL);

        // The slot exists even before binding.
        assert_eq!(rx_error(rx), "");

        let mut n = 42usize;
        assert_eq!(
            unsafe { radio_rx_streamer_num_channels(rx, &mut n) },
            RadioErrorCode::InvalidDevice
        );
        assert_eq!(n, 42);
        assert!(rx_error(rx).contains("not attached"));

        assert_eq!(unsafe { radio_rx_streamer_free(&mut rx) }, RadioErrorCode::None);
        assert_eq!(rx, RadioRxStreamerHandle::NULL);
    }

    #[test]
    #[serial]
    fn test_free_unknown_handle_leaves_it() {
        let mut rx = RadioRxStreamerHandle(u64::MAX);
        assert_eq!(
            unsafe { radio_rx_streamer_free(&mut rx) },
            RadioErrorCode::InvalidDevice
        );
        assert_eq!(rx, RadioRxStreamerHandle(u64::MAX));
    }

    #[test]
    #[serial]
    fn test_recv_times_out_without_stream_cmd() {
        let mut dev = make_device();
        let mut rx = RadioRxStreamerHandle::NULL;
        unsafe { radio_rx_streamer_make(&mut rx) };
        let channels = [0usize];
        let args = stream_args(&channels);
        assert_eq!(
            unsafe { radio_device_get_rx_stream(dev, &args, rx) },
            RadioErrorCode::None
        );

        let mut buf = vec![0f32; 2 * 64];
        let buffs = [buf.as_mut_ptr().cast::<c_void>()];
        let mut md = RadioRxMetadata::default();
        let mut items = 99usize;
        let code = unsafe {
            radio_rx_streamer_recv(rx, buffs.as_ptr(), 64, &mut md, 0.05, false, &mut items)
        };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(items, 0);
        assert_eq!(md.error_code, 0x1);
        assert_eq!(rx_error(rx), "None");

        // A null buffer array is recorded in the streamer's slot.
        let code = unsafe {
            radio_rx_streamer_recv(rx, std::ptr::null(), 64, &mut md, 0.05, false, &mut items)
        };
        assert_eq!(code, RadioErrorCode::Value);
        assert!(rx_error(rx).starts_with("ValueError: "));

        unsafe {
            radio_rx_streamer_free(&mut rx);
            radio_device_free(&mut dev);
        }
    }

    #[test]
    #[serial]
    fn test_bad_stream_mode_is_value_error() {
        let mut dev = make_device();
        let mut rx = RadioRxStreamerHandle::NULL;
        unsafe { radio_rx_streamer_make(&mut rx) };
        let args = stream_args(&[]);
        unsafe { radio_device_get_rx_stream(dev, &args, rx) };

        let cmd = RadioStreamCmd {
            stream_mode: 'x' as i32,
            num_samps: 0,
            stream_now: true,
            time_spec_full_secs: 0,
            time_spec_frac_secs: 0.0,
        };
        assert_eq!(
            unsafe { radio_rx_streamer_issue_stream_cmd(rx, &cmd) },
            RadioErrorCode::Value
        );

        unsafe {
            radio_rx_streamer_free(&mut rx);
            radio_device_free(&mut dev);
        }
    }

    #[test]
    #[serial]
    fn test_send_end_of_burst_acks() {
        let mut dev = make_device();
        let mut tx = RadioTxStreamerHandle::NULL;
        unsafe { radio_tx_streamer_make(&mut tx) };
        let channels = [1usize];
        let args = stream_args(&channels);
        assert_eq!(
            unsafe { radio_device_get_tx_stream(dev, &args, tx) },
            RadioErrorCode::None
        );

        let mut n = 0usize;
        unsafe { radio_tx_streamer_num_channels(tx, &mut n) };
        assert_eq!(n, 1);

        let buf = vec![0f32; 2 * 100];
        let buffs = [buf.as_ptr().cast::<c_void>()];
        let md = RadioTxMetadata {
            start_of_burst: true,
            end_of_burst: true,
            ..Default::default()
        };
        let mut sent = 0usize;
        let code =
            unsafe { radio_tx_streamer_send(tx, buffs.as_ptr(), 100, &md, 0.1, &mut sent) };
        assert_eq!(code, RadioErrorCode::None);
        assert_eq!(sent, 100);

        let mut async_md = RadioAsyncMetadata::default();
        let mut valid = false;
        let code =
            unsafe { radio_tx_streamer_recv_async_msg(tx, &mut async_md, 0.5, &mut valid) };
        assert_eq!(code, RadioErrorCode::None);
        assert!(valid);
        assert_eq!(async_md.event_code, 0x1);

        let mut untouched = RadioAsyncMetadata {
            channel: 77,
            ..Default::default()
        };
        unsafe { radio_tx_streamer_recv_async_msg(tx, &mut untouched, 0.01, &mut valid) };
        assert!(!valid);
        assert_eq!(untouched.channel, 77);

        unsafe {
            radio_tx_streamer_free(&mut tx);
            radio_device_free(&mut dev);
        }
    }
}
