// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Outermost error capture for every `radio_*` entry point.
//!
//! * Panics are caught here and never cross the ABI.
//! * Every failure is mirrored into a thread-local "last error" that
//!   [`crate::radio_get_last_error`] reads back.
//! * Pointer helpers check for null and defer output writes until the
//!   forwarded call has succeeded.

use std::cell::RefCell;
use std::ffi::{CStr, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::NonNull;

use radiolib::marshal::{copy_str_into, encode_list};
use radiolib::{RadioError, RadioErrorCode, Result, init_logging};

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

pub(crate) fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.clear();
        slot.push_str(msg);
    });
}

pub(crate) fn last_error() -> String {
    LAST_ERROR.with(|cell| cell.borrow().clone())
}

/// Run the body of an `extern "C"` function and turn its outcome into a
/// status code.
pub(crate) fn boundary(name: &'static str, body: impl FnOnce() -> Result<()>) -> RadioErrorCode {
    match catch_unwind(AssertUnwindSafe(|| {
        init_logging();
        body()
    })) {
        Ok(Ok(())) => RadioErrorCode::None,
        Ok(Err(e)) => {
            set_last_error(&e.to_string());
            e.code()
        }
        Err(payload) => {
            let detail = match RadioError::from_panic(payload) {
                RadioError::Panic(msg) => msg,
                other => other.to_string(),
            };
            tracing::error!("{} panicked outside a driver call: {}", name, detail);
            set_last_error(&format!("Internal panic in {}: {}", name, detail));
            RadioErrorCode::Unknown
        }
    }
}

/// Borrow a caller-supplied input string. Null or non-UTF-8 is a
/// [`RadioError::Value`].
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives
/// `'a`.
pub(crate) unsafe fn input_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(RadioError::Value(format!("{} must not be null", what)));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| RadioError::Value(format!("{} is not valid UTF-8", what)))
}

/// Borrow a caller-supplied input struct.
///
/// # Safety
///
/// `ptr` must be null or point to a valid `T` that outlives `'a`.
pub(crate) unsafe fn input_ref<'a, T>(ptr: *const T, what: &str) -> Result<&'a T> {
    unsafe { ptr.as_ref() }
        .ok_or_else(|| RadioError::Value(format!("{} must not be null", what)))
}

/// Checked output location for a single value.
pub(crate) struct Out<T>(NonNull<T>);

impl<T> Out<T> {
    pub(crate) fn new(ptr: *mut T, what: &str) -> Result<Self> {
        NonNull::new(ptr)
            .map(Self)
            .ok_or_else(|| RadioError::Value(format!("{} must not be null", what)))
    }

    /// # Safety
    ///
    /// The pointer passed to [`Out::new`] must be valid for writes.
    pub(crate) unsafe fn write(self, value: T) {
        unsafe { self.0.as_ptr().write(value) }
    }
}

/// Checked `(char *buf, size_t len)` output.
pub(crate) struct StrOut {
    buf: *mut c_char,
    len: usize,
}

impl StrOut {
    pub(crate) fn new(buf: *mut c_char, len: usize) -> Result<Self> {
        if buf.is_null() && len > 0 {
            return Err(RadioError::Value("string buffer must not be null".to_string()));
        }
        Ok(Self { buf, len })
    }

    /// Zero-fill the buffer and copy `s` in, truncated to `len - 1` bytes.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for `len` bytes of writes.
    pub(crate) unsafe fn write(self, s: &str) {
        if self.len == 0 {
            return;
        }
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.buf.cast::<u8>(), self.len) };
        copy_str_into(bytes, s);
    }
}

/// Checked list output: encoded string plus element count.
pub(crate) struct ListOut {
    text: StrOut,
    count: Out<usize>,
}

impl ListOut {
    pub(crate) fn new(buf: *mut c_char, len: usize, count: *mut usize) -> Result<Self> {
        Ok(Self {
            text: StrOut::new(buf, len)?,
            count: Out::new(count, "count output")?,
        })
    }

    /// # Safety
    ///
    /// Same contract as [`StrOut::write`] and [`Out::write`].
    pub(crate) unsafe fn write<S: AsRef<str>>(self, items: &[S]) {
        unsafe {
            self.text.write(&encode_list(items));
            self.count.write(items.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_maps_errors_and_panics() {
        let code = boundary("test", || Err(RadioError::Lookup("no such thing".into())));
        assert_eq!(code, RadioErrorCode::Lookup);
        assert_eq!(last_error(), "LookupError: no such thing");

        let code = boundary("test", || panic!("shim bug"));
        assert_eq!(code, RadioErrorCode::Unknown);
        assert!(last_error().contains("shim bug"));

        // Success leaves the thread-local untouched.
        assert_eq!(boundary("test", || Ok(())), RadioErrorCode::None);
        assert!(last_error().contains("shim bug"));
    }

    #[test]
    fn test_str_out_zero_length_writes_nothing() {
        let mut buf = [7 as c_char; 4];
        unsafe { StrOut::new(buf.as_mut_ptr(), 0).unwrap().write("abc") };
        assert_eq!(buf, [7; 4]);

        unsafe { StrOut::new(buf.as_mut_ptr(), 3).unwrap().write("abcdef") };
        assert_eq!(buf, [b'a' as c_char, b'b' as c_char, 0, 7]);
    }

    #[test]
    fn test_null_pointers_are_value_errors() {
        assert!(matches!(
            Out::<f64>::new(std::ptr::null_mut(), "rate output"),
            Err(RadioError::Value(_))
        ));
        assert!(StrOut::new(std::ptr::null_mut(), 0).is_ok());
        assert!(StrOut::new(std::ptr::null_mut(), 8).is_err());
        assert!(unsafe { input_str(std::ptr::null(), "args") }.is_err());
    }
}
