// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use super::registry::DeviceIndex;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Invalid device: index {0} is not registered")]
    InvalidDevice(DeviceIndex),

    #[error("Invalid streamer: {0}")]
    InvalidStreamer(String),

    #[error("IndexError: {0}")]
    Index(String),

    #[error("KeyError: {0}")]
    Key(String),

    #[error("NotImplementedError: {0}")]
    NotImplemented(String),

    #[error("USBError: {0}")]
    Usb(String),

    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),

    #[error("OSError: {0}")]
    Os(String),

    #[error("AssertionError: {0}")]
    Assertion(String),

    #[error("LookupError: {0}")]
    Lookup(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("ValueError: {0}")]
    Value(String),

    #[error("RuntimeError: {0}")]
    Runtime(String),

    #[error("EnvironmentError: {0}")]
    Environment(String),

    #[error("SystemError: {0}")]
    System(String),

    /// A driver panicked while servicing a forwarded call.
    #[error("Driver panicked: {0}")]
    Panic(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RadioError>;

/// Status code returned by every boundary call.
///
/// Values are part of the ABI and must not be renumbered.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioErrorCode {
    None = 0,
    InvalidDevice = 1,
    Index = 10,
    Key = 11,
    NotImplemented = 20,
    Usb = 21,
    Io = 30,
    Os = 31,
    Assertion = 40,
    Lookup = 41,
    Type = 42,
    Value = 43,
    Runtime = 44,
    Environment = 45,
    System = 46,
    Except = 47,
    Unknown = 100,
}

impl RadioError {
    /// Classify this error into its boundary status code.
    pub fn code(&self) -> RadioErrorCode {
        match self {
            Self::InvalidDevice(_) | Self::InvalidStreamer(_) => RadioErrorCode::InvalidDevice,
            Self::Index(_) => RadioErrorCode::Index,
            Self::Key(_) => RadioErrorCode::Key,
            Self::NotImplemented(_) => RadioErrorCode::NotImplemented,
            Self::Usb(_) => RadioErrorCode::Usb,
            Self::Io(_) => RadioErrorCode::Io,
            Self::Os(_) => RadioErrorCode::Os,
            Self::Assertion(_) => RadioErrorCode::Assertion,
            Self::Lookup(_) => RadioErrorCode::Lookup,
            Self::Type(_) => RadioErrorCode::Type,
            Self::Value(_) => RadioErrorCode::Value,
            Self::Runtime(_) => RadioErrorCode::Runtime,
            Self::Environment(_) => RadioErrorCode::Environment,
            Self::System(_) => RadioErrorCode::System,
            Self::Panic(_) => RadioErrorCode::Except,
            Self::Other(_) => RadioErrorCode::Unknown,
        }
    }

    /// Build a [`RadioError::Panic`] from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panic(msg)
    }
}

impl RadioErrorCode {
    pub fn is_ok(self) -> bool {
        self == Self::None
    }
}

impl<T> From<&Result<T>> for RadioErrorCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::None,
            Err(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(RadioErrorCode::None as i32, 0);
        assert_eq!(RadioErrorCode::InvalidDevice as i32, 1);
        assert_eq!(RadioErrorCode::Key as i32, 11);
        assert_eq!(RadioErrorCode::Value as i32, 43);
        assert_eq!(RadioErrorCode::Except as i32, 47);
        assert_eq!(RadioErrorCode::Unknown as i32, 100);
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            RadioError::InvalidDevice(7).code(),
            RadioErrorCode::InvalidDevice
        );
        assert_eq!(
            RadioError::InvalidStreamer("unbound".into()).code(),
            RadioErrorCode::InvalidDevice
        );
        assert_eq!(
            RadioError::Value("bad rate".into()).code(),
            RadioErrorCode::Value
        );
        let io = RadioError::from(std::io::Error::other("gone"));
        assert_eq!(io.code(), RadioErrorCode::Io);
        let other = RadioError::from(anyhow::anyhow!("mystery"));
        assert_eq!(other.code(), RadioErrorCode::Unknown);
    }

    #[test]
    fn test_panic_payloads() {
        let err = RadioError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "Driver panicked: boom");
        let err = RadioError::from_panic(Box::new(String::from("bang")));
        assert_eq!(err.code(), RadioErrorCode::Except);
        let err = RadioError::from_panic(Box::new(42u8));
        assert!(err.to_string().contains("non-string"));
    }

    #[test]
    fn test_code_from_result() {
        let ok: Result<u8> = Ok(1);
        assert!(RadioErrorCode::from(&ok).is_ok());
        let err: Result<u8> = Err(RadioError::Key("x".into()));
        assert_eq!(RadioErrorCode::from(&err), RadioErrorCode::Key);
    }
}
