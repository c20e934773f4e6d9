// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// Typed sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorData {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

/// Boundary tag for [`SensorData`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDataType {
    Boolean = b'b' as isize,
    Integer = b'i' as isize,
    Realnum = b'r' as isize,
    String = b's' as isize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorValue {
    pub name: String,
    pub data: SensorData,
    pub unit: String,
}

impl SensorValue {
    pub fn boolean(name: &str, value: bool, utrue: &str, ufalse: &str) -> Self {
        Self {
            name: name.to_string(),
            data: SensorData::Bool(value),
            unit: if value { utrue } else { ufalse }.to_string(),
        }
    }

    pub fn integer(name: &str, value: i64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            data: SensorData::Int(value),
            unit: unit.to_string(),
        }
    }

    pub fn real(name: &str, value: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            data: SensorData::Real(value),
            unit: unit.to_string(),
        }
    }

    pub fn text(name: &str, value: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            data: SensorData::Text(value.to_string()),
            unit: unit.to_string(),
        }
    }

    pub fn data_type(&self) -> SensorDataType {
        match self.data {
            SensorData::Bool(_) => SensorDataType::Boolean,
            SensorData::Int(_) => SensorDataType::Integer,
            SensorData::Real(_) => SensorDataType::Realnum,
            SensorData::Text(_) => SensorDataType::String,
        }
    }

    /// The reading as text (`"true"`, `"42"`, `"-71.5"`).
    pub fn value_string(&self) -> String {
        match &self.data {
            SensorData::Bool(v) => v.to_string(),
            SensorData::Int(v) => v.to_string(),
            SensorData::Real(v) => v.to_string(),
            SensorData::Text(v) => v.clone(),
        }
    }

    /// The reading as a number; booleans map to 1.0 / 0.0, text to NaN.
    pub fn to_real(&self) -> f64 {
        match &self.data {
            SensorData::Bool(v) => f64::from(u8::from(*v)),
            SensorData::Int(v) => *v as f64,
            SensorData::Real(v) => *v,
            SensorData::Text(v) => v.parse().unwrap_or(f64::NAN),
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data {
            SensorData::Bool(_) => write!(f, "{}: {}", self.name, self.unit),
            _ => write!(f, "{}: {} {}", self.name, self.value_string(), self.unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_sensor() {
        let s = SensorValue::boolean("ref_locked", true, "locked", "unlocked");
        assert_eq!(s.data_type(), SensorDataType::Boolean);
        assert_eq!(s.value_string(), "true");
        assert_eq!(s.to_real(), 1.0);
        assert_eq!(s.to_string(), "ref_locked: locked");
    }

    #[test]
    fn test_real_sensor() {
        let s = SensorValue::real("rssi", -71.5, "dBm");
        assert_eq!(s.data_type() as i32, b'r' as i32);
        assert_eq!(s.to_string(), "rssi: -71.5 dBm");
    }
}
