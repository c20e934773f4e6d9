// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Key/value device address markup (`"type=sim,serial=SIM0001"`).
//!
//! Used for device discovery hints, per-stream extra arguments, tune request
//! arguments, and motherboard EEPROM contents.

use std::fmt;
use std::str::FromStr;

use super::{RadioError, Result};

/// Ordered key/value pairs. Insertion order is preserved; keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAddr {
    pairs: Vec<(String, String)>,
}

impl DeviceAddr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `k=v,k2=v2`. Whitespace around keys and values is trimmed, a key
    /// without `=` gets an empty value, and empty segments are skipped.
    pub fn parse(markup: &str) -> Self {
        let mut addr = Self::new();
        for segment in markup.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((k, v)) => addr.set(k.trim(), v.trim()),
                None => addr.set(segment, ""),
            }
        }
        addr
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parse the value at `key` as a number.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                RadioError::Value(format!("cannot parse device argument {}={}", key, raw))
            }),
        }
    }

    /// Discovery filter: every key in `hint` that this address also carries
    /// must have the same value. Keys only present in the hint are treated as
    /// construction arguments and do not filter.
    pub fn matches_hint(&self, hint: &DeviceAddr) -> bool {
        hint.iter()
            .all(|(k, v)| self.get(k).is_none_or(|mine| mine == v))
    }

    /// Overlay every pair of `other` onto a copy of `self`.
    pub fn merged(&self, other: &DeviceAddr) -> Self {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.set(k, v);
        }
        out
    }

    /// Multi-line form used in discovery failure messages.
    pub fn to_pp_string(&self) -> String {
        if self.is_empty() {
            return "Empty Device Address".to_string();
        }
        let mut out = String::from("Device Address:\n");
        for (k, v) in self.iter() {
            out.push_str(&format!("    {}: {}\n", k, v));
        }
        out
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

impl From<&str> for DeviceAddr {
    fn from(markup: &str) -> Self {
        Self::parse(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let addr = DeviceAddr::parse(" type = sim , serial=SIM0001,,flag");
        assert_eq!(addr.get("type"), Some("sim"));
        assert_eq!(addr.get("serial"), Some("SIM0001"));
        assert_eq!(addr.get("flag"), Some(""));
        assert_eq!(addr.len(), 3);
        assert_eq!(addr.to_string(), "type=sim,serial=SIM0001,flag=");
    }

    #[test]
    fn test_empty_markup() {
        assert!(DeviceAddr::parse("").is_empty());
        assert_eq!(DeviceAddr::new().to_pp_string(), "Empty Device Address");
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut addr = DeviceAddr::parse("a=1,b=2");
        addr.set("a", "3");
        assert_eq!(addr.to_string(), "a=3,b=2");
        assert_eq!(addr.remove("a").as_deref(), Some("3"));
        assert!(!addr.contains("a"));
    }

    #[test]
    fn test_matches_hint() {
        let found = DeviceAddr::parse("type=sim,serial=SIM0001");
        assert!(found.matches_hint(&DeviceAddr::parse("")));
        assert!(found.matches_hint(&DeviceAddr::parse("type=sim")));
        assert!(found.matches_hint(&DeviceAddr::parse("master_clock_rate=16e6")));
        assert!(!found.matches_hint(&DeviceAddr::parse("serial=SIM0002")));
    }

    #[test]
    fn test_get_parsed() {
        let addr = DeviceAddr::parse("rate=1e6,bad=abc");
        assert_eq!(addr.get_parsed::<f64>("rate").unwrap(), Some(1e6));
        assert_eq!(addr.get_parsed::<f64>("missing").unwrap(), None);
        assert!(addr.get_parsed::<f64>("bad").is_err());
    }
}
