// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::str::FromStr;

use crate::core::{RadioError, Result};

/// One daughterboard slot / subdevice selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdevSpecPair {
    pub db_name: String,
    pub sd_name: String,
}

impl SubdevSpecPair {
    pub fn new(db_name: &str, sd_name: &str) -> Self {
        Self {
            db_name: db_name.to_string(),
            sd_name: sd_name.to_string(),
        }
    }
}

/// Frontend routing for one motherboard; one pair per channel.
///
/// Markup is whitespace-separated `db:sd` tokens, e.g. `"A:0 B:0"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubdevSpec(Vec<SubdevSpecPair>);

impl SubdevSpec {
    pub fn new(pairs: Vec<SubdevSpecPair>) -> Self {
        Self(pairs)
    }

    pub fn pairs(&self) -> &[SubdevSpecPair] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&SubdevSpecPair> {
        self.0.get(index).ok_or_else(|| {
            RadioError::Index(format!(
                "subdev spec index {} out of range (size {})",
                index,
                self.0.len()
            ))
        })
    }

    pub fn to_pp_string(&self) -> String {
        if self.0.is_empty() {
            return "Empty Subdevice Specification".to_string();
        }
        let mut out = String::from("Subdevice Specification:\n");
        for (i, pair) in self.0.iter().enumerate() {
            out.push_str(&format!(
                "    Channel {}: Daughterboard {}, Subdevice {}\n",
                i, pair.db_name, pair.sd_name
            ));
        }
        out
    }
}

impl FromStr for SubdevSpec {
    type Err = RadioError;

    fn from_str(markup: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        for token in markup.split_whitespace() {
            let (db, sd) = token.split_once(':').unwrap_or((token, ""));
            if db.is_empty() || sd.contains(':') {
                return Err(RadioError::Value(format!(
                    "invalid subdev spec token '{}'",
                    token
                )));
            }
            pairs.push(SubdevSpecPair::new(db, sd));
        }
        Ok(Self(pairs))
    }
}

impl fmt::Display for SubdevSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", pair.db_name, pair.sd_name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markup() {
        let spec: SubdevSpec = "A:0  B:AB".parse().unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.get(1).unwrap(), &SubdevSpecPair::new("B", "AB"));
        assert_eq!(spec.to_string(), "A:0 B:AB");
    }

    #[test]
    fn test_db_only_token() {
        let spec: SubdevSpec = "A".parse().unwrap();
        assert_eq!(spec.get(0).unwrap().sd_name, "");
        assert_eq!(spec.to_string(), "A:");
    }

    #[test]
    fn test_invalid_tokens() {
        assert!(":0".parse::<SubdevSpec>().is_err());
        assert!("A:0:1".parse::<SubdevSpec>().is_err());
        assert!(matches!(
            SubdevSpec::default().get(0),
            Err(RadioError::Index(_))
        ));
    }
}
