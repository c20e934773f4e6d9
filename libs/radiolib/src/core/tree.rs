// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Path-addressed property store exposed by every device.

use std::any::Any;
use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{RadioError, Result};

type PropertyValue = Box<dyn Any + Send + Sync>;

/// Typed values keyed by slash-separated paths such as
/// `/mboards/0/eeprom`.
///
/// Paths are normalized (duplicate and trailing slashes removed) so
/// `/mboards//0/` and `/mboards/0` name the same node.
#[derive(Default)]
pub struct PropertyTree {
    nodes: RwLock<BTreeMap<String, PropertyValue>>,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; fails if the path already exists.
    pub fn create<T>(&self, path: &str, value: T) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        let path = normalize(path);
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&path) {
            return Err(RadioError::Runtime(format!(
                "Cannot create node {}, already exists",
                path
            )));
        }
        nodes.insert(path, Box::new(value));
        Ok(())
    }

    pub fn get<T>(&self, path: &str) -> Result<T>
    where
        T: Any + Clone,
    {
        let path = normalize(path);
        let nodes = self.nodes.read();
        let node = nodes
            .get(&path)
            .ok_or_else(|| RadioError::Lookup(format!("Path not found in tree: {}", path)))?;
        node.downcast_ref::<T>().cloned().ok_or_else(|| {
            RadioError::Type(format!(
                "Property {} is not of type {}",
                path,
                std::any::type_name::<T>()
            ))
        })
    }

    /// Overwrite an existing node. The stored type may not change.
    pub fn set<T>(&self, path: &str, value: T) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        let path = normalize(path);
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| RadioError::Lookup(format!("Path not found in tree: {}", path)))?;
        match node.downcast_mut::<T>() {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RadioError::Type(format!(
                "Property {} is not of type {}",
                path,
                std::any::type_name::<T>()
            ))),
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.read().contains_key(&normalize(path))
    }

    /// Names of the direct children of `path`.
    pub fn list(&self, path: &str) -> Vec<String> {
        let mut prefix = normalize(path);
        if prefix != "/" {
            prefix.push('/');
        }
        let nodes = self.nodes.read();
        let mut children: Vec<String> = nodes
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|child| !child.is_empty())
            .map(str::to_string)
            .collect();
        children.dedup();
        children
    }
}

fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DboardEeprom;

    #[test]
    fn test_create_get_set() {
        let tree = PropertyTree::new();
        tree.create("/mboards/0/name", "sim0".to_string()).unwrap();
        assert_eq!(tree.get::<String>("mboards//0/name/").unwrap(), "sim0");

        tree.set("/mboards/0/name", "renamed".to_string()).unwrap();
        assert_eq!(tree.get::<String>("/mboards/0/name").unwrap(), "renamed");
        assert!(tree.create("/mboards/0/name", String::new()).is_err());
    }

    #[test]
    fn test_missing_and_mistyped() {
        let tree = PropertyTree::new();
        tree.create("/db", DboardEeprom::new(7, "X1", 2)).unwrap();
        assert!(matches!(
            tree.get::<DboardEeprom>("/nope"),
            Err(RadioError::Lookup(_))
        ));
        assert!(matches!(tree.get::<String>("/db"), Err(RadioError::Type(_))));
        assert!(matches!(tree.set("/db", 3u32), Err(RadioError::Type(_))));
    }

    #[test]
    fn test_list_children() {
        let tree = PropertyTree::new();
        tree.create("/mboards/0/eeprom", 0u8).unwrap();
        tree.create("/mboards/0/dboards/A/rx_eeprom", 0u8).unwrap();
        tree.create("/mboards/1/eeprom", 0u8).unwrap();
        assert_eq!(tree.list("/mboards"), vec!["0", "1"]);
        assert_eq!(tree.list("/mboards/0"), vec!["dboards", "eeprom"]);
        assert!(tree.exists("/mboards/0/dboards/A/rx_eeprom"));
    }
}
