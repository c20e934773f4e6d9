// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide table of live devices and the streamers attached to them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::device::{RadioDevice, RxStreamer, TxStreamer};
use super::handles::ErrorSlot;
use super::{RadioError, Result};

/// Key of a registry entry. Also the value of a device handle.
pub type DeviceIndex = u64;

/// Ordered streamer slots of one kind on one device.
///
/// Offsets are positions in the vector. A detached slot becomes `None` and
/// is the first candidate for the next attach.
pub struct StreamerSlots<S: ?Sized> {
    slots: RwLock<Vec<Option<Arc<S>>>>,
}

impl<S: ?Sized> Default for StreamerSlots<S> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<S: ?Sized> StreamerSlots<S> {
    /// Store `streamer` in the lowest vacant slot and return its offset.
    pub fn attach(&self, streamer: Arc<S>) -> usize {
        let mut slots = self.slots.write();
        match slots.iter().position(Option::is_none) {
            Some(offset) => {
                slots[offset] = Some(streamer);
                offset
            }
            None => {
                slots.push(Some(streamer));
                slots.len() - 1
            }
        }
    }

    pub fn get(&self, offset: usize) -> Option<Arc<S>> {
        self.slots.read().get(offset).cloned().flatten()
    }

    /// Vacate `offset`, returning the streamer that was there.
    pub fn detach(&self, offset: usize) -> Option<Arc<S>> {
        self.slots.write().get_mut(offset).and_then(Option::take)
    }

    /// Number of occupied slots.
    pub fn live(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }

    /// Length of the slot vector, vacant slots included.
    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }
}

/// One live device plus its streamers and error slot.
pub struct RegistryEntry {
    index: DeviceIndex,
    device: Arc<dyn RadioDevice>,
    rx_streamers: StreamerSlots<dyn RxStreamer>,
    tx_streamers: StreamerSlots<dyn TxStreamer>,
    last_error: ErrorSlot,
}

impl RegistryEntry {
    fn new(index: DeviceIndex, device: Arc<dyn RadioDevice>) -> Self {
        Self {
            index,
            device,
            rx_streamers: StreamerSlots::default(),
            tx_streamers: StreamerSlots::default(),
            last_error: ErrorSlot::new(),
        }
    }

    pub fn index(&self) -> DeviceIndex {
        self.index
    }

    pub fn device(&self) -> &Arc<dyn RadioDevice> {
        &self.device
    }

    pub fn rx_streamers(&self) -> &StreamerSlots<dyn RxStreamer> {
        &self.rx_streamers
    }

    pub fn tx_streamers(&self) -> &StreamerSlots<dyn TxStreamer> {
        &self.tx_streamers
    }

    pub fn last_error(&self) -> &ErrorSlot {
        &self.last_error
    }
}

struct RegistryState {
    entries: HashMap<DeviceIndex, Arc<RegistryEntry>>,
    next_index: DeviceIndex,
}

/// Sparse map from device index to entry.
///
/// The lock is held only while the map itself changes; callers clone the
/// entry `Arc` and release the lock before touching the device. Indices
/// start at 1 and are never reused.
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                entries: HashMap::new(),
                next_index: 1,
            }),
        }
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-constructed device under a fresh index.
    pub fn insert(&self, device: Arc<dyn RadioDevice>) -> DeviceIndex {
        let mut state = self.state.write();
        let index = state.next_index;
        state.next_index += 1;
        state
            .entries
            .insert(index, Arc::new(RegistryEntry::new(index, device)));
        index
    }

    pub fn resolve(&self, index: DeviceIndex) -> Result<Arc<RegistryEntry>> {
        self.state
            .read()
            .entries
            .get(&index)
            .cloned()
            .ok_or(RadioError::InvalidDevice(index))
    }

    /// Erase `index`. The returned entry is dropped by the caller, outside
    /// the registry lock.
    pub fn remove(&self, index: DeviceIndex) -> Result<Arc<RegistryEntry>> {
        self.state
            .write()
            .entries
            .remove(&index)
            .ok_or(RadioError::InvalidDevice(index))
    }

    pub fn contains(&self, index: DeviceIndex) -> bool {
        self.state.read().entries.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Erase every entry. The index counter keeps counting.
    pub fn clear(&self) {
        let drained: Vec<_> = self.state.write().entries.drain().collect();
        drop(drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeviceAddr;
    use crate::sim::SimDevice;

    fn sim_device() -> Arc<dyn RadioDevice> {
        Arc::new(SimDevice::new(&DeviceAddr::parse("type=sim,serial=SIM0001")))
    }

    #[test]
    fn test_indices_increase_and_are_not_reused() {
        let registry = DeviceRegistry::new();
        let a = registry.insert(sim_device());
        let b = registry.insert(sim_device());
        assert_eq!((a, b), (1, 2));

        registry.remove(b).unwrap();
        assert_eq!(registry.insert(sim_device()), 3);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.insert(sim_device()), 4);
    }

    #[test]
    fn test_missing_index_is_invalid_device() {
        let registry = DeviceRegistry::new();
        assert!(matches!(registry.resolve(9), Err(RadioError::InvalidDevice(9))));
        let index = registry.insert(sim_device());
        registry.remove(index).unwrap();
        assert!(matches!(
            registry.remove(index),
            Err(RadioError::InvalidDevice(_))
        ));
        assert!(!registry.contains(index));
    }

    #[test]
    fn test_slots_reuse_lowest_vacancy() {
        let slots: StreamerSlots<str> = StreamerSlots::default();
        assert_eq!(slots.attach(Arc::from("a")), 0);
        assert_eq!(slots.attach(Arc::from("b")), 1);
        assert_eq!(slots.attach(Arc::from("c")), 2);

        assert_eq!(slots.detach(1).as_deref(), Some("b"));
        assert!(slots.detach(1).is_none());
        assert!(slots.get(1).is_none());
        assert_eq!(slots.live(), 2);

        assert_eq!(slots.attach(Arc::from("d")), 1);
        assert_eq!(slots.get(2).as_deref(), Some("c"));
        assert_eq!(slots.capacity(), 3);
    }
}
