// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Opaque handle tables and per-handle error slots.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::Result;
use super::registry::DeviceIndex;

/// Opaque token naming a record in a [`HandleTable`]. Zero is never issued.
pub type HandleId = u64;

/// Text of the most recent failure on one handle.
///
/// Starts empty; every associated call overwrites it, with `"None"` on
/// success.
#[derive(Debug, Default)]
pub struct ErrorSlot(Mutex<String>);

impl ErrorSlot {
    pub const NONE: &'static str = "None";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.0.lock().clone()
    }

    pub fn set(&self, message: impl Into<String>) {
        *self.0.lock() = message.into();
    }

    /// Store the outcome of an associated call.
    pub fn record<T>(&self, result: &Result<T>) {
        match result {
            Ok(_) => self.set(Self::NONE),
            Err(e) => self.set(e.to_string()),
        }
    }
}

/// Sparse table of records keyed by monotonically assigned IDs.
///
/// ID assignment is a single atomic increment; the table lock is held only
/// for the map insert/remove.
pub struct HandleTable<T> {
    next_id: AtomicU64,
    records: RwLock<HashMap<HandleId, Arc<T>>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: T) -> HandleId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.records.write().insert(id, Arc::new(record));
        id
    }

    pub fn get(&self, id: HandleId) -> Option<Arc<T>> {
        self.records.read().get(&id).cloned()
    }

    pub fn remove(&self, id: HandleId) -> Option<Arc<T>> {
        self.records.write().remove(&id)
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.records.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop every record. Issued IDs are not reused.
    pub fn clear(&self) {
        let drained: Vec<_> = self.records.write().drain().collect();
        drop(drained);
    }
}

/// Where a streamer handle points: a device and a slot on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamerBinding {
    pub device: DeviceIndex,
    pub offset: usize,
}

/// Binding plus a marker set once the handle is freed. Both live under one
/// lock so an attach racing a free sees the release and backs out.
#[derive(Debug, Default)]
pub struct BindingState {
    pub current: Option<StreamerBinding>,
    pub released: bool,
}

/// Record behind an rx or tx streamer handle.
#[derive(Debug, Default)]
pub struct StreamerRecord {
    binding: Mutex<BindingState>,
    last_error: ErrorSlot,
}

impl StreamerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&self) -> Option<StreamerBinding> {
        self.binding.lock().current
    }

    /// Lock the binding for a read-modify-write (attach / free).
    pub fn binding_mut(&self) -> parking_lot::MutexGuard<'_, BindingState> {
        self.binding.lock()
    }

    pub fn last_error(&self) -> &ErrorSlot {
        &self.last_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RadioError;

    #[test]
    fn test_error_slot_protocol() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.get(), "");

        slot.record::<()>(&Err(RadioError::Value("bad gain".into())));
        assert_eq!(slot.get(), "ValueError: bad gain");

        slot.record(&Ok(5));
        assert_eq!(slot.get(), ErrorSlot::NONE);
    }

    #[test]
    fn test_handle_ids_are_never_reused() {
        let table = HandleTable::new();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_ne!(a, 0);
        assert!(b > a);

        assert!(table.remove(a).is_some());
        assert!(table.remove(a).is_none());
        assert!(table.get(a).is_none());

        let c = table.insert("c");
        assert!(c > b);
        assert_eq!(table.len(), 2);

        table.clear();
        assert!(table.is_empty());
        assert!(table.insert("d") > c);
    }

    #[test]
    fn test_streamer_record_binding() {
        let record = StreamerRecord::new();
        assert!(record.binding().is_none());
        record.binding_mut().current = Some(StreamerBinding {
            device: 3,
            offset: 1,
        });
        assert_eq!(record.binding().map(|b| b.offset), Some(1));

        let mut state = record.binding_mut();
        state.released = true;
        assert!(state.current.take().is_some());
        drop(state);
        assert!(record.binding().is_none());
    }
}
