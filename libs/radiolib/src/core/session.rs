// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Device and streamer lifecycle plus the per-call error-capture protocol.
//!
//! A [`Session`] owns the device registry and one handle table per streamer
//! kind. Every forwarded call follows the same shape: resolve the handle,
//! clone what it names out of the lock, run the call with panics caught,
//! then record the outcome in the handle's error slot.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};

use super::device::{RadioDevice, RxStreamer, TxStreamer};
use super::handles::{HandleId, HandleTable, StreamerBinding, StreamerRecord};
use super::registry::{DeviceIndex, DeviceRegistry, RegistryEntry, StreamerSlots};
use super::types::StreamArgs;
use super::{DeviceAddr, RadioError, Result, driver};

/// Run `f`, turning a panic into [`RadioError::Panic`].
pub fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let err = RadioError::from_panic(payload);
        tracing::warn!("Caught panic in driver call: {}", err);
        Err(err)
    })
}

/// Handle table plus slot selector for one streamer kind.
struct StreamerLane<S: ?Sized + 'static> {
    kind: &'static str,
    handles: HandleTable<StreamerRecord>,
    slots: fn(&RegistryEntry) -> &StreamerSlots<S>,
}

impl<S: ?Sized + 'static> StreamerLane<S> {
    fn new(kind: &'static str, slots: fn(&RegistryEntry) -> &StreamerSlots<S>) -> Self {
        Self {
            kind,
            handles: HandleTable::new(),
            slots,
        }
    }

    fn record(&self, handle: HandleId) -> Result<Arc<StreamerRecord>> {
        self.handles.get(handle).ok_or_else(|| {
            RadioError::InvalidStreamer(format!(
                "{} streamer handle {} is not allocated",
                self.kind, handle
            ))
        })
    }

    fn make(&self) -> HandleId {
        let handle = self.handles.insert(StreamerRecord::new());
        tracing::debug!("Allocated {} streamer handle {}", self.kind, handle);
        handle
    }

    fn free(&self, registry: &DeviceRegistry, handle: HandleId) -> Result<()> {
        let record = self.handles.remove(handle).ok_or_else(|| {
            RadioError::InvalidStreamer(format!(
                "{} streamer handle {} is not allocated",
                self.kind, handle
            ))
        })?;
        let binding = {
            let mut state = record.binding_mut();
            state.released = true;
            state.current.take()
        };
        if let Some(binding) = binding {
            self.detach(registry, binding);
        }
        tracing::debug!("Freed {} streamer handle {}", self.kind, handle);
        Ok(())
    }

    fn detach(&self, registry: &DeviceRegistry, binding: StreamerBinding) {
        // The device may already be gone, taking its streamers with it.
        let Ok(entry) = registry.resolve(binding.device) else {
            return;
        };
        let streamer = (self.slots)(&entry).detach(binding.offset);
        tracing::debug!(
            "Detached {} streamer from device {} offset {}",
            self.kind,
            binding.device,
            binding.offset
        );
        drop(streamer);
    }

    fn attach(
        &self,
        registry: &DeviceRegistry,
        index: DeviceIndex,
        handle: HandleId,
        build: impl FnOnce(&dyn RadioDevice) -> Result<Arc<S>>,
    ) -> Result<usize> {
        let entry = registry.resolve(index)?;
        let record = self.record(handle)?;

        let result = guarded(|| build(entry.device().as_ref()));
        entry.last_error().record(&result);
        let streamer = result?;

        let mut state = record.binding_mut();
        if state.released {
            drop(streamer);
            return Err(RadioError::InvalidStreamer(format!(
                "{} streamer handle {} was freed during attach",
                self.kind, handle
            )));
        }
        if let Some(previous) = state.current.take() {
            self.detach(registry, previous);
        }
        let offset = (self.slots)(&entry).attach(streamer);
        state.current = Some(StreamerBinding {
            device: index,
            offset,
        });
        tracing::debug!(
            "Attached {} streamer handle {} to device {} at offset {}",
            self.kind,
            handle,
            index,
            offset
        );
        Ok(offset)
    }

    fn resolve(&self, registry: &DeviceRegistry, record: &StreamerRecord) -> Result<Arc<S>> {
        let binding = record.binding().ok_or_else(|| {
            RadioError::InvalidStreamer(format!("{} streamer is not attached", self.kind))
        })?;
        let entry = registry.resolve(binding.device)?;
        (self.slots)(&entry).get(binding.offset).ok_or_else(|| {
            RadioError::InvalidStreamer(format!(
                "{} streamer slot {} on device {} is vacant",
                self.kind, binding.offset, binding.device
            ))
        })
    }

    fn call<T>(
        &self,
        registry: &DeviceRegistry,
        handle: HandleId,
        f: impl FnOnce(&S) -> Result<T>,
    ) -> Result<T> {
        let record = self.record(handle)?;
        let result = self
            .resolve(registry, &record)
            .and_then(|streamer| guarded(|| f(streamer.as_ref())));
        record.last_error().record(&result);
        result
    }

    fn last_error(&self, handle: HandleId) -> Result<String> {
        Ok(self.record(handle)?.last_error().get())
    }

    fn binding(&self, handle: HandleId) -> Result<Option<StreamerBinding>> {
        Ok(self.record(handle)?.binding())
    }
}

/// Devices, streamer handles and their error slots.
pub struct Session {
    devices: DeviceRegistry,
    rx: StreamerLane<dyn RxStreamer>,
    tx: StreamerLane<dyn TxStreamer>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            devices: DeviceRegistry::new(),
            rx: StreamerLane::new("rx", RegistryEntry::rx_streamers),
            tx: StreamerLane::new("tx", RegistryEntry::tx_streamers),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// Device addresses reachable with `args` as a hint.
    pub fn find(&self, args: &str) -> Result<Vec<DeviceAddr>> {
        guarded(|| driver::find(&DeviceAddr::parse(args)))
    }

    /// Open a device and register it under a fresh index.
    ///
    /// Discovery and construction run before the registry lock is taken, so
    /// concurrent creates only serialize on the final insert.
    pub fn make_device(&self, args: &str) -> Result<DeviceIndex> {
        let addr = DeviceAddr::parse(args);
        let device = guarded(|| driver::make(&addr))?;
        let index = self.devices.insert(device);
        tracing::info!("Created device {} from '{}'", index, addr);
        Ok(index)
    }

    /// Erase a device. Its streamers go with it; handles bound to them
    /// resolve to [`RadioError::InvalidDevice`] afterwards.
    pub fn free_device(&self, index: DeviceIndex) -> Result<()> {
        let entry = self.devices.remove(index)?;
        drop(entry);
        tracing::info!("Freed device {}", index);
        Ok(())
    }

    /// Forward `f` to the device at `index`, recording the outcome in its
    /// error slot.
    pub fn device_call<T>(
        &self,
        index: DeviceIndex,
        f: impl FnOnce(&dyn RadioDevice) -> Result<T>,
    ) -> Result<T> {
        let entry = self.devices.resolve(index)?;
        let result = guarded(|| f(entry.device().as_ref()));
        if let Err(e) = &result {
            tracing::debug!("Device {} call failed: {}", index, e);
        }
        entry.last_error().record(&result);
        result
    }

    pub fn device_last_error(&self, index: DeviceIndex) -> Result<String> {
        Ok(self.devices.resolve(index)?.last_error().get())
    }

    // ---- RX streamers ---------------------------------------------------

    pub fn make_rx_streamer(&self) -> HandleId {
        self.rx.make()
    }

    pub fn free_rx_streamer(&self, handle: HandleId) -> Result<()> {
        self.rx.free(&self.devices, handle)
    }

    /// Build an rx streamer on `index` and bind `handle` to it. Returns the
    /// slot offset.
    pub fn attach_rx_stream(
        &self,
        index: DeviceIndex,
        handle: HandleId,
        args: &StreamArgs,
    ) -> Result<usize> {
        self.rx
            .attach(&self.devices, index, handle, |dev| dev.get_rx_stream(args))
    }

    pub fn rx_call<T>(
        &self,
        handle: HandleId,
        f: impl FnOnce(&dyn RxStreamer) -> Result<T>,
    ) -> Result<T> {
        self.rx.call(&self.devices, handle, |s| f(s))
    }

    pub fn rx_last_error(&self, handle: HandleId) -> Result<String> {
        self.rx.last_error(handle)
    }

    pub fn rx_binding(&self, handle: HandleId) -> Result<Option<StreamerBinding>> {
        self.rx.binding(handle)
    }

    // ---- TX streamers ---------------------------------------------------

    pub fn make_tx_streamer(&self) -> HandleId {
        self.tx.make()
    }

    pub fn free_tx_streamer(&self, handle: HandleId) -> Result<()> {
        self.tx.free(&self.devices, handle)
    }

    pub fn attach_tx_stream(
        &self,
        index: DeviceIndex,
        handle: HandleId,
        args: &StreamArgs,
    ) -> Result<usize> {
        self.tx
            .attach(&self.devices, index, handle, |dev| dev.get_tx_stream(args))
    }

    pub fn tx_call<T>(
        &self,
        handle: HandleId,
        f: impl FnOnce(&dyn TxStreamer) -> Result<T>,
    ) -> Result<T> {
        self.tx.call(&self.devices, handle, |s| f(s))
    }

    pub fn tx_last_error(&self, handle: HandleId) -> Result<String> {
        self.tx.last_error(handle)
    }

    pub fn tx_binding(&self, handle: HandleId) -> Result<Option<StreamerBinding>> {
        self.tx.binding(handle)
    }

    /// Drop every device and streamer handle.
    pub fn clear(&self) {
        self.rx.handles.clear();
        self.tx.handles.clear();
        self.devices.clear();
    }
}

/// The process-wide session used by the C ABI.
pub fn global_session() -> &'static Session {
    static SESSION: OnceLock<Session> = OnceLock::new();
    SESSION.get_or_init(Session::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RxMetadata, StreamCmd};

    fn rx_args() -> StreamArgs {
        StreamArgs::new("fc32", "sc16")
    }

    #[test]
    fn test_device_call_records_outcome() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();

        let err = session
            .device_call(dev, |d| d.set_time_source("bogus", 0))
            .unwrap_err();
        assert_eq!(session.device_last_error(dev).unwrap(), err.to_string());

        let rate = session.device_call(dev, |d| d.get_master_clock_rate(0)).unwrap();
        assert!(rate > 0.0);
        assert_eq!(session.device_last_error(dev).unwrap(), "None");
    }

    #[test]
    fn test_panics_become_errors() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let result: Result<()> = session.device_call(dev, |_| panic!("driver exploded"));
        assert!(matches!(result, Err(RadioError::Panic(ref m)) if m == "driver exploded"));
        assert!(session.device_last_error(dev).unwrap().contains("driver exploded"));
        assert!(session.devices().contains(dev));
    }

    #[test]
    fn test_free_device_twice() {
        let session = Session::new();
        let dev = session.make_device("").unwrap();
        session.free_device(dev).unwrap();
        assert!(matches!(
            session.free_device(dev),
            Err(RadioError::InvalidDevice(_))
        ));
        assert!(session.device_call(dev, |d| d.get_num_mboards()).is_err());
    }

    #[test]
    fn test_attach_offsets_follow_attach_count() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let handles: Vec<_> = (0..3).map(|_| session.make_rx_streamer()).collect();
        for (expected, &h) in handles.iter().enumerate() {
            assert_eq!(session.attach_rx_stream(dev, h, &rx_args()).unwrap(), expected);
        }

        session.free_rx_streamer(handles[1]).unwrap();
        let reused = session.make_rx_streamer();
        assert_eq!(session.attach_rx_stream(dev, reused, &rx_args()).unwrap(), 1);
        assert_eq!(
            session.rx_binding(handles[2]).unwrap(),
            Some(StreamerBinding { device: dev, offset: 2 })
        );
    }

    #[test]
    fn test_binding_names_the_built_streamer() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let entry = session.devices().resolve(dev).unwrap();

        let mut built = Vec::new();
        let handles: Vec<_> = (0..2).map(|_| session.make_rx_streamer()).collect();
        for &h in &handles {
            let offset = session
                .rx
                .attach(&session.devices, dev, h, |d| {
                    let streamer = d.get_rx_stream(&rx_args())?;
                    built.push(streamer.clone());
                    Ok(streamer)
                })
                .unwrap();
            let slot = entry.rx_streamers().get(offset).unwrap();
            assert!(Arc::ptr_eq(&slot, built.last().unwrap()));
        }

        for (h, streamer) in handles.iter().zip(&built) {
            let same = session
                .rx_call(*h, |s| Ok(std::ptr::addr_eq(s, Arc::as_ptr(streamer))))
                .unwrap();
            assert!(same);
        }

        // A vacancy refilled by a new handle resolves to the new object.
        session.free_rx_streamer(handles[0]).unwrap();
        let reused = session.make_rx_streamer();
        let mut fresh = None;
        let offset = session
            .rx
            .attach(&session.devices, dev, reused, |d| {
                let streamer = d.get_rx_stream(&rx_args())?;
                fresh = Some(streamer.clone());
                Ok(streamer)
            })
            .unwrap();
        assert_eq!(offset, 0);
        let fresh = fresh.unwrap();
        assert!(!Arc::ptr_eq(&fresh, &built[0]));
        assert!(Arc::ptr_eq(&entry.rx_streamers().get(0).unwrap(), &fresh));
        assert!(Arc::ptr_eq(&entry.rx_streamers().get(1).unwrap(), &built[1]));
    }

    #[test]
    fn test_free_during_attach_leaves_no_slot() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let h = session.make_rx_streamer();

        let result = session.rx.attach(&session.devices, dev, h, |d| {
            session.free_rx_streamer(h).unwrap();
            d.get_rx_stream(&rx_args())
        });
        assert!(matches!(result, Err(RadioError::InvalidStreamer(_))));

        let entry = session.devices().resolve(dev).unwrap();
        assert_eq!(entry.rx_streamers().live(), 0);
        assert!(session.rx_binding(h).is_err());

        // The slot is still free for the next handle.
        let next = session.make_rx_streamer();
        assert_eq!(session.attach_rx_stream(dev, next, &rx_args()).unwrap(), 0);
    }

    #[test]
    fn test_reattach_detaches_previous() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let h = session.make_tx_streamer();
        assert_eq!(session.attach_tx_stream(dev, h, &rx_args()).unwrap(), 0);
        assert_eq!(session.attach_tx_stream(dev, h, &rx_args()).unwrap(), 0);
        let entry = session.devices().resolve(dev).unwrap();
        assert_eq!(entry.tx_streamers().live(), 1);
    }

    #[test]
    fn test_attach_to_missing_device_leaves_handle_unbound() {
        let session = Session::new();
        let h = session.make_rx_streamer();
        assert!(matches!(
            session.attach_rx_stream(42, h, &rx_args()),
            Err(RadioError::InvalidDevice(42))
        ));
        assert_eq!(session.rx_binding(h).unwrap(), None);
        let err = session.rx_call(h, |s| Ok(s.num_channels())).unwrap_err();
        assert_eq!(err.code(), crate::core::RadioErrorCode::InvalidDevice);
    }

    #[test]
    fn test_bad_stream_args_recorded_on_device() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let h = session.make_rx_streamer();
        let err = session
            .attach_rx_stream(dev, h, &StreamArgs::new("fc16", "sc16"))
            .unwrap_err();
        assert!(matches!(err, RadioError::Value(_)));
        assert!(session.device_last_error(dev).unwrap().contains("fc16"));
        assert_eq!(session.rx_binding(h).unwrap(), None);
    }

    #[test]
    fn test_streamer_outlives_nothing_after_device_free() {
        let session = Session::new();
        let dev = session.make_device("type=sim").unwrap();
        let h = session.make_rx_streamer();
        session.attach_rx_stream(dev, h, &rx_args()).unwrap();
        session
            .rx_call(h, |s| s.issue_stream_cmd(&StreamCmd::start_continuous()))
            .unwrap();
        session.free_device(dev).unwrap();

        let mut md = RxMetadata::default();
        let err = session
            .rx_call(h, |s| {
                let mut buf = vec![0u8; 8 * 16];
                let mut buffs = [buf.as_mut_slice()];
                s.recv(&mut buffs, 16, &mut md, 0.1, false)
            })
            .unwrap_err();
        assert!(matches!(err, RadioError::InvalidDevice(_)));
        assert!(session.rx_last_error(h).unwrap().contains("Invalid device"));
        session.free_rx_streamer(h).unwrap();
        assert!(session.rx_last_error(h).is_err());
    }
}
