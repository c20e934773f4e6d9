// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::config::config_status;
use super::device::RadioDevice;
use super::{DeviceAddr, RadioError, Result};

/// Device discovery and construction for one family of radios.
///
/// Built-in drivers register at compile time via `inventory::submit!`;
/// embedders and tests can add more at runtime with [`register_driver`].
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// pub struct LoopbackDriver;
///
/// impl Driver for LoopbackDriver {
///     fn name(&self) -> &'static str { "loopback" }
///     fn find(&self, hint: &DeviceAddr) -> Result<Vec<DeviceAddr>> { ... }
///     fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn RadioDevice>> { ... }
/// }
///
/// inventory::submit! {
///     DriverRegistration::new::<LoopbackDriver>()
/// }
/// ```
pub trait Driver: Send + Sync + 'static {
    /// Value of the `type` key this driver answers to.
    fn name(&self) -> &'static str;

    /// Addresses of reachable devices matching `hint`. Each returned
    /// address carries `type=<name>`.
    fn find(&self, hint: &DeviceAddr) -> Result<Vec<DeviceAddr>>;

    /// Open the device at `addr` (an address returned by [`Driver::find`],
    /// merged with the caller's arguments).
    fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn RadioDevice>>;
}

/// Compile-time registration record.
/// Uses function pointers to avoid non-const Box::new in statics.
pub struct DriverRegistration {
    pub name_fn: fn() -> &'static str,
    pub find_fn: fn(&DeviceAddr) -> Result<Vec<DeviceAddr>>,
    pub make_fn: fn(&DeviceAddr) -> Result<Arc<dyn RadioDevice>>,
}

impl DriverRegistration {
    pub const fn new<T: Driver + Default>() -> Self {
        Self {
            name_fn: || T::default().name(),
            find_fn: |hint| T::default().find(hint),
            make_fn: |addr| T::default().make(addr),
        }
    }
}

inventory::collect!(DriverRegistration);

/// Uniform view over compile-time and runtime drivers.
#[derive(Clone)]
enum DriverRef {
    Static(&'static DriverRegistration),
    Dynamic(Arc<dyn Driver>),
}

impl DriverRef {
    fn name(&self) -> &'static str {
        match self {
            Self::Static(reg) => (reg.name_fn)(),
            Self::Dynamic(driver) => driver.name(),
        }
    }

    fn find(&self, hint: &DeviceAddr) -> Result<Vec<DeviceAddr>> {
        match self {
            Self::Static(reg) => (reg.find_fn)(hint),
            Self::Dynamic(driver) => driver.find(hint),
        }
    }

    fn make(&self, addr: &DeviceAddr) -> Result<Arc<dyn RadioDevice>> {
        match self {
            Self::Static(reg) => (reg.make_fn)(addr),
            Self::Dynamic(driver) => driver.make(addr),
        }
    }
}

fn runtime_drivers() -> &'static RwLock<Vec<Arc<dyn Driver>>> {
    static DRIVERS: OnceLock<RwLock<Vec<Arc<dyn Driver>>>> = OnceLock::new();
    DRIVERS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Add a driver at runtime. A driver whose name is already registered
/// replaces the earlier runtime registration.
pub fn register_driver(driver: Arc<dyn Driver>) {
    let mut drivers = runtime_drivers().write();
    drivers.retain(|d| d.name() != driver.name());
    tracing::debug!("Registered runtime driver '{}'", driver.name());
    drivers.push(driver);
}

fn all_drivers() -> Vec<DriverRef> {
    let mut drivers: Vec<DriverRef> = inventory::iter::<DriverRegistration>()
        .map(DriverRef::Static)
        .collect();
    drivers.extend(runtime_drivers().read().iter().cloned().map(DriverRef::Dynamic));
    drivers
}

/// Names of every known driver.
pub fn driver_names() -> Vec<&'static str> {
    all_drivers().iter().map(DriverRef::name).collect()
}

/// Query every driver whose name matches the hint's `type` (all drivers
/// when the hint has none).
pub fn find(hint: &DeviceAddr) -> Result<Vec<DeviceAddr>> {
    config_status()?;
    let mut found = Vec::new();
    for driver in all_drivers() {
        if hint.get("type").is_some_and(|t| t != driver.name()) {
            continue;
        }
        match driver.find(hint) {
            Ok(addrs) => found.extend(addrs),
            Err(e) => tracing::debug!("Driver '{}' discovery failed: {}", driver.name(), e),
        }
    }
    Ok(found)
}

/// Discover and open the first device matching `args`.
pub fn make(args: &DeviceAddr) -> Result<Arc<dyn RadioDevice>> {
    let found = find(args)?;
    let Some(first) = found.first() else {
        return Err(RadioError::Key(format!(
            "No devices found for ----->\n{}",
            args.to_pp_string()
        )));
    };
    let addr = first.merged(args);
    let type_name = addr.get("type").unwrap_or_default().to_string();
    let driver = all_drivers()
        .into_iter()
        .find(|d| d.name() == type_name)
        .ok_or_else(|| RadioError::Key(format!("No driver registered for type '{}'", type_name)))?;

    tracing::debug!("Making device with {}", addr);
    driver.make(&addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_finds_nothing() {
        let hint = DeviceAddr::parse("type=does-not-exist");
        assert!(find(&hint).unwrap().is_empty());
        let err = match make(&hint) {
            Err(e) => e,
            Ok(_) => panic!("expected no device"),
        };
        assert!(matches!(err, RadioError::Key(_)));
        assert!(err.to_string().contains("No devices found for ----->\n"));
        assert!(err.to_string().contains("type: does-not-exist"));
    }

    #[test]
    fn test_builtin_sim_driver_registered() {
        assert!(driver_names().contains(&"sim"));
    }
}
