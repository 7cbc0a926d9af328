//! In-memory configuration store
//!
//! A seedable snapshot of the fleet configuration, useful for tests and
//! dry runs without a database. Unlike the real store it can be mutated
//! at runtime (e.g. toggling a device's enabled flag) to exercise the
//! orchestrator's refresh behavior.

use std::sync::RwLock;

use async_trait::async_trait;

use super::backend::ConfigStore;
use super::error::StoreResult;
use super::schema::{Device, DeviceType, Parameter, Threshold};

#[derive(Debug, Default)]
struct Fleet {
    device_types: Vec<DeviceType>,
    devices: Vec<Device>,
    parameters: Vec<Parameter>,
    thresholds: Vec<Threshold>,
}

/// In-memory `ConfigStore` backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fleet: RwLock<Fleet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_device_type(&self, device_type: DeviceType) {
        self.fleet.write().unwrap().device_types.push(device_type);
    }

    pub fn insert_device(&self, device: Device) {
        self.fleet.write().unwrap().devices.push(device);
    }

    pub fn insert_parameter(&self, parameter: Parameter) {
        self.fleet.write().unwrap().parameters.push(parameter);
    }

    pub fn insert_threshold(&self, threshold: Threshold) {
        self.fleet.write().unwrap().thresholds.push(threshold);
    }

    /// Flip a device's enabled flag; the orchestrator picks the change
    /// up on its next refresh.
    pub fn set_device_enabled(&self, device_id: i64, enabled: bool) {
        let mut fleet = self.fleet.write().unwrap();
        if let Some(device) = fleet.devices.iter_mut().find(|d| d.id == device_id) {
            device.enabled = enabled;
        }
    }

    /// Remove a device entirely, as if deleted out-of-band.
    pub fn remove_device(&self, device_id: i64) {
        self.fleet.write().unwrap().devices.retain(|d| d.id != device_id);
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn list_enabled_devices(&self) -> StoreResult<Vec<Device>> {
        let fleet = self.fleet.read().unwrap();
        let mut devices: Vec<Device> = fleet.devices.iter().filter(|d| d.enabled).cloned().collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices)
    }

    async fn list_parameters_by_device_type(
        &self,
        device_type_id: i64,
    ) -> StoreResult<Vec<Parameter>> {
        let fleet = self.fleet.read().unwrap();
        let mut parameters: Vec<Parameter> = fleet
            .parameters
            .iter()
            .filter(|p| p.device_type_id == device_type_id)
            .cloned()
            .collect();
        parameters.sort_by_key(|p| p.id);
        Ok(parameters)
    }

    async fn list_active_thresholds_by_device(&self, device_id: i64) -> StoreResult<Vec<Threshold>> {
        let fleet = self.fleet.read().unwrap();
        let mut thresholds: Vec<Threshold> = fleet
            .thresholds
            .iter()
            .filter(|t| t.device_id == device_id && t.enabled)
            .cloned()
            .collect();
        thresholds.sort_by_key(|t| t.id);
        Ok(thresholds)
    }
}
