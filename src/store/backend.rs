//! Configuration store trait definition
//!
//! The polling core reads its fleet configuration through this trait and
//! never writes. Implementations must be `Send + Sync`: the orchestrator
//! and every poller share one store behind an `Arc` and query it
//! concurrently, so lookups must not require external locking.

use async_trait::async_trait;

use super::error::StoreResult;
use super::schema::{Device, Parameter, Threshold};

/// Read-only access to device/parameter/threshold configuration.
///
/// ## Error Handling
///
/// Every method returns `StoreResult<T>`. Callers treat failures as
/// transient (the orchestrator keeps its previous device set, a poller
/// retries its session snapshot), so implementations should surface
/// errors rather than retry internally.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All devices with the enabled flag set, in id order.
    ///
    /// The orchestrator calls this once per refresh interval; the result
    /// drives which supervisors exist.
    async fn list_enabled_devices(&self) -> StoreResult<Vec<Device>>;

    /// All parameters registered for a device type, in id order.
    ///
    /// Iteration order here is the order parameters are polled within a
    /// cycle and the order readings are emitted.
    async fn list_parameters_by_device_type(&self, device_type_id: i64)
    -> StoreResult<Vec<Parameter>>;

    /// Enabled thresholds scoped to one device.
    ///
    /// Thresholds referencing parameters that do not belong to the
    /// device's type may be returned; the evaluator treats them as "no
    /// threshold configured" for whatever it cannot match.
    async fn list_active_thresholds_by_device(&self, device_id: i64)
    -> StoreResult<Vec<Threshold>>;
}
