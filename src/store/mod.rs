//! Configuration store for the sensor fleet
//!
//! Devices, their types, the parameters each type supports and the
//! per-device thresholds are created and edited out-of-band; the polling
//! core only reads them. This module provides that read interface:
//!
//! - `backend`: the `ConfigStore` trait every backend implements
//! - `schema`: the entity structs
//! - `error`: store error types
//! - `memory`: seedable in-memory backend (tests, dry runs)
//! - `sqlite`: SQLite backend via sqlx (feature `store-sqlite`)

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;

#[cfg(feature = "store-sqlite")]
pub mod sqlite;

pub use backend::ConfigStore;
pub use error::{StoreError, StoreResult};
pub use schema::{Device, DeviceType, Parameter, Threshold};
