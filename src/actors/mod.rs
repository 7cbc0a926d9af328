//! Actor-based polling engine
//!
//! Each level of the device lifecycle runs as an independent async task
//! communicating via Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────┐
//!                  │  FleetOrchestrator   │  refreshes enabled devices
//!                  └──────────┬───────────┘
//!                             │ owns (one per device)
//!              ┌──────────────┼──────────────┐
//!              │                             │
//!   ┌──────────▼───────────┐     ┌──────────▼───────────┐
//!   │ ConnectivitySupervisor│ ... │ ConnectivitySupervisor│  TCP probes
//!   └──────────┬───────────┘     └──────────┬───────────┘
//!              │ starts/stops               │
//!   ┌──────────▼───────────┐     ┌──────────▼───────────┐
//!   │    DevicePoller      │ ... │    DevicePoller      │  data session
//!   └──────────┬───────────┘     └──────────┬───────────┘
//!              │ emits                      │
//!              └──────────────┬─────────────┘
//!                  ┌──────────▼───────────┐
//!                  │  Broadcast Channel   │  (readings)
//!                  └──────────────────────┘
//! ```
//!
//! ## Actor Types
//!
//! - **FleetOrchestrator**: re-fetches the enabled-device list and keeps
//!   one supervisor per device
//! - **ConnectivitySupervisor**: probes reachability, independent of the
//!   data connection, and owns the device's poller handle
//! - **DevicePoller**: connection lifecycle + poll cycles for one device
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: orchestrator and supervisors take mpsc commands for
//!    control messages; pollers are cancelled via a CancellationToken so
//!    blocked I/O aborts promptly
//! 2. **Events**: readings are published to a broadcast channel for
//!    fan-out to whatever sink is attached
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod messages;
pub mod orchestrator;
pub mod poller;
pub mod scheduler;
pub mod supervisor;
