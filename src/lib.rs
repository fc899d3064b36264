//! IronSight process and network telemetry sampler
//!
//! Turns cumulative per-process counters into CPU and disk rates, keeps a
//! bounded per-PID history across a churning process population, and
//! snapshots the machine's TCP/UDP connection tables.
//!
//! The core is platform independent and talks to the OS through the
//! `ProcessSource`, `TickClock` and `ConnectionTableSource` traits. The
//! Win32 implementations live in `system` and are built on Windows only.

pub mod config;
pub mod constants;
pub mod error;
pub mod monitor;
pub mod network;
pub mod sampler;
pub mod source;
pub mod system;

#[cfg(windows)]
mod ffi;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SamplerConfig;
pub use error::{AccessError, ConfigError, NetworkError, SamplerError};
pub use monitor::{PollingService, SampleEvent, Subscription};
pub use network::{ConnectionInfo, ConnectionMonitor, ConnectionState, Protocol};
pub use sampler::{DerivedMetric, MemoryConsumer, MetricAccess, RateSampler};
pub use source::{ProcessEntry, ProcessSource, RawProcessSample, SystemTimeSample, TickClock};
