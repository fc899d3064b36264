//! Capability interfaces consumed by the sampler
//!
//! The sampler never talks to the OS directly. It sees a process source
//! (enumeration plus raw cumulative counters) and a monotonic tick clock,
//! so the rate math can be driven by synthetic sources in tests.

use std::sync::Arc;

use crate::error::{AccessResult, SamplerResult};

/// A live process as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    /// Process ID
    pub pid: u32,
    /// Executable name (e.g., "notepad.exe")
    pub name: String,
    /// Number of threads
    pub thread_count: u32,
}

/// Raw cumulative counters for one process at one polling instant.
///
/// Times are in 100-nanosecond units. Every counter is non-decreasing for
/// the lifetime of a single process instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawProcessSample {
    /// Time spent in kernel mode
    pub kernel_time: u64,
    /// Time spent in user mode
    pub user_time: u64,
    /// Total bytes read
    pub read_bytes: u64,
    /// Total bytes written
    pub write_bytes: u64,
    /// Private (committed) memory in bytes
    pub memory_bytes: u64,
    /// Open handle count
    pub handle_count: u32,
    /// Creation time, when the source can report it
    pub start_time: Option<u64>,
}

impl RawProcessSample {
    /// Kernel plus user time
    pub fn cpu_time(&self) -> u64 {
        self.kernel_time.saturating_add(self.user_time)
    }
}

/// System-wide CPU time paired with the tick it was taken at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemTimeSample {
    /// Cumulative kernel + user time across all processors (100 ns units)
    pub kernel_user: u64,
    /// Monotonic tick in milliseconds
    pub tick_ms: u64,
}

/// Process enumeration and raw-metrics capability.
pub trait ProcessSource {
    /// Lists at most `capacity` live processes in OS order.
    fn enumerate(&self, capacity: usize) -> SamplerResult<Vec<ProcessEntry>>;

    /// Reads the cumulative counters of one process.
    fn raw_sample(&self, pid: u32) -> AccessResult<RawProcessSample>;

    /// Reads the working set (resident memory) of one process in bytes.
    fn working_set(&self, pid: u32) -> AccessResult<u64>;

    /// Reads system-wide kernel + user time. Returns 0 when unavailable.
    fn system_times(&self) -> u64;
}

/// Monotonic millisecond clock.
pub trait TickClock {
    fn tick_ms(&self) -> u64;
}

impl<T: ProcessSource + ?Sized> ProcessSource for Arc<T> {
    fn enumerate(&self, capacity: usize) -> SamplerResult<Vec<ProcessEntry>> {
        (**self).enumerate(capacity)
    }

    fn raw_sample(&self, pid: u32) -> AccessResult<RawProcessSample> {
        (**self).raw_sample(pid)
    }

    fn working_set(&self, pid: u32) -> AccessResult<u64> {
        (**self).working_set(pid)
    }

    fn system_times(&self) -> u64 {
        (**self).system_times()
    }
}

impl<T: TickClock + ?Sized> TickClock for Arc<T> {
    fn tick_ms(&self) -> u64 {
        (**self).tick_ms()
    }
}
