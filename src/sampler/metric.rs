//! Output records handed to sampler callers

use serde::Serialize;

use crate::constants::BYTES_PER_MB;
use crate::source::{ProcessEntry, RawProcessSample};

use super::history::Rates;

/// How the counters behind a metric were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricAccess {
    /// Counters were read; rates are valid (zero on cold start)
    Sampled,
    /// The process could not be opened for query
    Denied,
    /// The process exited before its counters were read
    Gone,
}

/// Per-process metrics produced by one poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetric {
    /// Process ID
    pub pid: u32,
    /// Executable name
    pub name: String,
    /// Private memory in megabytes
    pub memory_mb: f64,
    /// Open handle count
    pub handle_count: u32,
    /// Thread count
    pub thread_count: u32,
    /// Share of total machine CPU time since the previous poll (0-100)
    pub cpu_percent: f64,
    /// Disk read rate in MB/s
    pub read_mb_per_sec: f64,
    /// Disk write rate in MB/s
    pub write_mb_per_sec: f64,
    /// Whether the counters could be read
    pub access: MetricAccess,
}

impl DerivedMetric {
    pub(crate) fn sampled(entry: ProcessEntry, sample: &RawProcessSample, rates: Rates) -> Self {
        Self {
            pid: entry.pid,
            name: entry.name,
            memory_mb: sample.memory_bytes as f64 / BYTES_PER_MB,
            handle_count: sample.handle_count,
            thread_count: entry.thread_count,
            cpu_percent: rates.cpu_percent,
            read_mb_per_sec: rates.read_mb_per_sec,
            write_mb_per_sec: rates.write_mb_per_sec,
            access: MetricAccess::Sampled,
        }
    }

    /// A placeholder for a process whose counters were unavailable.
    pub(crate) fn zeroed(entry: ProcessEntry, access: MetricAccess) -> Self {
        Self {
            pid: entry.pid,
            name: entry.name,
            memory_mb: 0.0,
            handle_count: 0,
            thread_count: entry.thread_count,
            cpu_percent: 0.0,
            read_mb_per_sec: 0.0,
            write_mb_per_sec: 0.0,
            access,
        }
    }
}

/// A row of the top memory consumers query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryConsumer {
    pub pid: u32,
    pub name: String,
    /// Working set in megabytes
    pub memory_mb: f64,
}
