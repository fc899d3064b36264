//! Process enumeration and counters for the sampler
//!
//! Enumeration uses CreateToolhelp32Snapshot and Process32First/Next.
//! Counters are read through one query handle per process per poll.

use std::mem;

use windows::Win32::System::Diagnostics::ToolHelp::{
    Process32FirstW, Process32NextW, PROCESSENTRY32W,
};

use tracing::trace;

use crate::error::{AccessResult, SamplerError, SamplerResult};
use crate::ffi::{ProcessHandle, SnapshotHandle};
use crate::source::{ProcessEntry, ProcessSource, RawProcessSample};

use super::{cpu, disk, memory};

/// Converts a null-terminated wide string (u16 slice) to a Rust String
fn wide_to_string(wide: &[u16]) -> String {
    // Find the null terminator
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn entry_from_raw(entry: &PROCESSENTRY32W) -> ProcessEntry {
    ProcessEntry {
        pid: entry.th32ProcessID,
        name: wide_to_string(&entry.szExeFile),
        thread_count: entry.cntThreads,
    }
}

/// Enumerates at most `capacity` running processes in snapshot order.
///
/// # Errors
/// `SamplerError::Enumeration` if the snapshot cannot be created.
pub fn enumerate_processes(capacity: usize) -> SamplerResult<Vec<ProcessEntry>> {
    let snapshot =
        SnapshotHandle::create_process_snapshot().map_err(|e| SamplerError::Enumeration {
            api: "CreateToolhelp32Snapshot",
            code: e.code().0,
        })?;
    let mut processes = Vec::with_capacity(capacity.min(1024));

    // Initialize the entry structure - CRITICAL: dwSize must be set!
    let mut entry = PROCESSENTRY32W {
        dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    // SAFETY: We have a valid snapshot handle and properly initialized entry.
    let mut success = unsafe { Process32FirstW(snapshot.as_raw(), &mut entry) };

    while success.is_ok() && processes.len() < capacity {
        processes.push(entry_from_raw(&entry));

        // SAFETY: Same as above - valid handles and initialized struct.
        success = unsafe { Process32NextW(snapshot.as_raw(), &mut entry) };
    }

    Ok(processes)
}

/// Reads a counter that does not feed a rate. A failure reports 0.
fn counter_or_zero<T: Default>(pid: u32, counter: &str, result: AccessResult<T>) -> T {
    result.unwrap_or_else(|e| {
        trace!(pid, "{} unavailable: {}", counter, e);
        T::default()
    })
}

/// `ProcessSource` backed by ToolHelp32 and per-process query handles
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32ProcessSource;

impl Win32ProcessSource {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSource for Win32ProcessSource {
    fn enumerate(&self, capacity: usize) -> SamplerResult<Vec<ProcessEntry>> {
        enumerate_processes(capacity)
    }

    fn raw_sample(&self, pid: u32) -> AccessResult<RawProcessSample> {
        let handle = ProcessHandle::open_for_query(pid)?;

        // Times and I/O drive the rates; memory and handles are best effort
        let times = cpu::process_times(&handle)?;
        let io = disk::process_io(&handle)?;
        let usage = counter_or_zero(pid, "memory counters", memory::process_memory(&handle));
        let handles = counter_or_zero(pid, "handle count", memory::handle_count(&handle));

        Ok(RawProcessSample {
            kernel_time: times.kernel_time,
            user_time: times.user_time,
            read_bytes: io.read_bytes,
            write_bytes: io.write_bytes,
            memory_bytes: usage.private_bytes,
            handle_count: handles,
            start_time: Some(times.creation_time),
        })
    }

    fn working_set(&self, pid: u32) -> AccessResult<u64> {
        let handle = ProcessHandle::open_for_query(pid)?;
        Ok(memory::process_memory(&handle)?.working_set)
    }

    fn system_times(&self) -> u64 {
        cpu::system_kernel_user()
    }
}
