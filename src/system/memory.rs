//! Memory and handle counters using Win32 APIs
//!
//! GetProcessMemoryInfo with the extended counters gives both the working
//! set (resident) and private usage (committed) of a process.

use std::mem;

use windows::Win32::System::ProcessStatus::{
    GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS, PROCESS_MEMORY_COUNTERS_EX,
};
use windows::Win32::System::Threading::GetProcessHandleCount;

use crate::error::AccessResult;
use crate::ffi::{access_error, ProcessHandle};

/// Per-process memory statistics in bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory {
    /// Working set size (physical memory in use)
    pub working_set: u64,
    /// Private bytes (committed memory)
    pub private_bytes: u64,
}

/// Gets working set and private usage for an open process.
pub fn process_memory(handle: &ProcessHandle) -> AccessResult<ProcessMemory> {
    // Initialize the counters struct - cb must be set!
    let mut counters = PROCESS_MEMORY_COUNTERS_EX {
        cb: mem::size_of::<PROCESS_MEMORY_COUNTERS_EX>() as u32,
        ..Default::default()
    };

    // SAFETY: the EX struct starts with PROCESS_MEMORY_COUNTERS and cb
    // tells the API how much of it to fill.
    unsafe {
        GetProcessMemoryInfo(
            handle.as_raw(),
            &mut counters as *mut PROCESS_MEMORY_COUNTERS_EX as *mut PROCESS_MEMORY_COUNTERS,
            mem::size_of::<PROCESS_MEMORY_COUNTERS_EX>() as u32,
        )
    }
    .map_err(|e| access_error(&e))?;

    Ok(ProcessMemory {
        working_set: counters.WorkingSetSize as u64,
        private_bytes: counters.PrivateUsage as u64,
    })
}

/// Gets the number of open handles of an open process.
pub fn handle_count(handle: &ProcessHandle) -> AccessResult<u32> {
    let mut count: u32 = 0;

    // SAFETY: GetProcessHandleCount is safe with valid handle and pointer
    unsafe { GetProcessHandleCount(handle.as_raw(), &mut count) }
        .map_err(|e| access_error(&e))?;

    Ok(count)
}
