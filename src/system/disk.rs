//! Disk I/O counters using GetProcessIoCounters

use windows::Win32::System::Threading::{GetProcessIoCounters, IO_COUNTERS};

use crate::error::AccessResult;
use crate::ffi::{access_error, ProcessHandle};

/// Cumulative transfer counters of one process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIo {
    /// Total bytes read
    pub read_bytes: u64,
    /// Total bytes written
    pub write_bytes: u64,
}

/// Gets the read/write transfer byte counts for an open process.
pub fn process_io(handle: &ProcessHandle) -> AccessResult<ProcessIo> {
    let mut io_counters = IO_COUNTERS::default();

    // SAFETY: GetProcessIoCounters is safe with a valid handle and initialized struct.
    unsafe { GetProcessIoCounters(handle.as_raw(), &mut io_counters) }
        .map_err(|e| access_error(&e))?;

    Ok(ProcessIo {
        read_bytes: io_counters.ReadTransferCount,
        write_bytes: io_counters.WriteTransferCount,
    })
}
