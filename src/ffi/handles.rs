//! Safe RAII wrappers for Windows HANDLEs
//!
//! These wrappers ensure that handles are properly closed when they
//! go out of scope, preventing resource leaks.

use windows::Win32::Foundation::{CloseHandle, E_ACCESSDENIED, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

use crate::error::{AccessError, AccessResult};

/// Maps a failed per-process call onto the two outcomes the sampler knows.
///
/// Anything other than access denied means the PID no longer names a
/// queryable process.
pub fn access_error(err: &windows::core::Error) -> AccessError {
    if err.code() == E_ACCESSDENIED {
        AccessError::AccessDenied
    } else {
        AccessError::NotFound
    }
}

/// A safe wrapper around a Windows process HANDLE.
/// Automatically closes the handle when dropped.
pub struct ProcessHandle(HANDLE);

impl ProcessHandle {
    /// Opens a process for counter queries (times, I/O, memory, handles).
    ///
    /// # Returns
    /// * `Ok(ProcessHandle)` - A wrapped handle to the process
    /// * `Err(AccessDenied)` - Insufficient privilege (e.g. protected system processes)
    /// * `Err(NotFound)` - The process has exited
    pub fn open_for_query(pid: u32) -> AccessResult<Self> {
        // SAFETY: OpenProcess is safe to call with valid parameters.
        // We handle the error case where the handle is invalid.
        let handle = unsafe {
            OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid)
        }
        .map_err(|e| access_error(&e))?;
        Ok(Self(handle))
    }

    /// Returns the raw HANDLE for use with Win32 APIs.
    pub fn as_raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: We own this handle and it's valid (we got it from OpenProcess).
        // CloseHandle is safe to call on a valid handle exactly once.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// A safe wrapper around a ToolHelp32 snapshot HANDLE.
/// Automatically closes the handle when dropped.
pub struct SnapshotHandle(HANDLE);

impl SnapshotHandle {
    /// Creates a snapshot of all processes in the system.
    pub fn create_process_snapshot() -> windows::core::Result<Self> {
        // SAFETY: CreateToolhelp32Snapshot is safe to call.
        // The second parameter (0) is ignored for process snapshots.
        let handle = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)? };
        Ok(Self(handle))
    }

    pub fn as_raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for SnapshotHandle {
    fn drop(&mut self) {
        // SAFETY: We own this handle and it's valid.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}
