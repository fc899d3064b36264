//! CPU time counters using Win32 APIs
//!
//! GetSystemTimes provides the system-wide denominator and GetProcessTimes
//! the per-process numerator. Rates are derived by the sampler from two
//! of these readings; nothing here keeps state.

use windows::Win32::Foundation::FILETIME;
use windows::Win32::System::Threading::{GetProcessTimes, GetSystemTimes};

use crate::ffi::{access_error, ProcessHandle};
use crate::error::AccessResult;

/// Cumulative times of one process, in 100-nanosecond units
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTimes {
    /// Creation time (FILETIME epoch). Distinguishes instances that share a PID.
    pub creation_time: u64,
    /// Time spent in kernel mode
    pub kernel_time: u64,
    /// Time spent in user mode
    pub user_time: u64,
}

/// Converts a FILETIME to a u64 (100-nanosecond intervals since 1601)
pub fn filetime_to_u64(ft: &FILETIME) -> u64 {
    ((ft.dwHighDateTime as u64) << 32) | (ft.dwLowDateTime as u64)
}

/// Gets system-wide kernel + user time across all processors.
///
/// Kernel time includes idle time. Returns 0 if the call fails, which the
/// sampler treats as "no elapsed system time".
pub fn system_kernel_user() -> u64 {
    let mut idle_time = FILETIME::default();
    let mut kernel_time = FILETIME::default();
    let mut user_time = FILETIME::default();

    // SAFETY: GetSystemTimes is safe to call with valid pointers.
    let result = unsafe {
        GetSystemTimes(
            Some(&mut idle_time),
            Some(&mut kernel_time),
            Some(&mut user_time),
        )
    };

    if result.is_ok() {
        filetime_to_u64(&kernel_time).saturating_add(filetime_to_u64(&user_time))
    } else {
        0
    }
}

/// Gets creation, kernel and user times for an open process.
pub fn process_times(handle: &ProcessHandle) -> AccessResult<ProcessTimes> {
    let mut creation_time = FILETIME::default();
    let mut exit_time = FILETIME::default();
    let mut kernel_time = FILETIME::default();
    let mut user_time = FILETIME::default();

    // SAFETY: GetProcessTimes is safe with a valid handle and pointers.
    unsafe {
        GetProcessTimes(
            handle.as_raw(),
            &mut creation_time,
            &mut exit_time,
            &mut kernel_time,
            &mut user_time,
        )
    }
    .map_err(|e| access_error(&e))?;

    Ok(ProcessTimes {
        creation_time: filetime_to_u64(&creation_time),
        kernel_time: filetime_to_u64(&kernel_time),
        user_time: filetime_to_u64(&user_time),
    })
}
