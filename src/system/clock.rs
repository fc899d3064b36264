//! Monotonic millisecond tick source

use crate::source::TickClock;

/// Milliseconds since boot on Windows, since construction elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct SystemTickClock {
    #[cfg(not(windows))]
    origin: std::time::Instant,
}

impl SystemTickClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(windows))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for SystemTickClock {
    #[cfg(windows)]
    fn tick_ms(&self) -> u64 {
        // SAFETY: GetTickCount64 takes no arguments and cannot fail.
        unsafe { windows::Win32::System::SystemInformation::GetTickCount64() }
    }

    #[cfg(not(windows))]
    fn tick_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
