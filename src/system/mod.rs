//! System information module - Process counters, CPU times and sockets
//!
//! This module provides safe abstractions over Win32 system APIs
//! behind the crate's capability traits. Only the tick clock is
//! available on other platforms.

pub mod clock;

#[cfg(windows)]
pub mod cpu;
#[cfg(windows)]
pub mod disk;
#[cfg(windows)]
pub mod memory;
#[cfg(windows)]
pub mod network;
#[cfg(windows)]
pub mod processes;

pub use clock::SystemTickClock;

#[cfg(windows)]
pub use network::Win32ConnectionTable;
#[cfg(windows)]
pub use processes::Win32ProcessSource;
