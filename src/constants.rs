//! Centralized constants for the sampler
//!
//! This module contains the magic numbers shared by the sampler core,
//! the connection table and the command-line front end.

// ============================================================================
// Application Info
// ============================================================================

/// Application name displayed in headers
pub const DISPLAY_NAME: &str = "IronSight Sampler";

/// Application version from Cargo.toml
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "ironsight.toml";

// ============================================================================
// Refresh Rate (milliseconds)
// ============================================================================

/// Default polling interval in milliseconds
pub const DEFAULT_REFRESH_MS: u64 = 2000;

/// Minimum allowed polling interval
pub const MIN_REFRESH_MS: u64 = 250;

/// Maximum allowed polling interval
pub const MAX_REFRESH_MS: u64 = 10000;

// ============================================================================
// Process History
// ============================================================================

/// Extra history entries tolerated over the live process count before pruning
pub const DEFAULT_HISTORY_SLACK: usize = 50;

/// Default upper bound on processes enumerated per poll
pub const DEFAULT_ENUMERATION_CAPACITY: usize = 2048;

/// Default number of rows returned by the top memory consumers query
pub const DEFAULT_TOP_CONSUMERS: usize = 10;

// ============================================================================
// Connection Tables
// ============================================================================

/// Initial size of each raw connection table buffer in bytes
pub const INITIAL_TABLE_BUFFER_BYTES: usize = 65536;

/// Initial capacity of the decoded connection list
pub const INITIAL_CONNECTION_CAPACITY: usize = 1024;

/// Padding added to the size reported by a "buffer too small" answer
pub const TABLE_BUFFER_GROWTH_BYTES: usize = 4096;

/// Attempts allowed for one table fetch before giving up
pub const MAX_TABLE_FETCH_ATTEMPTS: usize = 8;

// ============================================================================
// Unit Conversions
// ============================================================================

/// Bytes in a kilobyte
pub const BYTES_PER_KB: f64 = 1024.0;

/// Bytes in a megabyte
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Bytes in a gigabyte
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Milliseconds in a second
pub const MS_PER_SEC: f64 = 1000.0;

// ============================================================================
// CPU Usage Thresholds (for coloring)
// ============================================================================

/// CPU usage threshold for red color (critical)
pub const CPU_THRESHOLD_CRITICAL: f64 = 80.0;

/// CPU usage threshold for yellow color (warning)
pub const CPU_THRESHOLD_WARNING: f64 = 50.0;

/// CPU usage threshold for cyan color (moderate)
pub const CPU_THRESHOLD_MODERATE: f64 = 20.0;

/// Lines subtracted from terminal height to calculate visible rows
/// (accounts for header, column titles and footer)
pub const VISIBLE_ROWS_OVERHEAD: usize = 4;
