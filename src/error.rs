//! Custom error types for type-safe error handling
//!
//! Only whole-call failures surface as errors to callers. Per-process
//! access failures are expected and are recovered inside the sampler.

use std::fmt;

// ============================================================================
// Sampler Error
// ============================================================================

/// Errors that abort an entire sampler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    /// The OS refused to list processes at all
    Enumeration {
        /// Name of the failing API function
        api: &'static str,
        /// Platform error code (HRESULT on Windows)
        code: i32,
    },
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::Enumeration { api, code } => {
                write!(f, "process enumeration failed: {} (error code: 0x{:08X})", api, code)
            }
        }
    }
}

impl std::error::Error for SamplerError {}

// ============================================================================
// Access Error
// ============================================================================

/// Why the counters of a single process could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Insufficient privilege to open the process
    AccessDenied,

    /// Process exited between enumeration and the counter query
    NotFound,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::AccessDenied => write!(f, "Access denied - try running as Administrator"),
            AccessError::NotFound => write!(f, "Process not found or has terminated"),
        }
    }
}

impl std::error::Error for AccessError {}

// ============================================================================
// Network Error
// ============================================================================

/// Errors raised while rebuilding a connection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The table query failed for a reason other than buffer size
    TableQuery {
        /// Name of the failing API function
        api: &'static str,
        /// Win32 error code
        code: u32,
    },

    /// The table kept outgrowing the buffer
    BufferRetriesExhausted {
        /// Attempts made before giving up
        attempts: usize,
        /// Size the last attempt asked for
        required: usize,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::TableQuery { api, code } => {
                write!(f, "{} failed (error code: {})", api, code)
            }
            NetworkError::BufferRetriesExhausted { attempts, required } => {
                write!(
                    f,
                    "connection table still too small after {} attempts ({} bytes required)",
                    attempts, required
                )
            }
        }
    }
}

impl std::error::Error for NetworkError {}

// ============================================================================
// Config Error
// ============================================================================

/// Errors produced while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read
    Read {
        path: String,
        message: String,
    },

    /// Config file is not valid TOML for `SamplerConfig`
    Parse {
        path: String,
        message: String,
    },

    /// A field holds a value outside its allowed range
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "cannot read config {}: {}", path, message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config {}: {}", path, message)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid value for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Result type aliases
// ============================================================================

/// Result type for sampler operations
pub type SamplerResult<T> = Result<T, SamplerError>;

/// Result type for per-process counter queries
pub type AccessResult<T> = Result<T, AccessError>;

/// Result type for connection table operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
