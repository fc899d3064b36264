//! User interface rendering
//!
//! - `table` - Plain-text tables for the one-shot commands
//! - `live` - Live process table for `watch`
//! - `utils` - Shared formatting helpers

mod live;
mod table;
mod utils;

pub use live::{render, LiveView};
pub use table::{write_connections, write_consumers, write_metrics};
