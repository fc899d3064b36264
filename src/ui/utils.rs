//! Utility functions for UI rendering

use crossterm::style::Color;

use ironsight_sampler::constants::{
    BYTES_PER_GB, BYTES_PER_KB, BYTES_PER_MB, CPU_THRESHOLD_CRITICAL, CPU_THRESHOLD_MODERATE,
    CPU_THRESHOLD_WARNING,
};

/// Truncates a string to fit within a given width.
///
/// If the string exceeds `max_len` characters, it is truncated and "..." is appended.
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Formats a rate given in MB/s with an appropriate unit (B/s, KB/s, MB/s, GB/s).
#[must_use]
pub fn format_rate(mb_per_sec: f64) -> String {
    let bytes_per_sec = mb_per_sec * BYTES_PER_MB;
    if bytes_per_sec < 1.0 {
        "0 B/s".to_string()
    } else if bytes_per_sec < BYTES_PER_KB {
        format!("{:.0} B/s", bytes_per_sec)
    } else if bytes_per_sec < BYTES_PER_MB {
        format!("{:.1} KB/s", bytes_per_sec / BYTES_PER_KB)
    } else if bytes_per_sec < BYTES_PER_GB {
        format!("{:.1} MB/s", bytes_per_sec / BYTES_PER_MB)
    } else {
        format!("{:.1} GB/s", bytes_per_sec / BYTES_PER_GB)
    }
}

/// Formats a size given in MB, switching to GB past 1024 MB.
#[must_use]
pub fn format_mb(mb: f64) -> String {
    let gb = mb * BYTES_PER_MB / BYTES_PER_GB;
    if gb >= 1.0 {
        format!("{:.1} GB", gb)
    } else {
        format!("{:.1} MB", mb)
    }
}

/// Returns a color based on CPU usage percentage for visual indication.
///
/// # Color Thresholds
/// * Red - Critical usage (≥80%)
/// * Yellow - Warning level (≥50%)
/// * Cyan - Moderate usage (≥20%)
/// * Green - Low usage (<20%)
#[must_use]
pub fn cpu_color(percent: f64) -> Color {
    if percent >= CPU_THRESHOLD_CRITICAL {
        Color::Red
    } else if percent >= CPU_THRESHOLD_WARNING {
        Color::Yellow
    } else if percent >= CPU_THRESHOLD_MODERATE {
        Color::Cyan
    } else {
        Color::Green
    }
}
