//! Per-process baselines for delta-based rate calculation
//!
//! Each PID keeps exactly one prior sample. Rates are the difference
//! between the fresh counters and that sample, then the sample is replaced.

use std::collections::{HashMap, HashSet};

use crate::constants::{BYTES_PER_MB, MS_PER_SEC};
use crate::source::{RawProcessSample, SystemTimeSample};

/// Rates derived from two consecutive samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    pub cpu_percent: f64,
    pub read_mb_per_sec: f64,
    pub write_mb_per_sec: f64,
}

/// The most recent observation of one process
#[derive(Debug, Clone, Copy)]
pub(crate) struct HistoryEntry {
    sample: RawProcessSample,
    system: SystemTimeSample,
}

impl HistoryEntry {
    fn new(sample: RawProcessSample, system: SystemTimeSample) -> Self {
        Self { sample, system }
    }

    /// Computes rates from this baseline up to `sample` taken at `now`.
    ///
    /// Deltas saturate at zero, so a baseline that belongs to an older
    /// process instance yields 0 rather than wrapping.
    fn rates_to(&self, sample: &RawProcessSample, now: &SystemTimeSample) -> Rates {
        let proc_delta = sample.cpu_time().saturating_sub(self.sample.cpu_time());
        let sys_delta = now.kernel_user.saturating_sub(self.system.kernel_user);

        let cpu_percent = if sys_delta > 0 {
            (proc_delta as f64 / sys_delta as f64) * 100.0
        } else {
            0.0
        };

        let elapsed_sec = now.tick_ms.saturating_sub(self.system.tick_ms) as f64 / MS_PER_SEC;
        let per_sec = |now_bytes: u64, prev_bytes: u64| {
            if elapsed_sec > 0.0 {
                (now_bytes.saturating_sub(prev_bytes) as f64 / BYTES_PER_MB) / elapsed_sec
            } else {
                0.0
            }
        };

        Rates {
            cpu_percent,
            read_mb_per_sec: per_sec(sample.read_bytes, self.sample.read_bytes),
            write_mb_per_sec: per_sec(sample.write_bytes, self.sample.write_bytes),
        }
    }

    /// False when both samples carry start times and they differ.
    fn same_instance(&self, sample: &RawProcessSample) -> bool {
        match (self.sample.start_time, sample.start_time) {
            (Some(old), Some(new)) => old == new,
            _ => true,
        }
    }
}

/// History map keyed by PID
#[derive(Debug, Default)]
pub(crate) struct History {
    entries: HashMap<u32, HistoryEntry>,
}

impl History {
    /// Records `sample` for `pid` and returns rates against the previous one.
    ///
    /// First sightings (and, with `detect_reuse`, PIDs whose start time
    /// changed) return zero rates.
    pub fn observe(
        &mut self,
        pid: u32,
        sample: RawProcessSample,
        now: SystemTimeSample,
        detect_reuse: bool,
    ) -> Rates {
        let fresh = HistoryEntry::new(sample, now);

        match self.entries.get_mut(&pid) {
            Some(entry) if !detect_reuse || entry.same_instance(&sample) => {
                let rates = entry.rates_to(&sample, &now);
                *entry = fresh;
                rates
            }
            Some(entry) => {
                *entry = fresh;
                Rates::default()
            }
            None => {
                self.entries.insert(pid, fresh);
                Rates::default()
            }
        }
    }

    /// Drops every entry not in `live` once the map outgrows `live` by more
    /// than `slack`. Returns the number of entries removed.
    pub fn prune(&mut self, live: &HashSet<u32>, slack: usize) -> usize {
        if self.entries.len() <= live.len().saturating_add(slack) {
            return 0;
        }

        let before = self.entries.len();
        self.entries.retain(|pid, _| live.contains(pid));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
