//! Rate-derived process sampler
//!
//! `RateSampler` turns two temporally separated snapshots of cumulative
//! per-process counters into CPU and disk rates. It owns a per-PID history
//! that is pruned in batches as the process population churns.
//!
//! Every public call takes the history lock for its whole duration, so
//! concurrent callers are serialized rather than interleaved.

mod history;
mod metric;

pub use history::Rates;
pub use metric::{DerivedMetric, MemoryConsumer, MetricAccess};

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use crate::config::SamplerConfig;
use crate::constants::BYTES_PER_MB;
use crate::error::{AccessError, SamplerResult};
use crate::source::{ProcessSource, SystemTimeSample, TickClock};

use history::History;

/// Samples per-process rates against a process source and a tick clock
pub struct RateSampler<S, C> {
    source: S,
    clock: C,
    config: SamplerConfig,
    history: Mutex<History>,
}

impl<S: ProcessSource, C: TickClock> RateSampler<S, C> {
    /// Creates a sampler with an empty history.
    pub fn new(source: S, clock: C, config: SamplerConfig) -> Self {
        Self {
            source,
            clock,
            config,
            history: Mutex::new(History::default()),
        }
    }

    /// Polls up to `max_entries` live processes.
    ///
    /// Metrics come back in enumeration order. Processes seen for the first
    /// time report zero rates. A process whose counters cannot be read
    /// yields a zeroed entry in place instead of failing the call.
    ///
    /// # Errors
    /// Returns `SamplerError::Enumeration` only when the process list
    /// itself cannot be obtained.
    pub fn sample(&self, max_entries: usize) -> SamplerResult<Vec<DerivedMetric>> {
        if max_entries == 0 {
            return Ok(Vec::new());
        }

        let mut history = self.lock_history();

        // One system/tick pair for the whole poll keeps every process on the
        // same denominator.
        let now = SystemTimeSample {
            kernel_user: self.source.system_times(),
            tick_ms: self.clock.tick_ms(),
        };

        let mut entries = self.source.enumerate(max_entries).map_err(|e| {
            warn!("Failed to enumerate processes: {}", e);
            e
        })?;
        entries.truncate(max_entries);

        let mut live = HashSet::with_capacity(entries.len());
        let mut metrics = Vec::with_capacity(entries.len());

        for entry in entries {
            live.insert(entry.pid);

            let metric = match self.source.raw_sample(entry.pid) {
                Ok(sample) => {
                    let rates = history.observe(
                        entry.pid,
                        sample,
                        now,
                        self.config.detect_identity_reuse,
                    );
                    DerivedMetric::sampled(entry, &sample, rates)
                }
                Err(err) => {
                    trace!(pid = entry.pid, "counters unavailable: {}", err);
                    let access = match err {
                        AccessError::AccessDenied => MetricAccess::Denied,
                        AccessError::NotFound => MetricAccess::Gone,
                    };
                    DerivedMetric::zeroed(entry, access)
                }
            };
            metrics.push(metric);
        }

        let before = history.len();
        let removed = history.prune(&live, self.config.history_slack);
        if removed > 0 {
            debug!(
                before,
                after = history.len(),
                live = live.len(),
                "pruned stale process history"
            );
        }

        Ok(metrics)
    }

    /// Lists the `n` processes with the largest working set, largest first.
    ///
    /// Uses no history. Ties keep enumeration order and processes that
    /// cannot be queried are left out.
    pub fn top_consumers(&self, n: usize) -> SamplerResult<Vec<MemoryConsumer>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.lock_history();

        let entries = self
            .source
            .enumerate(self.config.enumeration_capacity)
            .map_err(|e| {
                warn!("Failed to enumerate processes: {}", e);
                e
            })?;

        let mut consumers: Vec<(u64, MemoryConsumer)> = entries
            .into_iter()
            .filter_map(|entry| {
                let bytes = self.source.working_set(entry.pid).ok()?;
                Some((
                    bytes,
                    MemoryConsumer {
                        pid: entry.pid,
                        name: entry.name,
                        memory_mb: bytes as f64 / BYTES_PER_MB,
                    },
                ))
            })
            .collect();

        // sort_by is stable, so equal sizes stay in enumeration order
        consumers.sort_by(|a, b| b.0.cmp(&a.0));
        consumers.truncate(n);

        Ok(consumers.into_iter().map(|(_, c)| c).collect())
    }

    /// Number of PIDs currently holding a baseline
    pub fn history_len(&self) -> usize {
        self.lock_history().len()
    }

    /// Forgets every baseline. The next poll is a cold start.
    pub fn clear(&self) {
        self.lock_history().clear();
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn lock_history(&self) -> MutexGuard<'_, History> {
        // History is consistent between statements, so a panic elsewhere
        // cannot leave it half-updated.
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamplerError;
    use crate::source::RawProcessSample;
    use crate::testing::{ManualClock, ScriptedSource};
    use std::sync::Arc;
    use std::thread;

    const MB: u64 = 1_048_576;

    fn sampler(
        source: &Arc<ScriptedSource>,
        clock: &Arc<ManualClock>,
        config: SamplerConfig,
    ) -> RateSampler<Arc<ScriptedSource>, Arc<ManualClock>> {
        RateSampler::new(Arc::clone(source), Arc::clone(clock), config)
    }

    #[test]
    fn test_cold_start_reports_zero_rates() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(1000));
        source.add_process(1, "busy.exe", 4);
        source.set_sample(
            1,
            RawProcessSample {
                kernel_time: 50_000,
                user_time: 70_000,
                read_bytes: 900 * MB,
                write_bytes: 300 * MB,
                memory_bytes: 64 * MB,
                handle_count: 12,
                start_time: None,
            },
        );
        source.set_system_times(1_000_000);

        let metrics = sampler(&source, &clock, SamplerConfig::default())
            .sample(16)
            .unwrap();

        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.cpu_percent, 0.0);
        assert_eq!(m.read_mb_per_sec, 0.0);
        assert_eq!(m.write_mb_per_sec, 0.0);
        assert_eq!(m.memory_mb, 64.0);
        assert_eq!(m.handle_count, 12);
        assert_eq!(m.thread_count, 4);
        assert_eq!(m.access, MetricAccess::Sampled);
    }

    #[test]
    fn test_rate_correctness_over_two_polls() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(5_000));
        let sampler = sampler(&source, &clock, SamplerConfig::default());

        source.add_process(42, "worker.exe", 1);
        source.set_sample(
            42,
            RawProcessSample {
                kernel_time: 1_000,
                user_time: 2_000,
                read_bytes: 10 * MB,
                write_bytes: 0,
                ..Default::default()
            },
        );
        source.set_system_times(40_000);
        sampler.sample(16).unwrap();

        source.set_sample(
            42,
            RawProcessSample {
                kernel_time: 1_100,
                user_time: 2_050,
                read_bytes: 12 * MB,
                write_bytes: 3 * MB,
                ..Default::default()
            },
        );
        source.set_system_times(40_300);
        clock.advance(1000);

        let metrics = sampler.sample(16).unwrap();
        assert_eq!(metrics[0].cpu_percent, 50.0);
        assert_eq!(metrics[0].read_mb_per_sec, 2.0);
        assert_eq!(metrics[0].write_mb_per_sec, 3.0);
    }

    #[test]
    fn test_zero_deltas_never_divide() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let sampler = sampler(&source, &clock, SamplerConfig::default());

        source.add_process(1, "idle.exe", 1);
        source.set_sample(1, RawProcessSample::default());
        source.set_system_times(500);
        sampler.sample(4).unwrap();

        // Same system time and same tick: both denominators are zero
        source.set_sample(
            1,
            RawProcessSample {
                kernel_time: 10,
                read_bytes: MB,
                ..Default::default()
            },
        );
        let metrics = sampler.sample(4).unwrap();

        let m = &metrics[0];
        assert_eq!(m.cpu_percent, 0.0);
        assert_eq!(m.read_mb_per_sec, 0.0);
        assert!(m.cpu_percent.is_finite() && m.read_mb_per_sec.is_finite());
    }

    #[test]
    fn test_history_bounded_after_churn() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let slack = 3;
        let sampler = sampler(
            &source,
            &clock,
            SamplerConfig {
                history_slack: slack,
                ..SamplerConfig::default()
            },
        );

        // live = 2, observe live + slack + 1 distinct PIDs over time
        for pid in 1..=6 {
            source.set_processes(&[(pid, "short.exe"), (100, "steady.exe")]);
            source.set_sample(pid, RawProcessSample::default());
            source.set_sample(100, RawProcessSample::default());
            sampler.sample(16).unwrap();
            clock.advance(1000);
            assert!(sampler.history_len() <= 2 + slack);
        }

        source.set_processes(&[(6, "short.exe"), (100, "steady.exe")]);
        sampler.sample(16).unwrap();
        assert!(sampler.history_len() <= 2 + slack);
    }

    #[test]
    fn test_prune_removes_only_dead_identities() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let sampler = sampler(
            &source,
            &clock,
            SamplerConfig {
                history_slack: 0,
                ..SamplerConfig::default()
            },
        );

        source.set_processes(&[(1, "a.exe"), (2, "b.exe"), (3, "c.exe")]);
        for pid in 1..=3 {
            source.set_sample(pid, RawProcessSample::default());
        }
        sampler.sample(16).unwrap();
        assert_eq!(sampler.history_len(), 3);

        source.set_processes(&[(2, "b.exe"), (4, "d.exe")]);
        source.set_sample(4, RawProcessSample::default());
        sampler.sample(16).unwrap();
        assert_eq!(sampler.history_len(), 2);

        // PID 2 kept its baseline, so its second poll has real rates
        source.set_sample(
            2,
            RawProcessSample {
                read_bytes: MB,
                ..Default::default()
            },
        );
        clock.advance(1000);
        let metrics = sampler.sample(16).unwrap();
        assert_eq!(metrics[0].pid, 2);
        assert_eq!(metrics[0].read_mb_per_sec, 1.0);
    }

    #[test]
    fn test_output_bounded_by_max_entries() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        for pid in 1..=10 {
            source.add_process(pid, "many.exe", 1);
            source.set_sample(pid, RawProcessSample::default());
        }

        let sampler = sampler(&source, &clock, SamplerConfig::default());
        let metrics = sampler.sample(3).unwrap();
        assert_eq!(metrics.len(), 3);
        let pids: Vec<u32> = metrics.iter().map(|m| m.pid).collect();
        assert_eq!(pids, vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_max_entries_is_empty_success() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        source.add_process(1, "a.exe", 1);

        let sampler = sampler(&source, &clock, SamplerConfig::default());
        assert_eq!(sampler.sample(0).unwrap(), Vec::new());
        assert_eq!(source.enumerate_calls(), 0);
    }

    #[test]
    fn test_partial_failure_isolated() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        source.add_process(1, "mine.exe", 2);
        source.add_process(4, "System", 150);
        source.add_process(9, "exited.exe", 1);
        source.set_sample(
            1,
            RawProcessSample {
                memory_bytes: 2 * MB,
                handle_count: 7,
                ..Default::default()
            },
        );
        source.deny(4);
        source.vanish(9);

        let sampler = sampler(&source, &clock, SamplerConfig::default());
        let metrics = sampler.sample(16).unwrap();

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[1].pid, 4);
        assert_eq!(metrics[1].name, "System");
        assert_eq!(metrics[1].thread_count, 150);
        assert_eq!(metrics[1].memory_mb, 0.0);
        assert_eq!(metrics[1].handle_count, 0);
        assert_eq!(metrics[1].access, MetricAccess::Denied);
        assert_eq!(metrics[2].access, MetricAccess::Gone);
        assert_eq!(metrics[0].handle_count, 7);

        // Failed lookups leave no baseline behind
        assert_eq!(sampler.history_len(), 1);
    }

    #[test]
    fn test_enumeration_failure_is_distinct_from_empty() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let sampler = sampler(&source, &clock, SamplerConfig::default());

        assert_eq!(sampler.sample(8).unwrap(), Vec::new());

        source.fail_enumeration(true);
        assert!(matches!(
            sampler.sample(8),
            Err(SamplerError::Enumeration { .. })
        ));
        assert!(matches!(
            sampler.top_consumers(3),
            Err(SamplerError::Enumeration { .. })
        ));
    }

    #[test]
    fn test_reused_pid_restarts_baseline() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let sampler = sampler(&source, &clock, SamplerConfig::default());

        source.add_process(77, "old.exe", 1);
        source.set_sample(
            77,
            RawProcessSample {
                kernel_time: 100,
                start_time: Some(1),
                ..Default::default()
            },
        );
        source.set_system_times(1_000);
        sampler.sample(4).unwrap();

        source.set_processes(&[(77, "new.exe")]);
        source.set_sample(
            77,
            RawProcessSample {
                kernel_time: 600,
                start_time: Some(2),
                ..Default::default()
            },
        );
        source.set_system_times(2_000);
        clock.advance(1000);

        let metrics = sampler.sample(4).unwrap();
        assert_eq!(metrics[0].cpu_percent, 0.0);
        assert_eq!(metrics[0].name, "new.exe");

        // Next poll measures against the new instance
        source.set_sample(
            77,
            RawProcessSample {
                kernel_time: 700,
                start_time: Some(2),
                ..Default::default()
            },
        );
        source.set_system_times(3_000);
        clock.advance(1000);
        let metrics = sampler.sample(4).unwrap();
        assert_eq!(metrics[0].cpu_percent, 10.0);
    }

    #[test]
    fn test_reused_pid_artifact_when_detection_disabled() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let sampler = sampler(
            &source,
            &clock,
            SamplerConfig {
                detect_identity_reuse: false,
                ..SamplerConfig::default()
            },
        );

        source.add_process(77, "old.exe", 1);
        source.set_sample(
            77,
            RawProcessSample {
                kernel_time: 100,
                start_time: Some(1),
                ..Default::default()
            },
        );
        source.set_system_times(1_000);
        sampler.sample(4).unwrap();

        source.set_sample(
            77,
            RawProcessSample {
                kernel_time: 600,
                start_time: Some(2),
                ..Default::default()
            },
        );
        source.set_system_times(2_000);
        let metrics = sampler.sample(4).unwrap();
        assert_eq!(metrics[0].cpu_percent, 50.0);
    }

    #[test]
    fn test_top_consumers_orders_by_memory() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        for (pid, mb) in [(1u32, 5u64), (2, 20), (3, 1), (4, 20)] {
            source.add_process(pid, &format!("p{}.exe", pid), 1);
            source.set_working_set(pid, mb * MB);
        }
        source.add_process(5, "locked.exe", 1);
        source.deny(5);

        let sampler = sampler(&source, &clock, SamplerConfig::default());
        let top = sampler.top_consumers(2).unwrap();

        let pids: Vec<u32> = top.iter().map(|c| c.pid).collect();
        assert_eq!(pids, vec![2, 4]);
        assert_eq!(top[0].memory_mb, 20.0);

        let all = sampler.top_consumers(10).unwrap();
        assert_eq!(all.len(), 4);
        assert!(sampler.top_consumers(0).unwrap().is_empty());

        // No history is touched by the memory query
        assert_eq!(sampler.history_len(), 0);
    }

    #[test]
    fn test_concurrent_callers_serialize() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        for pid in 1..=20 {
            source.add_process(pid, "shared.exe", 1);
            source.set_sample(pid, RawProcessSample::default());
            source.set_working_set(pid, u64::from(pid) * MB);
        }
        let sampler = Arc::new(sampler(&source, &clock, SamplerConfig::default()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sampler = Arc::clone(&sampler);
                thread::spawn(move || {
                    for _ in 0..25 {
                        if i % 2 == 0 {
                            assert_eq!(sampler.sample(64).unwrap().len(), 20);
                        } else {
                            assert_eq!(sampler.top_consumers(5).unwrap().len(), 5);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sampler.history_len(), 20);
    }

    #[test]
    fn test_clear_forces_cold_start() {
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(0));
        let sampler = sampler(&source, &clock, SamplerConfig::default());

        source.add_process(1, "a.exe", 1);
        source.set_sample(1, RawProcessSample::default());
        sampler.sample(4).unwrap();
        assert_eq!(sampler.history_len(), 1);

        sampler.clear();
        assert_eq!(sampler.history_len(), 0);

        source.set_sample(
            1,
            RawProcessSample {
                read_bytes: MB,
                ..Default::default()
            },
        );
        clock.advance(1000);
        assert_eq!(sampler.sample(4).unwrap()[0].read_mb_per_sec, 0.0);
    }
}
