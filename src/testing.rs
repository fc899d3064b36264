//! Scripted sources for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{AccessError, AccessResult, SamplerError, SamplerResult};
use crate::source::{ProcessEntry, ProcessSource, RawProcessSample, TickClock};

#[derive(Default)]
struct Script {
    processes: Vec<ProcessEntry>,
    samples: HashMap<u32, AccessResult<RawProcessSample>>,
    working_sets: HashMap<u32, AccessResult<u64>>,
    system_times: u64,
    fail_enumeration: bool,
    enumerate_calls: usize,
}

/// A process source whose answers are set by the test
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<Script>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }

    pub fn add_process(&self, pid: u32, name: &str, thread_count: u32) {
        self.with(|s| {
            s.processes.push(ProcessEntry {
                pid,
                name: name.to_string(),
                thread_count,
            })
        });
    }

    /// Replaces the live set with single-threaded processes.
    pub fn set_processes(&self, processes: &[(u32, &str)]) {
        self.with(|s| {
            s.processes = processes
                .iter()
                .map(|&(pid, name)| ProcessEntry {
                    pid,
                    name: name.to_string(),
                    thread_count: 1,
                })
                .collect();
        });
    }

    pub fn set_sample(&self, pid: u32, sample: RawProcessSample) {
        self.with(|s| s.samples.insert(pid, Ok(sample)));
    }

    pub fn set_working_set(&self, pid: u32, bytes: u64) {
        self.with(|s| s.working_sets.insert(pid, Ok(bytes)));
    }

    pub fn deny(&self, pid: u32) {
        self.with(|s| {
            s.samples.insert(pid, Err(AccessError::AccessDenied));
            s.working_sets.insert(pid, Err(AccessError::AccessDenied));
        });
    }

    pub fn vanish(&self, pid: u32) {
        self.with(|s| {
            s.samples.insert(pid, Err(AccessError::NotFound));
            s.working_sets.insert(pid, Err(AccessError::NotFound));
        });
    }

    pub fn set_system_times(&self, kernel_user: u64) {
        self.with(|s| s.system_times = kernel_user);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.with(|s| s.fail_enumeration = fail);
    }

    pub fn enumerate_calls(&self) -> usize {
        self.with(|s| s.enumerate_calls)
    }
}

impl ProcessSource for ScriptedSource {
    /// Ignores `capacity` so callers' own truncation is exercised.
    fn enumerate(&self, _capacity: usize) -> SamplerResult<Vec<ProcessEntry>> {
        self.with(|s| {
            s.enumerate_calls += 1;
            if s.fail_enumeration {
                Err(SamplerError::Enumeration {
                    api: "CreateToolhelp32Snapshot",
                    code: 5,
                })
            } else {
                Ok(s.processes.clone())
            }
        })
    }

    fn raw_sample(&self, pid: u32) -> AccessResult<RawProcessSample> {
        self.with(|s| s.samples.get(&pid).copied().unwrap_or(Err(AccessError::NotFound)))
    }

    fn working_set(&self, pid: u32) -> AccessResult<u64> {
        self.with(|s| {
            s.working_sets
                .get(&pid)
                .copied()
                .unwrap_or(Err(AccessError::NotFound))
        })
    }

    fn system_times(&self) -> u64 {
        self.with(|s| s.system_times)
    }
}

/// A tick clock that only moves when told to
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TickClock for ManualClock {
    fn tick_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
