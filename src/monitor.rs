//! Background polling service
//!
//! `PollingService` drives a shared `RateSampler` on an interval and
//! publishes every poll result to its subscribers over channels.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::constants::{MAX_REFRESH_MS, MIN_REFRESH_MS};
use crate::error::SamplerError;
use crate::sampler::{DerivedMetric, RateSampler};
use crate::source::{ProcessSource, TickClock};

/// One published poll result
#[derive(Debug, Clone, PartialEq)]
pub enum SampleEvent {
    Metrics {
        /// 1-based poll counter
        sequence: u64,
        metrics: Vec<DerivedMetric>,
    },
    Failed {
        sequence: u64,
        error: SamplerError,
    },
}

impl SampleEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            SampleEvent::Metrics { sequence, .. } | SampleEvent::Failed { sequence, .. } => {
                *sequence
            }
        }
    }
}

/// Receiving end of a subscription
pub struct Subscription {
    id: u64,
    receiver: Receiver<SampleEvent>,
}

impl Subscription {
    /// Handle for `PollingService::unsubscribe`
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<SampleEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<SampleEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn receiver(&self) -> &Receiver<SampleEvent> {
        &self.receiver
    }
}

/// Clamps a polling interval to the supported range.
pub fn clamp_interval(ms: u64) -> u64 {
    ms.clamp(MIN_REFRESH_MS, MAX_REFRESH_MS)
}

struct Shared {
    subscribers: Mutex<Vec<(u64, Sender<SampleEvent>)>>,
    next_id: AtomicU64,
    interval_ms: AtomicU64,
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, Vec<(u64, Sender<SampleEvent>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: SampleEvent) {
        let mut subscribers = self.subscribers();
        subscribers.retain(|(id, tx)| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                debug!(subscriber = id, "dropping closed subscription");
            }
            delivered
        });
    }

    /// Sleeps up to `timeout`. Returns true once a stop was requested.
    fn wait_for_stop(&self, timeout: Duration) -> bool {
        let stopped = self
            .stopped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (stopped, _) = self
            .wake
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *stopped
    }

    fn set_stopped(&self, value: bool) {
        let mut stopped = self
            .stopped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *stopped = value;
        self.wake.notify_all();
    }

    fn request_stop(&self) {
        self.set_stopped(true);
    }
}

/// Polls a sampler on a background thread
pub struct PollingService<S, C> {
    sampler: Arc<RateSampler<S, C>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl<S, C> PollingService<S, C>
where
    S: ProcessSource + Send + Sync + 'static,
    C: TickClock + Send + Sync + 'static,
{
    /// Creates a stopped service. Call `start` to begin polling.
    pub fn new(sampler: Arc<RateSampler<S, C>>, interval_ms: u64) -> Self {
        Self {
            sampler,
            shared: Arc::new(Shared {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                interval_ms: AtomicU64::new(clamp_interval(interval_ms)),
                stopped: Mutex::new(false),
                wake: Condvar::new(),
            }),
            worker: None,
        }
    }

    /// Spawns the polling thread. The first poll runs immediately.
    ///
    /// Does nothing if the service is already running. A stopped service
    /// can be started again; subscribe first to receive its events.
    pub fn start(&mut self) -> io::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.shared.set_stopped(false);

        let sampler = Arc::clone(&self.sampler);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("ironsight-poller".to_string())
            .spawn(move || poll_loop(sampler, shared))?;

        info!(
            interval_ms = self.interval_ms(),
            "polling service started"
        );
        self.worker = Some(handle);
        Ok(())
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.subscribers().push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Removes a subscription. Returns false for an unknown id.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.shared.subscribers();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }

    /// Sets the period used from the next tick on. Returns the clamped value.
    pub fn set_interval(&self, ms: u64) -> u64 {
        let ms = clamp_interval(ms);
        self.shared.interval_ms.store(ms, Ordering::SeqCst);
        ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.shared.interval_ms.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stops the thread and ends every subscription.
    pub fn stop(&mut self) {
        if self.join_worker() {
            info!("polling service stopped");
        }
        self.shared.subscribers().clear();
    }
}

impl<S, C> PollingService<S, C> {
    /// Signals the thread and waits for it. Returns false if none was running.
    fn join_worker(&mut self) -> bool {
        self.shared.request_stop();
        match self.worker.take() {
            Some(handle) => {
                if handle.join().is_err() {
                    warn!("polling thread panicked");
                }
                true
            }
            None => false,
        }
    }
}

impl<S, C> Drop for PollingService<S, C> {
    fn drop(&mut self) {
        self.join_worker();
    }
}

#[instrument(skip_all)]
fn poll_loop<S: ProcessSource, C: TickClock>(sampler: Arc<RateSampler<S, C>>, shared: Arc<Shared>) {
    let mut sequence = 0u64;

    loop {
        sequence += 1;
        let event = match sampler.sample(sampler.config().enumeration_capacity) {
            Ok(metrics) => {
                debug!(sequence, processes = metrics.len(), "poll complete");
                SampleEvent::Metrics { sequence, metrics }
            }
            Err(error) => {
                warn!(sequence, "poll failed: {}", error);
                SampleEvent::Failed { sequence, error }
            }
        };
        shared.publish(event);

        let interval = Duration::from_millis(shared.interval_ms.load(Ordering::SeqCst));
        if shared.wait_for_stop(interval) {
            break;
        }
    }
}
