//! Polling session controller.
//!
//! Drives periodic collection on the Tokio runtime. Every run of the polling
//! loop belongs to a session identified by a monotonically increasing id;
//! `stop`, `update_interval` and sleep all move to a new id, and a loop or
//! an in-flight collection that observes a different id than the one it was
//! started under exits without publishing.
//!
//! Observers read "current", "is polling" and the history through accessor
//! methods or subscribe to change notifications via `tokio::sync::watch`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::collector::StatsCollector;
use crate::history::{DEFAULT_MAX_SAMPLES, MetricHistorySample, MetricHistoryStore};
use crate::model::{MetricKind, StatsSnapshot};
use crate::rates::NetworkRateDeriver;

/// Refresh interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Shortest sleep between two loop iterations. Smaller configured intervals
/// are raised to this.
pub const MINIMUM_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    pub history_capacity: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            history_capacity: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// What a single refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot became current and was appended to history.
    Published,
    /// Another collection was already in flight; the collector was not called.
    Skipped,
    /// The collector failed; current is unchanged.
    Failed,
    /// The session changed while collecting; the result was dropped.
    Discarded,
}

struct ControllerState {
    session: u64,
    polling: bool,
    interval: Duration,
    in_flight: bool,
    resume_after_wake: bool,
    deriver: NetworkRateDeriver,
}

struct Shared<C> {
    collector: C,
    state: Mutex<ControllerState>,
    session_tx: watch::Sender<u64>,
    current_tx: watch::Sender<Option<Arc<StatsSnapshot>>>,
    polling_tx: watch::Sender<bool>,
    history_tx: watch::Sender<MetricHistoryStore>,
}

impl<C> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag when a refresh ends, including when its future
/// is dropped mid-collection.
struct InFlightGuard<'a, C> {
    shared: &'a Shared<C>,
}

impl<C> Drop for InFlightGuard<'_, C> {
    fn drop(&mut self) {
        self.shared.lock().in_flight = false;
    }
}

/// Resolves once the broadcast session id differs from `session`.
async fn session_changed(rx: &mut watch::Receiver<u64>, session: u64) {
    // A closed channel means every handle was dropped; treat it as a change.
    let _ = rx.wait_for(|id| *id != session).await;
}

/// Cloneable handle to one polling controller.
///
/// The polling loop only holds a weak reference, so dropping the last handle
/// ends the session the same way [`stop`](Self::stop) does.
pub struct PollingController<C: StatsCollector> {
    shared: Arc<Shared<C>>,
}

impl<C: StatsCollector> Clone for PollingController<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: StatsCollector> PollingController<C> {
    pub fn new(collector: C, config: PollingConfig) -> Self {
        let state = ControllerState {
            session: 0,
            polling: false,
            interval: config.interval,
            in_flight: false,
            resume_after_wake: false,
            deriver: NetworkRateDeriver::new(),
        };
        Self {
            shared: Arc::new(Shared {
                collector,
                state: Mutex::new(state),
                session_tx: watch::Sender::new(0),
                current_tx: watch::Sender::new(None),
                polling_tx: watch::Sender::new(false),
                history_tx: watch::Sender::new(MetricHistoryStore::new(config.history_capacity)),
            }),
        }
    }

    pub fn collector(&self) -> &C {
        &self.shared.collector
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Starts a new polling session. No-op if already polling.
    ///
    /// The first sample of every session reports a zero network rate.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let (session, interval) = {
            let mut state = self.shared.lock();
            if state.polling {
                debug!(session = state.session, "start ignored, already polling");
                return;
            }
            state.polling = true;
            state.session += 1;
            state.deriver.reset();
            self.shared.session_tx.send_replace(state.session);
            self.shared.polling_tx.send_replace(true);
            (state.session, state.interval)
        };
        info!(session, ?interval, "polling started");
        self.spawn_loop(session, interval);
    }

    /// Ends the current session. No-op if idle.
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        state.resume_after_wake = false;
        self.end_session(&mut state, "polling stopped");
    }

    /// Records a new interval. While polling, restarts the loop under a new
    /// session so the old loop's pending sleep is abandoned.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime when polling.
    pub fn update_interval(&self, interval: Duration) {
        let session = {
            let mut state = self.shared.lock();
            state.interval = interval;
            if !state.polling {
                debug!(?interval, "interval recorded for next start");
                return;
            }
            state.session += 1;
            self.shared.session_tx.send_replace(state.session);
            state.session
        };
        info!(session, ?interval, "polling restarted with new interval");
        self.spawn_loop(session, interval);
    }

    /// Suspends polling for system sleep, remembering whether to resume.
    pub fn will_sleep(&self) {
        let mut state = self.shared.lock();
        state.resume_after_wake = state.polling;
        self.end_session(&mut state, "polling suspended for sleep");
    }

    /// Resumes polling if it was active before [`will_sleep`](Self::will_sleep).
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime when resuming.
    pub fn did_wake(&self) {
        let resume = std::mem::take(&mut self.shared.lock().resume_after_wake);
        if resume {
            info!("resuming polling after wake");
            self.start();
        } else {
            debug!("wake ignored, polling was not active before sleep");
        }
    }

    fn end_session(&self, state: &mut ControllerState, reason: &'static str) {
        if !state.polling {
            return;
        }
        state.polling = false;
        state.session += 1;
        self.shared.session_tx.send_replace(state.session);
        self.shared.polling_tx.send_replace(false);
        info!(session = state.session, "{}", reason);
    }

    // ============================================================
    // Refresh
    // ============================================================

    /// Runs one collection outside the loop, under the same single-flight
    /// and publish rules as a loop iteration.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        self.refresh(None).await
    }

    /// One collect-derive-publish cycle.
    ///
    /// With `loop_rx`, the collection is abandoned as soon as the session
    /// moves on, and a session that is already stale collects nothing.
    async fn refresh(&self, loop_rx: Option<(&mut watch::Receiver<u64>, u64)>) -> RefreshOutcome {
        let shared = &*self.shared;
        let (session, _guard) = {
            let mut state = shared.lock();
            if let Some((_, expected)) = &loop_rx
                && state.session != *expected
            {
                return RefreshOutcome::Discarded;
            }
            if state.in_flight {
                debug!(session = state.session, "collection in flight, skipping");
                return RefreshOutcome::Skipped;
            }
            state.in_flight = true;
            (state.session, InFlightGuard { shared })
        };

        let result = match loop_rx {
            Some((rx, _)) => tokio::select! {
                result = shared.collector.collect() => result,
                _ = session_changed(rx, session) => {
                    debug!(session, "session ended during collection");
                    return RefreshOutcome::Discarded;
                }
            },
            None => shared.collector.collect().await,
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(session, error = %e, "collection failed, keeping previous snapshot");
                return RefreshOutcome::Failed;
            }
        };

        let mut state = shared.lock();
        if state.session != session {
            debug!(session, current = state.session, "dropping stale snapshot");
            return RefreshOutcome::Discarded;
        }
        let derived = Arc::new(state.deriver.derive(snapshot));
        shared
            .history_tx
            .send_modify(|history| history.append(&derived));
        debug!(
            session,
            metrics = derived.metrics.len(),
            processes = derived.process_cpu_usages.len(),
            "snapshot published"
        );
        shared.current_tx.send_replace(Some(derived));
        RefreshOutcome::Published
    }

    fn spawn_loop(&self, session: u64, interval: Duration) {
        let session_rx = self.shared.session_tx.subscribe();
        tokio::spawn(Self::run_loop(
            Arc::downgrade(&self.shared),
            session_rx,
            session,
            interval,
        ));
    }

    async fn run_loop(
        shared: Weak<Shared<C>>,
        mut session_rx: watch::Receiver<u64>,
        session: u64,
        interval: Duration,
    ) {
        let period = interval.max(MINIMUM_INTERVAL);

        loop {
            if *session_rx.borrow_and_update() != session {
                break;
            }
            // Strong only for the duration of one refresh.
            let Some(strong) = shared.upgrade() else {
                break;
            };
            PollingController { shared: strong }
                .refresh(Some((&mut session_rx, session)))
                .await;

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = session_changed(&mut session_rx, session) => break,
            }
        }
        debug!(session, "polling loop exited");
    }

    // ============================================================
    // Observation
    // ============================================================

    /// Latest published snapshot, if any.
    pub fn current(&self) -> Option<Arc<StatsSnapshot>> {
        self.shared.current_tx.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.lock().polling
    }

    pub fn interval(&self) -> Duration {
        self.shared.lock().interval
    }

    /// Id of the current (or last) session. Changes on every start, stop,
    /// interval restart and sleep.
    pub fn session_id(&self) -> u64 {
        self.shared.lock().session
    }

    /// Owned copy of the rolling history.
    pub fn history(&self) -> BTreeMap<MetricKind, Vec<MetricHistorySample>> {
        self.shared.history_tx.borrow().snapshot()
    }

    pub fn history_samples(&self, kind: MetricKind) -> Vec<MetricHistorySample> {
        self.shared.history_tx.borrow().to_vec(kind)
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Option<Arc<StatsSnapshot>>> {
        self.shared.current_tx.subscribe()
    }

    pub fn subscribe_polling(&self) -> watch::Receiver<bool> {
        self.shared.polling_tx.subscribe()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<MetricHistoryStore> {
        self.shared.history_tx.subscribe()
    }
}
