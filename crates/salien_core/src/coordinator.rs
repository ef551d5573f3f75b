//! The target coordinator: one background scan loop, one published target.
//!
//! The published target is the only shared mutable state in the system. It
//! is swapped whole under a short lock, so a reader sees the previous or
//! the next target, never a mix. Staleness between a swap and a worker's
//! next read is tolerated; the service rejects stale actions and the worker
//! reacts through [`CoordinatorHandle::revalidate`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use salien_proto::Planet;

use crate::client::GameClient;
use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::select::{select_target, target_still_valid, SelectPolicy, Target, TargetKey};

/// Result of a revalidation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidation {
    /// Another worker already holds the guard; nothing was done.
    Skipped,
    /// The published target still matches reality.
    Confirmed,
    /// The target was stale and a replacement was published.
    Replaced,
    /// The target was stale but the rescan found nothing; the previous
    /// target stays published until a later cycle finds a candidate.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSnapshot {
    pub running: bool,
    pub scan_count: u64,
    pub last_scan_unix_ms: Option<i64>,
    pub target: Option<TargetKey>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct ScanState {
    scan_count: u64,
    last_scan_unix_ms: Option<i64>,
    last_error: Option<String>,
}

struct Shared<C> {
    client: Arc<C>,
    config: SwarmConfig,
    published: Mutex<Option<Arc<Target>>>,
    revalidating: AtomicBool,
    state: Mutex<ScanState>,
}

/// Cheap handle workers hold to read the published target and request
/// revalidation.
pub struct CoordinatorHandle<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for CoordinatorHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: GameClient> CoordinatorHandle<C> {
    /// Atomic whole-value read of the published target.
    pub fn current_target(&self) -> Option<Arc<Target>> {
        lock(&self.shared.published).clone()
    }

    /// Confirms or replaces the published target after a worker hit an
    /// authoritative stale-target code.
    ///
    /// The single-slot guard is strictly non-blocking: when another caller
    /// holds it, this returns [`Revalidation::Skipped`] immediately with no
    /// network traffic, collapsing a thundering herd of workers discovering
    /// staleness at once into one re-scan.
    pub fn revalidate(&self) -> Revalidation {
        if self.shared.revalidating.swap(true, Ordering::SeqCst) {
            return Revalidation::Skipped;
        }
        let outcome = self.revalidate_guarded();
        self.shared.revalidating.store(false, Ordering::SeqCst);
        outcome
    }

    fn revalidate_guarded(&self) -> Revalidation {
        let Some(current) = self.current_target() else {
            // Nothing published yet; the full scan doubles as recovery.
            return if self.scan_and_publish() {
                Revalidation::Replaced
            } else {
                Revalidation::Unchanged
            };
        };

        if let Some(planet) = self.fetch_planet_detail(&current.planet().id) {
            if target_still_valid(&current, &planet) {
                tracing::info!(target = %current, "revalidation: target still valid");
                return Revalidation::Confirmed;
            }
        }

        tracing::info!(target = %current, "revalidation: target is stale, rescanning");
        if self.scan_and_publish() {
            Revalidation::Replaced
        } else {
            Revalidation::Unchanged
        }
    }

    /// One full scan-and-select cycle. Returns true when a target was
    /// published. An empty cycle keeps the previous target and is not an
    /// error.
    pub fn scan_and_publish(&self) -> bool {
        let published = self.run_scan();
        let mut state = lock(&self.shared.state);
        state.scan_count = state.scan_count.saturating_add(1);
        state.last_scan_unix_ms = Some(now_unix_ms());
        published
    }

    fn run_scan(&self) -> bool {
        let response = self.shared.client.planets();
        if !response.result.is_ok() {
            let reason = format!("planet list rejected: {}", response.result);
            tracing::warn!(
                result = %response.result,
                message = response.error_message.as_deref().unwrap_or(""),
                "scan aborted"
            );
            lock(&self.shared.state).last_error = Some(reason);
            return false;
        }

        let summaries = response.body.map(|body| body.planets).unwrap_or_default();
        let mut details = Vec::new();
        for summary in summaries {
            if summary.state.captured {
                continue;
            }
            if let Some(planet) = self.fetch_planet_detail(&summary.id) {
                details.push(planet);
            }
        }

        let policy = SelectPolicy {
            min_progress: self.shared.config.min_progress,
            abandon_threshold: self.shared.config.abandon_threshold,
        };
        match select_target(&details, &policy) {
            Some(target) => {
                tracing::info!(
                    target = %target,
                    progress = target.zone().capture_progress,
                    "publishing target"
                );
                *lock(&self.shared.published) = Some(Arc::new(target));
                lock(&self.shared.state).last_error = None;
                true
            }
            None => {
                tracing::info!("no eligible target this cycle, keeping previous");
                false
            }
        }
    }

    fn fetch_planet_detail(&self, planet_id: &str) -> Option<Planet> {
        let response = self.shared.client.planet(planet_id);
        if !response.result.is_ok() {
            tracing::warn!(
                planet = planet_id,
                result = %response.result,
                "planet detail rejected"
            );
            return None;
        }
        response
            .body
            .and_then(|body| body.planets.into_iter().next())
    }
}

/// Owns the background scan thread. Workers interact through
/// [`CoordinatorHandle`] only.
pub struct Coordinator<C> {
    shared: Arc<Shared<C>>,
    running: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl<C: GameClient + 'static> Coordinator<C> {
    pub fn new(client: Arc<C>, config: SwarmConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                config,
                published: Mutex::new(None),
                revalidating: AtomicBool::new(false),
                state: Mutex::new(ScanState::default()),
            }),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            worker: None,
        }
    }

    pub fn handle(&self) -> CoordinatorHandle<C> {
        CoordinatorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs the first scan synchronously so workers never start against a
    /// never-scanned coordinator, then spawns the periodic scan thread.
    pub fn start(&mut self) -> Result<(), SwarmError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SwarmError::AlreadyRunning);
        }

        let handle = self.handle();
        handle.scan_and_publish();

        let scan_interval = self.shared.config.scan_interval;
        let running = Arc::clone(&self.running);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("swarm-coordinator".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(scan_interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            handle.scan_and_publish();
                        }
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                SwarmError::ThreadSpawnFailed {
                    reason: err.to_string(),
                }
            })?;

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), SwarmError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SwarmError::NotRunning);
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker.join().map_err(|_| SwarmError::ThreadJoinFailed)?;
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let state = lock(&self.shared.state);
        CoordinatorSnapshot {
            running: self.running.load(Ordering::SeqCst),
            scan_count: state.scan_count,
            last_scan_unix_ms: state.last_scan_unix_ms,
            target: lock(&self.shared.published)
                .as_ref()
                .map(|target| target.key()),
            last_error: state.last_error.clone(),
        }
    }
}

impl<C> Drop for Coordinator<C> {
    fn drop(&mut self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
