//! Scheduler module: one check loop per target plus the hysteresis engine.

mod event_log;
mod state;

pub use event_log::*;
pub use state::*;

use crate::notify::{render, MessageFields, Notifier};
use crate::probe::{ProbeOutcome, ProbeStatus, Prober};
use crate::store::{Target, TargetStore};

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Upper bound of the random delay before a target's first check.
const START_JITTER_MS: u64 = 1000;

type RuntimeMap = HashMap<u32, Arc<Mutex<TargetRuntime>>>;
type StopMap = HashMap<u32, (u64, broadcast::Sender<()>)>;

/// Runs one check: probe, hysteresis update and transition side effects.
pub struct Checker {
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
}

impl Checker {
    pub fn new(prober: Arc<dyn Prober>, notifier: Arc<dyn Notifier>) -> Self {
        Self { prober, notifier }
    }

    /// Probe `target` once and apply the result to `runtime`.
    ///
    /// On a confirmed transition the rendered message is dispatched, the
    /// direction's callback fired and the event logged before returning.
    pub async fn check(
        &self,
        target: &Target,
        runtime: &Mutex<TargetRuntime>,
    ) -> Option<Direction> {
        let outcome = self.probe(target).await;
        self.apply(target, &outcome, runtime).await
    }

    pub async fn probe(&self, target: &Target) -> ProbeOutcome {
        self.prober.probe(&target.url).await
    }

    /// Record `outcome` and run the side effects of any confirmed transition.
    pub async fn apply(
        &self,
        target: &Target,
        outcome: &ProbeOutcome,
        runtime: &Mutex<TargetRuntime>,
    ) -> Option<Direction> {
        let now = Utc::now();

        let (transition, failures, successes) = {
            let mut rt = runtime.lock().await;
            let transition = rt.state.record(outcome, target, now);
            (transition, rt.state.failure_count, rt.state.success_count)
        };

        tracing::info!(
            "[{}] {} status {} in {} ms (fails: {}, successes: {})",
            target.id,
            target.url,
            outcome.status.code(),
            outcome.latency.as_millis(),
            failures,
            successes
        );
        if let Some(error) = &outcome.error {
            tracing::debug!("[{}] probe error: {}", target.id, error);
        }

        let direction = transition?;
        let (template, code, callback_url) = match direction {
            Direction::Online => (&target.online_message, None, &target.http_get_url_on),
            Direction::Offline => (
                &target.offline_message,
                Some(outcome.status.code()),
                &target.http_get_url_off,
            ),
        };

        let message = render(
            template,
            &MessageFields {
                name: &target.name,
                url: &target.url,
                code,
            },
        );
        tracing::warn!("[{}] {} is now {:?}: {}", target.id, target.name, direction, message);

        tokio::join!(
            self.notifier.notify(target, &message),
            self.notifier.callback(callback_url),
        );

        runtime.lock().await.log.push(LogEntry { direction, at: now });
        Some(direction)
    }
}

/// Drives a check loop for every schedulable target.
pub struct Scheduler {
    store: Arc<TargetStore>,
    checker: Arc<Checker>,
    runtimes: Arc<RwLock<RuntimeMap>>,
    stop_chans: Arc<RwLock<StopMap>>,
    // Held for the duration of a check; survives loop restarts so an old
    // loop finishing its probe never overlaps with its replacement.
    probe_locks: Arc<Mutex<HashMap<u32, Arc<Mutex<()>>>>>,
    generation: AtomicU64,
}

impl Scheduler {
    /// Create a new scheduler over the given store.
    pub fn new(
        store: Arc<TargetStore>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            checker: Arc::new(Checker::new(prober, notifier)),
            runtimes: Arc::new(RwLock::new(HashMap::new())),
            stop_chans: Arc::new(RwLock::new(HashMap::new())),
            probe_locks: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Start monitoring every schedulable target in the store.
    pub async fn start(&self) {
        let ids = self.store.ids();
        tracing::info!("Starting scheduler with {} targets", ids.len());

        for id in ids {
            self.sync_target(id).await;
        }

        let running = self.stop_chans.read().await.len();
        tracing::info!("Monitoring {} schedulable targets", running);
    }

    /// Bring the loop for `id` in line with its stored configuration.
    ///
    /// Starts a loop (with fresh runtime state) when the target became
    /// schedulable, stops it when it no longer is. Config changes on a
    /// running target are picked up by the loop itself.
    pub async fn sync_target(&self, id: u32) {
        let schedulable = self.store.get(id).is_some_and(|t| t.is_schedulable());

        if schedulable {
            self.start_target(id).await;
        } else {
            self.stop_target(id).await;
        }
    }

    pub async fn sync_all(&self) {
        for id in self.store.ids() {
            self.sync_target(id).await;
        }
    }

    /// Runtime state and event log of one target.
    pub async fn snapshot(&self, id: u32) -> Option<TargetRuntime> {
        let runtime = self.runtimes.read().await.get(&id).cloned()?;
        let rt = runtime.lock().await;
        Some(rt.clone())
    }

    pub async fn snapshots(&self) -> HashMap<u32, TargetRuntime> {
        let runtimes: Vec<_> = self
            .runtimes
            .read()
            .await
            .iter()
            .map(|(id, rt)| (*id, rt.clone()))
            .collect();

        let mut out = HashMap::with_capacity(runtimes.len());
        for (id, runtime) in runtimes {
            out.insert(id, runtime.lock().await.clone());
        }
        out
    }

    #[cfg(test)]
    pub async fn is_running(&self, id: u32) -> bool {
        self.stop_chans.read().await.contains_key(&id)
    }

    async fn start_target(&self, id: u32) {
        let mut stop_chans = self.stop_chans.write().await;
        if let Some((_, stop_tx)) = stop_chans.get(&id) {
            // A loop that already exited has dropped its receiver
            if stop_tx.receiver_count() > 0 {
                return; // Already running
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = broadcast::channel(1);
        stop_chans.insert(id, (generation, stop_tx));
        drop(stop_chans);

        let runtime = Arc::new(Mutex::new(TargetRuntime::default()));
        self.runtimes.write().await.insert(id, runtime.clone());

        let probe_lock = self
            .probe_locks
            .lock()
            .await
            .entry(id)
            .or_default()
            .clone();

        tracing::info!("Scheduler: Adding target {}", id);

        let ctx = LoopContext {
            id,
            store: self.store.clone(),
            checker: self.checker.clone(),
            runtime,
            probe_lock,
        };
        let stop_chans = self.stop_chans.clone();

        tokio::spawn(async move {
            run_check_loop(ctx, stop_rx).await;

            // Clean up unless a newer loop already took the slot
            let mut chans = stop_chans.write().await;
            if chans.get(&id).is_some_and(|(g, _)| *g == generation) {
                chans.remove(&id);
            }
        });
    }

    async fn stop_target(&self, id: u32) {
        if let Some((_, stop_tx)) = self.stop_chans.write().await.remove(&id) {
            let _ = stop_tx.send(());
            tracing::info!("Scheduler: Removed target {}", id);
        }

        if let Some(runtime) = self.runtimes.read().await.get(&id) {
            runtime.lock().await.state.status = ProbeStatus::NotProbed;
        }
    }
}

struct LoopContext {
    id: u32,
    store: Arc<TargetStore>,
    checker: Arc<Checker>,
    runtime: Arc<Mutex<TargetRuntime>>,
    probe_lock: Arc<Mutex<()>>,
}

/// Run the check loop for a single target.
///
/// The next check starts `check_interval` seconds after the previous one
/// (including its side effects) completed.
async fn run_check_loop(ctx: LoopContext, mut stop_rx: broadcast::Receiver<()>) {
    let jitter = Duration::from_millis(rand::random::<u64>() % START_JITTER_MS);
    let stopped = tokio::select! {
        _ = stop_rx.recv() => true,
        _ = tokio::time::sleep(jitter) => false,
    };

    if !stopped {
        check_until_stopped(&ctx, &mut stop_rx).await;
    }

    ctx.runtime.lock().await.state.status = ProbeStatus::NotProbed;
    tracing::debug!("Check loop for target {} stopped", ctx.id);
}

async fn check_until_stopped(ctx: &LoopContext, stop_rx: &mut broadcast::Receiver<()>) {
    loop {
        let target = match ctx.store.get(ctx.id) {
            Some(t) if t.is_schedulable() => t,
            _ => return,
        };

        {
            let _in_flight = ctx.probe_lock.lock().await;
            let outcome = ctx.checker.probe(&target).await;

            // Stopped while the probe was out: drop the result.
            if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                return;
            }
            ctx.checker.apply(&target, &outcome, &ctx.runtime).await;
        }

        let wait = Duration::from_secs(u64::from(target.check_interval.max(1)));
        tokio::select! {
            _ = stop_rx.recv() => return,
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
