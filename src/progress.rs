//! Simulated-progress clock for the loading indicator.
//!
//! Generation time is dominated by an opaque remote call, so there is no
//! true completion signal to report against. Instead a one-second tick
//! derives a simulated percentage from elapsed time and a per-tier estimate
//! of how long generation usually takes: `min(elapsed / estimated * 95, 95)`.
//! The value is capped at 95 while work is in flight — the indicator never
//! claims completion the pipeline cannot confirm — and is forced to exactly
//! 100 only on success. On failure it freezes at its last value.
//!
//! [`ProgressEstimator`] is the pure clock (tick in, percentage out);
//! [`ProgressTicker`] drives it from a `tokio` interval and publishes values
//! through a `watch` channel. The ticker task aborts when the handle drops,
//! so a leaked recurring timer is impossible.

use crate::config::ModelTier;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// The in-flight percentage ceiling.
pub const PROGRESS_CEILING: f64 = 95.0;

/// Tick period of the simulated clock.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Succeeded,
    Failed,
}

/// Pure simulated-progress state: elapsed seconds against a fixed per-tier
/// estimate.
#[derive(Debug)]
pub struct ProgressEstimator {
    elapsed_secs: u64,
    estimated_total_secs: u64,
    phase: Phase,
}

impl ProgressEstimator {
    /// A fresh clock for the given model tier, at zero elapsed time.
    pub fn for_tier(tier: ModelTier) -> Self {
        Self {
            elapsed_secs: 0,
            estimated_total_secs: tier.estimated_total_secs(),
            phase: Phase::Running,
        }
    }

    /// Advance the clock by one second. Ignored once terminal, which is
    /// what freezes the percentage after a failure.
    pub fn tick(&mut self) {
        if self.phase == Phase::Running {
            self.elapsed_secs += 1;
        }
    }

    /// Seconds the clock has been running.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// The simulated completion percentage.
    pub fn percent(&self) -> f64 {
        match self.phase {
            Phase::Succeeded => 100.0,
            Phase::Running | Phase::Failed => {
                let simulated =
                    self.elapsed_secs as f64 / self.estimated_total_secs as f64 * PROGRESS_CEILING;
                simulated.min(PROGRESS_CEILING)
            }
        }
    }

    /// Generation finished successfully; force the percentage to 100.
    pub fn complete(&mut self) {
        self.phase = Phase::Succeeded;
    }

    /// Generation failed; freeze the percentage at its last value.
    pub fn fail(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Failed;
        }
    }

    /// Whether the clock is still advancing.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}

/// Async driver for [`ProgressEstimator`]: ticks once per second and
/// publishes the derived percentage on a `watch` channel.
///
/// Dropping the ticker aborts the task; callers never need to remember to
/// stop the timer.
pub struct ProgressTicker {
    estimator: Arc<Mutex<ProgressEstimator>>,
    tx: watch::Sender<f64>,
    task: JoinHandle<()>,
}

impl ProgressTicker {
    /// Start a fresh clock for `tier`, beginning at zero.
    pub fn spawn(tier: ModelTier) -> Self {
        let estimator = Arc::new(Mutex::new(ProgressEstimator::for_tier(tier)));
        let (tx, _rx) = watch::channel(0.0);

        let task = {
            let estimator = Arc::clone(&estimator);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut ticker = interval(TICK_PERIOD);
                ticker.tick().await; // first tick completes immediately
                loop {
                    ticker.tick().await;
                    let percent = {
                        let mut est = lock(&estimator);
                        if !est.is_running() {
                            break;
                        }
                        est.tick();
                        est.percent()
                    };
                    if tx.send(percent).is_err() {
                        break;
                    }
                }
            })
        };

        Self { estimator, tx, task }
    }

    /// A receiver for percentage updates (initially 0.0).
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }

    /// The current simulated percentage.
    pub fn percent(&self) -> f64 {
        lock(&self.estimator).percent()
    }

    /// Mark the generation successful: stop ticking and publish 100.
    pub fn complete(&self) {
        lock(&self.estimator).complete();
        let _ = self.tx.send(100.0);
    }

    /// Mark the generation failed: stop ticking, leaving the last value.
    pub fn fail(&self) {
        let mut est = lock(&self.estimator);
        est.fail();
        let _ = self.tx.send(est.percent());
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock(estimator: &Mutex<ProgressEstimator>) -> std::sync::MutexGuard<'_, ProgressEstimator> {
    estimator.lock().unwrap_or_else(PoisonError::into_inner)
}
