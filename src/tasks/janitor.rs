//! Janitor Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::error::{CacheError, Result};

/// Lifecycle state of a [`Janitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JanitorState {
    /// Constructed, not started
    Idle,
    /// Sweeping on every tick
    Running,
    /// Terminal; a stopped janitor is never restarted
    Stopped,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    Stopped {
        task: Option<JoinHandle<()>>,
    },
}

// == Janitor ==
/// Periodic expiration sweep bound to one cache store.
///
/// The background task only holds a [`Weak`] reference to the store, so it
/// never keeps the store alive on its own: once the store is dropped the
/// task exits on its next tick. Dropping the janitor sends the stop signal.
#[derive(Debug)]
pub struct Janitor {
    interval: Duration,
    phase: Phase,
}

impl Janitor {
    /// Creates an idle janitor that will sweep every `interval` once started.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> JanitorState {
        match self.phase {
            Phase::Idle => JanitorState::Idle,
            Phase::Running { .. } => JanitorState::Running,
            Phase::Stopped { .. } => JanitorState::Stopped,
        }
    }

    // == Start ==
    /// Spawns the sweep loop on the current Tokio runtime.
    ///
    /// Starting a running janitor is a no-op.
    ///
    /// # Errors
    /// - [`CacheError::InvalidConfig`] if the interval is zero, or so large
    ///   that the first tick cannot be scheduled
    /// - [`CacheError::NoRuntime`] if called outside a Tokio runtime
    /// - [`CacheError::JanitorStopped`] if the janitor was already stopped
    pub fn start<V>(&mut self, store: &Arc<CacheStore<V>>) -> Result<()>
    where
        V: Send + Sync + 'static,
    {
        match self.phase {
            Phase::Idle => {}
            Phase::Running { .. } => return Ok(()),
            Phase::Stopped { .. } => return Err(CacheError::JanitorStopped),
        }

        if self.interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup interval must be positive".to_string(),
            ));
        }
        let first_tick = Instant::now().checked_add(self.interval).ok_or_else(|| {
            CacheError::InvalidConfig("cleanup interval is too large".to_string())
        })?;
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let (stop, stopped) = oneshot::channel();
        let task = runtime.spawn(run(
            Arc::downgrade(store),
            first_tick,
            self.interval,
            stopped,
        ));
        self.phase = Phase::Running { stop, task };
        Ok(())
    }

    // == Stop ==
    /// Signals the sweep loop to exit. Idempotent.
    ///
    /// A sweep already in progress completes before the loop exits.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Stopped { task: None }) {
            Phase::Running { stop, task } => {
                // The receiver is gone only if the loop already exited.
                let _ = stop.send(());
                self.phase = Phase::Stopped { task: Some(task) };
            }
            Phase::Idle => {}
            stopped @ Phase::Stopped { .. } => self.phase = stopped,
        }
    }

    /// Returns true once the background task has exited (or never ran).
    pub fn is_finished(&self) -> bool {
        match &self.phase {
            Phase::Idle => true,
            Phase::Running { task, .. } => task.is_finished(),
            Phase::Stopped { task } => task.as_ref().map_or(true, JoinHandle::is_finished),
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<V>(
    store: Weak<CacheStore<V>>,
    first_tick: Instant,
    period: Duration,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_ms = period.as_millis() as u64, "Janitor started");

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else {
                    debug!("Cache store dropped, janitor exiting");
                    break;
                };

                let removed = store.delete_expired();
                if removed > 0 {
                    info!(removed, "Janitor removed expired entries");
                }
            }
        }
    }

    info!("Janitor stopped");
}
