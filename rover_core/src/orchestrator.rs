//! Orchestrator: driver lifecycle, poll task, persistence task and
//! emergency-stop propagation.
//!
//! Two independent periodic tasks run concurrently with the external
//! request-serving layer; the only shared mutable state is the
//! [`StateStore`], and cancellation travels over a single watch channel.
//! The driver collection lives behind an async mutex locked once per poll
//! tick — drivers are never touched from anywhere else while the poll
//! task runs, and `stop()` can still reach them for disconnect after the
//! grace period.

use rover_common::config::RoverConfig;
use rover_common::error::ReadError;
use rover_common::reading::DeviceReading;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

use crate::device::Device;
use crate::persist::PersistenceSink;
use crate::store::StateStore;

/// Lifecycle errors. Everything else the orchestrator encounters at
/// runtime is contained and recorded, not returned.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// `start()` was called twice. The orchestrator is one-shot, like the
    /// process-lifetime state it owns.
    #[error("orchestrator already started")]
    AlreadyStarted,
}

/// Owns the driver collection and the state store; runs the poll and
/// persistence tasks.
pub struct Orchestrator {
    drivers: Arc<Mutex<Vec<Box<dyn Device>>>>,
    store: Arc<StateStore>,
    poll_period: Duration,
    persist_interval: Duration,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl Orchestrator {
    /// Create an orchestrator over the given drivers (already in
    /// registration order). Nothing runs until `start()`.
    pub fn new(config: &RoverConfig, drivers: Vec<Box<dyn Device>>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            drivers: Arc::new(Mutex::new(drivers)),
            store: Arc::new(StateStore::new()),
            poll_period: config.poll_period(),
            persist_interval: config.persist_interval(),
            shutdown,
            tasks: Vec::new(),
            started: false,
        }
    }

    /// Handle to the shared state store (read path for external layers).
    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// Set the emergency-stop flag. The next poll tick is guaranteed to
    /// observe it and call `emergency_stop()` on every driver — the flag
    /// is observed, not pushed.
    pub fn trigger_emergency_stop(&self) {
        warn!("emergency stop triggered");
        self.store.trigger_emergency_stop();
    }

    /// Clear the emergency-stop flag; polling resumes on the next tick.
    pub fn clear_emergency_stop(&self) {
        info!("emergency stop cleared");
        self.store.clear_emergency_stop();
    }

    /// Whether the emergency-stop flag is currently set.
    pub fn is_emergency_stopped(&self) -> bool {
        self.store.is_emergency_stopped()
    }

    /// Connect all drivers and launch the poll and persistence tasks.
    ///
    /// A connect failure for one driver is logged and recorded — the
    /// device stays unavailable until [`Orchestrator::reconnect`] — but
    /// never prevents startup.
    pub async fn start(
        &mut self,
        sink: Box<dyn PersistenceSink>,
    ) -> Result<(), OrchestratorError> {
        if self.started {
            return Err(OrchestratorError::AlreadyStarted);
        }
        self.started = true;

        {
            let mut drivers = self.drivers.lock().await;
            info!("connecting {} drivers", drivers.len());
            for driver in drivers.iter_mut() {
                match driver.connect().await {
                    Ok(()) => info!(device = driver.id(), "connected"),
                    Err(e) => {
                        warn!(
                            device = driver.id(),
                            error = %e,
                            "connect failed; device unavailable until reconnect"
                        );
                        self.store.record_error(driver.id(), format!("connect: {e}"));
                        self.store
                            .update(DeviceReading::error(driver.id(), format!("connect: {e}")));
                    }
                }
            }
        }

        self.tasks.push(tokio::spawn(poll_task(
            Arc::clone(&self.drivers),
            self.store(),
            self.poll_period,
            self.shutdown.subscribe(),
        )));
        self.tasks.push(tokio::spawn(persist_task(
            self.store(),
            sink,
            self.persist_interval,
            self.shutdown.subscribe(),
        )));

        info!(
            poll_period_ms = self.poll_period.as_millis() as u64,
            persist_interval_ms = self.persist_interval.as_millis() as u64,
            "orchestrator started"
        );
        Ok(())
    }

    /// Attempt to connect any drivers that are currently disconnected
    /// (manual reconnect path — polling skips disconnected devices).
    /// Serialized with the poll task through the driver lock.
    pub async fn reconnect(&self) {
        let mut drivers = self.drivers.lock().await;
        for driver in drivers.iter_mut() {
            if driver.is_connected() {
                continue;
            }
            match driver.connect().await {
                Ok(()) => info!(device = driver.id(), "reconnected"),
                Err(e) => {
                    warn!(device = driver.id(), error = %e, "reconnect failed");
                    self.store
                        .record_error(driver.id(), format!("reconnect: {e}"));
                }
            }
        }
    }

    /// Cooperative shutdown: signal both tasks, wait a bounded grace
    /// period for each, then disconnect all drivers regardless of
    /// task-exit outcome. A stuck task is logged and abandoned rather
    /// than blocking process shutdown.
    pub async fn stop(&mut self) {
        if !self.started {
            debug!("stop called before start; nothing to do");
            return;
        }

        info!("stopping orchestrator");
        let _ = self.shutdown.send(true);

        let grace = (self.poll_period * 4).max(Duration::from_millis(500));
        for task in self.tasks.drain(..) {
            match timeout(grace, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "task terminated abnormally"),
                Err(_) => error!(grace_ms = grace.as_millis() as u64, "task did not observe shutdown within grace period; abandoning"),
            }
        }

        match timeout(grace, self.drivers.lock()).await {
            Ok(mut drivers) => {
                for driver in drivers.iter_mut() {
                    driver.disconnect().await;
                    debug!(device = driver.id(), "disconnected");
                }
                info!("all drivers disconnected");
            }
            Err(_) => {
                error!("driver collection still held by an abandoned task; skipping disconnect")
            }
        }
    }
}

/// Fixed-rate device poll loop. Drivers are serviced in registration
/// order within each tick; one driver's failure never halts polling of
/// the others.
async fn poll_task(
    drivers: Arc<Mutex<Vec<Box<dyn Device>>>>,
    store: Arc<StateStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("poll task started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        let mut drivers = drivers.lock().await;
        poll_tick(&mut drivers, &store, period).await;
    }

    debug!("poll task exiting");
}

/// One poll tick. The read deadline is one poll period, so a hung driver
/// costs at most its own slot, surfaced as [`ReadError::Timeout`].
async fn poll_tick(drivers: &mut [Box<dyn Device>], store: &StateStore, read_timeout: Duration) {
    let emergency = store.is_emergency_stopped();

    for driver in drivers.iter_mut() {
        if emergency {
            if driver.is_connected() {
                driver.emergency_stop().await;
            } else {
                // Unreachable device: a dead link is already its safe
                // state. Logged no-op.
                debug!(device = driver.id(), "emergency stop: device not connected");
            }
            continue;
        }

        if !driver.is_connected() {
            continue;
        }

        match timeout(read_timeout, driver.read()).await {
            Ok(Ok(reading)) => store.update(reading),
            Ok(Err(e)) => record_read_failure(store, driver.id(), &e),
            Err(_) => record_read_failure(store, driver.id(), &ReadError::Timeout),
        }
    }
}

fn record_read_failure(store: &StateStore, device_id: &str, error: &ReadError) {
    warn!(device = device_id, error = %error, "read failed");
    store.record_error(device_id, error.to_string());
    store.update(DeviceReading::error(device_id, error.to_string()));
}

/// Snapshot persistence loop. Runs independently of the poll task so a
/// slow write path cannot delay emergency-stop propagation.
async fn persist_task(
    store: Arc<StateStore>,
    mut sink: Box<dyn PersistenceSink>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("persistence task started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        let snapshot = store.snapshot();
        if let Err(e) = sink.save(&snapshot).await {
            warn!(error = %e, "persistence sink failed; retrying next tick");
        }
    }

    debug!("persistence task exiting");
}
