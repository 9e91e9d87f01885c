//! Motor controller driver.
//!
//! Wraps the [`MotorStateMachine`] and the motor endpoint. Commands from
//! the request-serving layer travel over a bounded channel — drivers are
//! owned exclusively by the poll task, so nothing outside it ever touches
//! the driver object. Pending commands are drained and applied inside
//! `read()`, which also ticks the keep-alive watchdog, so loss of the
//! control channel halts motion within one poll tick of the deadline.

use async_trait::async_trait;
use rover_common::command::MotorCommand;
use rover_common::config::MotorConfig;
use rover_common::error::{ConnectError, ReadError};
use rover_common::reading::{DeviceReading, ReadingPayload};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::device::{Device, DeviceKind};
use crate::motor::{ActuatorSignal, MotorStateMachine};

/// Commands queued beyond this depth are dropped (with a warning) rather
/// than buffered without bound.
pub const COMMAND_QUEUE_DEPTH: usize = 32;

/// Transport seam for the motor controller.
#[async_trait]
pub trait MotorLink: Send {
    async fn open(&mut self) -> Result<(), ConnectError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;

    /// Write a two-sided drive signal to the controller.
    async fn apply(&mut self, signal: ActuatorSignal) -> Result<(), ReadError>;
}

#[derive(Debug)]
struct QueuedCommand {
    enqueued_at: Instant,
    command: MotorCommand,
}

/// Command entry point for the request-serving layer. Cloneable; the
/// driver end drains the queue once per poll tick.
#[derive(Debug, Clone)]
pub struct MotorCommandHandle {
    tx: mpsc::Sender<QueuedCommand>,
}

impl MotorCommandHandle {
    /// Submit a command. Returns `false` if it was dropped (queue full or
    /// driver gone) — the caller's recourse is to retry or keep-alive.
    pub fn send(&self, command: MotorCommand) -> bool {
        let queued = QueuedCommand {
            enqueued_at: Instant::now(),
            command,
        };
        match self.tx.try_send(queued) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(?command, "motor command queue full; dropping command");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(?command, "motor driver gone; dropping command");
                false
            }
        }
    }
}

/// Driver for the motor controller. Owns exactly one endpoint and the
/// command state machine.
pub struct MotorController<L: MotorLink> {
    link: L,
    machine: MotorStateMachine,
    commands: mpsc::Receiver<QueuedCommand>,
    /// Queued commands older than this are discarded at drain time — a
    /// stale backlog must never replay as motion.
    stale_after: Duration,
}

impl<L: MotorLink> MotorController<L> {
    /// Create the driver and its command handle.
    pub fn new(link: L, config: &MotorConfig) -> (Self, MotorCommandHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let controller = Self {
            link,
            machine: MotorStateMachine::new(config),
            commands: rx,
            stale_after: config.keep_alive_timeout(),
        };
        (controller, MotorCommandHandle { tx })
    }

    /// Drain and apply pending commands, then tick the watchdog.
    async fn service(&mut self, now: Instant) -> Result<(), ReadError> {
        while let Ok(queued) = self.commands.try_recv() {
            if now.duration_since(queued.enqueued_at) > self.stale_after {
                warn!(command = ?queued.command, "discarding stale motor command");
                continue;
            }
            if let Some(signal) = self.machine.apply(&queued.command, now) {
                self.link.apply(signal).await?;
            }
        }

        if let Some(neutral) = self.machine.check_watchdog(now) {
            info!("keep-alive timeout expired; stopping motion");
            self.link.apply(neutral).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl<L: MotorLink> Device for MotorController<L> {
    fn id(&self) -> &str {
        DeviceKind::MotorController.id()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::MotorController
    }

    fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.link.is_open() {
            return Ok(());
        }
        self.link.open().await
    }

    async fn disconnect(&mut self) {
        // Leave the actuator at neutral before dropping the link.
        if self.link.is_open() {
            let neutral = self.machine.force_stop();
            if let Err(e) = self.link.apply(neutral).await {
                warn!(error = %e, "failed to write neutral signal on disconnect");
            }
        }
        self.link.close();
    }

    async fn read(&mut self) -> Result<DeviceReading, ReadError> {
        if !self.link.is_open() {
            return Err(ReadError::NotConnected);
        }

        self.service(Instant::now()).await?;

        let signal = self.machine.last_signal();
        Ok(DeviceReading::ok(
            self.id(),
            ReadingPayload::Motor {
                state: self.machine.state_kind(),
                left: signal.left,
                right: signal.right,
            },
        ))
    }

    async fn emergency_stop(&mut self) {
        // Discard the backlog first so queued commands cannot replay as
        // motion once the flag is cleared.
        while self.commands.try_recv().is_ok() {}

        let neutral = self.machine.force_stop();
        if self.link.is_open() {
            if let Err(e) = self.link.apply(neutral).await {
                warn!(error = %e, "failed to write neutral signal during emergency stop");
            }
        } else {
            debug!("emergency stop: motor link not connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_common::reading::MotorStateKind;
    use std::sync::{Arc, Mutex};

    /// Link that records every applied signal.
    #[derive(Clone)]
    struct RecordingLink {
        open: bool,
        applied: Arc<Mutex<Vec<ActuatorSignal>>>,
    }

    impl RecordingLink {
        fn new() -> (Self, Arc<Mutex<Vec<ActuatorSignal>>>) {
            let applied = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    open: false,
                    applied: Arc::clone(&applied),
                },
                applied,
            )
        }
    }

    #[async_trait]
    impl MotorLink for RecordingLink {
        async fn open(&mut self) -> Result<(), ConnectError> {
            self.open = true;
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        async fn apply(&mut self, signal: ActuatorSignal) -> Result<(), ReadError> {
            self.applied.lock().unwrap().push(signal);
            Ok(())
        }
    }

    fn fast_config() -> MotorConfig {
        MotorConfig {
            keep_alive_timeout_ms: 100,
            ..MotorConfig::default()
        }
    }

    #[tokio::test]
    async fn commands_applied_on_next_read() {
        let (link, applied) = RecordingLink::new();
        let (mut motor, handle) = MotorController::new(link, &MotorConfig::default());
        motor.connect().await.unwrap();

        assert!(handle.send(MotorCommand::Forward { speed: 300 }));
        let reading = motor.read().await.unwrap();

        assert_eq!(
            reading.payload,
            ReadingPayload::Motor {
                state: MotorStateKind::Moving,
                left: 1800,
                right: 1800,
            }
        );
        assert_eq!(
            applied.lock().unwrap().as_slice(),
            &[ActuatorSignal { left: 1800, right: 1800 }]
        );
    }

    #[tokio::test]
    async fn read_without_connect_fails() {
        let (link, _) = RecordingLink::new();
        let (mut motor, _handle) = MotorController::new(link, &MotorConfig::default());
        assert_eq!(motor.read().await.unwrap_err(), ReadError::NotConnected);
    }

    #[tokio::test]
    async fn watchdog_fires_between_reads() {
        let (link, applied) = RecordingLink::new();
        let (mut motor, handle) = MotorController::new(link, &fast_config());
        motor.connect().await.unwrap();

        handle.send(MotorCommand::Forward { speed: 300 });
        motor.read().await.unwrap();

        // No further commands; wait past the keep-alive timeout.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let reading = motor.read().await.unwrap();

        assert_eq!(
            reading.payload,
            ReadingPayload::Motor {
                state: MotorStateKind::Stopped,
                left: 1500,
                right: 1500,
            }
        );
        let signals = applied.lock().unwrap();
        assert_eq!(signals.last().unwrap(), &ActuatorSignal { left: 1500, right: 1500 });
    }

    #[tokio::test]
    async fn stale_backlog_is_discarded() {
        let (link, applied) = RecordingLink::new();
        let (mut motor, handle) = MotorController::new(link, &fast_config());
        motor.connect().await.unwrap();

        // Command sits in the queue past the keep-alive window before the
        // next read services it.
        handle.send(MotorCommand::Forward { speed: 300 });
        tokio::time::sleep(Duration::from_millis(150)).await;
        let reading = motor.read().await.unwrap();

        assert_eq!(
            reading.payload,
            ReadingPayload::Motor {
                state: MotorStateKind::Stopped,
                left: 1500,
                right: 1500,
            }
        );
        assert!(applied.lock().unwrap().is_empty(), "stale command must not drive");
    }

    #[tokio::test]
    async fn emergency_stop_zeroes_and_clears_backlog() {
        let (link, applied) = RecordingLink::new();
        let (mut motor, handle) = MotorController::new(link, &MotorConfig::default());
        motor.connect().await.unwrap();

        handle.send(MotorCommand::Forward { speed: 300 });
        motor.read().await.unwrap();

        // Queue up motion, then stop before it is serviced.
        handle.send(MotorCommand::Backward { speed: 300 });
        motor.emergency_stop().await;

        assert_eq!(
            applied.lock().unwrap().last().unwrap(),
            &ActuatorSignal { left: 1500, right: 1500 }
        );

        // The queued Backward was discarded: the next read emits nothing.
        let before = applied.lock().unwrap().len();
        let reading = motor.read().await.unwrap();
        assert_eq!(applied.lock().unwrap().len(), before);
        assert!(matches!(
            reading.payload,
            ReadingPayload::Motor { state: MotorStateKind::Stopped, .. }
        ));
    }

    #[tokio::test]
    async fn queue_overflow_drops_commands() {
        let (link, _) = RecordingLink::new();
        let (_motor, handle) = MotorController::new(link, &MotorConfig::default());

        for _ in 0..COMMAND_QUEUE_DEPTH {
            assert!(handle.send(MotorCommand::KeepAlive));
        }
        assert!(!handle.send(MotorCommand::KeepAlive), "queue should be full");
    }
}
