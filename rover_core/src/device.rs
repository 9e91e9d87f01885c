//! Device driver trait and shared contract.
//!
//! Every peripheral is driven through [`Device`], a uniform capability set
//! `{connect, disconnect, read, emergency_stop}`. The orchestrator only
//! ever manipulates drivers through this trait — variant-specific behavior
//! stays inside the driver implementations in [`crate::drivers`].

use async_trait::async_trait;
use rover_common::error::{ConnectError, ReadError};
use rover_common::reading::DeviceReading;

/// The closed set of driver variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Ranging sensor (distance array payload).
    RangeSensor,
    /// Vision/AI sensor (coarse object payload).
    VisionSensor,
    /// Motor controller (wraps the motor command state machine).
    MotorController,
}

impl DeviceKind {
    /// Canonical device id for this kind.
    pub const fn id(&self) -> &'static str {
        match self {
            Self::RangeSensor => "range",
            Self::VisionSensor => "vision",
            Self::MotorController => "motor",
        }
    }
}

/// Uniform driver contract. One instance owns exactly one physical
/// endpoint and is touched only from the poll task (plus `stop()` after
/// the poll task has exited).
///
/// # Lifecycle
///
/// 1. `connect()` - once at startup (idempotent; failure is logged, not fatal)
/// 2. `read()` - every poll tick while the e-stop flag is clear
/// 3. `emergency_stop()` - every poll tick while the e-stop flag is set
/// 4. `disconnect()` - at shutdown (safe to call when not connected)
///
/// # Timing Contracts
///
/// | Operation | Bound | Enforced by |
/// |-----------------|--------------------|-----------------------------|
/// | `connect()` | seconds (pre-loop) | caller patience |
/// | `read()` | one poll period | deadline guard in poll task |
/// | `emergency_stop()` | ≤ 100 ms | driver implementation |
/// | `disconnect()` | ≤ 1 s | driver implementation |
#[async_trait]
pub trait Device: Send {
    /// Device identifier used as the state-store key.
    fn id(&self) -> &str;

    /// Which variant this driver is.
    fn kind(&self) -> DeviceKind;

    /// Whether the underlying transport is open.
    fn is_connected(&self) -> bool;

    /// Open the underlying transport. Calling while already connected is
    /// a no-op returning success.
    async fn connect(&mut self) -> Result<(), ConnectError>;

    /// Release the transport. Always succeeds; safe to call when not
    /// connected.
    async fn disconnect(&mut self);

    /// Produce the latest reading. Failures are values — a driver must
    /// never panic past the orchestrator. The poll task wraps this call
    /// in a deadline guard, so a hung transport surfaces as
    /// [`ReadError::Timeout`] instead of stalling the tick.
    async fn read(&mut self) -> Result<DeviceReading, ReadError>;

    /// Drive the device into its safe state (motors: neutral signal;
    /// sensors: no-op). Must complete in a small bounded time.
    async fn emergency_stop(&mut self);
}
