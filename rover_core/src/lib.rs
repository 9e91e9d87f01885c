//! # Rover Control Core
//!
//! Orchestration and safety core for a small mobile robot: polls the
//! hardware peripherals (ranging sensor, vision sensor, motor controller)
//! at a fixed rate, merges their latest readings into one exclusion-guarded
//! state snapshot, and propagates an emergency stop to every actuator
//! within a bounded time.
//!
//! # Module Structure
//!
//! - [`device`] - `Device` trait: the uniform driver contract
//! - [`drivers`] - The three driver variants and their links (sim + serial)
//! - [`motor`] - Motor command state machine (dead-zone, clamping, watchdog)
//! - [`store`] - Shared state store with snapshot copies and error ring
//! - [`orchestrator`] - Poll task, persistence task, lifecycle, e-stop
//! - [`persist`] - Persistence sink trait and JSON-lines sink
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                            │
//! │  ┌────────────┐                        ┌───────────────────┐   │
//! │  │ poll task  │── read()/e-stop() ──►  │ Vec<Box<dyn       │   │
//! │  │ (N Hz)     │                        │     Device>>      │   │
//! │  └─────┬──────┘                        └───────────────────┘   │
//! │        │ update()                                              │
//! │        ▼                                                       │
//! │  ┌────────────┐   snapshot()   ┌──────────────┐                │
//! │  │ StateStore │ ◄───────────── │ persist task │──► sink        │
//! │  └────────────┘                │ (1 Hz)       │                │
//! │        ▲                       └──────────────┘                │
//! └────────┼───────────────────────────────────────────────────────┘
//!          │ snapshot()/get()/e-stop flag
//!   request-serving layer (external)
//! ```
//!
//! The request-serving layer never touches a driver: it reads snapshots
//! from the store, toggles the emergency-stop flag on the orchestrator,
//! and submits motor commands through a channel handle.

pub mod device;
pub mod drivers;
pub mod motor;
pub mod orchestrator;
pub mod persist;
pub mod store;

// Re-export key types for convenience
pub use crate::device::{Device, DeviceKind};
pub use crate::drivers::motor::MotorCommandHandle;
pub use crate::motor::{ActuatorSignal, MotorStateMachine};
pub use crate::orchestrator::Orchestrator;
pub use crate::persist::{JsonlSink, PersistenceSink};
pub use crate::store::{StateStore, SystemState};
