//! Motor command set.
//!
//! Commands are produced by the request-serving layer (dashboard, gamepad
//! bridge) and consumed by the motor controller driver. The set is closed:
//! the motor state machine matches exhaustively on it.

use serde::{Deserialize, Serialize};

/// A single command for the motor controller.
///
/// Drive commands carry a speed magnitude; `0` means "use the configured
/// current speed" (initially `initial_speed`, adjustable via `SetSpeed`).
/// Every command except `KeepAlive` resets the keep-alive watchdog
/// deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum MotorCommand {
    /// Drive both sides forward.
    Forward { speed: u16 },
    /// Drive both sides backward.
    Backward { speed: u16 },
    /// Rotate in place, counter-clockwise.
    TurnLeft { speed: u16 },
    /// Rotate in place, clockwise.
    TurnRight { speed: u16 },
    /// Stop motion (neutral signal on both sides).
    Stop,
    /// Reset the watchdog deadline without changing commanded motion.
    KeepAlive,
    /// Adjust the configured current speed (clamped into the configured
    /// `[min_speed, max_speed]`). Does not change motion state.
    SetSpeed { speed: u16 },
}

impl MotorCommand {
    /// Whether this command only refreshes the watchdog.
    #[inline]
    pub fn is_keep_alive(&self) -> bool {
        matches!(self, Self::KeepAlive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serde_wire_format() {
        let json = serde_json::to_string(&MotorCommand::Forward { speed: 300 }).unwrap();
        assert_eq!(json, r#"{"cmd":"forward","speed":300}"#);

        let cmd: MotorCommand = serde_json::from_str(r#"{"cmd":"keep_alive"}"#).unwrap();
        assert!(cmd.is_keep_alive());
    }
}
