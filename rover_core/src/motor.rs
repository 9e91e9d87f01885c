//! Motor command state machine.
//!
//! Converts [`MotorCommand`]s into clamped two-sided actuator signals with
//! dead-zone compensation, and enforces the keep-alive watchdog: loss of
//! the control channel forces a transition to `Stopped` and a neutral
//! signal, independent of the request-serving layer's liveness.
//!
//! The machine is pure and time-injected — every method takes the current
//! `Instant` — so watchdog behavior is tested by advancing simulated time.

use rover_common::command::MotorCommand;
use rover_common::config::MotorConfig;
use rover_common::reading::MotorStateKind;
use std::time::Instant;

/// A pair of per-side drive values, always within
/// `[signal_min, signal_max]`. Recomputed on every command or watchdog
/// tick; no independent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSignal {
    /// Left-side drive value.
    pub left: u16,
    /// Right-side drive value.
    pub right: u16,
}

/// Commanded motion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

/// Motion state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    /// Neutral signal on both sides.
    Stopped,
    /// Driving with the given direction and effective speed.
    Moving { direction: Direction, speed: u16 },
}

/// Motor command state machine.
///
/// Numeric policy: neutral/center signal plus a signed per-side offset of
/// magnitude `max(speed, dead_zone_offset)`, clamped to
/// `[signal_min, signal_max]`. Every non-`KeepAlive` command resets the
/// watchdog deadline to `now + keep_alive_timeout`.
#[derive(Debug)]
pub struct MotorStateMachine {
    config: MotorConfig,
    state: MotorState,
    /// Speed used by drive commands that carry no explicit magnitude.
    current_speed: u16,
    /// Watchdog deadline; `None` until the first command arrives.
    deadline: Option<Instant>,
    /// Last signal handed to the actuator.
    last_signal: ActuatorSignal,
}

impl MotorStateMachine {
    /// Create a machine in the `Stopped` state.
    pub fn new(config: &MotorConfig) -> Self {
        let neutral = ActuatorSignal {
            left: config.signal_neutral,
            right: config.signal_neutral,
        };
        Self {
            config: config.clone(),
            state: MotorState::Stopped,
            current_speed: config.initial_speed,
            deadline: None,
            last_signal: neutral,
        }
    }

    /// Current motion state.
    #[inline]
    pub const fn state(&self) -> MotorState {
        self.state
    }

    /// Motion state in reading-payload form.
    #[inline]
    pub const fn state_kind(&self) -> MotorStateKind {
        match self.state {
            MotorState::Stopped => MotorStateKind::Stopped,
            MotorState::Moving { .. } => MotorStateKind::Moving,
        }
    }

    /// Last signal handed to the actuator.
    #[inline]
    pub const fn last_signal(&self) -> ActuatorSignal {
        self.last_signal
    }

    /// Currently configured default speed.
    #[inline]
    pub const fn current_speed(&self) -> u16 {
        self.current_speed
    }

    /// Neutral signal for this configuration.
    #[inline]
    pub const fn neutral(&self) -> ActuatorSignal {
        ActuatorSignal {
            left: self.config.signal_neutral,
            right: self.config.signal_neutral,
        }
    }

    /// Apply one command.
    ///
    /// Returns the signal to emit to the actuator, or `None` when the
    /// command changes no output (`KeepAlive`, `SetSpeed`).
    pub fn apply(&mut self, command: &MotorCommand, now: Instant) -> Option<ActuatorSignal> {
        if !command.is_keep_alive() {
            self.deadline = Some(now + self.config.keep_alive_timeout());
        }

        match *command {
            MotorCommand::KeepAlive => {
                self.deadline = Some(now + self.config.keep_alive_timeout());
                None
            }
            MotorCommand::SetSpeed { speed } => {
                self.current_speed = speed.clamp(self.config.min_speed, self.config.max_speed);
                None
            }
            MotorCommand::Stop => {
                self.state = MotorState::Stopped;
                self.last_signal = self.neutral();
                Some(self.last_signal)
            }
            MotorCommand::Forward { speed } => self.drive(Direction::Forward, speed),
            MotorCommand::Backward { speed } => self.drive(Direction::Backward, speed),
            MotorCommand::TurnLeft { speed } => self.drive(Direction::TurnLeft, speed),
            MotorCommand::TurnRight { speed } => self.drive(Direction::TurnRight, speed),
        }
    }

    /// Check the watchdog. If the deadline has passed while moving, force
    /// `Stopped` and return the neutral signal to emit.
    pub fn check_watchdog(&mut self, now: Instant) -> Option<ActuatorSignal> {
        let expired = matches!(self.state, MotorState::Moving { .. })
            && self.deadline.is_some_and(|d| now >= d);
        if !expired {
            return None;
        }

        self.state = MotorState::Stopped;
        self.deadline = None;
        self.last_signal = self.neutral();
        Some(self.last_signal)
    }

    /// Force `Stopped` unconditionally (emergency stop path). Returns the
    /// neutral signal to emit.
    pub fn force_stop(&mut self) -> ActuatorSignal {
        self.state = MotorState::Stopped;
        self.deadline = None;
        self.last_signal = self.neutral();
        self.last_signal
    }

    fn drive(&mut self, direction: Direction, speed: u16) -> Option<ActuatorSignal> {
        // 0 means "use the configured current speed"; explicit magnitudes
        // are clamped into the speed bounds before the dead-zone floor.
        let magnitude = if speed == 0 {
            self.current_speed
        } else {
            speed.clamp(self.config.min_speed, self.config.max_speed)
        };
        let offset = i32::from(magnitude.max(self.config.dead_zone_offset));

        let (left, right) = match direction {
            Direction::Forward => (offset, offset),
            Direction::Backward => (-offset, -offset),
            Direction::TurnLeft => (-offset, offset),
            Direction::TurnRight => (offset, -offset),
        };

        let signal = ActuatorSignal {
            left: self.clamp_signal(i32::from(self.config.signal_neutral) + left),
            right: self.clamp_signal(i32::from(self.config.signal_neutral) + right),
        };

        self.state = MotorState::Moving {
            direction,
            speed: magnitude,
        };
        self.last_signal = signal;
        Some(signal)
    }

    fn clamp_signal(&self, value: i32) -> u16 {
        value.clamp(
            i32::from(self.config.signal_min),
            i32::from(self.config.signal_max),
        ) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn machine() -> MotorStateMachine {
        MotorStateMachine::new(&MotorConfig::default())
    }

    #[test]
    fn forward_adds_symmetric_offset() {
        let mut m = machine();
        let s = m
            .apply(&MotorCommand::Forward { speed: 300 }, Instant::now())
            .unwrap();
        assert_eq!(s, ActuatorSignal { left: 1800, right: 1800 });
        assert!(matches!(m.state(), MotorState::Moving { .. }));
    }

    #[test]
    fn backward_mirrors_forward() {
        let mut m = machine();
        let s = m
            .apply(&MotorCommand::Backward { speed: 300 }, Instant::now())
            .unwrap();
        assert_eq!(s, ActuatorSignal { left: 1200, right: 1200 });
    }

    #[test]
    fn turns_drive_sides_opposite() {
        let mut m = machine();
        let now = Instant::now();
        let left = m.apply(&MotorCommand::TurnLeft { speed: 200 }, now).unwrap();
        assert_eq!(left, ActuatorSignal { left: 1300, right: 1700 });
        let right = m.apply(&MotorCommand::TurnRight { speed: 200 }, now).unwrap();
        assert_eq!(right, ActuatorSignal { left: 1700, right: 1300 });
    }

    #[test]
    fn dead_zone_floor_applied() {
        // min_speed (50) is below the dead-zone offset (60): a crawl
        // request must emit the dead-zone offset, never a motion-less
        // sub-threshold signal.
        let mut m = machine();
        let s = m
            .apply(&MotorCommand::Forward { speed: 50 }, Instant::now())
            .unwrap();
        assert_eq!(s, ActuatorSignal { left: 1560, right: 1560 });
    }

    #[test]
    fn signals_clamped_to_safe_range() {
        let mut config = MotorConfig::default();
        config.max_speed = 800; // wider than the 500-count headroom
        let mut m = MotorStateMachine::new(&config);
        let s = m
            .apply(&MotorCommand::Forward { speed: 800 }, Instant::now())
            .unwrap();
        assert_eq!(s, ActuatorSignal { left: 2000, right: 2000 });
        let s = m
            .apply(&MotorCommand::Backward { speed: 800 }, Instant::now())
            .unwrap();
        assert_eq!(s, ActuatorSignal { left: 1000, right: 1000 });
    }

    #[test]
    fn zero_speed_uses_configured_current_speed() {
        let mut m = machine();
        let now = Instant::now();
        assert!(m.apply(&MotorCommand::SetSpeed { speed: 350 }, now).is_none());
        let s = m.apply(&MotorCommand::Forward { speed: 0 }, now).unwrap();
        assert_eq!(s, ActuatorSignal { left: 1850, right: 1850 });
    }

    #[test]
    fn set_speed_clamps_into_bounds() {
        let mut m = machine();
        let now = Instant::now();
        m.apply(&MotorCommand::SetSpeed { speed: 5000 }, now);
        assert_eq!(m.current_speed(), 450);
        m.apply(&MotorCommand::SetSpeed { speed: 1 }, now);
        assert_eq!(m.current_speed(), 50);
        // No state change either way.
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn stop_returns_neutral() {
        let mut m = machine();
        let now = Instant::now();
        m.apply(&MotorCommand::Forward { speed: 300 }, now);
        let s = m.apply(&MotorCommand::Stop, now).unwrap();
        assert_eq!(s, m.neutral());
        assert_eq!(m.state(), MotorState::Stopped);
    }

    // ─── Watchdog (simulated time) ──────────────────────────────────

    #[test]
    fn watchdog_expires_without_input() {
        let mut m = machine();
        let t0 = Instant::now();
        m.apply(&MotorCommand::Forward { speed: 300 }, t0);

        // Just before the deadline: still moving.
        let before = t0 + Duration::from_millis(999);
        assert!(m.check_watchdog(before).is_none());
        assert!(matches!(m.state(), MotorState::Moving { .. }));

        // keep_alive_timeout + 50 ms with no input: forced stop, neutral.
        let after = t0 + Duration::from_millis(1050);
        let s = m.check_watchdog(after).expect("watchdog should fire");
        assert_eq!(s, ActuatorSignal { left: 1500, right: 1500 });
        assert_eq!(m.state(), MotorState::Stopped);

        // Idempotent once stopped.
        assert!(m.check_watchdog(after + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn keep_alive_defers_watchdog() {
        let mut m = machine();
        let t0 = Instant::now();
        m.apply(&MotorCommand::Forward { speed: 300 }, t0);

        let t1 = t0 + Duration::from_millis(800);
        assert!(m.apply(&MotorCommand::KeepAlive, t1).is_none());

        // Old deadline has passed, refreshed one has not.
        let t2 = t0 + Duration::from_millis(1200);
        assert!(m.check_watchdog(t2).is_none());
        assert!(matches!(m.state(), MotorState::Moving { .. }));

        let t3 = t1 + Duration::from_millis(1001);
        assert!(m.check_watchdog(t3).is_some());
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn watchdog_never_fires_while_stopped() {
        let mut m = machine();
        let t0 = Instant::now();
        // No command ever received.
        assert!(m.check_watchdog(t0 + Duration::from_secs(60)).is_none());

        // SetSpeed arms the deadline but the machine is stopped; expiry
        // must not emit anything.
        m.apply(&MotorCommand::SetSpeed { speed: 100 }, t0);
        assert!(m.check_watchdog(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn force_stop_resets_state_and_deadline() {
        let mut m = machine();
        let t0 = Instant::now();
        m.apply(&MotorCommand::Forward { speed: 300 }, t0);
        let s = m.force_stop();
        assert_eq!(s, m.neutral());
        assert_eq!(m.state(), MotorState::Stopped);
        assert_eq!(m.last_signal(), m.neutral());
    }
}
