// Drive controller: mode state machine and trigger/steering mixing
//
// Independent:  motor A <- left trigger, motor B <- right trigger (forward only)
// Differential: the larger trigger sets speed and direction (right = forward,
//               left = reverse, ties reverse). Joystick x picks the side that keeps
//               full speed (x >= 0 -> A, x < 0 -> B); the other side runs at
//               primary * (1 - |x|).
//
// The debug LED always follows motor A's magnitude and the tone follows motor B's.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::MODE_SWITCH_DEBOUNCE;
use crate::messages::{ControllerInput, DebugSignal, DriveMode, MotorCommand};

/// Mode bit plus the time of the last accepted toggle
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveState {
    pub mode: DriveMode,
    pub last_switch: Option<Instant>, // None until the first toggle
}

pub struct DriveController {
    state: DriveState,
    debounce: Duration,
}

impl Default for DriveController {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveController {
    pub fn new() -> Self {
        Self::with_debounce(MODE_SWITCH_DEBOUNCE)
    }

    /// Create with a custom debounce window
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            state: DriveState::default(),
            debounce,
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.state.mode
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Process one decoded control message
    ///
    /// A debounced button A press flips the mode first; the returned command is
    /// computed under the (possibly new) mode.
    pub fn on_input(&mut self, input: &ControllerInput, now: Instant) -> (MotorCommand, DebugSignal) {
        if input.button_a {
            self.try_toggle(now);
        }

        let (command, signal) = compute(self.state.mode, input);
        debug!(
            "mode={:?} motor_a={:.3} motor_b={:.3}",
            self.state.mode, command.motor_a, command.motor_b
        );
        (command, signal)
    }

    fn try_toggle(&mut self, now: Instant) -> bool {
        let debounced = match self.state.last_switch {
            Some(last) => now.saturating_duration_since(last) > self.debounce,
            None => true,
        };
        if !debounced {
            return false;
        }

        self.state.last_switch = Some(now);
        self.state.mode = self.state.mode.toggled();
        info!("Switched to {:?} mode", self.state.mode);
        true
    }
}

/// Motor command and debug signal for `input` under `mode`, with no state change
pub fn compute(mode: DriveMode, input: &ControllerInput) -> (MotorCommand, DebugSignal) {
    match mode {
        DriveMode::Independent => independent(input),
        DriveMode::Differential => differential(input),
    }
}

fn independent(input: &ControllerInput) -> (MotorCommand, DebugSignal) {
    let command = MotorCommand::new(input.left_trigger, input.right_trigger);
    let signal = DebugSignal::new(input.left_trigger, input.right_trigger);
    (command, signal)
}

fn differential(input: &ControllerInput) -> (MotorCommand, DebugSignal) {
    let forward = input.right_trigger > input.left_trigger;
    let primary = if forward {
        input.right_trigger
    } else {
        input.left_trigger
    };
    let steer = input.left_joystick_x;
    let reduced = primary * (1.0 - steer.abs());

    // Unsigned magnitudes per motor
    let (a, b) = if steer >= 0.0 {
        (primary, reduced)
    } else {
        (reduced, primary)
    };

    let direction = if forward { 1.0 } else { -1.0 };
    let command = MotorCommand::new(direction * a, direction * b);
    let signal = DebugSignal::new(a, b);
    (command, signal)
}
