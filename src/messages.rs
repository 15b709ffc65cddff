// Data types shared by the parser, the drive controller and the output backends

use serde::{Deserialize, Serialize};

/// Decoded controller state carried by one control datagram
///
/// Built only by the input parser, which guarantees the axis and trigger ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerInput {
    pub left_joystick_x: f32, // [-1, 1], steering bias
    pub left_joystick_y: f32, // [-1, 1], unused by the drive logic
    pub button_a: bool,
    pub left_trigger: f32,  // [0, 1]
    pub right_trigger: f32, // [0, 1]
}

/// Driving mode toggled with button A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Left trigger drives motor A, right trigger drives motor B
    #[default]
    Independent,
    /// Dominant trigger sets direction and speed, joystick x steers
    Differential,
}

impl DriveMode {
    pub fn toggled(self) -> Self {
        match self {
            DriveMode::Independent => DriveMode::Differential,
            DriveMode::Differential => DriveMode::Independent,
        }
    }
}

/// The two drive motors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorId {
    A, // left
    B, // right
}

/// Debug output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugChannel {
    Led,  // follows motor A
    Tone, // follows motor B
}

/// Signed per-motor speeds in [-1, 1]
///
/// Sign is the rotation direction, magnitude the duty-cycle fraction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorCommand {
    pub motor_a: f32,
    pub motor_b: f32,
}

impl MotorCommand {
    /// Build a command, clamping both speeds into [-1, 1]
    pub fn new(motor_a: f32, motor_b: f32) -> Self {
        Self {
            motor_a: clamp_unit(motor_a, -1.0),
            motor_b: clamp_unit(motor_b, -1.0),
        }
    }

    pub fn stop() -> Self {
        Self::default()
    }

    pub fn speed(&self, motor: MotorId) -> f32 {
        match motor {
            MotorId::A => self.motor_a,
            MotorId::B => self.motor_b,
        }
    }
}

/// LED and tone intensities in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DebugSignal {
    pub led: f32,
    pub tone: f32,
}

impl DebugSignal {
    /// Build a signal, clamping both intensities into [0, 1]
    pub fn new(led: f32, tone: f32) -> Self {
        Self {
            led: clamp_unit(led, 0.0),
            tone: clamp_unit(tone, 0.0),
        }
    }

    pub fn off() -> Self {
        Self::default()
    }

    pub fn intensity(&self, channel: DebugChannel) -> f32 {
        match channel {
            DebugChannel::Led => self.led,
            DebugChannel::Tone => self.tone,
        }
    }
}

// NaN collapses to zero so nothing unbounded ever reaches the output
fn clamp_unit(value: f32, min: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, 1.0)
    }
}
