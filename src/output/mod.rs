// Motor & debug output capability
//
// Provides:
// - `MotorOutput`, the fire-and-forget sink the runtime drives every control cycle
// - Duty-cycle / tone rendering shared by the backends
// - A tracing backend, a JSON-lines backend and a recording backend

mod json;
mod log;
pub mod render;

use std::sync::{Arc, Mutex};

pub use json::JsonLinesOutput;
pub use log::TracingOutput;
pub use render::{Direction, MotorSignal, led_duty, motor_signal, tone_hz};

use crate::messages::{DebugChannel, DebugSignal, MotorCommand, MotorId};

/// Error types for output backends
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sink for motor speeds and debug intensities
///
/// Nothing is ever read back; each call replaces the previous value for that motor or channel.
pub trait MotorOutput {
    /// `speed` in [-1, 1], sign is the direction
    fn set_motor(&mut self, motor: MotorId, speed: f32) -> Result<(), OutputError>;

    /// `value` in [0, 1]
    fn set_debug_intensity(&mut self, channel: DebugChannel, value: f32) -> Result<(), OutputError>;
}

impl<T: MotorOutput + ?Sized> MotorOutput for Box<T> {
    fn set_motor(&mut self, motor: MotorId, speed: f32) -> Result<(), OutputError> {
        (**self).set_motor(motor, speed)
    }

    fn set_debug_intensity(&mut self, channel: DebugChannel, value: f32) -> Result<(), OutputError> {
        (**self).set_debug_intensity(channel, value)
    }
}

/// Push one control cycle's command and debug signal to `output`
pub fn apply<O: MotorOutput + ?Sized>(
    output: &mut O,
    command: &MotorCommand,
    signal: &DebugSignal,
) -> Result<(), OutputError> {
    output.set_motor(MotorId::A, command.motor_a)?;
    output.set_debug_intensity(DebugChannel::Led, signal.led)?;
    output.set_motor(MotorId::B, command.motor_b)?;
    output.set_debug_intensity(DebugChannel::Tone, signal.tone)?;
    Ok(())
}

/// One call made on a `MotorOutput`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputCall {
    Motor(MotorId, f32),
    Debug(DebugChannel, f32),
}

/// Backend that records every call, cloneable so a test can keep a handle
/// while the runtime owns the other
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    calls: Arc<Mutex<Vec<OutputCall>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls so far
    pub fn calls(&self) -> Vec<OutputCall> {
        self.lock().clone()
    }

    /// Most recent command sent to `motor`
    pub fn last_speed(&self, motor: MotorId) -> Option<f32> {
        self.lock().iter().rev().find_map(|call| match *call {
            OutputCall::Motor(id, speed) if id == motor => Some(speed),
            _ => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OutputCall>> {
        // A panic while holding the lock only happens in a failing test
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MotorOutput for RecordingOutput {
    fn set_motor(&mut self, motor: MotorId, speed: f32) -> Result<(), OutputError> {
        self.lock().push(OutputCall::Motor(motor, speed));
        Ok(())
    }

    fn set_debug_intensity(&mut self, channel: DebugChannel, value: f32) -> Result<(), OutputError> {
        self.lock().push(OutputCall::Debug(channel, value));
        Ok(())
    }
}
