// Output backend that renders commands into tracing events
//
// Stands in for the motor driver board when running on a host: every change of
// direction or duty is logged at info, repeated values at trace.

use tracing::{info, trace};

use super::render::{MotorSignal, led_duty, motor_signal, tone_hz};
use super::{MotorOutput, OutputError};
use crate::messages::{DebugChannel, MotorId};

#[derive(Debug, Default)]
pub struct TracingOutput {
    motors: [Option<MotorSignal>; 2], // [A, B]
    led: Option<u8>,
    tone: Option<u32>,
}

impl TracingOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MotorOutput for TracingOutput {
    fn set_motor(&mut self, motor: MotorId, speed: f32) -> Result<(), OutputError> {
        let signal = motor_signal(speed);
        let slot = match motor {
            MotorId::A => &mut self.motors[0],
            MotorId::B => &mut self.motors[1],
        };

        if slot.replace(signal) == Some(signal) {
            trace!("Motor {:?} unchanged", motor);
        } else {
            info!(
                "Motor {:?}: {:?} at duty {}/255",
                motor, signal.direction, signal.duty
            );
        }
        Ok(())
    }

    fn set_debug_intensity(&mut self, channel: DebugChannel, value: f32) -> Result<(), OutputError> {
        match channel {
            DebugChannel::Led => {
                let duty = led_duty(value);
                if self.led.replace(duty) != Some(duty) {
                    info!("LED duty {}/255", duty);
                }
            }
            DebugChannel::Tone => {
                let hz = tone_hz(value);
                if self.tone.replace(hz) != Some(hz) {
                    info!("Tone {} Hz", hz);
                }
            }
        }
        Ok(())
    }
}
