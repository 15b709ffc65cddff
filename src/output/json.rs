// Output backend that writes one JSON object per call
//
// e.g. {"kind":"motor","motor":"a","speed":0.8,"direction":"forward","duty":204}
// Useful for piping into another process that owns the hardware.

use std::io::Write;

use serde::Serialize;

use super::render::{Direction, led_duty, motor_signal, tone_hz};
use super::{MotorOutput, OutputError};
use crate::messages::{DebugChannel, MotorId};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum OutputEvent {
    Motor {
        motor: MotorId,
        speed: f32,
        direction: Direction,
        duty: u8,
    },
    Led {
        value: f32,
        duty: u8,
    },
    Tone {
        value: f32,
        hz: u32,
    },
}

pub struct JsonLinesOutput<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, event: &OutputEvent) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> MotorOutput for JsonLinesOutput<W> {
    fn set_motor(&mut self, motor: MotorId, speed: f32) -> Result<(), OutputError> {
        let signal = motor_signal(speed);
        self.emit(&OutputEvent::Motor {
            motor,
            speed,
            direction: signal.direction,
            duty: signal.duty,
        })
    }

    fn set_debug_intensity(&mut self, channel: DebugChannel, value: f32) -> Result<(), OutputError> {
        let event = match channel {
            DebugChannel::Led => OutputEvent::Led {
                value,
                duty: led_duty(value),
            },
            DebugChannel::Tone => OutputEvent::Tone {
                value,
                hz: tone_hz(value),
            },
        };
        self.emit(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_writes_one_object_per_line() {
        let mut output = JsonLinesOutput::new(Vec::new());
        output.set_motor(MotorId::A, -0.5).unwrap();
        output.set_debug_intensity(DebugChannel::Tone, 1.0).unwrap();

        let text = String::from_utf8(output.into_inner()).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "motor");
        assert_eq!(lines[0]["motor"], "a");
        assert_eq!(lines[0]["direction"], "reverse");
        assert_eq!(lines[0]["duty"], 127);
        assert_eq!(lines[1]["kind"], "tone");
        assert_eq!(lines[1]["hz"], 20_000);
    }
}
