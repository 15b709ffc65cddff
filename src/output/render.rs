// Speed / intensity to hardware-level values
//
// Mirrors an H-bridge driver: a direction bit plus an 8-bit PWM duty per motor,
// an 8-bit PWM for the LED and a frequency for the buzzer.

use serde::Serialize;

use crate::config::{PWM_FULL_SCALE, TONE_FULL_SCALE_HZ};

/// H-bridge direction pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward, // IN1 high, IN2 low
    Reverse, // IN1 low, IN2 high
}

/// Rendered motor output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorSignal {
    pub direction: Direction,
    pub duty: u8,
}

/// Convert a signed speed to direction + duty
///
/// Zero counts as reverse with zero duty, same as any non-positive speed.
pub fn motor_signal(speed: f32) -> MotorSignal {
    let direction = if speed > 0.0 {
        Direction::Forward
    } else {
        Direction::Reverse
    };
    MotorSignal {
        direction,
        duty: to_pwm(speed.abs()),
    }
}

/// LED brightness as 8-bit PWM
pub fn led_duty(value: f32) -> u8 {
    to_pwm(value)
}

/// Buzzer frequency in Hz
pub fn tone_hz(value: f32) -> u32 {
    // Float to int casts saturate, NaN becomes 0
    (TONE_FULL_SCALE_HZ * value.clamp(0.0, 1.0)) as u32
}

fn to_pwm(value: f32) -> u8 {
    (PWM_FULL_SCALE * value.clamp(0.0, 1.0)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_reverse() {
        assert_eq!(
            motor_signal(1.0),
            MotorSignal { direction: Direction::Forward, duty: 255 }
        );
        assert_eq!(
            motor_signal(-0.5),
            MotorSignal { direction: Direction::Reverse, duty: 127 }
        );
    }

    #[test]
    fn test_zero_speed_is_idle_reverse() {
        assert_eq!(
            motor_signal(0.0),
            MotorSignal { direction: Direction::Reverse, duty: 0 }
        );
    }

    #[test]
    fn test_debug_scaling() {
        assert_eq!(led_duty(0.0), 0);
        assert_eq!(led_duty(1.0), 255);
        assert_eq!(tone_hz(0.5), 10_000);
        assert_eq!(tone_hz(1.0), 20_000);
    }

    #[test]
    fn test_out_of_range_values_saturate() {
        assert_eq!(led_duty(3.0), 255);
        assert_eq!(tone_hz(-1.0), 0);
        assert_eq!(motor_signal(-7.0).duty, 255);
        assert_eq!(motor_signal(f32::NAN).duty, 0);
    }
}
