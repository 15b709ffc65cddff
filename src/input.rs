// Control message parser
//
// Wire format: five ASCII whitespace separated fields
//   <joystick x> <joystick y> <button a> <left trigger> <right trigger>
// e.g. "0.25 -0.1 0 0.0 0.8"

use std::fmt;
use std::ops::RangeInclusive;

use crate::config::MAX_DATAGRAM_SIZE;
use crate::messages::ControllerInput;

const AXIS_RANGE: RangeInclusive<f32> = -1.0..=1.0;
const TRIGGER_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Fields of a control message, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    JoystickX,
    JoystickY,
    ButtonA,
    LeftTrigger,
    RightTrigger,
}

impl Field {
    pub const ORDER: [Field; 5] = [
        Field::JoystickX,
        Field::JoystickY,
        Field::ButtonA,
        Field::LeftTrigger,
        Field::RightTrigger,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::JoystickX => "joystick x",
            Field::JoystickY => "joystick y",
            Field::ButtonA => "button a",
            Field::LeftTrigger => "left trigger",
            Field::RightTrigger => "right trigger",
        };
        f.write_str(name)
    }
}

/// Why a control message was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed {field}: {reason}")]
    MalformedField { field: Field, reason: String },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: Field, value: f32 },

    #[error("Payload is not valid UTF-8")]
    InvalidUtf8,

    /// Datagram longer than `MAX_DATAGRAM_SIZE`; its tail may be cut off by the
    /// receive buffer, so no prefix of it is trusted
    #[error("Payload exceeds {limit} bytes")]
    Oversized { limit: usize },
}

/// Parse a raw datagram payload
pub fn parse_bytes(payload: &[u8]) -> Result<ControllerInput, ParseError> {
    if payload.len() > MAX_DATAGRAM_SIZE {
        return Err(ParseError::Oversized { limit: MAX_DATAGRAM_SIZE });
    }
    let text = std::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;
    parse(text)
}

/// Parse a control message
///
/// Total over all inputs: short, long or garbled messages produce an error, never a panic.
pub fn parse(payload: &str) -> Result<ControllerInput, ParseError> {
    let mut tokens = payload.split_ascii_whitespace();
    let mut next = |field: Field| {
        tokens.next().ok_or_else(|| ParseError::MalformedField {
            field,
            reason: "missing".to_string(),
        })
    };

    let [x, y, a, lt, rt] = Field::ORDER;
    let left_joystick_x = parse_ranged(next(x)?, x, AXIS_RANGE)?;
    let left_joystick_y = parse_ranged(next(y)?, y, AXIS_RANGE)?;
    let button_a = parse_button(next(a)?)?;
    let left_trigger = parse_ranged(next(lt)?, lt, TRIGGER_RANGE)?;
    let right_trigger = parse_ranged(next(rt)?, rt, TRIGGER_RANGE)?;

    if tokens.next().is_some() {
        return Err(ParseError::MalformedField {
            field: rt,
            reason: "unexpected extra field".to_string(),
        });
    }

    Ok(ControllerInput {
        left_joystick_x,
        left_joystick_y,
        button_a,
        left_trigger,
        right_trigger,
    })
}

/// Format `input` as a control message
pub fn encode(input: &ControllerInput) -> String {
    format!(
        "{} {} {} {} {}",
        input.left_joystick_x,
        input.left_joystick_y,
        u8::from(input.button_a),
        input.left_trigger,
        input.right_trigger
    )
}

fn parse_ranged(token: &str, field: Field, range: RangeInclusive<f32>) -> Result<f32, ParseError> {
    let value: f32 = token.parse().map_err(|_| ParseError::MalformedField {
        field,
        reason: format!("{token:?} is not a number"),
    })?;

    // NaN fails `contains`, so it is rejected here too
    if !range.contains(&value) {
        return Err(ParseError::OutOfRange { field, value });
    }
    Ok(value)
}

fn parse_button(token: &str) -> Result<bool, ParseError> {
    let value: i64 = token.parse().map_err(|_| ParseError::MalformedField {
        field: Field::ButtonA,
        reason: format!("{token:?} is not an integer"),
    })?;

    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ParseError::OutOfRange {
            field: Field::ButtonA,
            value: other as f32,
        }),
    }
}
