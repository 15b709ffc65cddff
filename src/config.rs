// Ports, protocol tokens, timing and output scaling
use std::time::Duration;

// UDP port the runtime listens on
pub const LISTENING_PORT: u16 = 8888;

// Handshake tokens
pub const HANDSHAKE_TOKEN: &[u8] = b"INIT"; // client -> runtime
pub const ACK_TOKEN: &[u8] = b"ACK"; // runtime -> client

// Minimum time between two accepted mode toggles (button A)
pub const MODE_SWITCH_DEBOUNCE: Duration = Duration::from_millis(350);

// Control messages are a few dozen bytes; anything longer is rejected whole
pub const MAX_DATAGRAM_SIZE: usize = 512;

// Output scaling
pub const PWM_FULL_SCALE: f32 = 255.0;
pub const TONE_FULL_SCALE_HZ: f32 = 20_000.0;
