// Keyboard teleop: A/D steer, W forward trigger, S reverse trigger, space = button A,
// R/F trigger strength, Q quit
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};
use tracing::info;
use udp_drive_runtime::config::{ACK_TOKEN, HANDSHAKE_TOKEN, LISTENING_PORT};
use udp_drive_runtime::input::encode;
use udp_drive_runtime::messages::ControllerInput;

const TRIGGER_LEVELS: [f32; 3] = [0.3, 0.6, 1.0];
const SEND_HZ: u64 = 30;
const ACK_TIMEOUT: Duration = Duration::from_secs(5);
const INPUT_TIMEOUT_MS: u64 = 100; // Release all inputs after this much time with no key

/// Drive the robot from the keyboard
#[derive(Debug, Parser)]
#[command(about)]
struct Args {
    /// Robot IP address
    host: std::net::IpAddr,

    /// Robot control port
    #[arg(long, default_value_t = LISTENING_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let robot = SocketAddr::new(args.host, args.port);

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    handshake(&socket, robot).await?;

    info!("Controls: A/D=steer, W=forward, S=reverse, SPACE=mode, R/F=strength, Q=quit");
    info!("Strength: {}", TRIGGER_LEVELS[0]);

    enable_raw_mode()?;
    let result = run_teleop(&socket, robot).await;
    disable_raw_mode()?;

    result
}

async fn handshake(
    socket: &UdpSocket,
    robot: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Connecting to {}...", robot);
    socket.send_to(HANDSHAKE_TOKEN, robot).await?;

    let mut buf = [0u8; 16];
    let (len, from) = timeout(ACK_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .map_err(|_| "Connection timeout")??;

    if &buf[..len] != ACK_TOKEN {
        return Err(format!("Unexpected handshake reply from {}: {:?}", from, &buf[..len]).into());
    }
    info!("Connection established");
    Ok(())
}

async fn run_teleop(
    socket: &UdpSocket,
    robot: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut level: usize = 0;
    let mut tick = interval(Duration::from_millis(1000 / SEND_HZ));

    // Persistent controller state
    let mut state = released();
    let mut last_input = Instant::now();

    loop {
        tick.tick().await;

        // Drain pending key events without blocking the send rate
        while event::poll(Duration::ZERO)? {
            let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
                continue;
            };
            if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
                continue;
            }

            match code {
                // Steering
                KeyCode::Char('a') => state.left_joystick_x = -1.0,
                KeyCode::Char('d') => state.left_joystick_x = 1.0,

                // Triggers
                KeyCode::Char('w') => state.right_trigger = TRIGGER_LEVELS[level],
                KeyCode::Char('s') => state.left_trigger = TRIGGER_LEVELS[level],

                // Mode switch
                KeyCode::Char(' ') => state.button_a = true,

                // Strength
                KeyCode::Char('r') => {
                    level = (level + 1).min(TRIGGER_LEVELS.len() - 1);
                    info!("Strength: {}", TRIGGER_LEVELS[level]);
                    continue;
                }
                KeyCode::Char('f') => {
                    level = level.saturating_sub(1);
                    info!("Strength: {}", TRIGGER_LEVELS[level]);
                    continue;
                }

                // Quit
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),

                _ => continue,
            }
            last_input = Instant::now();
        }

        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            state = released();
        }

        // Always send at SEND_HZ
        socket.send_to(encode(&state).as_bytes(), robot).await?;
    }
}

fn released() -> ControllerInput {
    ControllerInput {
        left_joystick_x: 0.0,
        left_joystick_y: 0.0,
        button_a: false,
        left_trigger: 0.0,
        right_trigger: 0.0,
    }
}
