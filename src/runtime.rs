// Control loop: datagram -> session -> parser -> drive controller -> output
//
// One task owns the session, the drive state and the output, so every datagram is
// handled to completion before the next one is read.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::config::{ACK_TOKEN, LISTENING_PORT, MAX_DATAGRAM_SIZE};
use crate::drive::DriveController;
use crate::input::{self, ParseError};
use crate::messages::{DebugSignal, DriveMode, MotorCommand};
use crate::output::{self, MotorOutput, OutputError};
use crate::session::{Action, SessionError, SessionManager};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Result of handling one datagram
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    /// Dropped by the session manager
    Ignored(SessionError),
    /// Session established, `ACK_TOKEN` must go back to the sender
    Handshake,
    /// Admitted but undecodable, nothing was sent to the motors
    Rejected(ParseError),
    /// Motors and debug outputs updated
    Driven(MotorCommand, DebugSignal),
}

pub struct Runtime<O> {
    session: SessionManager,
    drive: DriveController,
    output: O,
}

impl<O: MotorOutput> Runtime<O> {
    pub fn new(output: O) -> Self {
        Self::with_controller(output, DriveController::new())
    }

    pub fn with_controller(output: O, drive: DriveController) -> Self {
        Self {
            session: SessionManager::new(),
            drive,
            output,
        }
    }

    /// Handle one datagram received at `now`
    ///
    /// Only output failures are errors; rejected datagrams are reported through `Cycle`.
    pub fn on_datagram(
        &mut self,
        sender: SocketAddr,
        payload: &[u8],
        now: Instant,
    ) -> Result<Cycle, OutputError> {
        let payload = match self.session.admit(sender, payload) {
            Action::Ignore(reason) => return Ok(Cycle::Ignored(reason)),
            Action::RespondHandshake => return Ok(Cycle::Handshake),
            Action::Forward(payload) => payload,
        };

        let input = match input::parse_bytes(payload) {
            Ok(input) => input,
            Err(e) => {
                warn!("Discarding control message from {}: {}", sender, e);
                return Ok(Cycle::Rejected(e));
            }
        };

        let (command, signal) = self.drive.on_input(&input, now);
        output::apply(&mut self.output, &command, &signal)?;
        Ok(Cycle::Driven(command, signal))
    }

    /// Zero both motors and debug channels
    pub fn stop(&mut self) -> Result<(), OutputError> {
        info!("Stopping all motors");
        output::apply(&mut self.output, &MotorCommand::stop(), &DebugSignal::off())
    }

    pub fn mode(&self) -> DriveMode {
        self.drive.mode()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Drop the current session so a new controller can connect
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}

/// Bind the listening port on `bind_ip` and run until Ctrl-C
pub async fn run<O: MotorOutput>(bind_ip: IpAddr, output: O) -> Result<(), RuntimeError> {
    let socket = UdpSocket::bind(SocketAddr::new(bind_ip, LISTENING_PORT)).await?;
    info!("Listening on {}", socket.local_addr()?);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    serve(socket, Runtime::new(output), shutdown).await?;
    Ok(())
}

/// Process datagrams from `socket` until `shutdown` completes, then stop the motors
///
/// Returns the runtime so callers can inspect its final state.
pub async fn serve<O, F>(
    socket: UdpSocket,
    mut runtime: Runtime<O>,
    shutdown: F,
) -> Result<Runtime<O>, RuntimeError>
where
    O: MotorOutput,
    F: Future<Output = ()>,
{
    // One spare byte so an oversized datagram shows up as len > MAX_DATAGRAM_SIZE
    // instead of being silently truncated to a parseable prefix
    let mut buf = [0u8; MAX_DATAGRAM_SIZE + 1];
    tokio::pin!(shutdown);

    loop {
        let (len, sender) = tokio::select! {
            _ = &mut shutdown => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    // e.g. ICMP port unreachable surfaced on the next read
                    warn!("Receive failed: {}", e);
                    continue;
                }
            },
        };

        let cycle = match runtime.on_datagram(sender, &buf[..len], Instant::now()) {
            Ok(cycle) => cycle,
            Err(e) => {
                warn!("Output failed: {}", e);
                if let Err(stop_err) = runtime.stop() {
                    warn!("Failed to stop motors: {}", stop_err);
                }
                return Err(e.into());
            }
        };

        match cycle {
            Cycle::Handshake => {
                if let Err(e) = socket.send_to(ACK_TOKEN, sender).await {
                    warn!("Failed to acknowledge {}: {}", sender, e);
                }
            }
            Cycle::Ignored(_) | Cycle::Rejected(_) | Cycle::Driven(..) => {}
        }
    }

    info!("Shutting down");
    runtime.stop()?;
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{DebugChannel, MotorId};
    use crate::output::{OutputCall, RecordingOutput};
    use std::time::Duration;
    use tokio::time::timeout;

    // Driver that faults on any non-zero speed but still accepts a stop
    struct FaultyOutput(RecordingOutput);

    impl MotorOutput for FaultyOutput {
        fn set_motor(&mut self, motor: MotorId, speed: f32) -> Result<(), OutputError> {
            if speed != 0.0 {
                return Err(std::io::Error::other("driver fault").into());
            }
            self.0.set_motor(motor, speed)
        }

        fn set_debug_intensity(&mut self, channel: DebugChannel, value: f32) -> Result<(), OutputError> {
            self.0.set_debug_intensity(channel, value)
        }
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn connected(recorder: &RecordingOutput, client: SocketAddr) -> Runtime<RecordingOutput> {
        let mut runtime = Runtime::new(recorder.clone());
        let cycle = runtime.on_datagram(client, b"INIT", Instant::now()).unwrap();
        assert_eq!(cycle, Cycle::Handshake);
        runtime
    }

    #[test]
    fn test_control_before_handshake_is_ignored() {
        let recorder = RecordingOutput::new();
        let mut runtime = Runtime::new(recorder.clone());

        let cycle = runtime
            .on_datagram(addr("10.0.0.2:4000"), b"0 0 0 0.5 0.5", Instant::now())
            .unwrap();
        assert!(matches!(cycle, Cycle::Ignored(SessionError::NoSession { .. })));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_authorized_control_drives_motors() {
        let recorder = RecordingOutput::new();
        let client = addr("10.0.0.2:4000");
        let mut runtime = connected(&recorder, client);

        let cycle = runtime
            .on_datagram(client, b"0.3 0.9 0 0.5 0.9", Instant::now())
            .unwrap();
        assert_eq!(
            cycle,
            Cycle::Driven(MotorCommand::new(0.5, 0.9), DebugSignal::new(0.5, 0.9))
        );
        assert_eq!(recorder.last_speed(MotorId::A), Some(0.5));
        assert_eq!(recorder.last_speed(MotorId::B), Some(0.9));
    }

    #[test]
    fn test_other_sender_has_no_side_effects() {
        let recorder = RecordingOutput::new();
        let mut runtime = connected(&recorder, addr("10.0.0.2:4000"));

        let intruder = addr("10.0.0.9:4000");
        let cycle = runtime
            .on_datagram(intruder, b"0 0 1 1 1", Instant::now())
            .unwrap();
        assert_eq!(
            cycle,
            Cycle::Ignored(SessionError::UnauthorizedSender { sender: intruder })
        );
        assert!(recorder.calls().is_empty());
        assert_eq!(runtime.mode(), DriveMode::Independent);
    }

    #[test]
    fn test_malformed_message_leaves_motors_alone() {
        let recorder = RecordingOutput::new();
        let client = addr("10.0.0.2:4000");
        let mut runtime = connected(&recorder, client);

        runtime.on_datagram(client, b"0 0 0 0.4 0.4", Instant::now()).unwrap();
        let before = recorder.calls();

        for payload in [&b"0.1 0.2 1"[..], b"x y z w v", b"", b"\xff\xfe", b"INIT"] {
            let cycle = runtime.on_datagram(client, payload, Instant::now()).unwrap();
            assert!(matches!(cycle, Cycle::Rejected(_)), "{payload:?}");
        }
        assert_eq!(recorder.calls(), before);
        // A rejected message carrying button A must not toggle the mode either
        assert_eq!(runtime.mode(), DriveMode::Independent);
    }

    #[test]
    fn test_mode_switch_through_pipeline() {
        let recorder = RecordingOutput::new();
        let client = addr("10.0.0.2:4000");
        let mut runtime = connected(&recorder, client);
        let t0 = Instant::now();

        runtime.on_datagram(client, b"0 0 1 0 0", t0).unwrap();
        assert_eq!(runtime.mode(), DriveMode::Differential);

        // Held button inside the debounce window
        runtime
            .on_datagram(client, b"0 0 1 0 0", t0 + Duration::from_millis(100))
            .unwrap();
        assert_eq!(runtime.mode(), DriveMode::Differential);

        let cycle = runtime
            .on_datagram(client, b"1 0 0 0.2 0.8", t0 + Duration::from_millis(150))
            .unwrap();
        assert_eq!(
            cycle,
            Cycle::Driven(MotorCommand::new(0.8, 0.0), DebugSignal::new(0.8, 0.0))
        );
    }

    #[test]
    fn test_stop_zeroes_everything() {
        let recorder = RecordingOutput::new();
        let mut runtime = Runtime::new(recorder.clone());
        runtime.stop().unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                OutputCall::Motor(MotorId::A, 0.0),
                OutputCall::Debug(DebugChannel::Led, 0.0),
                OutputCall::Motor(MotorId::B, 0.0),
                OutputCall::Debug(DebugChannel::Tone, 0.0),
            ]
        );
    }

    #[test]
    fn test_reset_session_accepts_new_controller() {
        let recorder = RecordingOutput::new();
        let mut runtime = connected(&recorder, addr("10.0.0.2:4000"));

        runtime.reset_session();
        let cycle = runtime
            .on_datagram(addr("10.0.0.3:4000"), b"INIT", Instant::now())
            .unwrap();
        assert_eq!(cycle, Cycle::Handshake);
        assert_eq!(runtime.session().authorized(), Some("10.0.0.3".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn test_oversized_datagram_is_rejected() {
        let recorder = RecordingOutput::new();
        let client = addr("10.0.0.2:4000");
        let mut runtime = connected(&recorder, client);

        let payload = format!("0 0 0 0 1e-{}1", "0".repeat(600));
        let cycle = runtime
            .on_datagram(client, payload.as_bytes(), Instant::now())
            .unwrap();
        assert_eq!(
            cycle,
            Cycle::Rejected(ParseError::Oversized { limit: MAX_DATAGRAM_SIZE })
        );
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_output_failure_stops_motors() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let recorder = RecordingOutput::new();
        let runtime = Runtime::new(FaultyOutput(recorder.clone()));
        let task = tokio::spawn(serve(server, runtime, std::future::pending::<()>()));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"INIT", server_addr).await.unwrap();
        let mut buf = [0u8; 16];
        timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .expect("no ACK")
            .unwrap();

        client.send_to(b"0 0 0 0.5 0.5", server_addr).await.unwrap();
        let result = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(matches!(result, Err(RuntimeError::Output(_))));

        // The failed cycle was followed by a full stop
        assert_eq!(
            recorder.calls(),
            vec![
                OutputCall::Motor(MotorId::A, 0.0),
                OutputCall::Debug(DebugChannel::Led, 0.0),
                OutputCall::Motor(MotorId::B, 0.0),
                OutputCall::Debug(DebugChannel::Tone, 0.0),
            ]
        );
    }
}
