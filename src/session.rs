// Single-sender session handshake
//
// The first "INIT" datagram authorizes its sender's IP address. From then on only
// datagrams from that address reach the parser. There is no timeout; `reset` is the
// only way back to the unauthorized state.

use std::net::{IpAddr, SocketAddr};

use tracing::{debug, info};

use crate::config::HANDSHAKE_TOKEN;

/// Why a datagram was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No session established, expected handshake from {sender}")]
    NoSession { sender: SocketAddr },

    #[error("Datagram from unauthorized sender {sender}")]
    UnauthorizedSender { sender: SocketAddr },
}

/// What to do with a received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Drop silently
    Ignore(SessionError),
    /// Session just established, send the acknowledgment back to the sender
    RespondHandshake,
    /// Hand the payload to the parser
    Forward(&'a [u8]),
}

#[derive(Debug, Default)]
pub struct SessionManager {
    authorized: Option<IpAddr>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `payload` from `sender` is admitted
    pub fn admit<'a>(&mut self, sender: SocketAddr, payload: &'a [u8]) -> Action<'a> {
        match self.authorized {
            None if payload == HANDSHAKE_TOKEN => {
                self.authorized = Some(sender.ip());
                info!("Established connection with {}", sender.ip());
                Action::RespondHandshake
            }
            None => {
                debug!("Ignoring {} bytes from {} before handshake", payload.len(), sender);
                Action::Ignore(SessionError::NoSession { sender })
            }
            Some(ip) if ip == sender.ip() => Action::Forward(payload),
            Some(_) => {
                debug!("Dropping datagram from unauthorized sender {}", sender);
                Action::Ignore(SessionError::UnauthorizedSender { sender })
            }
        }
    }

    /// Address of the authorized controller, if a session exists
    pub fn authorized(&self) -> Option<IpAddr> {
        self.authorized
    }

    pub fn is_established(&self) -> bool {
        self.authorized.is_some()
    }

    /// Forget the authorized sender so the next handshake can claim the session
    pub fn reset(&mut self) {
        if let Some(ip) = self.authorized.take() {
            info!("Session with {} reset", ip);
        }
    }
}
