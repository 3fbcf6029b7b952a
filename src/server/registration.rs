//! Registration listener
//!
//! Receives join/leave datagrams and updates the client registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::protocol::command::RegistrationMessage;
use crate::protocol::constants::{MSG_REGISTERED, TEXT_DATAGRAM_BUFFER};
use crate::registry::ClientRegistry;

use super::shutdown::RunFlag;

/// What a registration datagram did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Sender added to the registry
    Registered,
    /// Sender was already registered
    AlreadyRegistered,
    /// Sender removed (or was not present)
    Unregistered,
    /// Not a registration message
    Ignored,
    /// Payload was not UTF-8
    Undecodable,
}

impl RegistrationOutcome {
    /// Reply owed to the sender, if any
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            RegistrationOutcome::Registered | RegistrationOutcome::AlreadyRegistered => {
                Some(MSG_REGISTERED)
            }
            _ => None,
        }
    }
}

/// Registration channel worker
pub struct RegistrationListener {
    socket: Arc<UdpSocket>,
    registry: Arc<ClientRegistry>,
    running: RunFlag,
    recv_timeout: Duration,
}

impl RegistrationListener {
    pub fn new(
        socket: Arc<UdpSocket>,
        registry: Arc<ClientRegistry>,
        running: RunFlag,
        recv_timeout: Duration,
    ) -> Self {
        Self {
            socket,
            registry,
            running,
            recv_timeout,
        }
    }

    /// Process one datagram from `peer`
    pub async fn handle(&self, data: &[u8], peer: SocketAddr) -> RegistrationOutcome {
        let Ok(text) = std::str::from_utf8(data) else {
            tracing::warn!(peer = %peer, len = data.len(), "Undecodable registration datagram");
            return RegistrationOutcome::Undecodable;
        };

        match RegistrationMessage::parse(text) {
            Some(RegistrationMessage::Register) => {
                if self.registry.register(peer).await {
                    RegistrationOutcome::Registered
                } else {
                    RegistrationOutcome::AlreadyRegistered
                }
            }
            Some(RegistrationMessage::Unregister) => {
                self.registry.unregister(&peer).await;
                RegistrationOutcome::Unregistered
            }
            None => {
                tracing::debug!(peer = %peer, "Ignoring unknown registration message");
                RegistrationOutcome::Ignored
            }
        }
    }

    /// Receive until the run flag is cleared
    pub async fn run(self) {
        let mut buf = [0u8; TEXT_DATAGRAM_BUFFER];

        tracing::debug!("Registration listener started");

        while self.running.is_running() {
            let (len, peer) =
                match tokio::time::timeout(self.recv_timeout, self.socket.recv_from(&mut buf))
                    .await
                {
                    Err(_) => continue,
                    Ok(Ok(received)) => received,
                    Ok(Err(e)) => {
                        if self.running.is_running() {
                            tracing::warn!(error = %e, "Registration receive failed");
                        }
                        continue;
                    }
                };

            tracing::trace!(peer = %peer, len = len, "Registration datagram");

            let outcome = self.handle(&buf[..len], peer).await;
            if let Some(reply) = outcome.reply() {
                if let Err(e) = self.socket.send_to(reply.as_bytes(), peer).await {
                    tracing::warn!(peer = %peer, error = %e, "Failed to send registration reply");
                }
            }
        }

        tracing::debug!("Registration listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn listener() -> RegistrationListener {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        RegistrationListener::new(
            Arc::new(socket),
            Arc::new(ClientRegistry::new()),
            RunFlag::new(),
            Duration::from_millis(20),
        )
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_register_then_reregister() {
        let l = listener().await;

        let first = l.handle(b"REGISTER", peer()).await;
        let second = l.handle(b"REGISTER", peer()).await;

        assert_eq!(first, RegistrationOutcome::Registered);
        assert_eq!(second, RegistrationOutcome::AlreadyRegistered);
        assert_eq!(first.reply(), Some("REGISTERED"));
        assert_eq!(second.reply(), Some("REGISTERED"));
        assert_eq!(l.registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unregister() {
        let l = listener().await;
        l.handle(b"REGISTER", peer()).await;

        let outcome = l.handle(b"UNREGISTER", peer()).await;
        assert_eq!(outcome, RegistrationOutcome::Unregistered);
        assert_eq!(outcome.reply(), None);
        assert!(l.registry.is_empty().await);

        // Unknown sender leaving is fine
        assert_eq!(
            l.handle(b"UNREGISTER", peer()).await,
            RegistrationOutcome::Unregistered
        );
    }

    #[tokio::test]
    async fn test_ignores_garbage() {
        let l = listener().await;

        assert_eq!(l.handle(b"HELLO", peer()).await, RegistrationOutcome::Ignored);
        assert_eq!(
            l.handle(&[0xff, 0xfe, 0x00], peer()).await,
            RegistrationOutcome::Undecodable
        );
        assert!(l.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_run_exits_after_stop() {
        let l = listener().await;
        let flag = l.running.clone();

        let handle = tokio::spawn(l.run());
        flag.stop();

        let joined = tokio_test::assert_ok!(
            tokio::time::timeout(Duration::from_secs(1), handle).await
        );
        assert!(joined.is_ok());
    }
}
