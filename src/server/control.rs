//! Control listener
//!
//! Receives parameter commands, applies them to the parameter store and
//! acknowledges each recognized command with `<KIND>_OK` or `<KIND>_ERROR`.
//! Unknown commands and undecodable datagrams get no reply.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::ValidationError;
use crate::params::ParameterStore;
use crate::protocol::command::{parse_control, CommandKind, ControlParse};
use crate::protocol::constants::TEXT_DATAGRAM_BUFFER;

use super::shutdown::RunFlag;

/// What a control datagram did
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// Command applied to the store
    Applied(CommandKind),
    /// Command recognized but rejected; the store is unchanged
    Rejected(CommandKind, ValidationError),
    /// Not a command we know
    Ignored,
    /// Payload was not UTF-8
    Undecodable,
}

impl ControlOutcome {
    /// Reply owed to the sender, if any
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            ControlOutcome::Applied(kind) => Some(kind.ok_token()),
            ControlOutcome::Rejected(kind, _) => Some(kind.error_token()),
            ControlOutcome::Ignored | ControlOutcome::Undecodable => None,
        }
    }
}

/// Control channel worker
pub struct ControlListener {
    socket: Arc<UdpSocket>,
    params: Arc<ParameterStore>,
    running: RunFlag,
    recv_timeout: Duration,
}

impl ControlListener {
    pub fn new(
        socket: Arc<UdpSocket>,
        params: Arc<ParameterStore>,
        running: RunFlag,
        recv_timeout: Duration,
    ) -> Self {
        Self {
            socket,
            params,
            running,
            recv_timeout,
        }
    }

    /// Process one datagram from `peer`
    pub async fn handle(&self, data: &[u8], peer: SocketAddr) -> ControlOutcome {
        let Ok(text) = std::str::from_utf8(data) else {
            tracing::warn!(peer = %peer, len = data.len(), "Undecodable control datagram");
            return ControlOutcome::Undecodable;
        };

        let command = match parse_control(text) {
            ControlParse::Command(command) => command,
            ControlParse::Invalid(kind, e) => {
                tracing::warn!(peer = %peer, command = %kind, error = %e, "Malformed control command");
                return ControlOutcome::Rejected(kind, e);
            }
            ControlParse::Ignored => {
                tracing::debug!(peer = %peer, "Ignoring unknown control command");
                return ControlOutcome::Ignored;
            }
        };

        let kind = command.kind();
        match self.params.apply(command).await {
            Ok(()) => ControlOutcome::Applied(kind),
            Err(e) => {
                tracing::warn!(peer = %peer, command = %kind, error = %e, "Control value rejected");
                ControlOutcome::Rejected(kind, e)
            }
        }
    }

    /// Receive until the run flag is cleared
    pub async fn run(self) {
        let mut buf = [0u8; TEXT_DATAGRAM_BUFFER];

        tracing::debug!("Control listener started");

        while self.running.is_running() {
            let (len, peer) =
                match tokio::time::timeout(self.recv_timeout, self.socket.recv_from(&mut buf))
                    .await
                {
                    Err(_) => continue,
                    Ok(Ok(received)) => received,
                    Ok(Err(e)) => {
                        if self.running.is_running() {
                            tracing::warn!(error = %e, "Control receive failed");
                        }
                        continue;
                    }
                };

            tracing::trace!(peer = %peer, len = len, "Control datagram");

            let outcome = self.handle(&buf[..len], peer).await;
            if let Some(reply) = outcome.reply() {
                if let Err(e) = self.socket.send_to(reply.as_bytes(), peer).await {
                    tracing::warn!(peer = %peer, error = %e, "Failed to send control reply");
                }
            }
        }

        tracing::debug!("Control listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Color;

    async fn listener() -> ControlListener {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        ControlListener::new(
            Arc::new(socket),
            Arc::new(ParameterStore::new()),
            RunFlag::new(),
            Duration::from_millis(20),
        )
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40001".parse().unwrap()
    }

    #[tokio::test]
    async fn test_color_ok() {
        let l = listener().await;

        let outcome = l.handle(b"COLOR:255,100,150", peer()).await;
        assert_eq!(outcome, ControlOutcome::Applied(CommandKind::Color));
        assert_eq!(outcome.reply(), Some("COLOR_OK"));
        assert_eq!(l.params.snapshot().await.color, Color::new(255, 100, 150));
    }

    #[tokio::test]
    async fn test_color_out_of_range_rejected() {
        let l = listener().await;
        let before = l.params.snapshot().await.color;

        let outcome = l.handle(b"COLOR:300,10,10", peer()).await;
        assert_eq!(outcome.reply(), Some("COLOR_ERROR"));
        assert_eq!(l.params.snapshot().await.color, before);
    }

    #[tokio::test]
    async fn test_malformed_color_rejected() {
        let l = listener().await;

        let outcome = l.handle(b"COLOR:1,2", peer()).await;
        assert!(matches!(
            outcome,
            ControlOutcome::Rejected(CommandKind::Color, ValidationError::FieldCount { .. })
        ));
        assert_eq!(outcome.reply(), Some("COLOR_ERROR"));
    }

    #[tokio::test]
    async fn test_intensity_clamped_and_acknowledged() {
        let l = listener().await;

        let outcome = l.handle(b"INTENSITY:1.5", peer()).await;
        assert_eq!(outcome.reply(), Some("INTENSITY_OK"));
        assert_eq!(l.params.snapshot().await.intensity, 1.0);

        let outcome = l.handle(b"INTENSITY:abc", peer()).await;
        assert_eq!(outcome.reply(), Some("INTENSITY_ERROR"));
        assert_eq!(l.params.snapshot().await.intensity, 1.0);
    }

    #[tokio::test]
    async fn test_blur_clamped_and_acknowledged() {
        let l = listener().await;

        assert_eq!(l.handle(b"BLUR:2", peer()).await.reply(), Some("BLUR_OK"));
        assert_eq!(l.params.snapshot().await.blur, 5);

        assert_eq!(l.handle(b"BLUR:x", peer()).await.reply(), Some("BLUR_ERROR"));
        assert_eq!(l.params.snapshot().await.blur, 5);
    }

    #[tokio::test]
    async fn test_lenient_values_are_clamped() {
        let l = listener().await;

        assert_eq!(l.handle(b"INTENSITY:0.5:x", peer()).await.reply(), Some("INTENSITY_OK"));
        assert_eq!(l.params.snapshot().await.intensity, 0.5);

        assert_eq!(l.handle(b"INTENSITY:nan", peer()).await.reply(), Some("INTENSITY_OK"));
        assert_eq!(l.params.snapshot().await.intensity, 1.0);

        assert_eq!(
            l.handle(b"BLUR:99999999999999999999", peer()).await.reply(),
            Some("BLUR_OK")
        );
        assert_eq!(l.params.snapshot().await.blur, 50);

        assert_eq!(l.handle(b"COLOR:1,2,3:4", peer()).await.reply(), Some("COLOR_OK"));
        assert_eq!(l.params.snapshot().await.color, Color::new(1, 2, 3));
    }

    #[tokio::test]
    async fn test_unknown_and_undecodable_are_silent() {
        let l = listener().await;
        let before = l.params.snapshot().await;

        let unknown = l.handle(b"SHARPEN:3", peer()).await;
        let garbage = l.handle(&[0xc3, 0x28], peer()).await;

        assert_eq!(unknown, ControlOutcome::Ignored);
        assert_eq!(garbage, ControlOutcome::Undecodable);
        assert_eq!(unknown.reply(), None);
        assert_eq!(garbage.reply(), None);
        assert_eq!(l.params.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_replies_over_socket() {
        let l = listener().await;
        let server_addr = l.socket.local_addr().unwrap();
        let params = Arc::clone(&l.params);
        let flag = l.running.clone();
        let handle = tokio::spawn(l.run());

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut buf = [0u8; 64];

        client.send_to(b"GAMMA:1", server_addr).await.unwrap();
        client.send_to(b"BLUR:20", server_addr).await.unwrap();
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        // The unknown command produced no reply, so the first one is for BLUR
        assert_eq!(&buf[..n], b"BLUR_OK");
        assert_eq!(params.snapshot().await.blur, 20);

        flag.stop();
        handle.await.unwrap();
    }
}
