//! Downstream alert forwarding
//!
//! When the server's verdict is a detection, the camera forwards the raw
//! verdict bytes to a downstream actuator (an ESP32 relay in the reference
//! deployment) over UDP. Fire-and-forget: no delivery confirmation, and a
//! send failure never disturbs the stream loop.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Best-effort UDP notifier for the downstream actuator.
pub struct AlertSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl AlertSink {
    /// Bind an ephemeral local port aimed at the given target
    pub async fn new(target: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self { socket, target })
    }

    /// Forward an alert payload; errors are logged, never returned
    pub async fn notify(&self, payload: &[u8]) {
        match self.socket.send_to(payload, self.target).await {
            Ok(n) => debug!("Forwarded {n}-byte alert to {}", self.target),
            Err(e) => warn!("Alert forward to {} failed: {e}", self.target),
        }
    }
}
