//! Request-reply sessions over TCP
//!
//! One session carries exactly one outstanding request: the camera's
//! [`FrameTransport::send`] is a full round trip, and the server's
//! [`ReplyHandle`] is consumed on use and borrows the session, so a second
//! `recv` cannot start until the previous reply has gone out. That ordering
//! is what lets the camera treat the next reply as the verdict for the
//! last frame it sent, with no sequence numbers on the wire.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use crate::core::{EncodedFrame, PeerIdentity};
use crate::error::TransportError;
use crate::transport::wire::{read_reply, read_request, write_reply, write_request, FrameRequest};

/// Camera-side door to the network: one call, one full round trip.
#[async_trait::async_trait]
pub trait FrameTransport: Send {
    /// Send one encoded frame and block (bounded) for the raw verdict bytes.
    async fn send(
        &mut self,
        peer: &PeerIdentity,
        frame: &EncodedFrame,
    ) -> Result<Bytes, TransportError>;

    /// Tear down and re-establish the session after a failure.
    async fn reconnect(&mut self) -> Result<(), TransportError>;
}

/// Connection-oriented transport for the camera role.
///
/// Owns at most one `TcpStream`; any send failure poisons the connection
/// so the next attempt fails fast with [`TransportError::NotConnected`]
/// until `reconnect` succeeds.
pub struct TcpTransport {
    addr: String,
    reply_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Dial the server and return a connected transport
    pub async fn connect(
        addr: impl Into<String>,
        reply_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addr = addr.into();
        let stream = Self::dial(&addr).await?;
        Ok(Self {
            addr,
            reply_timeout,
            stream: Some(stream),
        })
    }

    async fn dial(addr: &str) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to {addr}");
        Ok(stream)
    }
}

#[async_trait::async_trait]
impl FrameTransport for TcpTransport {
    async fn send(
        &mut self,
        peer: &PeerIdentity,
        frame: &EncodedFrame,
    ) -> Result<Bytes, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let round_trip = async {
            write_request(stream, peer, &frame.jpeg).await?;
            read_reply(stream).await
        };

        match tokio::time::timeout(self.reply_timeout, round_trip).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                // The stream may be mid-message; it cannot be reused.
                self.stream = None;
                Err(e)
            }
            Err(_) => {
                self.stream = None;
                Err(TransportError::Timeout(self.reply_timeout))
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        self.stream = Some(Self::dial(&self.addr).await?);
        Ok(())
    }
}

/// Server-side listener for camera sessions.
pub struct FrameListener {
    listener: TcpListener,
}

impl FrameListener {
    /// Bind on all interfaces at the given port
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        Ok(Self { listener })
    }

    /// Bind on an explicit address (tests use 127.0.0.1:0)
    pub async fn bind_addr(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// The bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Wait for the next camera to connect
    pub async fn accept(&self) -> Result<PeerSession, TransportError> {
        let (stream, remote) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok(PeerSession { stream, remote })
    }
}

/// One connected camera session on the server side.
pub struct PeerSession {
    stream: TcpStream,
    remote: SocketAddr,
}

impl PeerSession {
    /// The remote socket address (logging only)
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Receive the next frame request.
    ///
    /// The returned [`ReplyHandle`] mutably borrows this session, so the
    /// caller must reply before it can receive again.
    pub async fn recv(&mut self) -> Result<(FrameRequest, ReplyHandle<'_>), TransportError> {
        let request = read_request(&mut self.stream).await?;
        Ok((
            request,
            ReplyHandle {
                stream: &mut self.stream,
            },
        ))
    }
}

/// Single-use reply channel for one received request.
///
/// Consumed by [`ReplyHandle::reply`], which makes double-reply a compile
/// error rather than a runtime protocol violation.
pub struct ReplyHandle<'a> {
    stream: &'a mut TcpStream,
}

impl ReplyHandle<'_> {
    /// Send the verdict for the request this handle was issued for
    pub async fn reply(self, verdict: &[u8]) -> Result<(), TransportError> {
        write_reply(self.stream, verdict).await
    }
}
