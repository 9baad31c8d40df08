//! Warden - edge camera to inference host detection pipeline
//!
//! A camera on an edge device streams JPEG frames to a central server
//! over a strict request-reply protocol; the server runs a detection
//! model over each frame and answers with a compact verdict (`OK` or
//! `DETECTED:<label>`), which the camera can forward to a downstream
//! actuator.
//!
//! # Architecture
//!
//! Two roles built from the same crate:
//!
//! 1. **Camera** (`warden-camera`) - captures, encodes, sends, and reacts
//!    to verdicts; see [`streamer::Streamer`]
//! 2. **Server** (`warden-server`) - receives, classifies, filters, and
//!    replies; see [`server::Server`]
//!
//! The transport allows exactly one frame in flight per session, so the
//! next reply always belongs to the last frame sent.
//!
//! # Example - Camera
//!
//! ```ignore
//! use warden::{Streamer, StreamerConfig, SyntheticSource, TcpTransport};
//!
//! let transport = TcpTransport::connect("10.0.0.2:5555", timeout).await?;
//! let source = SyntheticSource::new(640, 480);
//! let mut streamer = Streamer::new(source, transport, None, StreamerConfig::default());
//! streamer.run().await;
//! ```
//!
//! # Example - Server
//!
//! ```ignore
//! use warden::{ClassFilter, FrameListener, NullClassifier, Server, ServerConfig};
//!
//! let listener = FrameListener::bind(5555).await?;
//! let filter = ClassFilter::resolve("animal");
//! let mut server = Server::new(listener, Box::new(NullClassifier), filter, ServerConfig::default());
//! server.run().await;
//! ```

// Shared types and protocol constants
pub mod core;

// Error kinds and their recovery policies
pub mod error;

// Frame acquisition (camera process, MJPEG splitting, synthetic fallback)
pub mod capture;

// JPEG compression
pub mod codec;

// Request-reply transport
pub mod transport;

// Detection model interface
pub mod classify;

// Alert class filtering
pub mod filter;

// Downstream alert forwarding
pub mod alert;

// Camera role loop
pub mod streamer;

// Server role loop
pub mod server;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use alert::AlertSink;
pub use capture::{CameraConfig, CameraSource, FrameSource, SyntheticSource};
pub use classify::{Classifier, Detection, NullClassifier};
pub use codec::{decode_jpeg, encode_jpeg};
pub use core::{EncodedFrame, Frame, PeerIdentity, Verdict};
pub use error::{CaptureError, EncodeError, InferenceError, TransportError};
pub use filter::ClassFilter;
pub use server::{Server, ServerConfig};
pub use streamer::{Streamer, StreamerConfig, StreamerStats};
pub use transport::{FrameListener, FrameRequest, FrameTransport, TcpTransport};
