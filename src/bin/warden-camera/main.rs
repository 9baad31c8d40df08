//! Warden Camera Binary
//!
//! Captures frames on the edge device, streams them to the server, and
//! forwards DETECTED verdicts to a downstream actuator over UDP.
//!
//! ## Usage
//!
//! ```bash
//! # Point at the server
//! export WARDEN_SERVER_ADDR=192.168.1.100:5555
//!
//! # Run with the Pi camera
//! warden-camera
//!
//! # Run with the synthetic test pattern (development)
//! warden-camera --test-source
//!
//! # Cap the frame rate and forward alerts
//! WARDEN_FPS=10 WARDEN_ALERT_ADDR=192.168.1.50:5005 warden-camera
//! ```

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{info, warn};
use warden::core::{
    CAMERA_WARMUP, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, DEFAULT_JPEG_QUALITY,
    DEFAULT_SEND_TIMEOUT, RECONNECT_BACKOFF_INITIAL, RECONNECT_BACKOFF_MAX,
};
use warden::{
    AlertSink, CameraConfig, CameraSource, FrameSource, PeerIdentity, Streamer, StreamerConfig,
    SyntheticSource, TcpTransport,
};

/// Camera configuration from environment/args
struct Config {
    /// Server address to stream to (host:port)
    server_addr: String,
    /// Capture width in pixels
    width: u32,
    /// Capture height in pixels
    height: u32,
    /// JPEG quality (0-100)
    quality: u8,
    /// Frame rate cap; 0 = uncapped (the server's round trip throttles)
    fps: u32,
    /// Name attached to every request
    peer: PeerIdentity,
    /// Downstream actuator address for alert forwarding
    alert_addr: Option<SocketAddr>,
    /// Use the synthetic test pattern instead of the camera
    test_source: bool,
    /// Log throughput stats
    profile: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        let server_addr = std::env::var("WARDEN_SERVER_ADDR")
            .context("WARDEN_SERVER_ADDR environment variable not set (host:port)")?;

        let width: u32 = std::env::var("WARDEN_WIDTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FRAME_WIDTH);

        let height: u32 = std::env::var("WARDEN_HEIGHT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FRAME_HEIGHT);

        let quality: u8 = std::env::var("WARDEN_QUALITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(|q: u8| q.min(100))
            .unwrap_or(DEFAULT_JPEG_QUALITY);

        let fps: u32 = std::env::var("WARDEN_FPS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let alert_addr = match std::env::var("WARDEN_ALERT_ADDR") {
            Ok(s) => Some(
                s.parse()
                    .context("Invalid WARDEN_ALERT_ADDR, expected host:port")?,
            ),
            Err(_) => None,
        };

        let args: Vec<String> = std::env::args().collect();
        let test_source = args.iter().any(|arg| arg == "--test-source");
        let profile = args.iter().any(|arg| arg == "--profile");

        Ok(Self {
            server_addr,
            width,
            height,
            quality,
            fps,
            peer: PeerIdentity::from_host(),
            alert_addr,
            test_source,
            profile,
        })
    }
}

/// Open the camera, falling back to the synthetic pattern when it is
/// unavailable so a missing sensor does not keep the device dark.
fn open_source(config: &Config) -> Box<dyn FrameSource> {
    if config.test_source {
        info!("Using synthetic test pattern");
        return Box::new(SyntheticSource::new(config.width, config.height));
    }

    match CameraSource::start(CameraConfig {
        width: config.width,
        height: config.height,
        fps: if config.fps > 0 { config.fps } else { 30 },
    }) {
        Ok(camera) => Box::new(camera),
        Err(e) => {
            warn!("Camera init failed ({e}), falling back to synthetic frames");
            Box::new(SyntheticSource::new(config.width, config.height))
        }
    }
}

/// Keep dialing until the server answers; the camera never gives up on a
/// server that is merely down.
async fn connect_with_retry(addr: &str) -> TcpTransport {
    let mut backoff = RECONNECT_BACKOFF_INITIAL;
    loop {
        match TcpTransport::connect(addr, DEFAULT_SEND_TIMEOUT).await {
            Ok(transport) => {
                info!("Connected to server at {addr}");
                return transport;
            }
            Err(e) => {
                warn!("Cannot reach server at {addr}: {e}; retrying in {backoff:?}");
                sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_BACKOFF_MAX);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warden=info".parse().unwrap()),
        )
        .init();

    let config = Config::from_env()?;

    info!("Warden Camera starting");
    info!("  Server: {}", config.server_addr);
    info!("  Frames: {}x{}, JPEG q={}", config.width, config.height, config.quality);
    if config.fps > 0 {
        info!("  FPS cap: {}", config.fps);
    }
    info!("  Peer name: {}", config.peer);

    let alert = match config.alert_addr {
        Some(addr) => {
            let sink = AlertSink::new(addr)
                .await
                .context("Failed to open alert socket")?;
            info!("  Forwarding alerts to {addr}");
            Some(sink)
        }
        None => None,
    };

    let source = open_source(&config);

    // Let the sensor settle before the first capture
    sleep(CAMERA_WARMUP).await;

    let streamer_config = StreamerConfig {
        peer: config.peer.clone(),
        quality: config.quality,
        fps_cap: config.fps,
        profile: config.profile,
        ..Default::default()
    };

    let run = async {
        let transport = connect_with_retry(&config.server_addr).await;
        let mut streamer = Streamer::new(source, transport, alert, streamer_config);
        streamer.run().await
    };

    tokio::select! {
        stats = run => {
            info!("Stream ended: {} frames sent, {} detections", stats.sent, stats.detections);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    // Dropping the source here releases the camera on every exit path

    Ok(())
}
