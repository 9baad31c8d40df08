//! Warden Server Binary
//!
//! Listens for camera sessions, classifies every received frame, and
//! answers each one with a verdict.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: port 5555, confidence 0.5, animal classes
//! warden-server
//!
//! # Alert on specific classes with a higher bar
//! WARDEN_CONF=0.7 WARDEN_CLASSES=person,dog warden-server
//!
//! # With FPS stats
//! warden-server --profile
//! ```

use anyhow::{Context, Result};
use tracing::{info, warn};
use warden::core::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PORT};
use warden::{ClassFilter, FrameListener, NullClassifier, Server, ServerConfig};

/// Server configuration from environment/args
struct Config {
    /// TCP port to listen on
    port: u16,
    /// Confidence threshold for detections
    confidence: f32,
    /// Class filter policy: "all", "animal", or a comma-separated list
    classes: String,
    /// Log FPS stats
    profile: bool,
}

impl Config {
    fn from_env() -> Self {
        let port: u16 = std::env::var("WARDEN_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let confidence: f32 = std::env::var("WARDEN_CONF")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);

        let classes =
            std::env::var("WARDEN_CLASSES").unwrap_or_else(|_| "animal".to_string());

        let args: Vec<String> = std::env::args().collect();
        let profile = args.iter().any(|arg| arg == "--profile");

        Self {
            port,
            confidence,
            classes,
            profile,
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

    let config = Config::from_env();
    let filter = ClassFilter::resolve(&config.classes);

    info!("Warden Server starting");
    info!("  Listening on 0.0.0.0:{}", config.port);
    info!("  Confidence threshold: {}", config.confidence);
    info!("  Alerting on classes: {:?}", filter.labels());

    // Failing to bind is the one fatal startup error; everything after
    // this point recovers in the loop.
    let listener = FrameListener::bind(config.port)
        .await
        .with_context(|| format!("Failed to bind listener on port {}", config.port))?;

    // No model backend is wired in yet; every frame comes back clean
    // until a Classifier implementation replaces this.
    warn!("No detection model configured, replying OK to every frame");
    let classifier = Box::new(NullClassifier);

    let mut server = Server::new(
        listener,
        classifier,
        filter,
        ServerConfig {
            confidence_threshold: config.confidence,
            profile: config.profile,
        },
    );

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
