//! Protocol constants for Warden

use std::time::Duration;

/// Default TCP port the server listens on
pub const DEFAULT_PORT: u16 = 5555;

/// Default capture width in pixels
pub const DEFAULT_FRAME_WIDTH: u32 = 640;

/// Default capture height in pixels
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Default JPEG quality (0-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Default confidence threshold for detections
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Maximum request message size (16 MB, generous for large high-quality frames)
pub const MAX_REQUEST_SIZE: usize = 16 * 1024 * 1024;

/// Maximum reply message size (verdicts are tiny)
pub const MAX_REPLY_SIZE: usize = 1024;

/// Maximum peer name length on the wire
pub const MAX_PEER_NAME_LEN: usize = 255;

/// How long the camera waits for a verdict before declaring the round trip dead
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Initial delay before redialing after a transport failure
pub const RECONNECT_BACKOFF_INITIAL: Duration = Duration::from_millis(500);

/// Upper bound on the reconnect backoff
pub const RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(8);

/// Log an OK liveness line only every this many frames
pub const LIVENESS_LOG_INTERVAL: u64 = 30;

/// Settle time between camera start and the first capture
pub const CAMERA_WARMUP: Duration = Duration::from_secs(1);
