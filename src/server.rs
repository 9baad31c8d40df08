//! Server-side detection loop
//!
//! Accepts one camera session at a time and, for every received frame,
//! produces exactly one verdict: decode, classify, filter, reply. A bad
//! frame or a classifier failure downgrades to OK instead of stalling the
//! session, since a wedged server would wedge every camera pointed at it.

use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use crate::classify::Classifier;
use crate::codec::decode_jpeg;
use crate::core::{Verdict, DEFAULT_CONFIDENCE_THRESHOLD, LIVENESS_LOG_INTERVAL};
use crate::error::TransportError;
use crate::filter::ClassFilter;
use crate::transport::{FrameListener, FrameRequest, PeerSession};

/// Detection server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Detections at or below this confidence never alert
    pub confidence_threshold: f32,
    /// Log FPS stats periodically
    pub profile: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            profile: false,
        }
    }
}

/// Produce the verdict for one request.
///
/// Decode and classifier failures are logged and come back as OK so the
/// reply always goes out and the camera's round trip completes.
pub fn evaluate_frame(
    classifier: &mut dyn Classifier,
    filter: &ClassFilter,
    request: &FrameRequest,
    confidence_threshold: f32,
) -> Verdict {
    let frame = match decode_jpeg(&request.jpeg) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Bad frame from {}: {e}", request.peer);
            return Verdict::Ok;
        }
    };

    let detections = match classifier.infer(&frame, confidence_threshold) {
        Ok(detections) => detections,
        Err(e) => {
            warn!("Classifier failed on frame from {}: {e}", request.peer);
            return Verdict::Ok;
        }
    };

    filter.verdict(&detections, confidence_threshold)
}

/// The server role: owns the listener, the classifier, and the class
/// filter, and serves camera sessions sequentially.
pub struct Server {
    listener: FrameListener,
    classifier: Box<dyn Classifier>,
    filter: ClassFilter,
    config: ServerConfig,
}

impl Server {
    /// Assemble a server around an already-bound listener
    pub fn new(
        listener: FrameListener,
        classifier: Box<dyn Classifier>,
        filter: ClassFilter,
        config: ServerConfig,
    ) -> Self {
        Self {
            listener,
            classifier,
            filter,
            config,
        }
    }

    /// Accept and serve sessions forever
    pub async fn run(&mut self) {
        loop {
            let session = match self.listener.accept().await {
                Ok(session) => session,
                Err(e) => {
                    warn!("Accept failed: {e}; retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };
            info!("Camera connected from {}", session.remote());
            self.serve(session).await;
        }
    }

    /// Serve one session until it ends
    async fn serve(&mut self, mut session: PeerSession) {
        let remote = session.remote();
        let mut frame_count = 0u64;
        let mut window_start = Instant::now();

        loop {
            let (request, reply) = match session.recv().await {
                Ok(received) => received,
                Err(TransportError::Io(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    info!("Camera {remote} disconnected");
                    return;
                }
                Err(e) => {
                    warn!("Receive from {remote} failed: {e}; dropping session");
                    return;
                }
            };

            let verdict = evaluate_frame(
                self.classifier.as_mut(),
                &self.filter,
                &request,
                self.config.confidence_threshold,
            );

            frame_count += 1;
            match &verdict {
                Verdict::Detected(_) => {
                    info!("Frame {frame_count} from {}: {verdict}", request.peer)
                }
                _ => {
                    if frame_count % LIVENESS_LOG_INTERVAL == 0 {
                        info!("Frame {frame_count} from {}: OK", request.peer);
                    }
                }
            }

            if let Err(e) = reply.reply(&verdict.encode()).await {
                warn!("Reply to {} failed: {e}; dropping session", request.peer);
                return;
            }

            if self.config.profile && frame_count % LIVENESS_LOG_INTERVAL == 0 {
                let fps = LIVENESS_LOG_INTERVAL as f64 / window_start.elapsed().as_secs_f64();
                info!("~{fps:.2} FPS over the last {LIVENESS_LOG_INTERVAL} frames");
                window_start = Instant::now();
            }
        }
    }
}
