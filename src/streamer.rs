//! Camera-side stream loop
//!
//! Capture, encode, send, react, repeated indefinitely. One frame is in
//! flight at a time; the loop does not capture the next frame until the
//! verdict for the previous one arrived or the round trip failed. All
//! failures are recovered here: bad frames are skipped, transport errors
//! back off and redial, and nothing short of the frame source closing
//! ends the loop.

use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tracing::{info, warn};

use crate::alert::AlertSink;
use crate::capture::FrameSource;
use crate::codec::encode_jpeg;
use crate::core::{
    PeerIdentity, Verdict, DEFAULT_JPEG_QUALITY, LIVENESS_LOG_INTERVAL,
    RECONNECT_BACKOFF_INITIAL, RECONNECT_BACKOFF_MAX,
};
use crate::error::CaptureError;
use crate::transport::FrameTransport;

/// Stream loop configuration
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Name attached to every request
    pub peer: PeerIdentity,
    /// JPEG quality (0-100)
    pub quality: u8,
    /// Frame rate cap; 0 means uncapped (the round trip sets the pace)
    pub fps_cap: u32,
    /// Stop after this many frame attempts (None = run forever)
    pub max_frames: Option<u64>,
    /// First retry delay after a transport failure
    pub backoff_initial: Duration,
    /// Retry delay ceiling
    pub backoff_max: Duration,
    /// Log throughput stats every few seconds
    pub profile: bool,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            peer: PeerIdentity::new("warden-camera"),
            quality: DEFAULT_JPEG_QUALITY,
            fps_cap: 0,
            max_frames: None,
            backoff_initial: RECONNECT_BACKOFF_INITIAL,
            backoff_max: RECONNECT_BACKOFF_MAX,
            profile: false,
        }
    }
}

/// Counters accumulated over one run of the loop
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamerStats {
    /// Frames captured (or attempted)
    pub attempts: u64,
    /// Frames that completed a round trip
    pub sent: u64,
    /// Round trips that came back DETECTED
    pub detections: u64,
    /// Frames skipped before sending (capture or encode failure)
    pub skipped: u64,
    /// Frames lost to transport failures
    pub dropped: u64,
    /// Compressed bytes that completed a round trip
    pub bytes_sent: u64,
}

/// Drift-corrected frame pacer.
///
/// Tracks an absolute next-deadline instead of re-arming a fixed sleep,
/// so per-frame overhead does not accumulate into a systematically lower
/// rate. When the loop falls behind (slow frame, reconnect backoff) the
/// schedule restarts from now rather than bursting to catch up.
pub struct Pacer {
    interval: Duration,
    next: Instant,
}

impl Pacer {
    /// A pacer for the given cap, or None when uncapped
    pub fn new(fps_cap: u32) -> Option<Self> {
        if fps_cap == 0 {
            return None;
        }
        Some(Self {
            interval: Duration::from_micros(1_000_000 / fps_cap as u64),
            next: Instant::now(),
        })
    }

    /// Sleep until the next scheduled tick
    pub async fn wait(&mut self) {
        self.next += self.interval;
        let now = Instant::now();
        if self.next > now {
            sleep_until(self.next).await;
        } else {
            self.next = now;
        }
    }
}

enum StepOutcome {
    Continue,
    SourceEnded,
}

/// The camera role: owns the frame source, the transport session, and the
/// optional downstream alert sink.
pub struct Streamer<S, T> {
    source: S,
    transport: T,
    alert: Option<AlertSink>,
    config: StreamerConfig,
    stats: StreamerStats,
    backoff: Duration,
}

impl<S: FrameSource, T: FrameTransport> Streamer<S, T> {
    /// Assemble a streamer; the session should already be established
    pub fn new(source: S, transport: T, alert: Option<AlertSink>, config: StreamerConfig) -> Self {
        let backoff = config.backoff_initial;
        Self {
            source,
            transport,
            alert,
            config,
            stats: StreamerStats::default(),
            backoff,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> StreamerStats {
        self.stats
    }

    /// Run the stream loop until the frame budget is exhausted or the
    /// source closes. Transport failures never end the loop.
    pub async fn run(&mut self) -> StreamerStats {
        let mut pacer = Pacer::new(self.config.fps_cap);
        let started = Instant::now();
        let mut last_stats = Instant::now();

        loop {
            if let Some(max) = self.config.max_frames {
                if self.stats.attempts >= max {
                    break;
                }
            }

            match self.step().await {
                StepOutcome::SourceEnded => break,
                StepOutcome::Continue => {}
            }

            if self.config.profile && last_stats.elapsed() >= Duration::from_secs(5) {
                let elapsed = started.elapsed().as_secs_f64();
                let fps = self.stats.sent as f64 / elapsed;
                let mbps = (self.stats.bytes_sent as f64 * 8.0) / (elapsed * 1_000_000.0);
                info!(
                    "Stats: {} sent ({} detections, {} skipped, {} dropped) | {:.1} fps, {:.2} Mbps",
                    self.stats.sent, self.stats.detections, self.stats.skipped,
                    self.stats.dropped, fps, mbps
                );
                last_stats = Instant::now();
            }

            if let Some(p) = pacer.as_mut() {
                p.wait().await;
            }
        }

        info!(
            "Stream loop ended: {} sent, {} detections, {} skipped, {} dropped",
            self.stats.sent, self.stats.detections, self.stats.skipped, self.stats.dropped
        );
        self.stats
    }

    /// One frame lifecycle: capture, encode, round trip, react.
    async fn step(&mut self) -> StepOutcome {
        self.stats.attempts += 1;

        let frame = match self.source.capture().await {
            Ok(frame) => frame,
            Err(CaptureError::SourceClosed) => {
                warn!("Frame source closed");
                return StepOutcome::SourceEnded;
            }
            Err(e) => {
                warn!("Capture failed: {e}; skipping frame");
                self.stats.skipped += 1;
                return StepOutcome::Continue;
            }
        };

        let encoded = match encode_jpeg(&frame, self.config.quality) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Encode failed: {e}; skipping frame");
                self.stats.skipped += 1;
                return StepOutcome::Continue;
            }
        };

        let reply = match self.transport.send(&self.config.peer, &encoded).await {
            Ok(reply) => reply,
            Err(e) => {
                // The frame is gone; back off, redial, and move on to a
                // fresh capture rather than resending a stale one.
                self.stats.dropped += 1;
                warn!("Send failed: {e}; retrying in {:?}", self.backoff);
                sleep(self.backoff).await;
                self.backoff = (self.backoff * 2).min(self.config.backoff_max);
                if let Err(e) = self.transport.reconnect().await {
                    warn!("Reconnect failed: {e}");
                }
                return StepOutcome::Continue;
            }
        };

        self.backoff = self.config.backoff_initial;
        self.stats.sent += 1;
        self.stats.bytes_sent += encoded.len() as u64;

        match Verdict::parse(&reply) {
            verdict @ Verdict::Detected(_) => {
                self.stats.detections += 1;
                info!("Frame {}: {verdict}", self.stats.attempts);
                if let Some(alert) = &self.alert {
                    alert.notify(&reply).await;
                }
            }
            Verdict::Ok => {
                if self.stats.sent % LIVENESS_LOG_INTERVAL == 0 {
                    info!("Frame {}: OK", self.stats.attempts);
                }
            }
            Verdict::Unknown(raw) => {
                warn!(
                    "Frame {}: unrecognized reply ({} bytes), ignoring",
                    self.stats.attempts,
                    raw.len()
                );
            }
        }

        StepOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;

    use super::*;
    use crate::capture::SyntheticSource;
    use crate::core::{EncodedFrame, Frame};
    use crate::error::TransportError;

    /// Transport that replays a script of replies and asserts that round
    /// trips never overlap.
    struct ScriptedTransport {
        script: VecDeque<Result<Bytes, TransportError>>,
        send_calls: u64,
        reconnect_calls: u64,
        in_flight: bool,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Bytes, TransportError>>) -> Self {
            Self {
                script: script.into(),
                send_calls: 0,
                reconnect_calls: 0,
                in_flight: false,
            }
        }

        fn always_ok() -> Self {
            Self::new(Vec::new())
        }
    }

    #[async_trait::async_trait]
    impl FrameTransport for ScriptedTransport {
        async fn send(
            &mut self,
            _peer: &PeerIdentity,
            _frame: &EncodedFrame,
        ) -> Result<Bytes, TransportError> {
            assert!(!self.in_flight, "second send started before reply");
            self.in_flight = true;
            tokio::task::yield_now().await;
            self.in_flight = false;
            self.send_calls += 1;
            self.script
                .pop_front()
                .unwrap_or(Ok(Bytes::from_static(b"OK")))
        }

        async fn reconnect(&mut self) -> Result<(), TransportError> {
            self.reconnect_calls += 1;
            Ok(())
        }
    }

    /// Source that fails every other capture
    struct FlakySource {
        inner: SyntheticSource,
        calls: u64,
    }

    #[async_trait::async_trait]
    impl FrameSource for FlakySource {
        async fn capture(&mut self) -> Result<Frame, CaptureError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(CaptureError::InvalidFrame("sensor glitch".to_string()));
            }
            self.inner.capture().await
        }
    }

    fn config(max_frames: u64) -> StreamerConfig {
        StreamerConfig {
            max_frames: Some(max_frames),
            backoff_initial: Duration::from_millis(10),
            backoff_max: Duration::from_millis(40),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_strict_alternation_one_reply_per_frame() {
        let mut streamer = Streamer::new(
            SyntheticSource::new(32, 32),
            ScriptedTransport::always_ok(),
            None,
            config(10),
        );
        let stats = streamer.run().await;
        assert_eq!(stats.attempts, 10);
        assert_eq!(stats.sent, 10);
        assert_eq!(streamer.transport.send_calls, 10);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_timeouts_then_success() {
        let timeout = || Err(TransportError::Timeout(Duration::from_secs(5)));
        let transport = ScriptedTransport::new(vec![
            timeout(),
            timeout(),
            timeout(),
            Ok(Bytes::from_static(b"OK")),
        ]);
        let mut streamer =
            Streamer::new(SyntheticSource::new(32, 32), transport, None, config(4));

        let stats = streamer.run().await;
        assert_eq!(streamer.transport.send_calls, 4);
        assert_eq!(stats.dropped, 3);
        assert_eq!(stats.sent, 1);
        // Each failure redials before the next capture
        assert_eq!(streamer.transport.reconnect_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_and_resets() {
        let timeout = || Err(TransportError::Timeout(Duration::from_secs(5)));
        let transport = ScriptedTransport::new(vec![
            timeout(),
            timeout(),
            timeout(),
            Ok(Bytes::from_static(b"OK")),
        ]);
        let mut streamer =
            Streamer::new(SyntheticSource::new(32, 32), transport, None, config(4));

        let started = Instant::now();
        streamer.run().await;
        // Sleeps: 10ms + 20ms + 40ms of backoff, everything else instant
        let slept = started.elapsed();
        assert!(slept >= Duration::from_millis(70), "slept {slept:?}");
        assert!(slept < Duration::from_millis(120), "slept {slept:?}");
        // Success resets the backoff for the next failure
        assert_eq!(streamer.backoff, streamer.config.backoff_initial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fps_cap_does_not_drift() {
        let mut cfg = config(1000);
        cfg.fps_cap = 10;
        let mut streamer = Streamer::new(
            SyntheticSource::new(32, 32),
            ScriptedTransport::always_ok(),
            None,
            cfg,
        );

        let started = Instant::now();
        let stats = streamer.run().await;
        let elapsed = started.elapsed();

        assert_eq!(stats.sent, 1000);
        // 1000 frames at 100ms each; an upward drift would overshoot
        assert!(elapsed >= Duration::from_millis(99_900), "ran {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(100_500), "ran {elapsed:?}");
    }

    #[tokio::test]
    async fn test_capture_failures_skip_but_keep_streaming() {
        let source = FlakySource {
            inner: SyntheticSource::new(32, 32),
            calls: 0,
        };
        let mut streamer =
            Streamer::new(source, ScriptedTransport::always_ok(), None, config(10));
        let stats = streamer.run().await;
        assert_eq!(stats.attempts, 10);
        assert_eq!(stats.skipped, 5);
        assert_eq!(stats.sent, 5);
    }

    #[tokio::test]
    async fn test_detection_reply_is_forwarded_downstream() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = AlertSink::new(receiver.local_addr().unwrap()).await.unwrap();

        let transport =
            ScriptedTransport::new(vec![Ok(Bytes::from_static(b"DETECTED:dog"))]);
        let mut streamer = Streamer::new(
            SyntheticSource::new(32, 32),
            transport,
            Some(sink),
            config(1),
        );
        let stats = streamer.run().await;
        assert_eq!(stats.detections, 1);

        let mut buf = [0u8; 64];
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"DETECTED:dog");
    }

    #[tokio::test]
    async fn test_unknown_reply_is_not_an_alert() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = AlertSink::new(receiver.local_addr().unwrap()).await.unwrap();

        let transport = ScriptedTransport::new(vec![Ok(Bytes::from_static(b"GARBLED"))]);
        let mut streamer = Streamer::new(
            SyntheticSource::new(32, 32),
            transport,
            Some(sink),
            config(1),
        );
        let stats = streamer.run().await;
        assert_eq!(stats.detections, 0);
        assert_eq!(stats.sent, 1);

        // Nothing must have been forwarded
        let mut buf = [0u8; 8];
        let res = tokio::time::timeout(
            Duration::from_millis(100),
            receiver.recv_from(&mut buf),
        )
        .await;
        assert!(res.is_err(), "unexpected datagram");
    }
}
