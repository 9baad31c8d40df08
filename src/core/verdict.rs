//! Verdict wire values and parsing
//!
//! The server answers every frame with one of three raw byte strings:
//! `b"OK"`, `b"DETECTED"`, or `b"DETECTED:<label>"`. The bare `DETECTED`
//! form is kept for older servers that did not report the label.

use bytes::Bytes;

/// The server's answer to a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing alert-worthy in the frame
    Ok,
    /// An alert-worthy detection, with the class label when known
    Detected(Option<String>),
    /// A reply the camera does not understand; logged and treated as non-alert
    Unknown(Bytes),
}

impl Verdict {
    /// Parse a raw reply. Never fails: unrecognized bytes become `Unknown`.
    pub fn parse(reply: &[u8]) -> Self {
        if reply == b"OK" {
            return Verdict::Ok;
        }
        if let Some(rest) = reply.strip_prefix(b"DETECTED" as &[u8]) {
            // Anything starting with DETECTED is an alert; the label is only
            // trusted when it follows the `:` separator.
            let label = rest
                .strip_prefix(b":" as &[u8])
                .filter(|l| !l.is_empty())
                .map(|l| String::from_utf8_lossy(l).into_owned());
            return Verdict::Detected(label);
        }
        Verdict::Unknown(Bytes::copy_from_slice(reply))
    }

    /// Encode to the raw wire bytes
    pub fn encode(&self) -> Bytes {
        match self {
            Verdict::Ok => Bytes::from_static(b"OK"),
            Verdict::Detected(None) => Bytes::from_static(b"DETECTED"),
            Verdict::Detected(Some(label)) => Bytes::from(format!("DETECTED:{label}")),
            Verdict::Unknown(raw) => raw.clone(),
        }
    }

    /// Whether this verdict should trigger the downstream alert path
    pub fn is_alert(&self) -> bool {
        matches!(self, Verdict::Detected(_))
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Ok => f.write_str("OK"),
            Verdict::Detected(None) => f.write_str("DETECTED"),
            Verdict::Detected(Some(label)) => write!(f, "DETECTED:{label}"),
            Verdict::Unknown(raw) => write!(f, "unknown ({} bytes)", raw.len()),
        }
    }
}
