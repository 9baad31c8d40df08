//! Peer identity attached to every frame request

use crate::core::MAX_PEER_NAME_LEN;

/// Stable name identifying a camera instance.
///
/// Carried on every request and used by the server only for log
/// attribution, never for routing. Truncated to the wire limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Create an identity, truncating to the wire limit
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.len() > MAX_PEER_NAME_LEN {
            // Cut on a char boundary; a fixed byte index could land
            // mid-codepoint and panic in String::truncate.
            let mut cut = MAX_PEER_NAME_LEN;
            while !name.is_char_boundary(cut) {
                cut -= 1;
            }
            name.truncate(cut);
        }
        Self(name)
    }

    /// Resolve an identity for this host.
    ///
    /// Prefers the `WARDEN_PEER_NAME` env var, then the system hostname,
    /// then a fixed fallback.
    pub fn from_host() -> Self {
        if let Ok(name) = std::env::var("WARDEN_PEER_NAME") {
            if !name.trim().is_empty() {
                return Self::new(name.trim());
            }
        }
        if let Ok(hostname) = std::fs::read_to_string("/etc/hostname") {
            let hostname = hostname.trim();
            if !hostname.is_empty() {
                return Self::new(hostname);
            }
        }
        Self::new("warden-camera")
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_truncation() {
        let long = "x".repeat(MAX_PEER_NAME_LEN + 10);
        let id = PeerIdentity::new(long);
        assert_eq!(id.as_str().len(), MAX_PEER_NAME_LEN);
    }

    #[test]
    fn test_identity_truncation_multibyte() {
        // 2-byte codepoints straddle the byte limit; the cut must stay on
        // a char boundary instead of panicking.
        let long = "é".repeat(200);
        let id = PeerIdentity::new(long);
        assert!(id.as_str().len() <= MAX_PEER_NAME_LEN);
        assert_eq!(id.as_str().len(), MAX_PEER_NAME_LEN - 1);
        assert!(id.as_str().chars().all(|c| c == 'é'));
    }
}
