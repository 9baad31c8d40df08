//! Wire format for frame requests and verdict replies
//!
//! Each request is sent as:
//! - 4 bytes: message length (big-endian u32)
//! - 2 bytes: peer name length (big-endian u16)
//! - N bytes: peer name (UTF-8)
//! - rest: JPEG payload
//!
//! Each reply is sent as:
//! - 4 bytes: reply length (big-endian u32)
//! - N bytes: raw verdict bytes

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::{PeerIdentity, MAX_PEER_NAME_LEN, MAX_REPLY_SIZE, MAX_REQUEST_SIZE};
use crate::error::TransportError;

/// One decoded frame request as received by the server.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    /// Who sent the frame (log attribution only)
    pub peer: PeerIdentity,
    /// The compressed frame
    pub jpeg: Bytes,
}

/// Serialize a request body (name length + name + payload, no length prefix)
fn request_to_bytes(peer: &PeerIdentity, jpeg: &[u8]) -> Bytes {
    let name = peer.as_str().as_bytes();
    let mut buf = BytesMut::with_capacity(2 + name.len() + jpeg.len());
    buf.put_u16(name.len() as u16);
    buf.put_slice(name);
    buf.put_slice(jpeg);
    buf.freeze()
}

/// Deserialize a request body
fn request_from_bytes(mut buf: Bytes) -> Result<FrameRequest, TransportError> {
    if buf.len() < 2 {
        return Err(TransportError::Protocol(format!(
            "request too short for header: {} bytes",
            buf.len()
        )));
    }
    let name_len = buf.get_u16() as usize;
    if name_len > MAX_PEER_NAME_LEN {
        return Err(TransportError::Protocol(format!(
            "peer name too long: {name_len} > {MAX_PEER_NAME_LEN}"
        )));
    }
    if buf.len() < name_len {
        return Err(TransportError::Protocol(format!(
            "request truncated: {} bytes left for {name_len}-byte name",
            buf.len()
        )));
    }
    let name_bytes = buf.split_to(name_len);
    let name = std::str::from_utf8(&name_bytes)
        .map_err(|_| TransportError::Protocol("peer name is not UTF-8".to_string()))?;

    Ok(FrameRequest {
        peer: PeerIdentity::new(name),
        jpeg: buf,
    })
}

/// Write a length-prefixed frame request
pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    peer: &PeerIdentity,
    jpeg: &[u8],
) -> Result<(), TransportError> {
    let bytes = request_to_bytes(peer, jpeg);
    if bytes.len() > MAX_REQUEST_SIZE {
        return Err(TransportError::Protocol(format!(
            "request too large: {} > {MAX_REQUEST_SIZE}",
            bytes.len()
        )));
    }
    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed frame request
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<FrameRequest, TransportError> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_REQUEST_SIZE {
        return Err(TransportError::Protocol(format!(
            "request length exceeds maximum: {len} > {MAX_REQUEST_SIZE}"
        )));
    }
    if len < 2 {
        return Err(TransportError::Protocol(format!(
            "request length too small for header: {len}"
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    request_from_bytes(Bytes::from(buf))
}

/// Write a length-prefixed verdict reply
pub async fn write_reply<W: AsyncWrite + Unpin>(
    writer: &mut W,
    reply: &[u8],
) -> Result<(), TransportError> {
    if reply.len() > MAX_REPLY_SIZE {
        return Err(TransportError::Protocol(format!(
            "reply too large: {} > {MAX_REPLY_SIZE}",
            reply.len()
        )));
    }
    writer.write_all(&(reply.len() as u32).to_be_bytes()).await?;
    writer.write_all(reply).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed verdict reply
pub async fn read_reply<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Bytes, TransportError> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_REPLY_SIZE {
        return Err(TransportError::Protocol(format!(
            "reply length exceeds maximum: {len} > {MAX_REPLY_SIZE}"
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_roundtrip() {
        let peer = PeerIdentity::new("pi-garden");
        let jpeg = b"\xff\xd8fake jpeg\xff\xd9";

        let mut buf = Vec::new();
        write_request(&mut buf, &peer, jpeg).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let req = read_request(&mut cursor).await.unwrap();
        assert_eq!(req.peer, peer);
        assert_eq!(&req.jpeg[..], jpeg);
    }

    #[tokio::test]
    async fn test_reply_roundtrip() {
        let mut buf = Vec::new();
        write_reply(&mut buf, b"DETECTED:dog").await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let reply = read_reply(&mut cursor).await.unwrap();
        assert_eq!(&reply[..], b"DETECTED:dog");
    }

    #[tokio::test]
    async fn test_read_request_rejects_oversized_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&((MAX_REQUEST_SIZE as u32) + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(
            read_request(&mut cursor).await,
            Err(TransportError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_request_from_bytes_rejects_truncated_name() {
        // Claims a 10-byte name but only 3 bytes follow
        let mut buf = BytesMut::new();
        buf.put_u16(10);
        buf.put_slice(b"abc");
        assert!(matches!(
            request_from_bytes(buf.freeze()),
            Err(TransportError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_payload_is_allowed_on_the_wire() {
        // The server rejects it later as a decode failure, not here
        let peer = PeerIdentity::new("cam");
        let mut buf = Vec::new();
        write_request(&mut buf, &peer, b"").await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let req = read_request(&mut cursor).await.unwrap();
        assert!(req.jpeg.is_empty());
    }
}
