//! Request-reply frame transport
//!
//! Wire codec plus the session discipline that guarantees at most one
//! frame in flight per connection.

pub mod session;
pub mod wire;

pub use session::{FrameListener, FrameTransport, PeerSession, ReplyHandle, TcpTransport};
pub use wire::FrameRequest;
