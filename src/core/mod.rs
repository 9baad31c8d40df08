//! Core types shared by both roles
//!
//! Frame and identity types, verdict wire values, the COCO class table,
//! and protocol constants.

pub mod classes;
pub mod frame;
pub mod identity;
pub mod protocol;
pub mod verdict;

pub use frame::{EncodedFrame, Frame};
pub use identity::PeerIdentity;
pub use protocol::*;
pub use verdict::Verdict;
