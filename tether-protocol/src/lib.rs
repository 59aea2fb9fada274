//! tether-protocol: Shared wire definitions for client-companion communication
//!
//! This crate defines the message envelopes, method payloads and framing
//! codec used between the tether client (running inside the assistant) and
//! the editor companion process.

pub mod codec;
pub mod messages;

// Re-export main types at crate root
pub use codec::{ClientCodec, CodecError, CompanionCodec};
pub use messages::{
    methods, DiffAck, DiffParams, ErrorCode, InitializeParams, InitializeResult, Request,
    RequestId, Response, ResponseError,
};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;
