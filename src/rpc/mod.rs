//! Thrift wire layer.
//!
//! # Data Flow
//! ```text
//! Browser ──JSON──▶ json.rs ──▶ Message { Struct } ──▶ processor.rs
//!                                                          │
//! Backend ◀──framed compact── framed.rs + compact.rs ◀─────┘
//! ```
//!
//! # Design Decisions
//! - Payloads decode into a schema-less value tree (value.rs), so the relay
//!   forwards structs it has no generated types for
//! - Protocol choice is data, not a type parameter, so both legs are
//!   selectable from configuration

pub mod compact;
pub mod error;
pub mod framed;
pub mod json;
pub mod message;
pub mod processor;
pub mod value;

use serde::{Deserialize, Serialize};

pub use error::{ProtocolError, RpcError, RpcResult};
pub use message::{
    ApplicationException, ApplicationExceptionKind, Message, MessageHeader, MessageType,
    ServiceException,
};
pub use processor::Processor;
pub use value::{Struct, TType, ThriftValue, Value};

/// Message encoding used on a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Json,
    Compact,
}

impl Protocol {
    pub fn encode(self, msg: &Message) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Protocol::Json => json::encode_message(msg),
            Protocol::Compact => compact::encode_message(msg),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<Message, ProtocolError> {
        match self {
            Protocol::Json => json::decode_message(bytes),
            Protocol::Compact => compact::decode_message(bytes),
        }
    }

    /// Best-effort name and sequence id of a payload that may not decode.
    pub fn peek_header(self, bytes: &[u8]) -> Option<MessageHeader> {
        match self {
            Protocol::Json => json::peek_header(bytes),
            Protocol::Compact => compact::peek_header(bytes),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Json => f.write_str("json"),
            Protocol::Compact => f.write_str("compact"),
        }
    }
}
