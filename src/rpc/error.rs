//! Error types for the wire layer and for RPC calls.

use std::time::Duration;

use thiserror::Error;

use crate::rpc::message::{ApplicationException, ServiceException};
use crate::rpc::value::TType;

/// Errors raised while encoding or decoding a Thrift payload.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected end of payload")]
    UnexpectedEof,

    #[error("invalid payload: {0}")]
    InvalidData(String),

    #[error("unsupported protocol version {0}")]
    BadVersion(i64),

    #[error("unknown type tag {0}")]
    UnknownType(String),

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: TType, actual: TType },

    #[error("missing required field {field} in {context}")]
    MissingField { context: &'static str, field: i16 },

    #[error("size {size} exceeds limit {max}")]
    SizeLimit { size: usize, max: usize },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ProtocolError::InvalidData(message.into())
    }
}

/// Failure of a single RPC invocation.
///
/// Variants stay distinguishable all the way up to the processor, which maps
/// them onto either a declared exception or an application exception.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The backend could not be reached or the socket failed mid-call.
    #[error("backend connection failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The remote side answered with a Thrift application exception.
    #[error("application exception: {0}")]
    Application(ApplicationException),

    /// A declared IDL exception, passed through verbatim.
    #[error("service exception: {0}")]
    Service(ServiceException),

    #[error("search provider not found: {0}")]
    ProviderNotFound(String),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

pub type RpcResult<T> = Result<T, RpcError>;
