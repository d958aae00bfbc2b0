//! Message envelope and the two exception shapes carried in replies.

use std::fmt;

use crate::rpc::value::{Struct, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(MessageType::Call),
            2 => Some(MessageType::Reply),
            3 => Some(MessageType::Exception),
            4 => Some(MessageType::Oneway),
            _ => None,
        }
    }
}

/// One protocol message: a call, a reply or an exception.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub kind: MessageType,
    pub seq_id: i32,
    pub body: Struct,
}

impl Message {
    pub fn call(name: impl Into<String>, seq_id: i32, args: Struct) -> Self {
        Self {
            name: name.into(),
            kind: MessageType::Call,
            seq_id,
            body: args,
        }
    }

    pub fn reply(header: &MessageHeader, result: Struct) -> Self {
        Self {
            name: header.name.clone(),
            kind: MessageType::Reply,
            seq_id: header.seq_id,
            body: result,
        }
    }

    pub fn exception(header: &MessageHeader, error: ApplicationException) -> Self {
        Self {
            name: header.name.clone(),
            kind: MessageType::Exception,
            seq_id: header.seq_id,
            body: error.to_struct(),
        }
    }

    pub fn header(&self) -> MessageHeader {
        MessageHeader {
            name: self.name.clone(),
            seq_id: self.seq_id,
        }
    }
}

/// Method name and sequence id, enough to address a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub seq_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationExceptionKind {
    Unknown = 0,
    UnknownMethod = 1,
    InvalidMessageType = 2,
    WrongMethodName = 3,
    BadSequenceId = 4,
    MissingResult = 5,
    InternalError = 6,
    ProtocolError = 7,
}

impl ApplicationExceptionKind {
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            _ => Self::Unknown,
        }
    }
}

/// Thrift's built-in `TApplicationException`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationException {
    pub kind: ApplicationExceptionKind,
    pub message: String,
}

impl ApplicationException {
    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn to_struct(&self) -> Struct {
        Struct::new()
            .with(1, self.message.as_str())
            .with(2, self.kind as i32)
    }

    /// Lenient decode: absent or ill-typed fields fall back to defaults.
    pub fn from_struct(body: &Struct) -> Self {
        let message = body
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = body
            .get(2)
            .and_then(Value::as_i32)
            .map(ApplicationExceptionKind::from_i32)
            .unwrap_or(ApplicationExceptionKind::Unknown);
        Self { kind, message }
    }
}

impl fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// An exception declared in a service's IDL (`throws (1: ...)`).
///
/// Concrete's `ServicesException` and `NotImplementedException` share the
/// layout `{1: message, 2: serEx}`. The struct is kept whole so exceptions
/// raised by a backend are relayed to the caller unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceException(Struct);

impl ServiceException {
    pub fn new(message: impl Into<String>) -> Self {
        Self(Struct::new().with(1, Value::String(message.into())))
    }

    pub fn from_struct(body: Struct) -> Self {
        Self(body)
    }

    pub fn message(&self) -> Option<&str> {
        self.0.get(1).and_then(Value::as_str)
    }

    pub fn into_struct(self) -> Struct {
        self.0
    }
}

impl fmt::Display for ServiceException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message().unwrap_or("<no message>"))
    }
}
