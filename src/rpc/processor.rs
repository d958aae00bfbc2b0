//! Dispatch of decoded calls to service handlers.

use std::time::Instant;

use async_trait::async_trait;

use crate::observability::metrics;
use crate::rpc::error::{ProtocolError, RpcError, RpcResult};
use crate::rpc::message::{
    ApplicationException, ApplicationExceptionKind, Message, MessageHeader, MessageType,
    ServiceException,
};
use crate::rpc::value::{Struct, ThriftValue};
use crate::rpc::Protocol;

/// A service processor: turns one call message into its reply.
///
/// Returns `None` only for oneway calls.
#[async_trait]
pub trait Processor: Send + Sync {
    fn service_name(&self) -> &'static str;

    async fn process(&self, call: Message) -> Option<Message>;
}

/// Decode `payload`, run it through `processor` and encode the reply.
///
/// Never fails: decode errors become a protocol-error exception addressed to
/// whatever header could be recovered, and oneway calls yield an empty body.
pub async fn process_payload(
    processor: &dyn Processor,
    protocol: Protocol,
    payload: &[u8],
) -> Vec<u8> {
    let started = Instant::now();
    let service = processor.service_name();

    let call = match protocol.decode(payload) {
        Ok(call) => call,
        Err(e) => {
            let header = protocol.peek_header(payload).unwrap_or_default();
            tracing::warn!(service, error = %e, method = %header.name, "Undecodable call");
            metrics::record_rpc_call(service, "unknown", "error", started.elapsed());
            let ex =
                ApplicationException::new(ApplicationExceptionKind::ProtocolError, e.to_string());
            return encode(protocol, &Message::exception(&header, ex));
        }
    };

    let oneway = call.kind == MessageType::Oneway;
    let method = call.name.clone();
    let reply = processor.process(call).await;

    match reply {
        Some(reply) => {
            let (label, outcome) = classify(&method, &reply);
            metrics::record_rpc_call(service, label, outcome, started.elapsed());
            if oneway {
                Vec::new()
            } else {
                encode(protocol, &reply)
            }
        }
        None => {
            metrics::record_rpc_call(service, &method, "ok", started.elapsed());
            Vec::new()
        }
    }
}

fn classify<'a>(method: &'a str, reply: &Message) -> (&'a str, &'static str) {
    match reply.kind {
        MessageType::Exception => {
            let ex = ApplicationException::from_struct(&reply.body);
            if ex.kind == ApplicationExceptionKind::UnknownMethod {
                ("unknown", "error")
            } else {
                (method, "error")
            }
        }
        _ if reply.body.get(0).is_some() => (method, "ok"),
        _ => (method, "exception"),
    }
}

fn encode(protocol: Protocol, reply: &Message) -> Vec<u8> {
    match protocol.encode(reply) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, method = %reply.name, "Failed to encode reply");
            let fallback = Message::exception(
                &reply.header(),
                ApplicationException::new(ApplicationExceptionKind::InternalError, e.to_string()),
            );
            protocol.encode(&fallback).unwrap_or_default()
        }
    }
}

/// Guard shared by every processor: only calls and oneway calls are served.
pub fn check_call(call: &Message) -> Option<Message> {
    match call.kind {
        MessageType::Call | MessageType::Oneway => None,
        other => Some(Message::exception(
            &call.header(),
            ApplicationException::new(
                ApplicationExceptionKind::InvalidMessageType,
                format!("expected a call, received {other:?}"),
            ),
        )),
    }
}

pub fn unknown_method(header: &MessageHeader) -> Message {
    Message::exception(
        header,
        ApplicationException::new(
            ApplicationExceptionKind::UnknownMethod,
            format!("Unknown function {}", header.name),
        ),
    )
}

pub fn bad_arguments(header: &MessageHeader, error: ProtocolError) -> Message {
    Message::exception(
        header,
        ApplicationException::new(ApplicationExceptionKind::ProtocolError, error.to_string()),
    )
}

/// Build the reply for a handler result.
///
/// Success lands in field 0. Declared exceptions land in field 1 when the
/// method declares one; everything else becomes an internal-error exception.
pub fn reply_with<T: ThriftValue>(
    header: &MessageHeader,
    result: RpcResult<T>,
    declares_exception: bool,
) -> Message {
    let error = match result {
        Ok(value) => return Message::reply(header, Struct::new().with(0, value.into_value())),
        Err(e) => e,
    };

    if declares_exception {
        match error {
            RpcError::Service(ex) => {
                return Message::reply(header, Struct::new().with(1, ex.into_struct()));
            }
            RpcError::ProviderNotFound(name) => {
                let ex = ServiceException::new(format!("Search provider not found: {name}"));
                return Message::reply(header, Struct::new().with(1, ex.into_struct()));
            }
            other => return internal_error(header, &other),
        }
    }
    internal_error(header, &error)
}

fn internal_error(header: &MessageHeader, error: &RpcError) -> Message {
    tracing::error!(method = %header.name, error = %error, "Handler failed");
    Message::exception(
        header,
        ApplicationException::new(ApplicationExceptionKind::InternalError, error.to_string()),
    )
}
