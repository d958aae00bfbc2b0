//! Clients for Concrete services behind framed sockets.

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::connection::BackendConnection;
use crate::config::{BackendOptions, EndpointConfig};
use crate::observability::metrics;
use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::message::{
    ApplicationException, ApplicationExceptionKind, Message, MessageHeader, MessageType,
    ServiceException,
};
use crate::rpc::value::{Struct, ThriftValue};
use crate::rpc::Protocol;
use crate::services::types::{
    FetchRequest, FetchResult, SearchCapability, SearchQuery, SearchResult, ServiceInfo,
};
use crate::services::{FetchCommunicationService, SearchService, Service};

/// Calls methods on one backend address, one connection per call.
#[derive(Debug)]
pub struct BackendClient {
    address: String,
    protocol: Protocol,
    max_frame_bytes: usize,
    timeout: Option<Duration>,
    next_seq: AtomicI32,
}

impl BackendClient {
    pub fn new(endpoint: &EndpointConfig, options: &BackendOptions) -> Self {
        Self {
            address: endpoint.address(),
            protocol: options.protocol,
            max_frame_bytes: options.max_frame_bytes,
            timeout: options.call_timeout(),
            next_seq: AtomicI32::new(0),
        }
    }

    /// Invoke `method` and decode field 0 of its result as `T`.
    pub async fn call<T: ThriftValue>(&self, method: &str, args: Struct) -> RpcResult<T> {
        let seq_id = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let request = Message::call(method, seq_id, args);

        let exchange = self.exchange(&request);
        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .unwrap_or(Err(RpcError::Timeout(limit))),
            None => exchange.await,
        };

        let result = reply.and_then(|reply| decode_reply(&request.header(), reply));
        let outcome = match &result {
            Ok(_) => "ok",
            Err(RpcError::Service(_)) => "exception",
            Err(_) => "error",
        };
        metrics::record_backend_call(method, outcome);
        if let Err(e) = &result {
            tracing::warn!(backend = %self.address, method, error = %e, "Backend call failed");
        }
        result
    }

    async fn exchange(&self, request: &Message) -> RpcResult<Message> {
        let mut conn =
            BackendConnection::open(&self.address, self.protocol, self.max_frame_bytes).await?;
        tracing::trace!(connection_id = %conn.id(), method = %request.name, "Calling backend");
        conn.call(request).await
    }
}

/// Interpret a backend reply to the call described by `call`.
pub fn decode_reply<T: ThriftValue>(call: &MessageHeader, reply: Message) -> RpcResult<T> {
    if reply.kind == MessageType::Exception {
        return Err(RpcError::Application(ApplicationException::from_struct(&reply.body)));
    }
    if reply.kind != MessageType::Reply {
        return Err(application(
            ApplicationExceptionKind::InvalidMessageType,
            format!("{} failed: expected a reply", call.name),
        ));
    }
    if reply.name != call.name {
        return Err(application(
            ApplicationExceptionKind::WrongMethodName,
            format!("{} failed: wrong method name {}", call.name, reply.name),
        ));
    }
    if reply.seq_id != call.seq_id {
        return Err(application(
            ApplicationExceptionKind::BadSequenceId,
            format!("{} failed: out of sequence response", call.name),
        ));
    }

    let mut body = reply.body;
    if let Some(success) = body.take(0) {
        return Ok(T::from_value(success)?);
    }
    if let Some(declared) = body.take(1) {
        return Err(RpcError::Service(ServiceException::from_struct(Struct::from_value(declared)?)));
    }
    Err(application(
        ApplicationExceptionKind::MissingResult,
        format!("{} failed: unknown result", call.name),
    ))
}

fn application(kind: ApplicationExceptionKind, message: String) -> RpcError {
    RpcError::Application(ApplicationException::new(kind, message))
}

/// `FetchCommunicationService` client.
#[derive(Debug)]
pub struct FetchCommunicationClient {
    client: BackendClient,
}

impl FetchCommunicationClient {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Service for FetchCommunicationClient {
    async fn about(&self) -> RpcResult<ServiceInfo> {
        self.client.call("about", Struct::new()).await
    }

    async fn alive(&self) -> RpcResult<bool> {
        self.client.call("alive", Struct::new()).await
    }
}

#[async_trait]
impl FetchCommunicationService for FetchCommunicationClient {
    async fn fetch(&self, request: FetchRequest) -> RpcResult<FetchResult> {
        let args = Struct::new().with(1, request.into_value());
        self.client.call("fetch", args).await
    }

    async fn get_communication_count(&self) -> RpcResult<i64> {
        self.client.call("getCommunicationCount", Struct::new()).await
    }

    async fn get_communication_ids(&self, offset: i64, count: i64) -> RpcResult<Vec<String>> {
        let args = Struct::new().with(1, offset).with(2, count);
        self.client.call("getCommunicationIDs", args).await
    }
}

/// `SearchService` client.
#[derive(Debug)]
pub struct SearchClient {
    client: BackendClient,
}

impl SearchClient {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Service for SearchClient {
    async fn about(&self) -> RpcResult<ServiceInfo> {
        self.client.call("about", Struct::new()).await
    }

    async fn alive(&self) -> RpcResult<bool> {
        self.client.call("alive", Struct::new()).await
    }
}

#[async_trait]
impl SearchService for SearchClient {
    async fn search(&self, query: SearchQuery) -> RpcResult<SearchResult> {
        let args = Struct::new().with(1, query.into_value());
        self.client.call("search", args).await
    }

    async fn get_capabilities(&self) -> RpcResult<Vec<SearchCapability>> {
        self.client.call("getCapabilities", Struct::new()).await
    }

    async fn get_corpora(&self) -> RpcResult<Vec<String>> {
        self.client.call("getCorpora", Struct::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::value::Value;

    fn header() -> MessageHeader {
        MessageHeader {
            name: "getCorpora".into(),
            seq_id: 7,
        }
    }

    #[test]
    fn success_field_is_decoded() {
        let corpora = vec!["a".to_string()];
        let reply = Message::reply(&header(), Struct::new().with(0, corpora.clone().into_value()));
        let decoded: Vec<String> = decode_reply(&header(), reply).unwrap();
        assert_eq!(decoded, corpora);
    }

    #[test]
    fn declared_exception_is_kept_whole() {
        let ex = Struct::new().with(1, "bad query").with(2, Value::Binary(vec![1, 2]));
        let reply = Message::reply(&header(), Struct::new().with(1, ex.clone()));
        match decode_reply::<Vec<String>>(&header(), reply) {
            Err(RpcError::Service(e)) => assert_eq!(e.into_struct(), ex),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_replies_are_rejected() {
        let mut reply = Message::reply(&header(), Struct::new().with(0, true));
        reply.seq_id = 8;
        assert!(matches!(
            decode_reply::<bool>(&header(), reply),
            Err(RpcError::Application(ApplicationException {
                kind: ApplicationExceptionKind::BadSequenceId,
                ..
            }))
        ));

        let empty = Message::reply(&header(), Struct::new());
        assert!(matches!(
            decode_reply::<bool>(&header(), empty),
            Err(RpcError::Application(ApplicationException {
                kind: ApplicationExceptionKind::MissingResult,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = EndpointConfig::new("127.0.0.1", port);
        let client = BackendClient::new(&endpoint, &BackendOptions::default());
        let result: RpcResult<bool> = client.call("alive", Struct::new()).await;
        assert!(matches!(result, Err(RpcError::Transport(_))));
    }
}
