//! `SearchService`: run queries against one search backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc::error::{ProtocolError, RpcResult};
use crate::rpc::message::Message;
use crate::rpc::processor::{bad_arguments, check_call, reply_with, unknown_method, Processor};
use crate::services::types::{SearchCapability, SearchQuery, SearchResult};
use crate::services::{base_method, Service};

#[async_trait]
pub trait SearchService: Service {
    async fn search(&self, query: SearchQuery) -> RpcResult<SearchResult>;

    async fn get_capabilities(&self) -> RpcResult<Vec<SearchCapability>>;

    async fn get_corpora(&self) -> RpcResult<Vec<String>>;
}

pub struct SearchProcessor {
    handler: Arc<dyn SearchService>,
}

impl SearchProcessor {
    pub fn new(handler: Arc<dyn SearchService>) -> Self {
        Self { handler }
    }

    async fn dispatch(&self, call: Message) -> Result<Message, ProtocolError> {
        let header = call.header();
        if let Some(reply) = base_method(self.handler.as_ref(), &header).await {
            return Ok(reply);
        }
        let mut args = call.body;
        Ok(match header.name.as_str() {
            "search" => {
                let query = args.required(1, "search_args")?;
                reply_with(&header, self.handler.search(query).await, true)
            }
            "getCapabilities" => reply_with(&header, self.handler.get_capabilities().await, true),
            "getCorpora" => reply_with(&header, self.handler.get_corpora().await, true),
            _ => unknown_method(&header),
        })
    }
}

#[async_trait]
impl Processor for SearchProcessor {
    fn service_name(&self) -> &'static str {
        "SearchService"
    }

    async fn process(&self, call: Message) -> Option<Message> {
        if let Some(reject) = check_call(&call) {
            return Some(reject);
        }
        let header = call.header();
        Some(
            self.dispatch(call)
                .await
                .unwrap_or_else(|e| bad_arguments(&header, e)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::error::RpcError;
    use crate::rpc::message::{
        ApplicationException, ApplicationExceptionKind, MessageType, ServiceException,
    };
    use crate::rpc::value::{Struct, ThriftValue, Value};
    use crate::services::types::ServiceInfo;

    /// Answers a search with the query it received, nested under field 7.
    struct Mirror;

    #[async_trait]
    impl Service for Mirror {
        async fn about(&self) -> RpcResult<ServiceInfo> {
            Ok(ServiceInfo {
                name: "mirror".into(),
                version: "1".into(),
                description: None,
            })
        }

        async fn alive(&self) -> RpcResult<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl SearchService for Mirror {
        async fn search(&self, query: SearchQuery) -> RpcResult<SearchResult> {
            Ok(SearchResult::from_struct(
                Struct::new().with(1, "result-1").with(7, query.into_value()),
            ))
        }

        async fn get_capabilities(&self) -> RpcResult<Vec<SearchCapability>> {
            Err(RpcError::Service(ServiceException::new("no capabilities")))
        }

        async fn get_corpora(&self) -> RpcResult<Vec<String>> {
            Ok(vec!["wiki".into(), "news".into()])
        }
    }

    fn processor() -> SearchProcessor {
        SearchProcessor::new(Arc::new(Mirror))
    }

    #[tokio::test]
    async fn query_reaches_handler_unchanged() {
        let query = Struct::new()
            .with(1, vec!["rust".to_string()].into_value())
            .with(3, "raw query")
            .with(5, 25i32);
        let args = Struct::new().with(1, query.clone());
        let reply = processor().process(Message::call("search", 6, args)).await.unwrap();

        assert_eq!(reply.kind, MessageType::Reply);
        assert_eq!(reply.seq_id, 6);
        let result = reply.body.get(0).and_then(Value::as_struct).unwrap();
        assert_eq!(result.get(1), Some(&Value::from("result-1")));
        assert_eq!(result.get(7), Some(&Value::Struct(query)));
    }

    #[tokio::test]
    async fn declared_exception_is_field_one() {
        let reply = processor()
            .process(Message::call("getCapabilities", 1, Struct::new()))
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageType::Reply);
        let ex = reply.body.get(1).and_then(Value::as_struct).unwrap();
        assert_eq!(ex.get(1), Some(&Value::from("no capabilities")));
    }

    #[tokio::test]
    async fn lists_corpora() {
        let reply = processor()
            .process(Message::call("getCorpora", 2, Struct::new()))
            .await
            .unwrap();
        let corpora = Vec::<String>::from_value(reply.body.get(0).cloned().unwrap()).unwrap();
        assert_eq!(corpora, vec!["wiki", "news"]);
    }

    #[tokio::test]
    async fn search_without_query_is_protocol_error() {
        let reply = processor()
            .process(Message::call("search", 3, Struct::new()))
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageType::Exception);
        let ex = ApplicationException::from_struct(&reply.body);
        assert_eq!(ex.kind, ApplicationExceptionKind::ProtocolError);
    }

    #[tokio::test]
    async fn fetch_methods_are_unknown() {
        let reply = processor()
            .process(Message::call("fetch", 4, Struct::new()))
            .await
            .unwrap();
        let ex = ApplicationException::from_struct(&reply.body);
        assert_eq!(ex.kind, ApplicationExceptionKind::UnknownMethod);
    }
}
