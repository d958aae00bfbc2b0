//! `FetchCommunicationService`: retrieve communications by id.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc::error::{ProtocolError, RpcResult};
use crate::rpc::message::Message;
use crate::rpc::processor::{bad_arguments, check_call, reply_with, unknown_method, Processor};
use crate::services::types::{FetchRequest, FetchResult};
use crate::services::{base_method, Service};

#[async_trait]
pub trait FetchCommunicationService: Service {
    async fn fetch(&self, request: FetchRequest) -> RpcResult<FetchResult>;

    async fn get_communication_count(&self) -> RpcResult<i64>;

    async fn get_communication_ids(&self, offset: i64, count: i64) -> RpcResult<Vec<String>>;
}

pub struct FetchProcessor {
    handler: Arc<dyn FetchCommunicationService>,
}

impl FetchProcessor {
    pub fn new(handler: Arc<dyn FetchCommunicationService>) -> Self {
        Self { handler }
    }

    async fn dispatch(&self, call: Message) -> Result<Message, ProtocolError> {
        let header = call.header();
        if let Some(reply) = base_method(self.handler.as_ref(), &header).await {
            return Ok(reply);
        }
        let mut args = call.body;
        Ok(match header.name.as_str() {
            "fetch" => {
                let request = args.required(1, "fetch_args")?;
                reply_with(&header, self.handler.fetch(request).await, true)
            }
            "getCommunicationCount" => {
                reply_with(&header, self.handler.get_communication_count().await, true)
            }
            "getCommunicationIDs" => {
                let offset = args.required(1, "getCommunicationIDs_args")?;
                let count = args.required(2, "getCommunicationIDs_args")?;
                reply_with(
                    &header,
                    self.handler.get_communication_ids(offset, count).await,
                    true,
                )
            }
            _ => unknown_method(&header),
        })
    }
}

#[async_trait]
impl Processor for FetchProcessor {
    fn service_name(&self) -> &'static str {
        "FetchCommunicationService"
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
    use crate::rpc::message::{ApplicationException, ApplicationExceptionKind, MessageType};
    use crate::rpc::value::{Struct, ThriftValue, Value};
    use crate::services::types::ServiceInfo;

    struct Fixed;

    #[async_trait]
    impl Service for Fixed {
        async fn about(&self) -> RpcResult<ServiceInfo> {
            Ok(ServiceInfo {
                name: "fixed".into(),
                version: "0".into(),
                description: None,
            })
        }

        async fn alive(&self) -> RpcResult<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl FetchCommunicationService for Fixed {
        async fn fetch(&self, request: FetchRequest) -> RpcResult<FetchResult> {
            assert_eq!(request.communication_ids(), vec!["a"]);
            Ok(FetchResult::new(Vec::new()))
        }

        async fn get_communication_count(&self) -> RpcResult<i64> {
            Ok(42)
        }

        async fn get_communication_ids(&self, offset: i64, count: i64) -> RpcResult<Vec<String>> {
            Ok((offset..offset + count).map(|i| i.to_string()).collect())
        }
    }

    fn processor() -> FetchProcessor {
        FetchProcessor::new(Arc::new(Fixed))
    }

    #[tokio::test]
    async fn dispatches_by_method_name() {
        let reply = processor()
            .process(Message::call("getCommunicationCount", 2, Struct::new()))
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageType::Reply);
        assert_eq!(reply.seq_id, 2);
        assert_eq!(reply.body.get(0), Some(&Value::I64(42)));
    }

    #[tokio::test]
    async fn decodes_arguments() {
        let args = Struct::new().with(1, 3i64).with(2, 2i64);
        let reply = processor()
            .process(Message::call("getCommunicationIDs", 1, args))
            .await
            .unwrap();
        let ids = Vec::<String>::from_value(reply.body.get(0).cloned().unwrap()).unwrap();
        assert_eq!(ids, vec!["3", "4"]);

        let args = Struct::new().with(1, FetchRequest::new(["a"]).into_value());
        let reply = processor().process(Message::call("fetch", 1, args)).await.unwrap();
        assert!(reply.body.get(0).is_some());
    }

    #[tokio::test]
    async fn missing_arguments_are_protocol_errors() {
        let reply = processor()
            .process(Message::call("getCommunicationIDs", 1, Struct::new().with(1, 0i64)))
            .await
            .unwrap();
        assert_eq!(reply.kind, MessageType::Exception);
        let ex = ApplicationException::from_struct(&reply.body);
        assert_eq!(ex.kind, ApplicationExceptionKind::ProtocolError);
    }

    #[tokio::test]
    async fn answers_alive() {
        let reply = processor().process(Message::call("alive", 0, Struct::new())).await.unwrap();
        assert_eq!(reply.body.get(0), Some(&Value::Bool(true)));
    }
}
