//! `SearchProxyService`: search across named providers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc::error::{ProtocolError, RpcResult};
use crate::rpc::message::Message;
use crate::rpc::processor::{bad_arguments, check_call, reply_with, unknown_method, Processor};
use crate::services::types::{SearchCapability, SearchQuery, SearchResult};
use crate::services::{base_method, Service};

#[async_trait]
pub trait SearchProxyService: Service {
    async fn search(&self, query: SearchQuery, provider: String) -> RpcResult<SearchResult>;

    async fn get_providers(&self) -> RpcResult<Vec<String>>;

    async fn get_capabilities(&self, provider: String) -> RpcResult<Vec<SearchCapability>>;

    async fn get_corpora(&self, provider: String) -> RpcResult<Vec<String>>;
}

pub struct SearchProxyProcessor {
    handler: Arc<dyn SearchProxyService>,
}

impl SearchProxyProcessor {
    pub fn new(handler: Arc<dyn SearchProxyService>) -> Self {
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
                let provider = args.required(2, "search_args")?;
                reply_with(&header, self.handler.search(query, provider).await, true)
            }
            "getProviders" => reply_with(&header, self.handler.get_providers().await, true),
            "getCapabilities" => {
                let provider = args.required(1, "getCapabilities_args")?;
                reply_with(&header, self.handler.get_capabilities(provider).await, true)
            }
            "getCorpora" => {
                let provider = args.required(1, "getCorpora_args")?;
                reply_with(&header, self.handler.get_corpora(provider).await, true)
            }
            _ => unknown_method(&header),
        })
    }
}

#[async_trait]
impl Processor for SearchProxyProcessor {
    fn service_name(&self) -> &'static str {
        "SearchProxyService"
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
