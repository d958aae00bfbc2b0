//! Search relay: forwards every call to one search backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc::error::RpcResult;
use crate::services::types::{SearchCapability, SearchQuery, SearchResult, ServiceInfo};
use crate::services::{SearchService, Service};

pub struct RelaySearchHandler {
    backend: Arc<dyn SearchService>,
}

impl RelaySearchHandler {
    pub fn new(backend: Arc<dyn SearchService>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Service for RelaySearchHandler {
    async fn about(&self) -> RpcResult<ServiceInfo> {
        tracing::debug!("RelaySearchHandler.about()");
        self.backend.about().await
    }

    async fn alive(&self) -> RpcResult<bool> {
        tracing::debug!("RelaySearchHandler.alive()");
        self.backend.alive().await
    }
}

#[async_trait]
impl SearchService for RelaySearchHandler {
    async fn search(&self, query: SearchQuery) -> RpcResult<SearchResult> {
        tracing::debug!("RelaySearchHandler.search()");
        self.backend.search(query).await
    }

    async fn get_capabilities(&self) -> RpcResult<Vec<SearchCapability>> {
        tracing::debug!("RelaySearchHandler.getCapabilities()");
        self.backend.get_capabilities().await
    }

    async fn get_corpora(&self) -> RpcResult<Vec<String>> {
        tracing::debug!("RelaySearchHandler.getCorpora()");
        self.backend.get_corpora().await
    }
}
