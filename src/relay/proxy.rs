//! Search proxy: routes calls to a named search provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc::error::{RpcError, RpcResult};
use crate::services::types::{SearchCapability, SearchQuery, SearchResult, ServiceInfo};
use crate::services::{SearchProxyService, SearchService, Service};

/// Provider name to search handler, fixed at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn SearchService>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any earlier entry.
    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn SearchService>,
    ) -> Self {
        self.providers.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> RpcResult<&Arc<dyn SearchService>> {
        self.providers
            .get(name)
            .ok_or_else(|| RpcError::ProviderNotFound(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

pub struct SearchProxyHandler {
    providers: ProviderRegistry,
}

impl SearchProxyHandler {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl Service for SearchProxyHandler {
    async fn about(&self) -> RpcResult<ServiceInfo> {
        tracing::debug!("SearchProxyHandler.about()");
        Ok(ServiceInfo {
            name: "SearchProxyHandler".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: None,
        })
    }

    async fn alive(&self) -> RpcResult<bool> {
        tracing::debug!("SearchProxyHandler.alive()");
        Ok(true)
    }
}

#[async_trait]
impl SearchProxyService for SearchProxyHandler {
    async fn search(&self, query: SearchQuery, provider: String) -> RpcResult<SearchResult> {
        tracing::debug!(provider = %provider, "SearchProxyHandler.search()");
        self.providers.get(&provider)?.search(query).await
    }

    async fn get_providers(&self) -> RpcResult<Vec<String>> {
        tracing::debug!("SearchProxyHandler.getProviders()");
        Ok(self.providers.names())
    }

    async fn get_capabilities(&self, provider: String) -> RpcResult<Vec<SearchCapability>> {
        tracing::debug!(provider = %provider, "SearchProxyHandler.getCapabilities()");
        self.providers.get(&provider)?.get_capabilities().await
    }

    async fn get_corpora(&self, provider: String) -> RpcResult<Vec<String>> {
        tracing::debug!(provider = %provider, "SearchProxyHandler.getCorpora()");
        self.providers.get(&provider)?.get_corpora().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::value::{Struct, Value};

    struct Named(&'static str);

    #[async_trait]
    impl Service for Named {
        async fn about(&self) -> RpcResult<ServiceInfo> {
            Ok(ServiceInfo {
                name: self.0.to_string(),
                version: "0".into(),
                description: None,
            })
        }

        async fn alive(&self) -> RpcResult<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl SearchService for Named {
        async fn search(&self, query: SearchQuery) -> RpcResult<SearchResult> {
            let echoed = query.into_struct().with(99, self.0);
            Ok(SearchResult::from_struct(echoed))
        }

        async fn get_capabilities(&self) -> RpcResult<Vec<SearchCapability>> {
            Ok(vec![SearchCapability::from_struct(Struct::new().with(1, self.0))])
        }

        async fn get_corpora(&self) -> RpcResult<Vec<String>> {
            Ok(vec![format!("{}-corpus", self.0)])
        }
    }

    fn proxy() -> SearchProxyHandler {
        SearchProxyHandler::new(
            ProviderRegistry::new()
                .with_provider("default", Arc::new(Named("default")))
                .with_provider("wiki", Arc::new(Named("wiki"))),
        )
    }

    #[tokio::test]
    async fn routes_by_provider_name() {
        let proxy = proxy();
        assert_eq!(proxy.get_corpora("wiki".into()).await.unwrap(), vec!["wiki-corpus"]);
        let result = proxy
            .search(SearchQuery::default(), "default".into())
            .await
            .unwrap();
        assert_eq!(result.as_struct().get(99), Some(&Value::from("default")));
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let err = proxy().get_capabilities("nonexistent".into()).await.unwrap_err();
        assert!(matches!(err, RpcError::ProviderNotFound(name) if name == "nonexistent"));
    }

    #[tokio::test]
    async fn lists_providers() {
        assert_eq!(proxy().get_providers().await.unwrap(), vec!["default", "wiki"]);
        assert!(proxy().alive().await.unwrap());
    }
}
