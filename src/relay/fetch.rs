//! Fetch relay: forwards to the fetch backend, with an optional cache.

use std::sync::Arc;

use async_trait::async_trait;

use crate::relay::cache::CommunicationCache;
use crate::rpc::error::RpcResult;
use crate::services::types::{FetchRequest, FetchResult, ServiceInfo};
use crate::services::{FetchCommunicationService, Service};

pub struct RelayFetchHandler {
    backend: Arc<dyn FetchCommunicationService>,
    cache: Option<CommunicationCache>,
}

impl RelayFetchHandler {
    pub fn new(
        backend: Arc<dyn FetchCommunicationService>,
        cache: Option<CommunicationCache>,
    ) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> Option<&CommunicationCache> {
        self.cache.as_ref()
    }
}

#[async_trait]
impl Service for RelayFetchHandler {
    async fn about(&self) -> RpcResult<ServiceInfo> {
        tracing::debug!("RelayFetchHandler.about()");
        self.backend.about().await
    }

    async fn alive(&self) -> RpcResult<bool> {
        tracing::debug!("RelayFetchHandler.alive()");
        self.backend.alive().await
    }
}

#[async_trait]
impl FetchCommunicationService for RelayFetchHandler {
    /// Served from cache only when every requested id is cached. Otherwise
    /// the whole request goes to the backend, and its successful result is
    /// cached.
    async fn fetch(&self, request: FetchRequest) -> RpcResult<FetchResult> {
        tracing::debug!("RelayFetchHandler.fetch()");
        if let Some(cache) = &self.cache {
            if let Some(communications) = cache.get_all(&request.communication_ids()) {
                tracing::debug!(count = communications.len(), "Serving communications from cache");
                return Ok(FetchResult::new(communications));
            }
        }

        let result = self.backend.fetch(request).await?;
        tracing::debug!(count = result.len(), "Fetched communications from backend");
        if let Some(cache) = self.cache.as_ref().filter(|_| !result.is_empty()) {
            cache.insert_all(&result.communications());
        }
        Ok(result)
    }

    async fn get_communication_count(&self) -> RpcResult<i64> {
        tracing::debug!("RelayFetchHandler.getCommunicationCount()");
        self.backend.get_communication_count().await
    }

    async fn get_communication_ids(&self, offset: i64, count: i64) -> RpcResult<Vec<String>> {
        tracing::debug!(offset, count, "RelayFetchHandler.getCommunicationIDs()");
        self.backend.get_communication_ids(offset, count).await
    }
}

#[cfg(test)]
pub(crate) mod doubles {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::rpc::error::RpcError;
    use crate::services::types::fixtures::communication;
    use crate::services::types::Communication;

    /// In-memory fetch backend that counts calls and can be switched to fail.
    #[derive(Default)]
    pub struct CountingFetch {
        pub store: HashMap<String, Communication>,
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
    }

    impl CountingFetch {
        pub fn with(ids: &[&str]) -> Self {
            let store = ids
                .iter()
                .map(|id| (id.to_string(), communication(id, &format!("text of {id}"), &[])))
                .collect();
            Self {
                store,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Service for CountingFetch {
        async fn about(&self) -> RpcResult<ServiceInfo> {
            Ok(ServiceInfo {
                name: "counting".into(),
                version: "0".into(),
                description: None,
            })
        }

        async fn alive(&self) -> RpcResult<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl FetchCommunicationService for CountingFetch {
        async fn fetch(&self, request: FetchRequest) -> RpcResult<FetchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RpcError::Transport(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "backend down",
                )));
            }
            let found = request
                .communication_ids()
                .into_iter()
                .filter_map(|id| self.store.get(id).cloned())
                .collect();
            Ok(FetchResult::new(found))
        }

        async fn get_communication_count(&self) -> RpcResult<i64> {
            Ok(self.store.len() as i64)
        }

        async fn get_communication_ids(&self, offset: i64, count: i64) -> RpcResult<Vec<String>> {
            let mut ids: Vec<String> = self.store.keys().cloned().collect();
            ids.sort();
            Ok(ids
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(count.max(0) as usize)
                .collect())
        }
    }
}
