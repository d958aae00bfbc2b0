//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the relay handlers and their processors from configuration
//! - Create the Axum router: three bridge endpoints, the sentence endpoint
//!   and static files as fallback
//! - Wire up middleware (request ID, tracing, body limit)
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::backend::{BackendClient, FetchCommunicationClient, SearchClient};
use crate::config::{EndpointConfig, RelayConfig, DEFAULT_CONTENT_TYPE, DEFAULT_PROVIDER};
use crate::http::bridge::BridgeEndpoint;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::sentence;
use crate::relay::{
    CommunicationCache, ProviderRegistry, RelayFetchHandler, RelaySearchHandler,
    SearchProxyHandler,
};
use crate::rpc::processor::Processor;
use crate::services::{
    FetchCommunicationService, FetchProcessor, SearchProcessor, SearchProxyProcessor,
    SearchService,
};

pub const FETCH_ENDPOINT: &str = "/fetch_http_endpoint/";
pub const SEARCH_ENDPOINT: &str = "/search_http_endpoint/";
pub const SEARCH_PROXY_ENDPOINT: &str = "/search_proxy_http_endpoint/";

/// The three relay handlers, wired to their backends.
#[derive(Clone)]
pub struct RelayServices {
    pub fetch: Arc<RelayFetchHandler>,
    pub search: Arc<RelaySearchHandler>,
    pub proxy: Arc<SearchProxyHandler>,
}

impl RelayServices {
    /// Connect to the configured fetch and search backends.
    ///
    /// Nothing is dialed here; each call opens its own connection.
    pub fn from_config(config: &RelayConfig) -> Self {
        let fetch = BackendClient::new(&config.fetch_backend, &config.backend);
        let search = BackendClient::new(&config.search_backend, &config.backend);

        let extra = config.providers.iter().map(|provider| {
            let endpoint = EndpointConfig::new(provider.host.clone(), provider.port);
            let client = SearchClient::new(BackendClient::new(&endpoint, &config.backend));
            let handler: Arc<dyn SearchService> =
                Arc::new(RelaySearchHandler::new(Arc::new(client)));
            (provider.name.clone(), handler)
        });

        Self::assemble(
            Arc::new(FetchCommunicationClient::new(fetch)),
            Arc::new(SearchClient::new(search)),
            extra,
            config.cache.capacity,
        )
    }

    /// Relay to arbitrary backends, with `search` as the only provider.
    pub fn with_backends(
        fetch: Arc<dyn FetchCommunicationService>,
        search: Arc<dyn SearchService>,
        cache_capacity: usize,
    ) -> Self {
        Self::assemble(fetch, search, std::iter::empty(), cache_capacity)
    }

    fn assemble<I>(
        fetch: Arc<dyn FetchCommunicationService>,
        search: Arc<dyn SearchService>,
        extra_providers: I,
        cache_capacity: usize,
    ) -> Self
    where
        I: IntoIterator<Item = (String, Arc<dyn SearchService>)>,
    {
        let cache = CommunicationCache::new(cache_capacity);
        let fetch = Arc::new(RelayFetchHandler::new(fetch, cache));
        let search = Arc::new(RelaySearchHandler::new(search));

        let mut registry = ProviderRegistry::new().with_provider(DEFAULT_PROVIDER, search.clone());
        for (name, handler) in extra_providers {
            registry = registry.with_provider(name, handler);
        }
        tracing::debug!(providers = ?registry.names(), "Search providers registered");
        let proxy = Arc::new(SearchProxyHandler::new(registry));

        Self { fetch, search, proxy }
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a server relaying to the backends named in `config`.
    pub fn new(config: RelayConfig) -> Self {
        let services = RelayServices::from_config(&config);
        Self::with_services(config, services)
    }

    pub fn with_services(config: RelayConfig, services: RelayServices) -> Self {
        let router = Self::build_router(&config, services);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, services: RelayServices) -> Router {
        // validate_config rejects values that do not parse
        let content_type = HeaderValue::from_str(&config.bridge.content_type).unwrap_or_else(|_| {
            tracing::warn!(
                content_type = %config.bridge.content_type,
                "Invalid bridge content type, using {}",
                DEFAULT_CONTENT_TYPE
            );
            HeaderValue::from_static(DEFAULT_CONTENT_TYPE)
        });
        let bridge = |processor: Arc<dyn Processor>, path: &str| {
            BridgeEndpoint::new(
                processor,
                config.bridge.protocol,
                content_type.clone(),
                config.listener.max_body_bytes,
            )
            .into_router(path)
        };

        let fetch: Arc<dyn FetchCommunicationService> = services.fetch;
        Router::new()
            .merge(bridge(Arc::new(FetchProcessor::new(fetch.clone())), FETCH_ENDPOINT))
            .merge(bridge(Arc::new(SearchProcessor::new(services.search)), SEARCH_ENDPOINT))
            .merge(bridge(
                Arc::new(SearchProxyProcessor::new(services.proxy)),
                SEARCH_PROXY_ENDPOINT,
            ))
            .merge(sentence::router(fetch))
            .fallback_service(ServeDir::new(&config.static_files.root))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            request_id = %request_id(request.headers()),
                            method = %request.method(),
                            uri = %request.uri(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes)),
            )
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            static_root = %self.config.static_files.root,
            cache_capacity = self.config.cache.capacity,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
