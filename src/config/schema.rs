//! Configuration schema definitions.
//!
//! Every section defaults, so an empty file (or no file) yields the same
//! settings as running with no command-line flags.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rpc::framed::DEFAULT_MAX_FRAME_BYTES;
use crate::rpc::Protocol;

/// Name of the provider that always points at `search_backend`.
pub const DEFAULT_PROVIDER: &str = "default";

/// `Content-Type` of bridge replies unless `bridge.content_type` says otherwise.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-rpc";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Backend serving `FetchCommunicationService`.
    pub fetch_backend: EndpointConfig,

    /// Backend serving `SearchService`; also the `default` provider.
    pub search_backend: EndpointConfig,

    /// Additional named search providers.
    pub providers: Vec<ProviderConfig>,

    /// Settings shared by all backend connections.
    pub backend: BackendOptions,

    /// Settings of the HTTP bridge endpoints.
    pub bridge: BridgeConfig,

    /// Communication cache settings.
    pub cache: CacheConfig,

    /// Static file serving.
    pub static_files: StaticFilesConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host interface to listen on.
    pub host: String,

    pub port: u16,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Host and port of a backend service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

impl EndpointConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A named search backend reachable through the search proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendOptions {
    /// Encoding spoken on backend sockets.
    pub protocol: Protocol,

    /// Largest reply frame accepted from a backend.
    pub max_frame_bytes: usize,

    /// Per-call deadline in milliseconds. Unset means calls may block indefinitely.
    pub call_timeout_ms: Option<u64>,
}

impl BackendOptions {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            protocol: Protocol::Compact,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            call_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Encoding spoken by HTTP clients on the bridge endpoints.
    pub protocol: Protocol,

    /// `Content-Type` of bridge replies.
    pub content_type: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Json,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of communications kept. 0 disables caching.
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory holding the web UI.
    pub root: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: "ui".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn/warning, error/critical).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            fetch_backend: EndpointConfig::new("localhost", 9092),
            search_backend: EndpointConfig::new("localhost", 9090),
            providers: Vec::new(),
            backend: BackendOptions::default(),
            bridge: BridgeConfig::default(),
            cache: CacheConfig::default(),
            static_files: StaticFilesConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
