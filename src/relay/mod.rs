//! Relay handlers: the service implementations exposed over HTTP.
//!
//! # Data Flow
//! ```text
//! FetchProcessor       → RelayFetchHandler  → [cache] → FetchCommunicationClient
//! SearchProcessor      → RelaySearchHandler → SearchClient
//! SearchProxyProcessor → SearchProxyHandler → ProviderRegistry → RelaySearchHandler
//! ```
//!
//! # Design Decisions
//! - Handlers depend on service traits, never on sockets, so tests swap in
//!   in-memory backends
//! - The provider registry is built once and never mutated

pub mod cache;
pub mod fetch;
pub mod proxy;
pub mod search;

pub use cache::CommunicationCache;
pub use fetch::RelayFetchHandler;
pub use proxy::{ProviderRegistry, SearchProxyHandler};
pub use search::RelaySearchHandler;
