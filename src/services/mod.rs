//! Service interfaces and their processors.
//!
//! # Data Flow
//! ```text
//! Message (call) → <Service>Processor → decode args → handler trait method
//!                                              │
//! Message (reply) ◀── reply_with() ◀── RpcResult<T>
//! ```
//!
//! # Design Decisions
//! - One trait per service with exactly its IDL method set; relays, backend
//!   clients and test doubles all implement the same trait
//! - Processors hold `Arc<dyn Trait>` so handlers are injected at startup

pub mod fetch;
pub mod proxy;
pub mod search;
pub mod types;

use async_trait::async_trait;

use crate::rpc::error::RpcResult;
use crate::rpc::message::{Message, MessageHeader};
use crate::rpc::processor::reply_with;

pub use fetch::{FetchCommunicationService, FetchProcessor};
pub use proxy::{SearchProxyProcessor, SearchProxyService};
pub use search::{SearchProcessor, SearchService};
pub use types::{
    Communication, FetchRequest, FetchResult, SearchCapability, SearchQuery, SearchResult,
    ServiceInfo,
};

/// Methods every Concrete service provides.
#[async_trait]
pub trait Service: Send + Sync {
    async fn about(&self) -> RpcResult<ServiceInfo>;

    async fn alive(&self) -> RpcResult<bool>;
}

/// Answer `about` and `alive` for any service; `None` for other methods.
pub(crate) async fn base_method<S>(service: &S, header: &MessageHeader) -> Option<Message>
where
    S: Service + ?Sized,
{
    match header.name.as_str() {
        "about" => Some(reply_with(header, service.about().await, false)),
        "alive" => Some(reply_with(header, service.alive().await, false)),
        _ => None,
    }
}
