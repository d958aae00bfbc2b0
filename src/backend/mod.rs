//! Backend side: framed sockets to Concrete services.
//!
//! # Data Flow
//! ```text
//! relay handler → typed client (client.rs)
//!     → BackendClient::call → BackendConnection (connection.rs)
//!     → framed write → framed read → decode_reply → RpcResult<T>
//! ```
//!
//! # Design Decisions
//! - A fresh connection per call, closed on drop; no pooling
//! - No retries: every failure goes straight back to the caller
//! - Optional per-call deadline; off unless configured

pub mod client;
pub mod connection;

pub use client::{BackendClient, FetchCommunicationClient, SearchClient};
pub use connection::BackendConnection;
