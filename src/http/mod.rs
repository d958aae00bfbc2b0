//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → bridge.rs   POST /<service>_http_endpoint/ → Processor → reply bytes
//!     → sentence.rs GET /get_sentence_text → fetch relay → JSON
//!     → ServeDir    everything else → static files
//! ```

pub mod bridge;
pub mod request;
pub mod sentence;
pub mod server;

pub use bridge::BridgeEndpoint;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{
    HttpServer, RelayServices, FETCH_ENDPOINT, SEARCH_ENDPOINT, SEARCH_PROXY_ENDPOINT,
};
