//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed task observes the broadcast
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → server stops accepting and drains
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
