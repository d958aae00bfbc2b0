//! One backend socket, opened for a single call.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::BufWriter;
use tokio::net::TcpStream;

use crate::observability::metrics;
use crate::rpc::error::RpcError;
use crate::rpc::framed::{read_frame, write_frame};
use crate::rpc::{Message, Protocol};

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a backend connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend-{}", self.0)
    }
}

/// Framed connection to a backend service.
///
/// The socket is closed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct BackendConnection {
    stream: BufWriter<TcpStream>,
    protocol: Protocol,
    max_frame_bytes: usize,
    id: ConnectionId,
}

impl BackendConnection {
    pub async fn open(
        addr: &str,
        protocol: Protocol,
        max_frame_bytes: usize,
    ) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let id = ConnectionId::new();
        metrics::backend_connection_opened();
        tracing::trace!(connection_id = %id, address = addr, "Backend connection opened");
        Ok(Self {
            stream: BufWriter::new(stream),
            protocol,
            max_frame_bytes,
            id,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Send one call and wait for the frame that answers it.
    pub async fn call(&mut self, msg: &Message) -> Result<Message, RpcError> {
        let payload = self.protocol.encode(msg)?;
        write_frame(&mut self.stream, &payload).await?;
        let reply = read_frame(&mut self.stream, self.max_frame_bytes).await?;
        Ok(self.protocol.decode(&reply)?)
    }
}

impl Drop for BackendConnection {
    fn drop(&mut self) {
        metrics::backend_connection_closed();
        tracing::trace!(connection_id = %self.id, "Backend connection closed");
    }
}
