//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use concrete_relay::config::RelayConfig;
use concrete_relay::rpc::framed::{read_frame, write_frame, DEFAULT_MAX_FRAME_BYTES};
use concrete_relay::rpc::{Message, Protocol, Struct, Value};
use concrete_relay::{HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Start a mock Thrift backend speaking framed compact protocol.
///
/// `handler` maps each decoded call to the reply sent back.
#[allow(dead_code)]
pub async fn start_thrift_backend<F>(addr: SocketAddr, handler: F)
where
    F: Fn(Message) -> Message + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        while let Ok(frame) =
                            read_frame(&mut socket, DEFAULT_MAX_FRAME_BYTES).await
                        {
                            let Ok(call) = Protocol::Compact.decode(&frame) else {
                                break;
                            };
                            let reply = handler(call);
                            let Ok(bytes) = Protocol::Compact.encode(&reply) else {
                                break;
                            };
                            if write_frame(&mut socket, &bytes).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Connections seen by a tracked backend.
#[derive(Default)]
pub struct ConnectionLog {
    pub accepted: AtomicUsize,
    pub closed: AtomicUsize,
}

impl ConnectionLog {
    #[allow(dead_code)]
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until `count` connections have been closed by the peer.
    #[allow(dead_code)]
    pub async fn wait_closed(&self, count: usize) {
        for _ in 0..50 {
            if self.closed() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Like [`start_thrift_backend`], but records every accepted connection and
/// every connection the client closes. `None` from `handler` leaves the call
/// unanswered.
#[allow(dead_code)]
pub async fn start_tracked_backend<F>(addr: SocketAddr, handler: F) -> Arc<ConnectionLog>
where
    F: Fn(Message) -> Option<Message> + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let handler = Arc::new(handler);
    let log = Arc::new(ConnectionLog::default());
    let tracked = log.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tracked.accepted.fetch_add(1, Ordering::SeqCst);
            let handler = handler.clone();
            let tracked = tracked.clone();
            tokio::spawn(async move {
                // Runs until the client closes its end.
                while let Ok(frame) = read_frame(&mut socket, DEFAULT_MAX_FRAME_BYTES).await {
                    let Ok(call) = Protocol::Compact.decode(&frame) else {
                        break;
                    };
                    let Some(reply) = handler(call) else {
                        continue;
                    };
                    let Ok(bytes) = Protocol::Compact.encode(&reply) else {
                        break;
                    };
                    if write_frame(&mut socket, &bytes).await.is_err() {
                        break;
                    }
                }
                tracked.closed.fetch_add(1, Ordering::SeqCst);
            });
        }
    });
    log
}

/// Start the relay on `addr` and wait until it accepts connections.
#[allow(dead_code)]
pub async fn start_relay(addr: SocketAddr, mut config: RelayConfig) -> Shutdown {
    config.listener.host = addr.ip().to_string();
    config.listener.port = addr.port();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// POST a JSON-encoded call to a bridge endpoint and decode the reply.
#[allow(dead_code)]
pub async fn post_call(client: &reqwest::Client, url: &str, call: &Message) -> Message {
    let body = Protocol::Json.encode(call).unwrap();
    let res = client.post(url).body(body).send().await.expect("relay unreachable");
    assert_eq!(res.status(), 200);
    let bytes = res.bytes().await.unwrap();
    Protocol::Json.decode(&bytes).unwrap()
}

/// Reply to `call` with `value` as the success field.
#[allow(dead_code)]
pub fn success(call: &Message, value: impl Into<Value>) -> Message {
    Message::reply(&call.header(), Struct::new().with(0, value))
}
