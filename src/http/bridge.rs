//! HTTP to RPC bridge: one POST route per service processor.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};

use crate::http::request::request_id;
use crate::rpc::processor::{process_payload, Processor};
use crate::rpc::Protocol;

/// Exposes one [`Processor`] at one HTTP path.
pub struct BridgeEndpoint {
    processor: Arc<dyn Processor>,
    protocol: Protocol,
    content_type: HeaderValue,
    max_body_bytes: usize,
}

impl BridgeEndpoint {
    pub fn new(
        processor: Arc<dyn Processor>,
        protocol: Protocol,
        content_type: HeaderValue,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            processor,
            protocol,
            content_type,
            max_body_bytes,
        }
    }

    /// Router serving this endpoint at `path`. Only POST is routed.
    pub fn into_router(self, path: &str) -> Router {
        Router::new()
            .route(path, post(handle_call))
            .with_state(Arc::new(self))
    }
}

async fn handle_call(
    State(endpoint): State<Arc<BridgeEndpoint>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request_id = request_id(&headers).to_string();
    let declared = match declared_length(&headers) {
        Ok(len) => len,
        Err(rejection) => return rejection.into_response(),
    };
    if declared > endpoint.max_body_bytes {
        tracing::warn!(request_id = %request_id, declared, "Request body too large");
        return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
    }

    let payload = match to_bytes(body, declared).await {
        Ok(bytes) if bytes.len() == declared => bytes,
        Ok(bytes) => {
            tracing::warn!(
                request_id = %request_id,
                declared,
                received = bytes.len(),
                "Body shorter than Content-Length"
            );
            return length_mismatch();
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                declared,
                error = %e,
                "Failed to read request body"
            );
            return length_mismatch();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        service = endpoint.processor.service_name(),
        bytes = payload.len(),
        "Bridging call"
    );
    let reply = process_payload(endpoint.processor.as_ref(), endpoint.protocol, &payload).await;

    let length = reply.len();
    let mut response = Response::new(Body::from(reply));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, endpoint.content_type.clone());
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}

fn length_mismatch() -> Response {
    (StatusCode::BAD_REQUEST, "Body length does not match Content-Length").into_response()
}

fn declared_length(headers: &HeaderMap) -> Result<usize, (StatusCode, &'static str)> {
    let value = headers
        .get(header::CONTENT_LENGTH)
        .ok_or((StatusCode::LENGTH_REQUIRED, "Content-Length required"))?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .ok_or((StatusCode::BAD_REQUEST, "Invalid Content-Length"))
}
