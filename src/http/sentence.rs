//! `GET /get_sentence_text`: text of one sentence of one communication.
//!
//! Lookup misses are answered with 200 and an `ERROR: ...` string in
//! `sentence_text`; the web UI displays whatever comes back.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::services::types::FetchRequest;
use crate::services::FetchCommunicationService;

#[derive(Debug, Deserialize)]
pub struct SentenceQuery {
    pub communication_id: String,
    pub sentence_uuid_string: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentenceText {
    pub sentence_text: String,
}

pub fn router(fetch: Arc<dyn FetchCommunicationService>) -> Router {
    Router::new()
        .route("/get_sentence_text", get(get_sentence_text))
        .with_state(fetch)
}

async fn get_sentence_text(
    State(fetch): State<Arc<dyn FetchCommunicationService>>,
    Query(query): Query<SentenceQuery>,
) -> Json<SentenceText> {
    let sentence_text = lookup_sentence_text(
        fetch.as_ref(),
        &query.communication_id,
        &query.sentence_uuid_string,
    )
    .await;
    Json(SentenceText { sentence_text })
}

/// Fetch `communication_id` and return the text of sentence `sentence_uuid`,
/// or an error string describing which lookup failed.
pub async fn lookup_sentence_text(
    fetch: &dyn FetchCommunicationService,
    communication_id: &str,
    sentence_uuid: &str,
) -> String {
    let result = match fetch.fetch(FetchRequest::new([communication_id])).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(communication_id, error = %e, "Sentence lookup fetch failed");
            return format!("ERROR: Failed to fetch Communication with ID {communication_id}: {e}");
        }
    };

    match result.communications().as_slice() {
        [comm] => comm
            .sentence_text(sentence_uuid)
            .unwrap_or_else(|| format!("ERROR: Could not find Sentence with UUID {sentence_uuid}")),
        _ => format!("ERROR: Could not find Communication with ID {communication_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::fetch::doubles::CountingFetch;
    use crate::services::types::fixtures::communication;

    fn backend() -> CountingFetch {
        let mut backend = CountingFetch::default();
        let spans = [("s1", 0, 12), ("s2", 13, 17)];
        backend
            .store
            .insert("c1".into(), communication("c1", "Hello there. Bye.", &spans));
        backend
    }

    #[tokio::test]
    async fn returns_sentence_span() {
        assert_eq!(lookup_sentence_text(&backend(), "c1", "s2").await, "Bye.");
    }

    #[tokio::test]
    async fn misses_are_error_strings() {
        let text = lookup_sentence_text(&backend(), "doesnotexist", "s1").await;
        assert_eq!(text, "ERROR: Could not find Communication with ID doesnotexist");

        let text = lookup_sentence_text(&backend(), "c1", "nope").await;
        assert_eq!(text, "ERROR: Could not find Sentence with UUID nope");
    }

    #[tokio::test]
    async fn backend_failure_is_error_string() {
        let backend = backend();
        backend.failing.store(true, std::sync::atomic::Ordering::SeqCst);
        let text = lookup_sentence_text(&backend, "c1", "s1").await;
        assert!(text.starts_with("ERROR: Failed to fetch Communication with ID c1"));
    }
}
