//! Transport capability used by the fetch controller.
//!
//! The `Transport` trait is runtime-agnostic and returns futures, allowing the
//! controller to spawn them however it wants. The controller never retries;
//! retry policy, if any, belongs to the transport.

use futures::future::BoxFuture;
use suggest_core::{Suggestion, SuggestionsResponse, TransportError};

// =============================================================================
// Request / Response
// =============================================================================

/// One outbound request to the suggestion service.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Full endpoint URL.
    pub endpoint: String,

    /// JSON body, shaped by the suggestion kind.
    pub payload: serde_json::Value,

    /// Request headers as name/value pairs.
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    /// Create a request with no headers.
    pub fn new(endpoint: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload,
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `query` field of the payload, if any.
    pub fn query(&self) -> Option<&str> {
        self.payload.get("query").and_then(|q| q.as_str())
    }
}

/// Undecoded response body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub body: serde_json::Value,
}

impl RawResponse {
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }

    /// Decode the `{"suggestions": [...]}` envelope.
    pub fn decode<T>(self) -> Result<Vec<Suggestion<T>>, TransportError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response: SuggestionsResponse<T> = serde_json::from_value(self.body)?;
        Ok(response.suggestions)
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Single-call request capability.
///
/// Implementations must return a `'static` future so the controller can move
/// it into a spawned task without borrowing the transport.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send one request.
    fn send(&self, request: TransportRequest)
        -> BoxFuture<'static, Result<RawResponse, TransportError>>;
}

// =============================================================================
// Scripted Transport for Testing
// =============================================================================


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_request_headers() {
        let request = TransportRequest::new("https://example.com", json!({"query": "Мо"}))
            .with_header("Authorization", "Token TEST_TOKEN");

        assert_eq!(request.header("authorization"), Some("Token TEST_TOKEN"));
        assert_eq!(request.header("Accept"), None);
        assert_eq!(request.query(), Some("Мо"));
    }

    #[test]
    fn test_decode_body() {
        let raw = RawResponse::new(json!({
            "suggestions": [{"value": "г Москва", "unrestricted_value": "г Москва", "data": null}]
        }));
        let items = raw.decode::<serde_json::Value>().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, "г Москва");
    }

    #[test]
    fn test_decode_malformed() {
        let raw = RawResponse::new(json!({"suggestions": "nope"}));
        let err = raw.decode::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_transport_delay() {
        let transport =
            ScriptedTransport::new(&["a"]).respond("slow", &["b"], Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        let raw = transport
            .send(TransportRequest::new("x", json!({"query": "slow"})))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(raw.decode::<serde_json::Value>().unwrap()[0].value, "b");
        assert_eq!(transport.queries(), vec!["slow".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_transport_failure() {
        let transport = ScriptedTransport::new(&[]).fail("boom", Duration::ZERO);
        let result = transport
            .send(TransportRequest::new("x", json!({"query": "boom"})))
            .await;
        assert!(result.is_err());
        assert_eq!(transport.call_count(), 1);
    }
}
