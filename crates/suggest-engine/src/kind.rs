//! Suggestion kinds: per-domain request shaping and identity keys.

use serde::de::DeserializeOwned;
use serde_json::json;
use suggest_core::Suggestion;

/// A domain of suggestions (address, bank, person name, ...).
///
/// A kind turns the query text into a request payload and derives an identity
/// key for each returned item. It carries its own filters, so two widgets with
/// different filters produce different payloads and therefore different cache keys.
pub trait SuggestionKind: Send + Sync + 'static {
    /// Domain payload carried by each suggestion.
    type Data: DeserializeOwned + Clone + Send + Sync + 'static;

    /// Endpoint used when the widget config has no `url` override.
    fn default_endpoint(&self) -> &str;

    /// Request body for `query`.
    fn payload(&self, query: &str, count: usize) -> serde_json::Value;

    /// Identity key used for list diffing and de-duplication.
    fn suggestion_key(&self, suggestion: &Suggestion<Self::Data>) -> String {
        suggestion.value.clone()
    }
}

/// A kind with no filters and an untyped payload.
#[derive(Debug, Clone)]
pub struct GenericKind {
    endpoint: String,
}

impl GenericKind {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl SuggestionKind for GenericKind {
    type Data = serde_json::Value;

    fn default_endpoint(&self) -> &str {
        &self.endpoint
    }

    fn payload(&self, query: &str, count: usize) -> serde_json::Value {
        json!({ "query": query, "count": count })
    }
}
