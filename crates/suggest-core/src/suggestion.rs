//! Suggestion types returned by the remote service.

use serde::{Deserialize, Serialize};

/// A single candidate returned by the suggestion service.
///
/// `data` is the domain payload and is opaque to the widget core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion<T> {
    /// Display value shown in the list and written into the input on commit.
    pub value: String,

    /// Fully qualified value, independent of any active restrictions.
    #[serde(default)]
    pub unrestricted_value: String,

    /// Domain payload.
    pub data: T,
}

impl<T> Suggestion<T> {
    /// Create a suggestion whose unrestricted value equals its display value.
    pub fn new(value: impl Into<String>, data: T) -> Self {
        let value = value.into();
        Self {
            unrestricted_value: value.clone(),
            value,
            data,
        }
    }

    /// Set the unrestricted value.
    pub fn with_unrestricted(mut self, unrestricted_value: impl Into<String>) -> Self {
        self.unrestricted_value = unrestricted_value.into();
        self
    }
}

/// Response envelope of the suggestion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsResponse<T> {
    #[serde(default = "Vec::new")]
    pub suggestions: Vec<Suggestion<T>>,
}
