//! Suggestion fetch engine for autocomplete widgets.
//!
//! This crate provides the runtime-facing pieces of the widget:
//! - Transport capability and request/response types
//! - Response cache with bounded entry lifetime
//! - FetchController for debounce, caching and stale-response gating
//! - Navigation state machine for the suggestion list
//! - Widget orchestrator wiring input events to the above

pub mod cache;
pub mod fetch;
pub mod kind;
pub mod navigation;
pub mod transport;
pub mod widget;

// Re-export commonly used types
pub use cache::{cache_key, CacheEntry, MemoryCache, SuggestionCache, DEFAULT_CACHE_TTL};
pub use fetch::{FetchConfig, FetchController, FetchOutcome, FetchSink, FetchSource};
pub use kind::{GenericKind, SuggestionKind};
pub use navigation::{NavPhase, Navigation, UpMove};
pub use transport::{RawResponse, Transport, TransportRequest};
pub use widget::{Commit, CommitCallback, RenderSnapshot, Widget, WidgetBuilder, WidgetId};
