//! Core types for the suggestion widget.
//!
//! This crate contains shared data structures that are used across all suggest crates:
//! - Suggestion items returned by the remote service
//! - Navigation keys
//! - Widget configuration
//! - Error types

mod config;
mod error;
mod key;
mod suggestion;

pub use config::{
    config_dir, config_path, WidgetConfig, DEFAULT_CACHE_TTL_MS, DEFAULT_COUNT,
};
pub use error::{ConfigError, TransportError};
pub use key::NavKey;
pub use suggestion::{Suggestion, SuggestionsResponse};
