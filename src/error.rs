//! Error types for script loading, place fetching and widget mounting.
//!
//! Load errors are shared by every caller awaiting the same load, so they
//! are `Clone`. Field fetch errors are per-selection and never fatal to a
//! mounted widget.

use thiserror::Error;

/// Failure to load the provider script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The script element fired its error event (network error, blocked resource).
    #[error("Provider script failed to load: {src}")]
    Script { src: String },

    /// The ready callback fired but the provider namespace was not installed.
    #[error("Provider callback fired but the places namespace is missing")]
    MissingApi,

    /// The host environment refused to insert or observe the script element.
    #[error("Script host error: {0}")]
    Host(String),

    /// The load was dropped before it reported an outcome.
    #[error("Script load abandoned before completion")]
    Abandoned,
}

/// Failure to resolve a selected prediction into a full place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldFetchError {
    /// The provider rejected the field fetch.
    #[error("Place field fetch failed: {0}")]
    Fetch(String),

    /// The fetch succeeded but produced no place data.
    #[error("Place field fetch returned an empty place")]
    Empty,

    /// A requested field is absent from the fetched place.
    #[error("Fetched place is missing field '{field}'")]
    Incomplete { field: &'static str },

    /// A field is present but does not have the expected shape.
    #[error("Fetched place is malformed: {0}")]
    Malformed(String),
}

/// Failure to bring an autocomplete widget up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The provider refused to construct the widget or expose its parts.
    #[error("Autocomplete widget error: {0}")]
    Widget(String),

    /// A DOM operation on the mount point failed.
    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Autocomplete bridge is already initialized")]
    AlreadyInitialized,
}

/// Invalid loader or widget configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is empty.
    #[error("Missing configuration value: {0}")]
    MissingField(&'static str),

    /// The script base URL could not be parsed.
    #[error("Invalid script URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configuration document could not be deserialized.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FieldFetchError {
    /// Whether selecting the same prediction again could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FieldFetchError::Fetch(_))
    }
}
