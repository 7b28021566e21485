//! Error types for agquota
//!
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations. The account-scoped failures
//! (token refresh, project discovery, quota fetch) render to the exact
//! text that appears in the report's error line; only `ConfigNotFound`
//! aborts an invocation before any network activity.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for agquota operations
#[derive(Error, Debug)]
pub enum AgquotaError {
    /// OAuth refresh-token grant rejected by the token endpoint
    #[error("Token failed ({status})")]
    TokenRefreshFailed {
        /// HTTP status returned by the token endpoint
        status: u16,
    },

    /// loadCodeAssist project discovery rejected
    #[error("loadCodeAssist failed ({status})")]
    ProjectDiscoveryFailed {
        /// HTTP status returned by the discovery endpoint
        status: u16,
    },

    /// fetchAvailableModels quota call rejected
    #[error("fetchModels failed ({status})")]
    QuotaFetchFailed {
        /// HTTP status returned by the quota endpoint
        status: u16,
    },

    /// No credential store found at any candidate location
    #[error("Configuration file not found at {}", path.display())]
    ConfigNotFound {
        /// The primary expected location of the store
        path: PathBuf,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Convenience type alias for Results in agquota
pub type Result<T> = std::result::Result<T, AgquotaError>;
