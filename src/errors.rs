//! Domain error types for shopbot.
//!
//! Typed errors at module boundaries replace string-encoded errors and
//! enable structured error handling via pattern matching.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Errors from LLM provider operations.
///
/// Used internally by the retry loop; surviving failures are folded into an
/// in-band [`crate::providers::base::LLMResponse`] with
/// `finish_reason == "error"` so a single bad call degrades the turn instead
/// of aborting it.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to read response body: {0}")]
    ResponseReadError(String),

    #[error("Failed to parse response JSON: {0}")]
    JsonParseError(String),

    #[error("Rate limited (status {status}): retry after {retry_after_ms}ms")]
    RateLimited { status: u16, retry_after_ms: u64 },

    #[error("Authentication failed (status {status}): {message}")]
    AuthError { status: u16, message: String },

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Request rejected (status {status}): {message}")]
    BadRequest { status: u16, message: String },
}

impl ProviderError {
    /// Transient failures worth retrying; auth and parse errors are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::HttpError(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::ServerError { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

/// Errors from the remote product catalog.
///
/// The tool bridge converts these into in-band `Error: ...` payloads so the
/// search role can see the failure and adjust; they only propagate as-is when
/// the catalog is called outside an exchange.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("product {0} not found")]
    NotFound(i64),

    #[error("catalog transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Per-stage failures of the recommendation pipeline.
///
/// None of these are retried automatically; each aborts the current turn and
/// is reported to the user as a short diagnostic.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The search exchange produced no message containing candidate JSON.
    #[error("the search exchange produced no product results")]
    NoResults,

    /// Candidate JSON was recovered but matched no known product-list shape.
    /// Carries the offending text for diagnostics.
    #[error("could not parse any products from the search response")]
    UnparsableResult { raw: String },

    /// The analysis role returned blank or structurally empty content.
    #[error("the analyzer returned no content")]
    EmptyAnalysis,
}
