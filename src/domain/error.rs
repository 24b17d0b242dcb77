use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, TradeOpsError>;

/// Error taxonomy for the ingestion-to-intelligence pipeline.
///
/// Transient upstream failures (transport, 429) are recovered inside the
/// client with bounded backoff; what surfaces here is the terminal form.
/// Per-record failures never become errors at all — the harvester counts
/// them and moves on.
#[derive(Debug, Error)]
pub enum TradeOpsError {
    /// Upstream API returned a non-200 response that could not be recovered.
    /// A status of 0 means retries were exhausted on transport errors.
    #[error("upstream API error {status}: {body}")]
    UpstreamApi { status: u16, body: String },

    /// The OAuth token endpoint failed after all refresh attempts.
    #[error("token refresh failed after {attempts} attempts")]
    TokenRefreshFailed { attempts: u32 },

    /// The daily call budget for this kind of work is spent.
    #[error("API budget exhausted for {kind} calls")]
    BudgetExhausted { kind: String },

    /// Missing or invalid process configuration (e.g. upstream credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// A raw record could not be projected into the canonical shape.
    #[error("malformed raw record: {0}")]
    MalformedRecord(String),

    /// Request payload failed validation at the dispatch surface.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown commodity, job, or entity referenced by a caller.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TradeOpsError {
    /// Whether a fresh attempt against the upstream could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TradeOpsError::Http(_) => true,
            TradeOpsError::UpstreamApi { status, .. } => {
                *status == 429 || *status >= 500 || *status == 0
            }
            _ => false,
        }
    }
}
