//! Error types for the remote client and the caller facade.

use thiserror::Error;

/// Classification of a failed remote call. The `Display` text is what callers
/// see in `AiResponse::Failure`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("an API key is required for the remote AI provider")]
    MissingApiKey,

    #[error("invalid API key: the AI service rejected the credentials")]
    InvalidApiKey,

    #[error("rate limit exceeded: wait before sending more AI requests")]
    RateLimited,

    #[error("AI service temporarily unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    #[error("AI service returned HTTP status {0}")]
    Status(u16),

    #[error("network error contacting AI service: {0}")]
    Transport(String),

    #[error("malformed response from AI service: {0}")]
    Malformed(String),

    #[error("empty response from AI service: {0}")]
    Empty(&'static str),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl RemoteError {
    /// Map a non-success HTTP status to its error. `None` means retry.
    pub fn from_status(status: u16, attempts: u32, max_attempts: u32) -> Option<Self> {
        match status {
            503 if attempts < max_attempts => None,
            503 => Some(Self::Unavailable { attempts }),
            429 => Some(Self::RateLimited),
            401 => Some(Self::InvalidApiKey),
            other => Some(Self::Status(other)),
        }
    }
}

/// Error returned by [`crate::ai::AiClient`] when an operation does not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("{0}")]
    Service(String),

    #[error("AI service returned an empty summary")]
    EmptySummary,
}
