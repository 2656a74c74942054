use std::time::Duration;

use crate::ollama::OllamaError;
use crate::retrieval::IndexError;

/// Failure of a single call to an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ollama(#[from] OllamaError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Session-level failure returned by `ask`.
///
/// Finding no relevant passage is not an error; it is a normal outcome with a
/// localized message.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(#[source] ServiceError),

    #[error("answer generation failed: {0}")]
    GenerationFailed(#[source] ServiceError),

    #[error("query rewrite failed: {0}")]
    RewriteFailed(#[source] ServiceError),

    #[error("request cancelled")]
    Cancelled,
}

impl AskError {
    /// Whether retrying the same question later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AskError::RetrievalUnavailable(e)
            | AskError::GenerationFailed(e)
            | AskError::RewriteFailed(e) => matches!(
                e,
                ServiceError::Timeout(_)
                    | ServiceError::Ollama(
                        OllamaError::RateLimited
                            | OllamaError::Network(_)
                            | OllamaError::Api { code: 500..=599, .. }
                    )
            ),
            AskError::Cancelled => false,
        }
    }
}
