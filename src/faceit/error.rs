use std::time::Duration;

use super::types::PollResult;

#[derive(Debug, thiserror::Error)]
pub enum FaceitError {
    #[error("Rate limit exceeded, retry after {0:?}")]
    RateLimited(Duration),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    #[error("API error: HTTP {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl FaceitError {
    /// Whether this failure is a configuration problem rather than a passing one
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<FaceitError> for PollResult {
    fn from(err: FaceitError) -> Self {
        match err {
            FaceitError::RateLimited(retry_after) => PollResult::RateLimited(retry_after),
            FaceitError::NotFound => PollResult::NotFound,
            other => PollResult::TransientError(other.to_string()),
        }
    }
}
