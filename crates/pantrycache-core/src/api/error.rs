use thiserror::Error;

/// Error taxonomy surfaced by the cache core.
///
/// Every failure is returned to the caller for user-facing presentation;
/// the core never retries on its own. The type is `Clone` because a single
/// coalesced fetch distributes its outcome to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Remote 404 - the entity no longer exists. Triggers a cache purge of
    /// the affected id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote rejected the payload. Surfaced verbatim; no cache mutation.
    #[error("rejected by server: {0}")]
    ValidationRejected(String),

    /// Network or server failure. No cache mutation; any optimistic
    /// placeholder is cleared.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            404 => ApiError::NotFound(truncated),
            400 | 409 | 422 => ApiError::ValidationRejected(truncated),
            _ => ApiError::TransportFailure(format!("status {}: {}", status, truncated)),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::TransportFailure(err.to_string())
    }
}
