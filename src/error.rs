//! error.rs - Failure taxonomy for outbound calls
//!
//! None of these escape a component boundary: providers turn them into
//! "no quote", the dispatcher into an empty claim or a logged submit failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("malformed payload: {0}")]
    Decode(String),

    #[error("{0} is not listed")]
    NotListed(String),

    #[error("no reference-quoted pair for {0}")]
    NoReferencePair(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Fails with [`FetchError::Status`] on a non-2xx response
pub(crate) fn check_status(response: reqwest::Response) -> FetchResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::Status {
            status,
            url: response.url().to_string(),
        })
    }
}
