use thiserror::Error;

/// Failure talking to the upstream search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("upstream body is not JSON: {0}")]
    Body(#[from] serde_json::Error),
}

/// Failure syncing the watchlist with its persistence boundary.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("stored watchlist is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}
