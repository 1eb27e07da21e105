use thiserror::Error;

/// A request against one of the REST collaborators did not yield usable data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A time-of-day field on a raw arrival could not be turned into an instant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("time of day is missing")]
    Missing,
    #[error("malformed time of day {0:?}")]
    Malformed(String),
    #[error("time of day {0:?} does not exist in the reference timezone")]
    Nonexistent(String),
}

/// The AI summary call failed. Never surfaced; callers fall back to a fixed insight.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("empty response from model")]
    Empty,
    #[error("model returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
