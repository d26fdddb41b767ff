use thiserror::Error;

/// Failures while fetching the category page. Every variant aborts the run
/// before any state is touched.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blocked by {url} (HTTP {status}) after session warm-up")]
    Blocked { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid page URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A single extraction strategy gave up. Always swallowed by the cascade.
#[derive(Debug, Error)]
pub(crate) enum StrategyError {
    #[error("unparseable count \"{raw}\": {source}")]
    Count {
        raw: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("malformed embedded JSON: {0}")]
    Json(#[from] serde_json::Error),
}
