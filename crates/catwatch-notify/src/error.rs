use thiserror::Error;

/// Errors returned by the messaging transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Twilio answered with a non-2xx status.
    #[error("Twilio API error (HTTP {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The configured API base URL could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A success response did not have the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
