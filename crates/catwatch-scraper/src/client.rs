use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};

use crate::error::ScraperError;

/// Pause between the homepage warm-up and the retried page request.
const DEFAULT_WARMUP_DELAY: Duration = Duration::from_secs(2);

/// Anything that can hand back the markup of a page.
pub trait PageSource {
    /// Fetch `url` and return its body.
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>> + Send;
}

/// HTTP client for the watched category page.
///
/// Sends browser-like headers and keeps a cookie store so that a visit to the
/// site's homepage can establish a session. On HTTP 403 the client makes that
/// visit once and retries the page a single time; a second 403 surfaces as
/// [`ScraperError::Blocked`].
pub struct PageClient {
    client: Client,
    warmup_delay: Duration,
}

/// Extracts the scheme+host origin from a page URL.
///
/// Given `"https://www.sheinindia.in/c/sverse-5939-37961"`, returns
/// `"https://www.sheinindia.in"`.
pub(crate) fn page_origin(url: &str) -> Result<String, ScraperError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    if parsed.host_str().is_none() {
        return Err(ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: "URL has no host".to_owned(),
        });
    }
    Ok(parsed.origin().ascii_serialization())
}

impl PageClient {
    /// Creates a `PageClient` with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            warmup_delay: DEFAULT_WARMUP_DELAY,
        })
    }

    /// Overrides the pause between the homepage warm-up and the retry.
    #[must_use]
    pub fn with_warmup_delay(mut self, delay: Duration) -> Self {
        self.warmup_delay = delay;
        self
    }

    /// Fetches `url` and returns the response body as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] — `url` has no usable origin.
    /// - [`ScraperError::Blocked`] — HTTP 403 even after the warm-up visit.
    /// - [`ScraperError::UnexpectedStatus`] — any other non-2xx status.
    /// - [`ScraperError::Http`] — network, TLS or timeout failure.
    pub async fn get_page(&self, url: &str) -> Result<String, ScraperError> {
        let origin = page_origin(url)?;
        let referer = format!("{origin}/");

        let response = self.request(url, &referer).await?;
        let response = if response.status() == StatusCode::FORBIDDEN {
            tracing::warn!(url, "page returned 403; warming up session via homepage");
            match self.request(&referer, &referer).await {
                Ok(home) => tracing::debug!(status = home.status().as_u16(), "homepage visited"),
                Err(e) => tracing::debug!(error = %e, "homepage warm-up failed"),
            }
            if !self.warmup_delay.is_zero() {
                tokio::time::sleep(self.warmup_delay).await;
            }

            let retried = self.request(url, &referer).await?;
            if retried.status() == StatusCode::FORBIDDEN {
                return Err(ScraperError::Blocked {
                    status: retried.status().as_u16(),
                    url: url.to_owned(),
                });
            }
            retried
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        tracing::debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }

    async fn request(&self, url: &str, referer: &str) -> Result<reqwest::Response, ScraperError> {
        Ok(self
            .client
            .get(url)
            .header(REFERER, referer)
            .send()
            .await?)
    }
}

impl PageSource for PageClient {
    async fn fetch_page(&self, url: &str) -> Result<String, ScraperError> {
        self.get_page(url).await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
