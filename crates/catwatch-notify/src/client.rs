//! Twilio Programmable Messaging client for WhatsApp alerts.
//!
//! Sends a single message per call to the `Messages.json` resource of the
//! configured account. Non-2xx responses are decoded from Twilio's error
//! envelope and surfaced as [`NotifyError::Api`].

use std::future::Future;
use std::time::Duration;

use catwatch_core::TwilioConfig;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::NotifyError;
use crate::format::truncate_body;

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Anything that can deliver a rendered alert.
pub trait Notifier {
    /// Deliver `body` to the configured recipient.
    fn notify(&self, body: &str) -> impl Future<Output = Result<SentMessage, NotifyError>> + Send;
}

/// Acknowledgement returned by Twilio for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentMessage {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Client for sending WhatsApp messages through Twilio.
///
/// Use [`TwilioClient::new`] for production or
/// [`TwilioClient::with_base_url`] to point at a mock server in tests.
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
    endpoint: Url,
}

impl TwilioClient {
    /// Creates a client pointed at the production Twilio API.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &TwilioConfig, timeout_secs: u64) -> Result<Self, NotifyError> {
        Self::with_base_url(config, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`NotifyError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        config: &TwilioConfig,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("catwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = messages_endpoint(base_url, &config.account_sid)?;

        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from: config.from.clone(),
            to: config.to.clone(),
            endpoint,
        })
    }

    /// Sends `body` as one WhatsApp message.
    ///
    /// Bodies longer than the transport ceiling are cut down with
    /// [`truncate_body`] first.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::Api`] if Twilio rejects the message.
    /// - [`NotifyError::Http`] on network failure or timeout.
    /// - [`NotifyError::Deserialize`] if the success response lacks a `sid`.
    pub async fn send_message(&self, body: &str) -> Result<SentMessage, NotifyError> {
        let body = truncate_body(body);

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", self.from.as_str()),
                ("To", self.to.as_str()),
                ("Body", &*body),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let parsed: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message: parsed.message.unwrap_or(text),
            });
        }

        let sent: SentMessage =
            serde_json::from_str(&text).map_err(|e| NotifyError::Deserialize {
                context: "Messages.json response".to_string(),
                source: e,
            })?;

        tracing::info!(sid = %sent.sid, status = ?sent.status, to = %self.to, "whatsapp alert sent");
        Ok(sent)
    }
}

impl Notifier for TwilioClient {
    async fn notify(&self, body: &str) -> Result<SentMessage, NotifyError> {
        self.send_message(body).await
    }
}

/// Builds `{base}/2010-04-01/Accounts/{sid}/Messages.json`.
fn messages_endpoint(base_url: &str, account_sid: &str) -> Result<Url, NotifyError> {
    let invalid = |reason: String| NotifyError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason,
    };

    let mut url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot be a base".to_owned()))?
        .pop_if_empty()
        .extend(["2010-04-01", "Accounts", account_sid, "Messages.json"]);
    Ok(url)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
