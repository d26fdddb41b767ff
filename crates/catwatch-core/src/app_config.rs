use std::path::PathBuf;

/// Credentials and addresses for the Twilio WhatsApp transport.
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender address, e.g. `"whatsapp:+14155238886"`.
    pub from: String,
    /// Recipient address, e.g. `"whatsapp:+919900000000"`.
    pub to: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Fully resolved runtime configuration, assembled once at startup by a
/// [`crate::ConfigProvider`] and passed by reference into every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Category page being watched.
    pub url: String,
    pub check_interval_seconds: u64,
    /// Where the counts snapshot lives.
    pub storage_path: PathBuf,
    /// Where the product-tracker snapshot lives.
    pub products_storage_path: PathBuf,
    /// Scheme + host used to absolutize relative product links.
    pub product_origin: String,
    pub max_products_per_message: usize,
    /// Enables the product-card counting fallback when no total is found.
    pub count_visible_products: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub log_level: String,
    pub twilio: TwilioConfig,
}
