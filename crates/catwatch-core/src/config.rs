use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::app_config::{AppConfig, TwilioConfig};
use crate::ConfigError;

pub const DEFAULT_URL: &str = "https://www.sheinindia.in/c/sverse-5939-37961";
pub const DEFAULT_PRODUCT_ORIGIN: &str = "https://www.sheinindia.in";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A source of [`AppConfig`], chosen once at startup.
///
/// Deployments that cannot ship a config file (CI runners) use
/// [`EnvConfigProvider`]; everything else uses [`FileConfigProvider`].
/// Providers read the process environment as it is; loading a `.env` file is
/// left to the binary.
pub trait ConfigProvider {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Assemble the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required value is missing, a value cannot
    /// be parsed, or the backing file is unreadable.
    fn load(&self) -> Result<AppConfig, ConfigError>;
}

/// On-disk configuration. Every field is optional; anything absent falls back
/// to the environment and then to the built-in default.
///
/// Parsed with `serde_yaml`, so both YAML and plain JSON files are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub url: Option<String>,
    pub check_interval_seconds: Option<u64>,
    pub storage_path: Option<PathBuf>,
    pub products_storage_path: Option<PathBuf>,
    pub product_origin: Option<String>,
    pub max_products_per_message: Option<usize>,
    pub count_visible_products: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub log_level: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_whatsapp_from: Option<String>,
    pub twilio_whatsapp_to: Option<String>,
}

/// Reads a config file, then lets environment variables override it.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<AppConfig, ConfigError> {
        let file = load_file_config(&self.path)?;
        build_app_config(&file, |key| std::env::var(key))
    }
}

/// Environment variables only; no file is consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigProvider;

impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    fn load(&self) -> Result<AppConfig, ConfigError> {
        build_app_config(&FileConfig::default(), |key| std::env::var(key))
    }
}

/// Load the config file at `path`. A missing file yields an empty
/// [`FileConfig`] so environment-only setups still work.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Layer `lookup` (normally `std::env::var`) over `file`, then over the
/// built-in defaults.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap`.
fn build_app_config<F>(file: &FileConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let env_str = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

    let string = |var: &str, file_value: Option<&String>, default: &str| -> String {
        env_str(var)
            .or_else(|| file_value.cloned())
            .unwrap_or_else(|| default.to_string())
    };

    let require = |var: &str, file_value: Option<&String>| -> Result<String, ConfigError> {
        env_str(var)
            .or_else(|| file_value.filter(|v| !v.trim().is_empty()).cloned())
            .ok_or_else(|| ConfigError::MissingKey(var.to_string()))
    };

    let url = string("CATWATCH_URL", file.url.as_ref(), DEFAULT_URL);
    let check_interval_seconds = parse_or(
        &env_str,
        "CATWATCH_CHECK_INTERVAL_SECONDS",
        file.check_interval_seconds,
        300,
    )?;
    if check_interval_seconds == 0 {
        return Err(ConfigError::InvalidValue {
            key: "CATWATCH_CHECK_INTERVAL_SECONDS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let storage_path = env_str("CATWATCH_STORAGE_PATH")
        .map(PathBuf::from)
        .or_else(|| file.storage_path.clone())
        .unwrap_or_else(|| PathBuf::from("product_counts.json"));
    let products_storage_path = env_str("CATWATCH_PRODUCTS_STORAGE_PATH")
        .map(PathBuf::from)
        .or_else(|| file.products_storage_path.clone())
        .unwrap_or_else(|| PathBuf::from("tracked_products.json"));

    let product_origin = string(
        "CATWATCH_PRODUCT_ORIGIN",
        file.product_origin.as_ref(),
        DEFAULT_PRODUCT_ORIGIN,
    )
    .trim_end_matches('/')
    .to_string();

    let max_products_per_message = parse_or(
        &env_str,
        "CATWATCH_MAX_PRODUCTS_PER_MESSAGE",
        file.max_products_per_message,
        5,
    )?;
    if max_products_per_message == 0 {
        return Err(ConfigError::InvalidValue {
            key: "CATWATCH_MAX_PRODUCTS_PER_MESSAGE".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let count_visible_products = match env_str("CATWATCH_COUNT_VISIBLE_PRODUCTS") {
        Some(raw) => parse_bool("CATWATCH_COUNT_VISIBLE_PRODUCTS", &raw)?,
        None => file.count_visible_products.unwrap_or(true),
    };

    let request_timeout_secs = parse_or(
        &env_str,
        "CATWATCH_REQUEST_TIMEOUT_SECS",
        file.request_timeout_secs,
        30,
    )?;
    let user_agent = string(
        "CATWATCH_USER_AGENT",
        file.user_agent.as_ref(),
        DEFAULT_USER_AGENT,
    );
    let log_level = string("CATWATCH_LOG_LEVEL", file.log_level.as_ref(), "info");

    let twilio = TwilioConfig {
        account_sid: require("TWILIO_ACCOUNT_SID", file.twilio_account_sid.as_ref())?,
        auth_token: require("TWILIO_AUTH_TOKEN", file.twilio_auth_token.as_ref())?,
        from: require("TWILIO_WHATSAPP_FROM", file.twilio_whatsapp_from.as_ref())?,
        to: require("TWILIO_WHATSAPP_TO", file.twilio_whatsapp_to.as_ref())?,
    };

    Ok(AppConfig {
        url,
        check_interval_seconds,
        storage_path,
        products_storage_path,
        product_origin,
        max_products_per_message,
        count_visible_products,
        request_timeout_secs,
        user_agent,
        log_level,
        twilio,
    })
}

fn parse_or<T, E>(env_str: &E, var: &str, file_value: Option<T>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: Fn(&str) -> Option<String>,
{
    match env_str(var) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                key: var.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(file_value.unwrap_or(default)),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
