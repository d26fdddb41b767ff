pub mod app_config;
pub mod config;
pub mod diff;
pub mod products;
pub mod signals;

pub use app_config::{AppConfig, TwilioConfig};
pub use config::{ConfigProvider, EnvConfigProvider, FileConfig, FileConfigProvider};
pub use diff::{compute_delta, find_new_products};
pub use products::{Category, ProductRecord, ProductState};
pub use signals::{CountsState, Delta, SignalChange, SignalMap};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config value: {0}")]
    MissingKey(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
