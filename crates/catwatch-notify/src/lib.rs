pub mod client;
pub mod error;
pub mod format;

pub use client::{Notifier, SentMessage, TwilioClient};
pub use error::NotifyError;
pub use format::{
    format_counts_message, format_products_message, format_test_message, truncate_body,
};
