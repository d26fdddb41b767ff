pub mod client;
pub mod error;
pub mod products;
pub mod signals;
mod text;

pub use client::{PageClient, PageSource};
pub use error::ScraperError;
pub use products::ProductExtractor;
pub use signals::SignalExtractor;
