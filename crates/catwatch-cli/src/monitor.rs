//! One monitoring run, and the loop that repeats it.
//!
//! A run is strictly sequential: fetch, extract, load the baseline, diff,
//! notify, persist. Fetch and extraction failures end the run before any
//! state is touched. Notification is best-effort: a failed send is logged and
//! the new snapshot is still written, so a missed alert is never replayed.

use std::future::Future;
use std::time::Duration;

use catwatch_core::{compute_delta, find_new_products, AppConfig, Category, CountsState};
use catwatch_notify::{format_counts_message, format_products_message, Notifier};
use catwatch_scraper::{PageSource, ProductExtractor, ScraperError, SignalExtractor};
use catwatch_store::{CountsStore, JsonStore, ProductStore, StoreError};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Which tracker a run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Aggregate count signals.
    Counts,
    /// Individual listings; alerts on new men's products.
    Products,
}

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error("failed to fetch page: {0}")]
    Fetch(#[from] ScraperError),

    #[error("no usable data could be extracted from {url}")]
    Extraction { url: String },

    #[error("failed to persist state: {0}")]
    Persist(#[from] StoreError),
}

/// What a successful run observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// No previous snapshot; this run's data became the baseline.
    Baseline,
    /// Nothing alert-worthy changed.
    Unchanged,
    /// Something changed and an alert was attempted.
    Changed { notified: bool },
}

pub(crate) struct Monitor<S, N> {
    url: String,
    max_products_per_message: usize,
    source: S,
    notifier: N,
    signals: SignalExtractor,
    products: ProductExtractor,
    counts_store: CountsStore,
    product_store: ProductStore,
}

impl<S, N> Monitor<S, N>
where
    S: PageSource,
    N: Notifier,
{
    pub(crate) fn new(config: &AppConfig, source: S, notifier: N) -> Self {
        Self {
            url: config.url.clone(),
            max_products_per_message: config.max_products_per_message,
            source,
            notifier,
            signals: SignalExtractor::new(config.count_visible_products),
            products: ProductExtractor::new(&config.product_origin),
            counts_store: CountsStore::new(&config.storage_path),
            product_store: ProductStore::new(&config.products_storage_path),
        }
    }

    pub(crate) async fn run_once(&self, mode: Mode) -> Result<RunOutcome, RunError> {
        match mode {
            Mode::Counts => self.run_counts_once().await,
            Mode::Products => self.run_products_once().await,
        }
    }

    pub(crate) async fn run_counts_once(&self) -> Result<RunOutcome, RunError> {
        tracing::info!(url = %self.url, "checking product counts");

        let html = self.source.fetch_page(&self.url).await?;
        let counts = self
            .signals
            .extract(&html)
            .ok_or_else(|| RunError::Extraction {
                url: self.url.clone(),
            })?;
        tracing::info!(?counts, "current counts");

        let previous = load_baseline(&self.counts_store)?;
        let now = Utc::now();

        let outcome = match previous {
            None => RunOutcome::Baseline,
            Some(previous) => match compute_delta(Some(&previous.counts), &counts) {
                None => RunOutcome::Unchanged,
                Some(delta) => {
                    tracing::info!(?delta, "changes detected");
                    let message = format_counts_message(&counts, Some(&delta), &self.url, now);
                    RunOutcome::Changed {
                        notified: self.deliver(&message).await,
                    }
                }
            },
        };

        self.counts_store.save(&CountsState::new(counts, now))?;
        log_outcome(outcome, "counts");
        Ok(outcome)
    }

    pub(crate) async fn run_products_once(&self) -> Result<RunOutcome, RunError> {
        tracing::info!(url = %self.url, "checking for new products");

        let html = self.source.fetch_page(&self.url).await?;
        let now = Utc::now();
        let current = self.products.extract(&html, now);
        if current.is_empty() {
            return Err(RunError::Extraction {
                url: self.url.clone(),
            });
        }

        // No snapshot yet means an empty id set, so every men's item is new.
        let previous = load_baseline(&self.product_store)?.unwrap_or_default();
        let new_items = find_new_products(&previous, &current, Category::Men);

        let outcome = if new_items.is_empty() {
            if previous.timestamp.is_none() {
                RunOutcome::Baseline
            } else {
                RunOutcome::Unchanged
            }
        } else {
            tracing::info!(count = new_items.len(), "new men's products found");
            for item in &new_items {
                tracing::info!(id = %item.id, name = %item.name, price = %item.price, "new product");
            }
            let message = format_products_message(&new_items, self.max_products_per_message, now);
            RunOutcome::Changed {
                notified: self.deliver(&message).await,
            }
        };

        self.product_store.save(&current)?;
        log_outcome(outcome, "products");
        Ok(outcome)
    }

    /// Sends `message`, absorbing any failure. Returns whether it went out.
    async fn deliver(&self, message: &str) -> bool {
        tracing::info!("alert preview:\n{message}");
        match self.notifier.notify(message).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to send alert; continuing");
                false
            }
        }
    }
}

/// Repeats `mode` runs every `interval` until `shutdown` resolves.
///
/// A failed run is logged and the loop carries on with the next tick.
/// `shutdown` is observed both while a run is in flight and while sleeping.
pub(crate) async fn run_loop<S, N>(
    monitor: &Monitor<S, N>,
    mode: Mode,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) where
    S: PageSource,
    N: Notifier,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            result = monitor.run_once(mode) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "monitoring run failed");
                }
            }
        }

        tokio::select! {
            () = &mut shutdown => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("monitoring stopped");
}

/// Loads the previous snapshot. A corrupt file is treated like a missing one
/// so the run rewrites it; an unreadable file fails the run.
fn load_baseline<T>(store: &JsonStore<T>) -> Result<Option<T>, RunError>
where
    T: Serialize + DeserializeOwned,
{
    match store.load() {
        Ok(previous) => Ok(previous),
        Err(e @ StoreError::Parse { .. }) => {
            tracing::error!(error = %e, "discarding unreadable state; this run becomes the baseline");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn log_outcome(outcome: RunOutcome, tracker: &str) {
    match outcome {
        RunOutcome::Baseline => tracing::info!(tracker, "initial state stored"),
        RunOutcome::Unchanged => tracing::info!(tracker, "no changes detected"),
        RunOutcome::Changed { notified } => {
            tracing::info!(tracker, notified, "changes recorded");
        }
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod tests;
