mod monitor;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use catwatch_core::{AppConfig, ConfigProvider, EnvConfigProvider, FileConfigProvider};
use catwatch_notify::{format_test_message, TwilioClient};
use catwatch_scraper::PageClient;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::monitor::{run_loop, Mode, Monitor};

#[derive(Debug, Parser)]
#[command(name = "catwatch")]
#[command(about = "Watch a category page and send WhatsApp alerts when it changes")]
struct Cli {
    /// Path to the JSON/YAML config file.
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Where configuration is read from. `auto` uses the environment only
    /// when running under GitHub Actions.
    #[arg(long, global = true, value_enum, default_value_t = ConfigSource::Auto)]
    config_source: ConfigSource,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check the page repeatedly until interrupted.
    Run {
        /// Track individual products instead of aggregate counts.
        #[arg(long)]
        products: bool,
    },
    /// Check the page once; exits non-zero if the run fails.
    Once {
        /// Track individual products instead of aggregate counts.
        #[arg(long)]
        products: bool,
    },
    /// Send a test message to verify Twilio credentials.
    TestAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigSource {
    Auto,
    File,
    Env,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config_source, &cli.config)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Run { products } => {
            let monitor = build_monitor(&config)?;
            let mode = tracker_mode(products);
            tracing::info!(
                url = %config.url,
                interval_secs = config.check_interval_seconds,
                to = %config.twilio.to,
                ?mode,
                "starting monitor; press Ctrl+C to stop"
            );
            run_loop(
                &monitor,
                mode,
                Duration::from_secs(config.check_interval_seconds),
                shutdown_signal(),
            )
            .await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Once { products } => {
            let monitor = build_monitor(&config)?;
            match monitor.run_once(tracker_mode(products)).await {
                Ok(outcome) => {
                    tracing::info!(?outcome, "run complete");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::error!(error = %e, "monitoring run failed");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::TestAlert => run_test_alert(&config).await,
    }
}

fn load_config(source: ConfigSource, path: &Path) -> anyhow::Result<AppConfig> {
    let provider = config_provider(source, path, |key| std::env::var_os(key).is_some());

    provider
        .load()
        .map_err(|e| anyhow::anyhow!("failed to load configuration ({}): {e}", provider.name()))
}

/// `auto` means environment-only when `GITHUB_ACTIONS` is set.
fn config_provider<F>(source: ConfigSource, path: &Path, is_set: F) -> Box<dyn ConfigProvider>
where
    F: Fn(&str) -> bool,
{
    let use_env = match source {
        ConfigSource::Auto => is_set("GITHUB_ACTIONS"),
        ConfigSource::File => false,
        ConfigSource::Env => true,
    };

    if use_env {
        Box::new(EnvConfigProvider)
    } else {
        Box::new(FileConfigProvider::new(path))
    }
}

fn tracker_mode(products: bool) -> Mode {
    if products {
        Mode::Products
    } else {
        Mode::Counts
    }
}

fn build_monitor(config: &AppConfig) -> anyhow::Result<Monitor<PageClient, TwilioClient>> {
    let source = PageClient::new(config.request_timeout_secs, &config.user_agent)
        .map_err(|e| anyhow::anyhow!("failed to build page client: {e}"))?;
    let notifier = TwilioClient::new(&config.twilio, config.request_timeout_secs)
        .map_err(|e| anyhow::anyhow!("failed to build Twilio client: {e}"))?;
    Ok(Monitor::new(config, source, notifier))
}

async fn run_test_alert(config: &AppConfig) -> anyhow::Result<ExitCode> {
    tracing::info!(
        account_sid = %config.twilio.account_sid,
        from = %config.twilio.from,
        to = %config.twilio.to,
        "sending test alert"
    );

    let client = TwilioClient::new(&config.twilio, config.request_timeout_secs)
        .map_err(|e| anyhow::anyhow!("failed to build Twilio client: {e}"))?;

    match client.send_message(&format_test_message(chrono::Utc::now())).await {
        Ok(sent) => {
            println!(
                "test alert sent (sid: {}, status: {})",
                sent.sid,
                sent.status.as_deref().unwrap_or("unknown")
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "test alert failed");
            eprintln!(
                "error: {e}\n\
                 check that the recipient has joined the Twilio WhatsApp sandbox, \
                 that the credentials are correct, and that numbers use the \
                 `whatsapp:+<country><number>` form"
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping monitor");
}
