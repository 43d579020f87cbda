//! cli
//!
//! Command-line interface layer for play-deploy.
//!
//! # Responsibilities
//!
//! - Parse flags and environment inputs
//! - Validate configuration before any network call
//! - Build the authenticated publishing client
//! - Hand off to [`crate::engine`] and report the outcome
//!
//! # Architecture
//!
//! The CLI layer is thin. It owns the tokio runtime (current-thread; every
//! call is awaited in sequence) and the process-level concerns: logging
//! setup and exporting the failure reason for later CI steps.

pub mod args;
pub mod export;

pub use args::Cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::auth::{ServiceAccountAuth, ServiceAccountKey, TokenProvider};
use crate::core::config::{Config, ConfigLoadResult, RawInputs};
use crate::engine::{self, DeployError, Outcome};
use crate::publisher::google::GooglePlayPublisher;
use crate::ui::output::{self, Verbosity};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("play-deploy/", env!("CARGO_PKG_VERSION"));

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`. On failure the error
/// text is also exported as `FAILURE_REASON`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose_log);

    let result = execute(cli.into_raw_inputs());
    if let Err(err) = &result {
        export::export_failure_reason(&format!("{:#}", err));
    }
    result
}

/// Install the log subscriber. `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(raw: RawInputs) -> Result<()> {
    let ConfigLoadResult { config, warnings } =
        Config::from_inputs(raw).context("invalid configuration")?;
    let verbosity = Verbosity::from_flag(config.verbose_log);
    output::debug(format!("{:#?}", config), verbosity);
    for warning in &warnings {
        output::warn(warning);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(deploy(&config))
}

async fn deploy(config: &Config) -> Result<()> {
    output::section("Authenticating");
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT_VALUE)
        .build()
        .context("failed to create HTTP client")?;
    let key = ServiceAccountKey::load(&config.key, &client)
        .await
        .map_err(DeployError::from)?;
    let auth: Arc<dyn TokenProvider> = Arc::new(ServiceAccountAuth::new(key, client.clone()));
    tracing::info!(account = %auth.account(), "using service account");
    let publisher = GooglePlayPublisher::new(client, auth, config.package_name.clone());
    output::success("Authenticated client created");

    match engine::deploy(&publisher, config).await {
        Ok(report) => {
            let done = match report.outcome {
                Outcome::Validated => "dry run finished, edit validated but not committed",
                Outcome::Committed {
                    sent_for_review: true,
                } => "release published",
                Outcome::Committed {
                    sent_for_review: false,
                } => "release published, changes not sent for review",
            };
            output::success(format!(
                "{}: version codes {:?} on track {}",
                done, report.version_codes, report.track.name
            ));
            Ok(())
        }
        Err(err) => {
            if let Some(hint) = err.hint() {
                output::warn(hint);
            }
            Err(err.into())
        }
    }
}
