//! Command-line interface for the DropQuery AI water-usage ledger.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `status` | Today's, weekly and lifetime usage |
//! | `history` | Recorded queries or archived daily totals |
//! | `record` | Record one query by hand |
//! | `reset` | Erase all usage data |
//! | `unit` | Show or change the display unit |
//! | `message` | Impact message or periodic summary text |
//! | `classify` | Check whether a request counts as an AI query |
//! | `replay` | Run a page-event trace through the detectors |
//! | `onboard` | Complete the onboarding survey |
//! | `config` | Manage configuration |
//!
//! # Environment Variables
//!
//! - `DROPQUERY_CONFIG`: configuration file (overridden by `--config`)
//! - `DROPQUERY_DB`: ledger database (overridden by `--database`)
//! - `RUST_LOG`: log filter when neither `--verbose` nor `--quiet` is given

mod cli;
mod commands;
mod config;
mod format;
mod util;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dropquery_core::{Clock, SurveyAnswers, SystemClock};

use cli::{Cli, Commands};
use commands::{
    HistoryArgs, MessageArgs, cmd_classify, cmd_config, cmd_history, cmd_message, cmd_onboard,
    cmd_record, cmd_replay, cmd_reset, cmd_status, cmd_unit,
};
use config::Config;
use util::Session;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // The local offset can only be read while the process is single-threaded.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::detect());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli, clock))
}

async fn run(cli: Cli, clock: Arc<dyn Clock>) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;

    let command = match cli.command {
        Commands::Config { action } => return cmd_config(action, &config, &config_path),
        Commands::Classify {
            url,
            method,
            format,
        } => return cmd_classify(&url, &method, format),
        command => command,
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {}", error);
        }
        bail!(
            "Invalid configuration in {}; run `dropquery config validate`",
            config_path.display()
        );
    }

    let session = match &command {
        Commands::Replay { dry_run: true, .. } => Session::in_memory(&config, clock.clone())?,
        _ => Session::open(&config, cli.database.as_deref(), clock.clone())?,
    };

    let result = match command {
        Commands::Status { output } => cmd_status(&session, &output).await,
        Commands::History {
            output,
            model,
            since,
            until,
            count,
            daily,
        } => {
            cmd_history(
                &session,
                HistoryArgs {
                    output: &output,
                    model,
                    since,
                    until,
                    count,
                    daily,
                },
            )
            .await
        }
        Commands::Record {
            model,
            volume,
            format,
        } => {
            let estimates = config.estimates.volume_estimates();
            cmd_record(&session, &estimates, &model, volume, format).await
        }
        Commands::Reset { yes } => cmd_reset(&session, yes, cli.quiet).await,
        Commands::Unit { unit, next } => cmd_unit(&session, unit, next).await,
        Commands::Message {
            daily,
            average,
            summary,
            seed,
            format,
        } => {
            cmd_message(
                &session,
                config.messaging,
                MessageArgs {
                    daily,
                    average,
                    summary,
                    seed,
                    format,
                },
            )
            .await
        }
        Commands::Replay { input, format, .. } => {
            cmd_replay(
                &session,
                config.estimates.volume_estimates(),
                config.ledger.throttle_window_ms,
                clock,
                &input,
                format,
            )
            .await
        }
        Commands::Onboard {
            frequency,
            purpose,
            screen_time,
            awareness,
        } => {
            let answers = SurveyAnswers {
                usage_frequency: frequency.into(),
                usage_purpose: purpose.into(),
                screen_time_hours: screen_time,
                water_awareness: awareness,
            };
            cmd_onboard(&session, answers, cli.quiet).await
        }
        Commands::Config { .. } | Commands::Classify { .. } => Ok(()),
    };

    session.finish().await;
    result
}
