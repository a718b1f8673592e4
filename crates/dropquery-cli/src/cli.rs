//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dropquery_core::{SummaryFrequency, UsageFrequency, UsagePurpose};
use dropquery_types::{DisplayUnit, ModelTag};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Reusable output arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "dropquery")]
#[command(author, version, about = "Track the water footprint of your AI queries", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DROPQUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ledger database (overrides [storage] path in the config)
    #[arg(long, global = true, env = "DROPQUERY_DB")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show today's, this week's and lifetime usage
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List recorded queries or archived daily totals
    History {
        #[command(flatten)]
        output: OutputArgs,

        /// Only records attributed to this model
        #[arg(short, long, value_parser = parse_model)]
        model: Option<ModelTag>,

        /// Only records on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Only records on or before this date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,

        /// Maximum number of records (0 for all)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        /// Show archived daily totals instead of individual queries
        #[arg(long)]
        daily: bool,
    },

    /// Record one query by hand
    Record {
        /// Model the query went to (unknown names count as ai-service)
        model: String,

        /// Volume in ml (defaults to the configured estimate for the model)
        #[arg(long)]
        volume: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Erase all usage data and start over
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show or change the display unit
    Unit {
        /// New unit (ml, gallons, ounces)
        #[arg(value_parser = parse_unit, conflicts_with = "next")]
        unit: Option<DisplayUnit>,

        /// Switch to the next unit in the cycle
        #[arg(long)]
        next: bool,
    },

    /// Print an impact message for today's usage
    Message {
        /// Daily usage in ml (defaults to the ledger)
        #[arg(long)]
        daily: Option<f64>,

        /// Average usage in ml (defaults to the ledger)
        #[arg(long)]
        average: Option<f64>,

        /// Print the periodic summary text instead
        #[arg(long, value_parser = parse_frequency)]
        summary: Option<SummaryFrequency>,

        /// Seed for message selection (for reproducible output)
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check whether a request would be counted as an AI query
    Classify {
        /// Request URL
        url: String,

        /// HTTP method
        #[arg(short, long, default_value = "POST")]
        method: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a recorded page-event trace through the detectors
    Replay {
        /// JSON-lines trace file, or '-' for stdin
        input: PathBuf,

        /// Use a throwaway in-memory ledger
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Complete the onboarding survey
    Onboard {
        /// How often you use AI assistants
        #[arg(long, value_enum, default_value = "sometimes")]
        frequency: FrequencyArg,

        /// What you mostly use them for
        #[arg(long, value_enum, default_value = "other")]
        purpose: PurposeArg,

        /// Daily screen time in hours
        #[arg(long, default_value = "4")]
        screen_time: f64,

        /// How aware you were of AI water use
        #[arg(long)]
        awareness: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Survey answer for usage frequency
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Daily,
    Sometimes,
    Never,
}

impl From<FrequencyArg> for UsageFrequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Daily => UsageFrequency::Daily,
            FrequencyArg::Sometimes => UsageFrequency::Sometimes,
            FrequencyArg::Never => UsageFrequency::Never,
        }
    }
}

/// Survey answer for usage purpose
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PurposeArg {
    Roleplay,
    Discussion,
    Tool,
    Other,
}

impl From<PurposeArg> for UsagePurpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Roleplay => UsagePurpose::Roleplay,
            PurposeArg::Discussion => UsagePurpose::Discussion,
            PurposeArg::Tool => UsagePurpose::Tool,
            PurposeArg::Other => UsagePurpose::Other,
        }
    }
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the configuration for invalid values
    Validate,
}

fn parse_model(s: &str) -> Result<ModelTag, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_unit(s: &str) -> Result<DisplayUnit, String> {
    s.parse()
        .map_err(|_| format!("Invalid unit '{}'. Use: ml, gallons, ounces", s))
}

fn parse_frequency(s: &str) -> Result<SummaryFrequency, String> {
    s.parse()
        .map_err(|_| format!("Invalid frequency '{}'. Use: daily, weekly, yearly", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!(parse_unit("oz"), Ok(DisplayUnit::Ounces));
        assert!(parse_unit("cups").is_err());
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("Weekly"), Ok(SummaryFrequency::Weekly));
        assert!(parse_frequency("hourly").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["dropquery", "status", "--database", "x.db", "-q"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.database, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn test_unit_and_next_conflict() {
        assert!(Cli::try_parse_from(["dropquery", "unit", "ml", "--next"]).is_err());
    }
}
