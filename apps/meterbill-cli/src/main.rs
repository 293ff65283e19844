//! # meterbill CLI entry point
//!
//! Parses arguments, loads configuration and dispatches to the command
//! handlers in the library crate.
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Initialize tracing (stderr, so stdout stays pure JSON)
//! 3. Load configuration
//! 4. Read the request document
//! 5. Run the command and print its JSON response
//!
//! A failure in steps 3 to 5 prints the `ApiError` JSON instead and exits
//! non-zero.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use meterbill_cli::{execute, load_config, read_input, ApiError, CommandKind};

/// Utility billing and payment allocation engine.
///
/// Every command reads a JSON request (a file, or stdin with `-`) and prints
/// a JSON response. Failures print `{ "code", "message" }` and exit non-zero.
#[derive(Parser, Debug)]
#[command(name = "meterbill", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to billing.toml. Overrides METERBILL_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Request file; `-` reads stdin.
    #[arg(short, long, default_value = "-")]
    input: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price a bill from a reading pair and a tariff.
    Bill(InputArgs),

    /// Apply a payment across open bills.
    Allocate(InputArgs),

    /// Validate and issue a refund against a payment.
    Refund(InputArgs),

    /// Compare expected daily totals with recorded payments.
    Reconcile(InputArgs),

    /// Total one day's payments by method or channel.
    Collections(InputArgs),

    /// Check a batch of meter readings.
    ValidateReadings(InputArgs),

    /// Print the effective configuration as TOML.
    ShowConfig,
}

impl Command {
    fn split(&self) -> Option<(CommandKind, &InputArgs)> {
        match self {
            Command::Bill(args) => Some((CommandKind::Bill, args)),
            Command::Allocate(args) => Some((CommandKind::Allocate, args)),
            Command::Refund(args) => Some((CommandKind::Refund, args)),
            Command::Reconcile(args) => Some((CommandKind::Reconcile, args)),
            Command::Collections(args) => Some((CommandKind::Collections, args)),
            Command::ValidateReadings(args) => Some((CommandKind::ValidateReadings, args)),
            Command::ShowConfig => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err)?);
            Err(anyhow::Error::new(err).context("meterbill failed"))
        }
    }
}

/// Everything after argument parsing. The output is JSON, or TOML for
/// `show-config`.
fn run(cli: &Cli) -> Result<String, ApiError> {
    let config = load_config(cli.config.clone())?;

    let Some((kind, args)) = cli.command.split() else {
        return Ok(config.to_toml()?);
    };

    tracing::debug!(?kind, input = %args.input.display(), "Running command");
    let input = read_input(&args.input)?;
    execute(kind, &input, &config)
}

/// Logs go to stderr. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allocate_with_input() {
        let cli = Cli::try_parse_from(["meterbill", "allocate", "--input", "payment.json"]).unwrap();
        let (kind, args) = cli.command.split().unwrap();
        assert_eq!(kind, CommandKind::Allocate);
        assert_eq!(args.input, PathBuf::from("payment.json"));
    }

    #[test]
    fn test_input_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["meterbill", "validate-readings"]).unwrap();
        let (kind, args) = cli.command.split().unwrap();
        assert_eq!(kind, CommandKind::ValidateReadings);
        assert_eq!(args.input, PathBuf::from("-"));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["meterbill", "show-config", "--config", "billing.toml", "-vv"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("billing.toml")));
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.split().is_none());
    }

    #[test]
    fn test_missing_config_fails_with_config_error() {
        let cli = Cli::try_parse_from([
            "meterbill",
            "bill",
            "--config",
            "/nonexistent/meterbill/billing.toml",
        ])
        .unwrap();
        let err = run(&cli).unwrap_err();
        assert_eq!(err.code, meterbill_cli::ErrorCode::ConfigError);
    }

    #[test]
    fn test_show_config_renders_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[refund]\nreference_prefix = \"RFD\"\n").unwrap();

        let config = file.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["meterbill", "show-config", "--config", config.as_str()]).unwrap();
        let output = run(&cli).unwrap();
        assert!(output.contains("reference_prefix = \"RFD\""));
    }
}
