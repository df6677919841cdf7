//! lockcheck — verify a sandbox's lockdown from the inside
//!
//! Runs the fixed probe battery, prints a report and exits with 0 when the
//! lockdown is healthy, 1 when it is not, and 2 when the harness itself is
//! misconfigured.
//!
//! Usage:
//!   lockcheck [run] [--json] [--threshold N] [--port P] [--config FILE]
//!   lockcheck expectations
//!   lockcheck config

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

use lockcheck_core::{HarnessConfig, ProbeSuite, RunReport, SuiteVerdict, render_text};

const CONFIG_ERROR_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "lockcheck", version, about = "Verify sandbox lockdown from the inside")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the probe suite (default)
    Run(RunArgs),
    /// Print the expectation table
    Expectations,
    /// Print the resolved configuration
    Config,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Emit a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Minimum number of correct probes for a healthy verdict
    #[arg(long)]
    threshold: Option<usize>,

    /// Control-plane port (overrides config file and environment)
    #[arg(long)]
    port: Option<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(cli: &Cli, args: &RunArgs) -> Result<HarnessConfig> {
    let mut config =
        HarnessConfig::resolve(cli.config.as_deref()).context("Failed to resolve configuration")?;
    config.apply_port_override(args.port.as_deref(), "--port")?;
    if let Some(threshold) = args.threshold {
        config.health_threshold = threshold;
    }
    Ok(config)
}

fn run_suite(config: &HarnessConfig, json: bool) -> Result<u8> {
    let suite = ProbeSuite::lockdown(config).context("Invalid probe suite configuration")?;
    debug!("Resolved config: {:?}", config);

    let started_at = chrono::Utc::now();
    let results = suite.run();
    let verdict = SuiteVerdict::aggregate(results, suite.expectations(), config.health_threshold)
        .context("Failed to aggregate probe results")?;
    let exit_code = verdict.exit_code();

    if json {
        let report = RunReport::new(verdict, started_at);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&verdict, suite.expectations()));
    }

    info!("lockcheck finished with exit code {}", exit_code);
    Ok(exit_code)
}

fn print_expectations(config: &HarnessConfig) -> Result<u8> {
    let suite = ProbeSuite::lockdown(config)?;
    for entry in suite.expectations().entries() {
        let polarity = if entry.should_succeed {
            "must work"
        } else {
            "must be denied"
        };
        println!("{:<18} {}", entry.probe_name, polarity);
    }
    Ok(0)
}

/// Print the resolved config, but only once it would be accepted by `run`
fn print_config(config: &HarnessConfig) -> Result<u8> {
    ProbeSuite::lockdown(config)?;
    print!("{}", toml::to_string_pretty(config)?);
    Ok(0)
}

fn run(cli: Cli) -> Result<u8> {
    let default_args = RunArgs::default();
    let run_args = match &cli.command {
        Some(Command::Run(args)) => args,
        _ => &default_args,
    };
    let config = resolve_config(&cli, run_args)?;

    match &cli.command {
        None | Some(Command::Run(_)) => run_suite(&config, run_args.json),
        Some(Command::Expectations) => print_expectations(&config),
        Some(Command::Config) => print_config(&config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("lockcheck v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(CONFIG_ERROR_EXIT)
        }
    }
}
