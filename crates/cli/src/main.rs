//! ResQ CLI - Main Entry Point
//!
//! Runs verification presets against the ResQ dashboard, queries its
//! backend, audits prediction fairness and drives the dashboard's unit tests.

use clap::{Parser, Subcommand};

use resq_cli::commands::{api, baselines, fairness, presets, run, unit, GlobalArgs};
use resq_cli::output::print_error;

/// ResQ - disaster-response dashboard verification harness
#[derive(Parser)]
#[command(name = "resq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more presets against the dashboard
    Run(run::RunArgs),

    /// List available presets
    Presets,

    /// Query the backend API
    #[command(subcommand)]
    Api(api::ApiCommands),

    /// Audit predictions for group fairness
    Fairness(fairness::FairnessArgs),

    /// Run the dashboard's unit tests
    Unit(unit::UnitArgs),

    /// Manage visual regression baselines
    #[command(subcommand)]
    Baselines(baselines::BaselineCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let globals = cli.globals;

    // Initialize logging
    let log_level = if globals.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let passed = match cli.command {
        Commands::Run(args) => run::execute(args, &globals).await?,
        Commands::Presets => {
            presets::execute(&globals)?;
            true
        }
        Commands::Api(cmd) => {
            api::execute(cmd, &globals).await?;
            true
        }
        Commands::Fairness(args) => fairness::execute(args, &globals)?,
        Commands::Unit(args) => unit::execute(args, globals.verbose)?,
        Commands::Baselines(cmd) => {
            baselines::execute(cmd, &globals)?;
            true
        }
        Commands::Version => {
            println!("ResQ CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("resq-common v{}", resq_common::VERSION);
            true
        }
    };

    if !passed {
        print_error("Checks failed");
        std::process::exit(1);
    }
    Ok(())
}
