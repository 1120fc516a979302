//! `resq unit`: run the dashboard's own unit tests through vitest

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitCategory {
    Components,
    Hooks,
    Services,
    Utils,
    All,
}

impl UnitCategory {
    /// Source directory the category is restricted to, relative to the dashboard
    pub fn source_dir(&self) -> Option<&'static str> {
        match self {
            UnitCategory::Components => Some("src/components"),
            UnitCategory::Hooks => Some("src/hooks"),
            UnitCategory::Services => Some("src/services"),
            UnitCategory::Utils => Some("src/utils"),
            UnitCategory::All => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct UnitArgs {
    /// Which tests to run
    #[arg(value_enum, default_value = "all")]
    pub category: UnitCategory,

    /// Re-run on file changes
    #[arg(long)]
    pub watch: bool,

    /// Collect coverage
    #[arg(long)]
    pub coverage: bool,

    /// Dashboard checkout holding package.json
    #[arg(long, default_value = ".")]
    pub dashboard_dir: PathBuf,
}

/// Arguments passed to `npx`; the global `--verbose` selects the verbose reporter
pub fn vitest_args(args: &UnitArgs, verbose: bool) -> Vec<String> {
    let mut out = vec!["vitest".to_string()];
    if !args.watch {
        out.push("run".to_string());
    }
    if let Some(dir) = args.category.source_dir() {
        out.push(dir.to_string());
    }
    if args.coverage {
        out.push("--coverage".to_string());
    }
    if verbose {
        out.push("--reporter=verbose".to_string());
    }
    out
}

/// Runs vitest; `Ok(false)` when it reports failures
pub fn execute(args: UnitArgs, verbose: bool) -> Result<bool> {
    if !args.dashboard_dir.join("package.json").exists() {
        bail!("No package.json in {}", args.dashboard_dir.display());
    }

    let npx_args = vitest_args(&args, verbose);
    info!("Running npx {} in {}", npx_args.join(" "), args.dashboard_dir.display());

    let status = Command::new("npx")
        .current_dir(&args.dashboard_dir)
        .args(&npx_args)
        .status()
        .context("failed to spawn npx")?;

    Ok(status.success())
}
