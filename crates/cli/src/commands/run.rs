//! `resq run`: execute presets against the dashboard

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use resq_e2e::orchestrator::build_registry;
use resq_e2e::{Browser, CommandResult, CommandStatus, HarnessConfig, SuiteResult, TestOrchestrator};

use super::GlobalArgs;
use crate::output::{print_error, print_list, print_success, print_value, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Presets to run, in order (see `resq presets`)
    #[arg(required = true)]
    pub presets: Vec<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory of extra preset YAML files
    #[arg(long)]
    pub preset_dir: Option<PathBuf>,

    /// Visual diff threshold in percent
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Create missing visual baselines from this run's captures
    #[arg(long)]
    pub update_baselines: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(dir) = &self.preset_dir {
            config.preset_dir = Some(dir.clone());
        }
        if let Some(threshold) = self.threshold {
            config.visual.threshold = threshold;
        }
        if self.update_baselines {
            config.visual.auto_update = true;
        }
    }
}

/// One row per command across every suite
#[derive(Serialize)]
pub struct ResultRow {
    pub suite: String,
    pub command: String,
    pub status: CommandStatus,
    pub duration_ms: u64,
    pub message: String,
}

impl ResultRow {
    fn from_result(suite: &str, result: &CommandResult) -> Self {
        Self {
            suite: suite.to_string(),
            command: result.name.clone(),
            status: result.status,
            duration_ms: result.duration_ms,
            message: result.message.clone(),
        }
    }
}

impl TableDisplay for ResultRow {
    fn headers() -> Vec<&'static str> {
        vec!["Suite", "Command", "Status", "Duration", "Message"]
    }

    fn row(&self) -> Vec<String> {
        let status = match self.status {
            CommandStatus::Passed => "✓ passed",
            CommandStatus::Failed => "✗ failed",
            CommandStatus::Skipped => "- skipped",
        };
        vec![
            self.suite.clone(),
            self.command.clone(),
            status.to_string(),
            format!("{}ms", self.duration_ms),
            self.message.clone(),
        ]
    }
}

pub fn rows(results: &[SuiteResult]) -> Vec<ResultRow> {
    results
        .iter()
        .flat_map(|suite| {
            suite
                .results
                .iter()
                .map(move |r| ResultRow::from_result(&suite.suite, r))
        })
        .collect()
}

/// Runs the presets; `Ok(false)` when any command failed
pub async fn execute(args: RunArgs, globals: &GlobalArgs) -> Result<bool> {
    let mut config = globals.harness_config()?;
    args.apply(&mut config);

    check_presets(&config, &args.presets)?;

    let orchestrator = TestOrchestrator::launch(&config).await?;
    let outcome = orchestrator.run_presets(&args.presets).await;

    if let Ok(results) = &outcome {
        orchestrator.write_results(results)?;
    }
    if let Err(e) = orchestrator.shutdown().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }
    let results = outcome?;

    report(&results, globals.format);
    Ok(results.iter().all(SuiteResult::success))
}

/// Resolve every requested preset without starting a browser
pub fn check_presets(config: &HarnessConfig, names: &[String]) -> Result<()> {
    config.validate()?;
    build_registry(config)?.check_names(names)?;
    Ok(())
}

fn report(results: &[SuiteResult], format: OutputFormat) {
    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        print_value(results, format);
        return;
    }

    print_list(&rows(results), format);
    println!();
    for suite in results {
        let summary = format!(
            "{}: {} passed, {} failed, {} skipped ({} ms)",
            suite.suite, suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        if suite.success() {
            print_success(&summary);
        } else {
            print_error(&summary);
        }
    }
}
