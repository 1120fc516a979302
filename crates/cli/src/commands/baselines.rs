//! `resq baselines`: manage visual regression baselines

use anyhow::Result;
use clap::Subcommand;

use resq_e2e::orchestrator::update_baselines;
use resq_e2e::VisualTester;

use super::GlobalArgs;
use crate::output::{print_message, print_success, print_value, OutputFormat};

#[derive(Subcommand)]
pub enum BaselineCommands {
    /// List stored baselines
    List,

    /// Promote the last run's captures to baselines
    Update,

    /// Remove diff images from earlier runs
    Clean,
}

pub fn execute(cmd: BaselineCommands, globals: &GlobalArgs) -> Result<()> {
    let config = globals.harness_config()?;
    let visual = VisualTester::new(config.visual.clone())?;

    match cmd {
        BaselineCommands::List => {
            let baselines = visual.list_baselines()?;
            if globals.format == OutputFormat::Table || globals.format == OutputFormat::Plain {
                if baselines.is_empty() {
                    println!("No baselines in {}", config.visual.baseline_dir.display());
                }
                for name in &baselines {
                    println!("{}", name);
                }
            } else {
                print_value(&baselines, globals.format);
            }
        }
        BaselineCommands::Update => {
            let updated = update_baselines(&visual, &config.screenshot_dir)?;
            if updated.is_empty() {
                print_message(
                    &format!("No captures in {}", config.screenshot_dir.display()),
                    globals.format,
                );
            } else {
                print_success(&format!("Updated {} baseline(s): {}", updated.len(), updated.join(", ")));
            }
        }
        BaselineCommands::Clean => {
            let removed = visual.clean_diffs()?;
            print_success(&format!("Removed {} diff image(s)", removed));
        }
    }
    Ok(())
}
