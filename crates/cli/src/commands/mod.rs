//! CLI Commands

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use resq_e2e::HarnessConfig;

use crate::output::OutputFormat;

pub mod api;
pub mod baselines;
pub mod fairness;
pub mod presets;
pub mod run;
pub mod unit;

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Harness config file (YAML); defaults apply when it does not exist
    #[arg(long, default_value = "resq.yaml", global = true)]
    pub config: PathBuf,

    /// Backend base URL
    #[arg(long, env = "RESQ_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Dashboard URL
    #[arg(long, env = "RESQ_FRONTEND_URL", global = true)]
    pub frontend_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Config file, then environment, then flags
    pub fn harness_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = HarnessConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        config.apply_env();
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(url) = &self.frontend_url {
            config.frontend_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
