//! `resq presets`: list the preset catalog

use anyhow::Result;
use serde::Serialize;

use resq_e2e::orchestrator::build_registry;
use resq_e2e::MacroCommand;

use super::GlobalArgs;
use crate::output::{print_list, TableDisplay};

#[derive(Serialize)]
pub struct PresetRow {
    pub name: String,
    pub description: String,
    pub fail_fast: bool,
    pub timeout_secs: u64,
    pub commands: Vec<String>,
}

impl From<&MacroCommand> for PresetRow {
    fn from(suite: &MacroCommand) -> Self {
        Self {
            name: suite.name().to_string(),
            description: suite.description().to_string(),
            fail_fast: suite.is_fail_fast(),
            timeout_secs: suite.timeout().as_secs(),
            commands: suite.command_names().iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl TableDisplay for PresetRow {
    fn headers() -> Vec<&'static str> {
        vec!["Preset", "Commands", "Fail-fast", "Timeout", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.commands.join(", "),
            if self.fail_fast { "yes" } else { "no" }.to_string(),
            format!("{}s", self.timeout_secs),
            self.description.clone(),
        ]
    }
}

pub fn execute(globals: &GlobalArgs) -> Result<()> {
    let config = globals.harness_config()?;
    let registry = build_registry(&config)?;
    let rows: Vec<PresetRow> = registry.iter().map(PresetRow::from).collect();
    print_list(&rows, globals.format);
    Ok(())
}
