//! Command factory and preset registry
//!
//! The factory turns a command name into a configured command; the registry
//! maps preset names to suites built from it. Both are plain values handed to
//! the orchestrator; nothing here is global.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::command::Command;
use crate::commands::{
    InvariantsCommand, PerfCommand, RobustCommand, SafeRoutesCommand, SmokeCommand, TerrainCommand,
    VisualCommand, VisualView,
};
use crate::config::{CommandSettings, PresetDefinition};
use crate::error::{E2eError, E2eResult};
use crate::page::Viewport;
use crate::suite::MacroCommand;

/// Every command name the factory knows
pub const COMMAND_NAMES: [&str; 9] = [
    "smoke",
    "invariants",
    "perf",
    "robust",
    "safe_routes",
    "terrain",
    "visual_overview",
    "visual_layers",
    "visual_panel",
];

/// Builds commands by name from shared settings
#[derive(Debug, Clone)]
pub struct CommandFactory {
    settings: CommandSettings,
    viewport: Viewport,
    visual_threshold: Option<f64>,
}

impl CommandFactory {
    pub fn new(settings: CommandSettings, viewport: Viewport) -> Self {
        Self {
            settings,
            viewport,
            visual_threshold: None,
        }
    }

    /// Override the visual tester's default threshold for `visual_*` commands
    pub fn with_visual_threshold(mut self, threshold: f64) -> Self {
        self.visual_threshold = Some(threshold);
        self
    }

    pub fn create(&self, name: &str) -> E2eResult<Box<dyn Command>> {
        let s = &self.settings;
        let timeout = s.command_timeout();

        let command: Box<dyn Command> = match name {
            "smoke" => Box::new(SmokeCommand::new(&s.map_selector, timeout)),
            "invariants" => Box::new(InvariantsCommand::new(s.expected_layers.clone(), timeout)),
            "perf" => Box::new(PerfCommand::new(s.perf_budget, &s.map_selector, timeout)),
            "robust" => Box::new(RobustCommand::new(s.robust, &s.map_selector, self.viewport, timeout)),
            "safe_routes" => Box::new(SafeRoutesCommand::new(&s.scenario, timeout)?),
            "terrain" => Box::new(TerrainCommand::new(s.terrain_probe, timeout)?),
            "visual_overview" => self.visual(VisualView::Overview, timeout),
            "visual_layers" => self.visual(VisualView::Layers, timeout),
            "visual_panel" => self.visual(VisualView::Panel, timeout),
            other => return Err(E2eError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    fn visual(&self, view: VisualView, timeout: Duration) -> Box<dyn Command> {
        let mut command = VisualCommand::new(
            view,
            &self.settings.map_selector,
            &self.settings.panel_toggle_selector,
            timeout,
        );
        if let Some(threshold) = self.visual_threshold {
            command = command.with_threshold(threshold);
        }
        Box::new(command)
    }

    /// Resolve every name before building the suite, so a typo fails up front
    pub fn suite(
        &self,
        name: &str,
        description: &str,
        command_names: &[&str],
        fail_fast: bool,
    ) -> E2eResult<MacroCommand> {
        if let Some(unknown) = command_names.iter().find(|n| !COMMAND_NAMES.contains(*n)) {
            return Err(E2eError::UnknownCommand(unknown.to_string()));
        }

        let mut suite = MacroCommand::new(name, description)
            .with_fail_fast(fail_fast)
            .with_timeout(self.settings.suite_timeout());
        for command_name in command_names {
            suite = suite.with_command(self.create(command_name)?);
        }
        Ok(suite)
    }
}

/// Name → suite lookup, populated once
pub struct PresetRegistry {
    factory: CommandFactory,
    presets: BTreeMap<String, MacroCommand>,
}

impl PresetRegistry {
    /// Registry holding the built-in catalog
    pub fn with_builtin(factory: CommandFactory) -> E2eResult<Self> {
        let mut registry = Self {
            factory,
            presets: BTreeMap::new(),
        };

        for (name, description) in [
            ("smoke", "Backend answers and the dashboard loads"),
            ("invariants", "Map layer stack is consistent"),
            ("perf", "Page load stays within budget"),
            ("robust", "Map survives fault injection"),
            ("safe_routes", "Routing endpoints return drawable routes"),
            ("terrain", "3D terrain toggles and answers elevation queries"),
            ("visual_overview", "Full-page visual regression"),
            ("visual_layers", "Map layer visual regression"),
            ("visual_panel", "Evacuation panel visual regression"),
        ] {
            registry.register(name, description, &[name], false)?;
        }

        registry.register(
            "visual",
            "All visual regression captures",
            &["visual_overview", "visual_layers", "visual_panel"],
            false,
        )?;
        registry.register(
            "map-core",
            "Smoke, layer invariants and performance; stops at the first failure",
            &["smoke", "invariants", "perf"],
            true,
        )?;
        registry.register("full", "Every command in the catalog", &COMMAND_NAMES, false)?;

        Ok(registry)
    }

    fn register(
        &mut self,
        name: &str,
        description: &str,
        command_names: &[&str],
        fail_fast: bool,
    ) -> E2eResult<()> {
        if self.presets.contains_key(name) {
            return Err(E2eError::DuplicatePreset(name.to_string()));
        }
        let suite = self.factory.suite(name, description, command_names, fail_fast)?;
        debug!("Registered preset '{}' {:?}", name, suite.command_names());
        self.presets.insert(name.to_string(), suite);
        Ok(())
    }

    /// Register `name` as the given commands, in order
    pub fn add_custom_preset(&mut self, name: &str, command_names: &[&str]) -> E2eResult<()> {
        self.register(name, "Custom preset", command_names, false)
    }

    pub fn add_definition(&mut self, definition: &PresetDefinition) -> E2eResult<()> {
        definition.validate()?;
        let names: Vec<&str> = definition.commands.iter().map(String::as_str).collect();
        let description = if definition.description.is_empty() {
            "Custom preset"
        } else {
            definition.description.as_str()
        };
        self.register(&definition.name, description, &names, definition.fail_fast)?;

        if let Some(secs) = definition.timeout_secs {
            if let Some(suite) = self.presets.remove(&definition.name) {
                let suite = suite.with_timeout(Duration::from_secs(secs));
                self.presets.insert(definition.name.clone(), suite);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> E2eResult<&MacroCommand> {
        self.presets
            .get(name)
            .ok_or_else(|| E2eError::UnknownPreset(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Fails on the first name with no preset
    pub fn check_names(&self, names: &[String]) -> E2eResult<()> {
        match names.iter().find(|n| !self.contains(n)) {
            Some(unknown) => Err(E2eError::UnknownPreset(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Presets in name order
    pub fn iter(&self) -> impl Iterator<Item = &MacroCommand> {
        self.presets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn registry() -> PresetRegistry {
        let factory = CommandFactory::new(CommandSettings::default(), Viewport::default());
        PresetRegistry::with_builtin(factory).unwrap()
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = registry();
        for name in COMMAND_NAMES {
            assert!(registry.contains(name), "missing preset {}", name);
        }
        let core = registry.get("map-core").unwrap();
        assert_eq!(core.command_names(), vec!["smoke", "invariants", "perf"]);
        assert!(core.is_fail_fast());
        assert_eq!(registry.get("full").unwrap().len(), COMMAND_NAMES.len());
    }

    #[test]
    fn test_factory_names_match_commands() {
        let factory = CommandFactory::new(CommandSettings::default(), Viewport::default());
        for name in COMMAND_NAMES {
            assert_eq!(factory.create(name).unwrap().name(), name);
        }
    }

    #[test_case("Smoke" ; "names are case sensitive")]
    #[test_case("map-core" ; "preset name is not a command")]
    #[test_case("" ; "empty")]
    fn test_factory_rejects(name: &str) {
        let factory = CommandFactory::new(CommandSettings::default(), Viewport::default());
        assert!(matches!(factory.create(name), Err(E2eError::UnknownCommand(_))));
    }

    #[test]
    fn test_custom_preset_with_unknown_command() {
        let mut registry = registry();
        let err = registry
            .add_custom_preset("broken", &["smoke", "teleport"])
            .unwrap_err();
        assert!(matches!(err, E2eError::UnknownCommand(ref n) if n == "teleport"));
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_custom_preset_keeps_order() {
        let mut registry = registry();
        registry
            .add_custom_preset("routes-then-smoke", &["safe_routes", "smoke"])
            .unwrap();
        let suite = registry.get("routes-then-smoke").unwrap();
        assert_eq!(suite.command_names(), vec!["safe_routes", "smoke"]);
        assert!(!suite.is_fail_fast());
    }

    #[test]
    fn test_duplicate_and_unknown_presets() {
        let mut registry = registry();
        assert!(matches!(
            registry.add_custom_preset("smoke", &["smoke"]),
            Err(E2eError::DuplicatePreset(_))
        ));
        assert!(matches!(registry.get("nope"), Err(E2eError::UnknownPreset(_))));
    }

    #[test]
    fn test_check_names() {
        let registry = registry();
        let names = vec!["smoke".to_string(), "map-core".to_string()];
        assert!(registry.check_names(&names).is_ok());

        let names = vec!["smoke".to_string(), "smok".to_string()];
        let err = registry.check_names(&names).unwrap_err();
        assert!(matches!(err, E2eError::UnknownPreset(ref n) if n == "smok"));
    }

    #[test]
    fn test_definition_timeout() {
        let mut registry = registry();
        let definition = PresetDefinition {
            name: "nightly".to_string(),
            description: String::new(),
            fail_fast: true,
            timeout_secs: Some(30),
            commands: vec!["smoke".to_string(), "perf".to_string()],
        };
        registry.add_definition(&definition).unwrap();

        let suite = registry.get("nightly").unwrap();
        assert_eq!(suite.timeout(), Duration::from_secs(30));
        assert!(suite.is_fail_fast());
    }

    #[test]
    fn test_definition_with_zero_timeout_is_rejected() {
        let mut registry = registry();
        let definition = PresetDefinition {
            name: "nightly".to_string(),
            description: String::new(),
            fail_fast: false,
            timeout_secs: Some(0),
            commands: vec!["smoke".to_string(), "perf".to_string()],
        };

        let err = registry.add_definition(&definition).unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
        assert!(!registry.contains("nightly"));
    }
}
