//! Harness configuration, loaded from YAML with environment overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use resq_common::Coordinate;

use crate::error::{E2eError, E2eResult};
use crate::page::Viewport;
use crate::playwright::{Browser, PlaywrightConfig};
use crate::visual::VisualConfig;

pub const ENV_BACKEND_URL: &str = "RESQ_BACKEND_URL";
pub const ENV_FRONTEND_URL: &str = "RESQ_FRONTEND_URL";
pub const ENV_MAPBOX_TOKEN: &str = "MAPBOX_ACCESS_TOKEN";

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub backend_url: String,
    pub frontend_url: String,
    pub mapbox_token: Option<String>,
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    pub node_modules_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub visual: VisualConfig,
    pub commands: CommandSettings,
    /// Extra presets on top of the built-in catalog
    pub presets: Vec<PresetDefinition>,
    /// Directory of preset YAML files, one preset per file
    pub preset_dir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".to_string(),
            frontend_url: "http://127.0.0.1:5173".to_string(),
            mapbox_token: None,
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            node_modules_dir: None,
            output_dir: PathBuf::from("test-results"),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            visual: VisualConfig::default(),
            commands: CommandSettings::default(),
            presets: Vec::new(),
            preset_dir: None,
        }
    }
}

/// Settings shared by the command catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub map_selector: String,
    pub panel_toggle_selector: String,
    pub command_timeout_secs: u64,
    pub suite_timeout_secs: u64,
    pub expected_layers: Vec<String>,
    pub perf_budget: PerfBudget,
    pub scenario: ScenarioSettings,
    pub terrain_probe: Coordinate,
    pub robust: RobustSettings,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            map_selector: r#"[data-testid="map-container"]"#.to_string(),
            panel_toggle_selector: r#"[data-testid="evacuation-panel-toggle"]"#.to_string(),
            command_timeout_secs: 60,
            suite_timeout_secs: 600,
            expected_layers: vec![
                "hazard-zones".to_string(),
                "safe-routes".to_string(),
                "evacuation-routes".to_string(),
            ],
            perf_budget: PerfBudget::default(),
            scenario: ScenarioSettings::default(),
            terrain_probe: Coordinate::new(37.7749, -122.4194),
            robust: RobustSettings::default(),
        }
    }
}

impl CommandSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn suite_timeout(&self) -> Duration {
        Duration::from_secs(self.suite_timeout_secs)
    }
}

/// Page load budget, milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfBudget {
    pub max_dom_content_loaded_ms: f64,
    pub max_load_ms: f64,
    pub max_first_contentful_paint_ms: f64,
}

impl Default for PerfBudget {
    fn default() -> Self {
        Self {
            max_dom_content_loaded_ms: 3000.0,
            max_load_ms: 5000.0,
            max_first_contentful_paint_ms: 2500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    pub seed: u64,
    pub origin: Coordinate,
    pub destination: Coordinate,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            origin: Coordinate::new(37.7749, -122.4194),
            destination: Coordinate::new(37.8044, -122.2712),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustSettings {
    pub resize_cycles: u32,
    pub click_burst: u32,
}

impl Default for RobustSettings {
    fn default() -> Self {
        Self {
            resize_cycles: 5,
            click_burst: 20,
        }
    }
}

/// A named list of commands, declared in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub commands: Vec<String>,
}

impl PresetDefinition {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Rejects a zero timeout
    pub fn validate(&self) -> E2eResult<()> {
        if self.timeout_secs == Some(0) {
            return Err(E2eError::Config(format!(
                "preset '{}' has a zero timeout",
                self.name
            )));
        }
        Ok(())
    }

    /// Load every `.yaml`/`.yml` preset under `dir`
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut presets = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            debug!("Loading preset {}", entry.path().display());
            let content = std::fs::read_to_string(entry.path())?;
            presets.push(Self::from_yaml(&content)?);
        }

        Ok(presets)
    }
}

impl HarnessConfig {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Load from `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Apply `RESQ_BACKEND_URL`, `RESQ_FRONTEND_URL` and `MAPBOX_ACCESS_TOKEN`
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(url) = non_empty(ENV_FRONTEND_URL) {
            self.frontend_url = url;
        }
        if let Some(token) = non_empty(ENV_MAPBOX_TOKEN) {
            self.mapbox_token = Some(token);
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        for (what, url) in [("backend_url", &self.backend_url), ("frontend_url", &self.frontend_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(E2eError::Config(format!("{} must be an http(s) URL, got '{}'", what, url)));
            }
        }
        if self.commands.command_timeout_secs == 0 || self.commands.suite_timeout_secs == 0 {
            return Err(E2eError::Config("timeouts must be non-zero".to_string()));
        }
        for preset in &self.presets {
            preset.validate()?;
        }
        Ok(())
    }

    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            viewport: self.viewport,
            screenshot_dir: self.screenshot_dir.clone(),
            mapbox_token: self.mapbox_token.clone(),
            node_modules_dir: self.node_modules_dir.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
frontend_url: http://dashboard.local:3000
browser: firefox
viewport:
  width: 1920
  height: 1080
commands:
  expected_layers: [hazard-zones]
  perf_budget:
    max_load_ms: 8000
presets:
  - name: nightly
    fail_fast: true
    commands: [smoke, perf]
"#;
        let config = HarnessConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.frontend_url, "http://dashboard.local:3000");
        assert_eq!(config.backend_url, "http://127.0.0.1:8000");
        assert_eq!(config.browser, Browser::Firefox);
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.commands.expected_layers, vec!["hazard-zones"]);
        assert_eq!(config.commands.perf_budget.max_load_ms, 8000.0);
        assert_eq!(config.commands.perf_budget.max_dom_content_loaded_ms, 3000.0);
        assert_eq!(config.presets[0].commands, vec!["smoke", "perf"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "http://api.internal:9000"),
            (ENV_FRONTEND_URL, "  "),
            (ENV_MAPBOX_TOKEN, "pk.test"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend_url, "http://api.internal:9000");
        assert_eq!(config.frontend_url, "http://127.0.0.1:5173");
        assert_eq!(config.mapbox_token.as_deref(), Some("pk.test"));
    }

    #[test]
    fn test_validate_rejects_zero_preset_timeout() {
        let yaml = "presets:\n  - name: nightly\n    timeout_secs: 0\n    commands: [smoke, perf]\n";
        let config = HarnessConfig::from_yaml(yaml).unwrap();
        assert!(matches!(config.validate(), Err(E2eError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = HarnessConfig {
            frontend_url: "dashboard:5173".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(E2eError::Config(_))));
    }

    #[test]
    fn test_load_preset_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "name: release\ncommands: [smoke, visual_overview]\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let presets = PresetDefinition::load_all(dir.path()).unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].name, "release");
        assert!(!presets[0].fail_fast);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = HarnessConfig::load(Path::new("/nonexistent/resq.yaml")).unwrap();
        assert_eq!(config.commands.scenario.seed, 42);
    }
}
