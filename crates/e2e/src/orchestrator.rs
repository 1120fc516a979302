//! Orchestrator: owns the browser page, backend client, registry and visual
//! tester, and runs presets against them

use std::path::{Path, PathBuf};

use tracing::{error, info};

use resq_common::BackendClient;

use crate::command::CommandContext;
use crate::config::{HarnessConfig, PresetDefinition};
use crate::error::E2eResult;
use crate::page::Page;
use crate::playwright::PlaywrightPage;
use crate::preset::{CommandFactory, PresetRegistry};
use crate::suite::SuiteResult;
use crate::visual::VisualTester;

/// Runs named presets against one live page
pub struct TestOrchestrator {
    registry: PresetRegistry,
    page: Box<dyn Page>,
    api: BackendClient,
    frontend_url: String,
    visual: VisualTester,
    output_dir: PathBuf,
    screenshot_dir: PathBuf,
}

impl TestOrchestrator {
    /// Assemble an orchestrator from already-built parts
    pub fn new(
        registry: PresetRegistry,
        page: Box<dyn Page>,
        api: BackendClient,
        visual: VisualTester,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            registry,
            page,
            api,
            frontend_url: config.frontend_url.clone(),
            visual,
            output_dir: config.output_dir.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
        }
    }

    /// Build the registry from `config` and attach `page`.
    ///
    /// Every custom preset in the config is resolved here, so a bad command
    /// name is reported before a browser does anything.
    pub fn with_page(config: &HarnessConfig, page: Box<dyn Page>) -> E2eResult<Self> {
        config.validate()?;
        let registry = build_registry(config)?;
        let api = BackendClient::new(&config.backend_url)?;
        let visual = VisualTester::new(config.visual.clone())?;
        Ok(Self::new(registry, page, api, visual, config))
    }

    /// Launch Playwright and build everything from `config`
    pub async fn launch(config: &HarnessConfig) -> E2eResult<Self> {
        // Resolve presets before paying for a browser
        config.validate()?;
        build_registry(config)?;

        let page = PlaywrightPage::launch(config.playwright()).await?;
        Self::with_page(config, Box::new(page))
    }

    fn context(&self) -> CommandContext<'_> {
        CommandContext {
            page: self.page.as_ref(),
            api: &self.api,
            frontend_url: &self.frontend_url,
            visual: &self.visual,
        }
    }

    /// Run one preset by name
    pub async fn run_preset(&self, name: &str) -> E2eResult<SuiteResult> {
        let suite = self.registry.get(name)?;
        let result = suite.run(&self.context()).await;

        if result.success() {
            info!(
                "Preset '{}': {} passed, {} skipped ({} ms)",
                name, result.passed, result.skipped, result.duration_ms
            );
        } else {
            error!(
                "Preset '{}': {} failed, {} passed, {} skipped ({} ms)",
                name, result.failed, result.passed, result.skipped, result.duration_ms
            );
        }
        Ok(result)
    }

    /// Run several presets in order; every name is checked before the first runs
    pub async fn run_presets(&self, names: &[String]) -> E2eResult<Vec<SuiteResult>> {
        self.registry.check_names(names)?;

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            results.push(self.run_preset(name).await?);
        }
        Ok(results)
    }

    /// Write results as pretty JSON to `<output_dir>/test-results.json`
    pub fn write_results(&self, results: &[SuiteResult]) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, results)
    }

    /// Promote every capture in the screenshot directory to a baseline
    pub fn update_baselines(&self) -> E2eResult<Vec<String>> {
        update_baselines(&self.visual, &self.screenshot_dir)
    }

    /// Close the browser
    pub async fn shutdown(self) -> E2eResult<()> {
        info!("Shutting down browser");
        self.page.close().await
    }
}

/// Built-in catalog plus every preset declared in `config`
pub fn build_registry(config: &HarnessConfig) -> E2eResult<PresetRegistry> {
    let factory = CommandFactory::new(config.commands.clone(), config.viewport)
        .with_visual_threshold(config.visual.threshold);
    let mut registry = PresetRegistry::with_builtin(factory)?;
    for definition in &config.presets {
        registry.add_definition(definition)?;
    }
    if let Some(dir) = &config.preset_dir {
        for definition in PresetDefinition::load_all(dir)? {
            registry.add_definition(&definition)?;
        }
    }
    Ok(registry)
}

pub fn write_results(output_dir: &Path, results: &[SuiteResult]) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

pub fn update_baselines(visual: &VisualTester, screenshot_dir: &Path) -> E2eResult<Vec<String>> {
    let mut updated = Vec::new();
    if !screenshot_dir.exists() {
        return Ok(updated);
    }

    for entry in std::fs::read_dir(screenshot_dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "png").unwrap_or(false) {
            if let Some(name) = path.file_stem() {
                let name = name.to_string_lossy().to_string();
                visual.update_baseline(&name, &path)?;
                updated.push(name);
            }
        }
    }
    updated.sort();
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::visual::VisualConfig;

    #[test]
    fn test_update_baselines_from_captures() {
        let dir = tempfile::tempdir().unwrap();
        let shots = dir.path().join("shots");
        std::fs::create_dir_all(&shots).unwrap();
        image::RgbaImage::new(2, 2).save(shots.join("visual_panel.png")).unwrap();
        std::fs::write(shots.join("trace.log"), "not an image").unwrap();

        let visual = VisualTester::new(VisualConfig {
            baseline_dir: dir.path().join("baselines"),
            diff_dir: dir.path().join("diffs"),
            ..Default::default()
        })
        .unwrap();

        let updated = update_baselines(&visual, &shots).unwrap();
        assert_eq!(updated, vec!["visual_panel"]);
        assert_eq!(visual.list_baselines().unwrap(), vec!["visual_panel"]);
    }

    #[test]
    fn test_missing_screenshot_dir_updates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let visual = VisualTester::new(VisualConfig {
            baseline_dir: dir.path().join("baselines"),
            diff_dir: dir.path().join("diffs"),
            ..Default::default()
        })
        .unwrap();
        assert!(update_baselines(&visual, &dir.path().join("none")).unwrap().is_empty());
    }

    #[test]
    fn test_config_preset_with_unknown_command() {
        let config = HarnessConfig {
            presets: vec![PresetDefinition {
                name: "broken".to_string(),
                description: String::new(),
                fail_fast: false,
                timeout_secs: None,
                commands: vec!["smoke".to_string(), "warp".to_string()],
            }],
            ..Default::default()
        };
        assert!(matches!(build_registry(&config), Err(E2eError::UnknownCommand(_))));
    }
}
