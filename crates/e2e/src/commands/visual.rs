use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::command::{Command, CommandContext, Verdict};
use crate::commands::invariants::LayerValidation;
use crate::commands::VALIDATE_LAYERS;
use crate::error::{E2eError, E2eResult};
use crate::page::WaitState;
use crate::retry::RetryPolicy;

/// Which part of the dashboard is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualView {
    /// Whole page as first rendered
    Overview,
    /// Viewport once every map layer validates
    Layers,
    /// Viewport with the evacuation panel opened
    Panel,
}

impl VisualView {
    pub fn command_name(&self) -> &'static str {
        match self {
            VisualView::Overview => "visual_overview",
            VisualView::Layers => "visual_layers",
            VisualView::Panel => "visual_panel",
        }
    }
}

/// Capture a view and compare it with its baseline
pub struct VisualCommand {
    view: VisualView,
    map_selector: String,
    panel_toggle_selector: String,
    threshold: Option<f64>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl VisualCommand {
    pub fn new(view: VisualView, map_selector: &str, panel_toggle_selector: &str, timeout: Duration) -> Self {
        Self {
            view,
            map_selector: map_selector.to_string(),
            panel_toggle_selector: panel_toggle_selector.to_string(),
            threshold: None,
            retry: RetryPolicy::default(),
            timeout,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    async fn prepare(&self, ctx: &CommandContext<'_>) -> E2eResult<()> {
        let page = ctx.page;
        page.goto(ctx.frontend_url).await?;
        page.wait_for_selector(&self.map_selector, WaitState::Visible, self.timeout / 4)
            .await?;

        match self.view {
            VisualView::Overview => {}
            VisualView::Layers => {
                let validation: LayerValidation =
                    serde_json::from_value(page.evaluate(VALIDATE_LAYERS).await?)?;
                if !validation.valid {
                    return Err(E2eError::AssertionFailed(format!(
                        "layers invalid before capture: {}",
                        validation.errors.join("; ")
                    )));
                }
            }
            VisualView::Panel => {
                page.click(&self.panel_toggle_selector).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Command for VisualCommand {
    fn name(&self) -> &str {
        self.view.command_name()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        self.prepare(ctx).await?;

        let page = ctx.page;
        let name = self.name();
        let full_page = self.view == VisualView::Overview;
        let capture = self
            .retry
            .run(&format!("capture {}", name), move || page.screenshot(name, full_page))
            .await?;

        match ctx.visual.compare(name, &capture, self.threshold) {
            Ok(diff) if diff.baseline_created => {
                Ok(Verdict::pass("baseline created").with_details(json!(diff)))
            }
            Ok(diff) if diff.matches => Ok(Verdict::pass(format!(
                "{:.2}% pixels differ",
                diff.diff_percent
            ))
            .with_details(json!(diff))),
            Ok(diff) => Ok(Verdict::fail(format!(
                "visual regression: {:.2}% pixels differ",
                diff.diff_percent
            ))
            .with_details(json!(diff))),
            Err(E2eError::BaselineNotFound(path)) => {
                info!("No baseline for '{}' - rerun with baseline updates enabled", name);
                Ok(Verdict::pass(format!("no baseline at {}", path)))
            }
            Err(e) => Err(e),
        }
    }
}
