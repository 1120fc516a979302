use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::command::{Command, CommandContext, Verdict};
use crate::commands::invariants::LayerValidation;
use crate::commands::VALIDATE_LAYERS;
use crate::config::RobustSettings;
use crate::error::E2eResult;
use crate::page::{Viewport, WaitState};

const TOGGLE_CONNECTIVITY: &str = "(() => { \
    window.dispatchEvent(new Event('offline')); \
    window.dispatchEvent(new Event('online')); \
    return true; })()";

const MOBILE: Viewport = Viewport {
    width: 375,
    height: 667,
};

/// Fault injection: the map survives connectivity flaps, resizes and click bursts
pub struct RobustCommand {
    settings: RobustSettings,
    map_selector: String,
    viewport: Viewport,
    timeout: Duration,
}

impl RobustCommand {
    pub fn new(settings: RobustSettings, map_selector: &str, viewport: Viewport, timeout: Duration) -> Self {
        Self {
            settings,
            map_selector: map_selector.to_string(),
            viewport,
            timeout,
        }
    }
}

#[async_trait]
impl Command for RobustCommand {
    fn name(&self) -> &str {
        "robust"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        let page = ctx.page;
        // Errors from earlier commands are not ours to report
        let stale = page.take_page_errors().await?;
        debug!("Dropped {} page error(s) from before fault injection", stale.len());

        page.evaluate(TOGGLE_CONNECTIVITY).await?;

        for _ in 0..self.settings.resize_cycles {
            page.set_viewport(MOBILE).await?;
            page.set_viewport(self.viewport).await?;
        }

        page.wait_for_selector(&self.map_selector, WaitState::Visible, self.timeout / 4)
            .await?;
        for _ in 0..self.settings.click_burst {
            page.click(&self.map_selector).await?;
        }

        let validation: LayerValidation = serde_json::from_value(page.evaluate(VALIDATE_LAYERS).await?)?;
        let errors = page.take_page_errors().await?;

        let details = json!({
            "page_errors": errors,
            "layers_valid": validation.valid,
            "layer_errors": validation.errors,
            "resize_cycles": self.settings.resize_cycles,
            "click_burst": self.settings.click_burst,
        });

        let mut problems = Vec::new();
        if !errors.is_empty() {
            problems.push(format!("{} uncaught page error(s): {}", errors.len(), errors.join(" | ")));
        }
        if !validation.valid {
            problems.push("layers invalid after fault injection".to_string());
        }

        if problems.is_empty() {
            Ok(Verdict::pass("map survived fault injection").with_details(details))
        } else {
            Ok(Verdict::fail(problems.join("; ")).with_details(details))
        }
    }
}
