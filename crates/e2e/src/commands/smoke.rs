use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::command::{expect_bool, Command, CommandContext, Verdict};
use crate::commands::MAP_API_PRESENT;
use crate::error::E2eResult;
use crate::page::WaitState;

/// Backend answers, the dashboard loads, and the map exposes its test API
pub struct SmokeCommand {
    map_selector: String,
    timeout: Duration,
}

impl SmokeCommand {
    pub fn new(map_selector: &str, timeout: Duration) -> Self {
        Self {
            map_selector: map_selector.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Command for SmokeCommand {
    fn name(&self) -> &str {
        "smoke"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        let zones = match ctx.api.hazard_zones().await {
            Ok(zones) => zones,
            Err(e) => return Ok(Verdict::fail(format!("hazard zones unavailable: {}", e))),
        };

        ctx.page.goto(ctx.frontend_url).await?;
        ctx.page
            .wait_for_selector(&self.map_selector, WaitState::Visible, self.timeout / 2)
            .await?;

        let has_api = expect_bool(&ctx.page.evaluate(MAP_API_PRESENT).await?, "map test API probe")?;
        if !has_api {
            return Ok(Verdict::fail("window.__mapTestApi__ is not exposed"));
        }

        Ok(Verdict::pass(format!("dashboard up, {} hazard zone(s)", zones.len()))
            .with_details(json!({ "hazard_zones": zones.len() })))
    }
}
