use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::command::{Command, CommandContext, Verdict};
use crate::config::PerfBudget;
use crate::error::E2eResult;
use crate::page::WaitState;

const NAVIGATION_TIMINGS: &str = r#"(() => {
  const nav = performance.getEntriesByType('navigation')[0];
  const fcp = performance.getEntriesByName('first-contentful-paint')[0];
  return {
    dom_content_loaded_ms: nav ? nav.domContentLoadedEventEnd : null,
    load_ms: nav && nav.loadEventEnd > 0 ? nav.loadEventEnd : null,
    first_contentful_paint_ms: fcp ? fcp.startTime : null,
  };
})()"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTimings {
    pub dom_content_loaded_ms: Option<f64>,
    pub load_ms: Option<f64>,
    pub first_contentful_paint_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetViolation {
    pub metric: &'static str,
    pub value_ms: f64,
    pub budget_ms: f64,
}

/// Every measured timing above its budget; unmeasured timings are ignored
pub fn over_budget(timings: &PageTimings, budget: &PerfBudget) -> Vec<BudgetViolation> {
    [
        ("dom_content_loaded", timings.dom_content_loaded_ms, budget.max_dom_content_loaded_ms),
        ("load", timings.load_ms, budget.max_load_ms),
        (
            "first_contentful_paint",
            timings.first_contentful_paint_ms,
            budget.max_first_contentful_paint_ms,
        ),
    ]
    .into_iter()
    .filter_map(|(metric, value, max)| {
        value
            .filter(|v| *v > max)
            .map(|value_ms| BudgetViolation {
                metric,
                value_ms,
                budget_ms: max,
            })
    })
    .collect()
}

/// A fresh page load stays within the performance budget
pub struct PerfCommand {
    budget: PerfBudget,
    map_selector: String,
    timeout: Duration,
}

impl PerfCommand {
    pub fn new(budget: PerfBudget, map_selector: &str, timeout: Duration) -> Self {
        Self {
            budget,
            map_selector: map_selector.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Command for PerfCommand {
    fn name(&self) -> &str {
        "perf"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        ctx.page.goto(ctx.frontend_url).await?;
        ctx.page
            .wait_for_selector(&self.map_selector, WaitState::Visible, self.timeout / 2)
            .await?;

        let timings: PageTimings = serde_json::from_value(ctx.page.evaluate(NAVIGATION_TIMINGS).await?)?;
        let violations = over_budget(&timings, &self.budget);
        let details = json!({ "timings": timings, "budget": self.budget, "violations": violations });

        if violations.is_empty() {
            return Ok(Verdict::pass("page load within budget").with_details(details));
        }

        let summary = violations
            .iter()
            .map(|v| format!("{} {:.0}ms > {:.0}ms", v.metric, v.value_ms, v.budget_ms))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Verdict::fail(format!("over budget: {}", summary)).with_details(details))
    }
}
