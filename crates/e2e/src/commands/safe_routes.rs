use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use resq_common::types::Route;
use resq_common::{EvacuationQuery, EvacuationScenario, SafeRouteQuery, ScenarioBuilder};

use crate::command::{Command, CommandContext, Verdict};
use crate::config::ScenarioSettings;
use crate::error::{E2eError, E2eResult};

/// Routing endpoints answer with drawable routes for a seeded scenario
pub struct SafeRoutesCommand {
    scenario: EvacuationScenario,
    timeout: Duration,
}

impl SafeRoutesCommand {
    pub fn new(settings: &ScenarioSettings, timeout: Duration) -> E2eResult<Self> {
        let scenario = ScenarioBuilder::new(settings.seed)
            .origin("origin", settings.origin)
            .destination("destination", settings.destination)
            .build()
            .map_err(|e| E2eError::Config(format!("safe_routes scenario: {}", e)))?;
        Ok(Self { scenario, timeout })
    }

    pub fn scenario(&self) -> &EvacuationScenario {
        &self.scenario
    }
}

fn route_problems(kind: &str, routes: &[Route]) -> Vec<String> {
    if routes.is_empty() {
        return vec![format!("no {} returned", kind)];
    }
    routes
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_drawable())
        .map(|(i, r)| {
            format!(
                "{} #{} ('{}') has {} coordinate(s)",
                kind,
                i,
                r.id,
                r.coordinates.len()
            )
        })
        .collect()
}

#[async_trait]
impl Command for SafeRoutesCommand {
    fn name(&self) -> &str {
        "safe_routes"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        let (origin, destination) = match (self.scenario.origin(), self.scenario.destination()) {
            (Some(o), Some(d)) => (o.position, d.position),
            _ => return Err(E2eError::Config("scenario has no endpoints".to_string())),
        };

        let safe = ctx.api.safe_routes(&SafeRouteQuery::between(origin, destination)).await?;
        let evacuation = ctx
            .api
            .evacuation_routes(&EvacuationQuery::from_origin(origin).with_destination(destination))
            .await?;
        let risk = ctx
            .api
            .risk_assessment(origin.latitude, origin.longitude, None)
            .await?;

        let mut problems = route_problems("safe route", &safe);
        problems.extend(route_problems("evacuation route", &evacuation));
        if risk.risk_level.trim().is_empty() {
            problems.push("risk assessment has no risk level".to_string());
        }

        let details = json!({
            "seed": self.scenario.seed,
            "waypoint_colors": self.scenario.colors(),
            "safe_routes": safe.len(),
            "evacuation_routes": evacuation.len(),
            "origin_risk": risk.risk_level,
        });

        if problems.is_empty() {
            Ok(Verdict::pass(format!(
                "{} safe / {} evacuation route(s), origin risk {}",
                safe.len(),
                evacuation.len(),
                risk.risk_level
            ))
            .with_details(details))
        } else {
            Ok(Verdict::fail(problems.join("; ")).with_details(details))
        }
    }
}
