use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use resq_common::Coordinate;

use crate::command::{expect_bool, Command, CommandContext, Verdict};
use crate::error::{E2eError, E2eResult};

const API_PRESENT: &str = "typeof window.__mapTestApi3D__ !== 'undefined'";
const HAS_TERRAIN: &str = "window.__mapTestApi3D__.hasTerrain()";

/// Terrain can be switched on, queried, and switched off again
pub struct TerrainCommand {
    probe: Coordinate,
    timeout: Duration,
}

impl TerrainCommand {
    pub fn new(probe: Coordinate, timeout: Duration) -> E2eResult<Self> {
        if !probe.is_valid() {
            return Err(E2eError::Config(format!(
                "terrain probe {:?} is not a valid position",
                probe
            )));
        }
        Ok(Self { probe, timeout })
    }

    fn set_terrain(enabled: bool) -> String {
        format!("window.__mapTestApi3D__.setTerrainEnabled({})", enabled)
    }

    fn query_elevation(&self) -> String {
        format!(
            "window.__mapTestApi3D__.queryTerrainElevation({{ lng: {}, lat: {} }})",
            self.probe.longitude, self.probe.latitude
        )
    }
}

#[async_trait]
impl Command for TerrainCommand {
    fn name(&self) -> &str {
        "terrain"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        let page = ctx.page;
        if !expect_bool(&page.evaluate(API_PRESENT).await?, "3D test API probe")? {
            return Ok(Verdict::fail("window.__mapTestApi3D__ is not exposed"));
        }

        page.evaluate(&Self::set_terrain(true)).await?;
        if !expect_bool(&page.evaluate(HAS_TERRAIN).await?, "hasTerrain")? {
            return Ok(Verdict::fail("terrain still off after setTerrainEnabled(true)"));
        }

        let elevation = page.evaluate(&self.query_elevation()).await?;
        let meters = match elevation.as_f64() {
            Some(m) if m.is_finite() => m,
            _ => {
                return Ok(Verdict::fail(format!(
                    "queryTerrainElevation returned {}",
                    elevation
                )))
            }
        };

        page.evaluate(&Self::set_terrain(false)).await?;
        if expect_bool(&page.evaluate(HAS_TERRAIN).await?, "hasTerrain")? {
            return Ok(Verdict::fail("terrain still on after setTerrainEnabled(false)"));
        }

        Ok(Verdict::pass(format!("terrain toggles, elevation {:.1}m", meters)).with_details(json!({
            "probe": self.probe,
            "elevation_m": meters,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_probe() {
        let result = TerrainCommand::new(Coordinate::new(120.0, 0.0), Duration::from_secs(1));
        assert!(matches!(result, Err(E2eError::Config(_))));
    }

    #[test]
    fn test_elevation_query_is_lng_lat() {
        let cmd = TerrainCommand::new(Coordinate::new(46.5, 7.25), Duration::from_secs(1)).unwrap();
        assert_eq!(
            cmd.query_elevation(),
            "window.__mapTestApi3D__.queryTerrainElevation({ lng: 7.25, lat: 46.5 })"
        );
    }
}
