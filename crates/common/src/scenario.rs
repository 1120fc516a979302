//! Seeded evacuation scenarios
//!
//! Waypoint colours are drawn from a seeded RNG in insertion order, so two
//! builders with the same seed fed the same waypoints agree on every colour.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Origin,
    Checkpoint,
    Shelter,
    Destination,
}

impl WaypointKind {
    /// Base hue in degrees
    fn hue(&self) -> f64 {
        match self {
            WaypointKind::Origin => 210.0,
            WaypointKind::Checkpoint => 45.0,
            WaypointKind::Shelter => 130.0,
            WaypointKind::Destination => 280.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub kind: WaypointKind,
    pub position: Coordinate,
    /// `#rrggbb`
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvacuationScenario {
    pub seed: u64,
    pub waypoints: Vec<Waypoint>,
}

impl EvacuationScenario {
    /// First origin waypoint, else the first waypoint
    pub fn origin(&self) -> Option<&Waypoint> {
        self.waypoints
            .iter()
            .find(|w| w.kind == WaypointKind::Origin)
            .or_else(|| self.waypoints.first())
    }

    /// Last destination waypoint, else the last waypoint
    pub fn destination(&self) -> Option<&Waypoint> {
        self.waypoints
            .iter()
            .rev()
            .find(|w| w.kind == WaypointKind::Destination)
            .or_else(|| self.waypoints.last())
    }

    pub fn colors(&self) -> Vec<&str> {
        self.waypoints.iter().map(|w| w.color.as_str()).collect()
    }
}

pub struct ScenarioBuilder {
    seed: u64,
    rng: StdRng,
    waypoints: Vec<Waypoint>,
}

impl ScenarioBuilder {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            waypoints: Vec::new(),
        }
    }

    pub fn waypoint(mut self, name: &str, kind: WaypointKind, position: Coordinate) -> Self {
        let color = self.next_color(kind);
        self.waypoints.push(Waypoint {
            name: name.to_string(),
            kind,
            position,
            color,
        });
        self
    }

    pub fn origin(self, name: &str, position: Coordinate) -> Self {
        self.waypoint(name, WaypointKind::Origin, position)
    }

    pub fn checkpoint(self, name: &str, position: Coordinate) -> Self {
        self.waypoint(name, WaypointKind::Checkpoint, position)
    }

    pub fn shelter(self, name: &str, position: Coordinate) -> Self {
        self.waypoint(name, WaypointKind::Shelter, position)
    }

    pub fn destination(self, name: &str, position: Coordinate) -> Self {
        self.waypoint(name, WaypointKind::Destination, position)
    }

    pub fn build(self) -> Result<EvacuationScenario> {
        if self.waypoints.len() < 2 {
            return Err(Error::InvalidInput(
                "a scenario needs at least two waypoints".into(),
            ));
        }
        if let Some(bad) = self.waypoints.iter().find(|w| !w.position.is_valid()) {
            return Err(Error::InvalidInput(format!(
                "waypoint '{}' has an invalid position",
                bad.name
            )));
        }
        Ok(EvacuationScenario {
            seed: self.seed,
            waypoints: self.waypoints,
        })
    }

    fn next_color(&mut self, kind: WaypointKind) -> String {
        let hue = (kind.hue() + self.rng.gen_range(-15.0..15.0)).rem_euclid(360.0);
        let saturation = self.rng.gen_range(0.65..0.85);
        let lightness = self.rng.gen_range(0.45..0.55);
        let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}
