//! Core types for ResQ

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Hazard severity as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for HazardSeverity {
    fn default() -> Self {
        Self::Low
    }
}

impl std::fmt::Display for HazardSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HazardSeverity::Low => write!(f, "low"),
            HazardSeverity::Medium => write!(f, "medium"),
            HazardSeverity::High => write!(f, "high"),
            HazardSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A hazard polygon rendered on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardZone {
    pub id: String,
    #[serde(default)]
    pub hazard_type: String,
    #[serde(default)]
    pub severity: HazardSeverity,
    /// GeoJSON geometry, passed through untouched
    #[serde(default)]
    pub geometry: serde_json::Value,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// A route between two points, as returned by the routing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub id: String,
    /// Ordered `[lon, lat]` pairs
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub hazards_avoided: Vec<String>,
}

impl Route {
    /// A route needs at least a start and an end point
    pub fn is_drawable(&self) -> bool {
        self.coordinates.len() >= 2
    }
}

/// Aggregate hazard counts for the summary panel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HazardSummary {
    #[serde(default)]
    pub total_zones: u64,
    #[serde(default)]
    pub by_severity: HashMap<String, u64>,
    #[serde(default)]
    pub by_type: HashMap<String, u64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Risk assessment around a point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub radius: f64,
    pub risk_level: String,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub nearby_hazards: Vec<String>,
}

/// Query for `/api/safe-routes`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SafeRouteQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_lon: Option<f64>,
}

impl SafeRouteQuery {
    pub fn between(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin_lat: Some(origin.latitude),
            origin_lon: Some(origin.longitude),
            destination_lat: Some(destination.latitude),
            destination_lon: Some(destination.longitude),
        }
    }
}

/// Query for `/api/evacuation-routes`
///
/// Only the keys that are set are sent to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EvacuationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_lon: Option<f64>,
}

impl EvacuationQuery {
    pub fn from_origin(origin: Coordinate) -> Self {
        Self {
            origin_lat: Some(origin.latitude),
            origin_lon: Some(origin.longitude),
            ..Default::default()
        }
    }

    pub fn with_destination(mut self, destination: Coordinate) -> Self {
        self.destination_lat = Some(destination.latitude);
        self.destination_lon = Some(destination.longitude);
        self
    }
}
