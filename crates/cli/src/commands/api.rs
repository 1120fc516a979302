//! `resq api`: query the backend directly

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use resq_common::types::{HazardSummary, HazardZone, RiskAssessment, Route};
use resq_common::{BackendClient, EvacuationQuery, SafeRouteQuery};

use super::GlobalArgs;
use crate::output::{print_item, print_list, TableDisplay};

#[derive(Subcommand)]
pub enum ApiCommands {
    /// List hazard zones
    Zones,

    /// Safe routes between two points
    Routes(RouteArgs),

    /// Hazard counts by severity and type
    Summary,

    /// Risk around a point
    Risk {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius (backend default units)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Evacuation routes; only the given coordinates are sent
    Evac(RouteArgs),
}

#[derive(Args, Debug, Default)]
pub struct RouteArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub origin_lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub origin_lon: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub destination_lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub destination_lon: Option<f64>,
}

impl From<&RouteArgs> for SafeRouteQuery {
    fn from(args: &RouteArgs) -> Self {
        SafeRouteQuery {
            origin_lat: args.origin_lat,
            origin_lon: args.origin_lon,
            destination_lat: args.destination_lat,
            destination_lon: args.destination_lon,
        }
    }
}

impl From<&RouteArgs> for EvacuationQuery {
    fn from(args: &RouteArgs) -> Self {
        EvacuationQuery {
            origin_lat: args.origin_lat,
            origin_lon: args.origin_lon,
            destination_lat: args.destination_lat,
            destination_lon: args.destination_lon,
        }
    }
}

#[derive(Serialize)]
struct ZoneRow<'a>(&'a HazardZone);

impl TableDisplay for ZoneRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Type", "Severity"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.0.id.clone(),
            self.0.hazard_type.clone(),
            self.0.severity.to_string(),
        ]
    }
}

#[derive(Serialize)]
struct RouteRow<'a>(&'a Route);

impl TableDisplay for RouteRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Points", "Distance", "Duration", "Hazards avoided"]
    }

    fn row(&self) -> Vec<String> {
        let route = self.0;
        vec![
            route.id.clone(),
            route.coordinates.len().to_string(),
            route
                .distance_m
                .map(|d| format!("{:.1} km", d / 1000.0))
                .unwrap_or_else(|| "-".to_string()),
            route
                .duration_s
                .map(|s| format!("{:.0} min", s / 60.0))
                .unwrap_or_else(|| "-".to_string()),
            route.hazards_avoided.join(", "),
        ]
    }
}

impl TableDisplay for HazardSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Zones", "By severity", "By type", "Updated"]
    }

    fn row(&self) -> Vec<String> {
        let counts = |map: &std::collections::HashMap<String, u64>| {
            let mut pairs: Vec<_> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            pairs.sort();
            pairs.join(", ")
        };
        vec![
            self.total_zones.to_string(),
            counts(&self.by_severity),
            counts(&self.by_type),
            self.updated_at.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl TableDisplay for RiskAssessment {
    fn headers() -> Vec<&'static str> {
        vec!["Latitude", "Longitude", "Radius", "Risk", "Score", "Nearby hazards"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.latitude.to_string(),
            self.longitude.to_string(),
            self.radius.to_string(),
            self.risk_level.clone(),
            self.risk_score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string()),
            self.nearby_hazards.join(", "),
        ]
    }
}

pub async fn execute(cmd: ApiCommands, globals: &GlobalArgs) -> Result<()> {
    let config = globals.harness_config()?;
    let client = BackendClient::new(&config.backend_url)?;
    let format = globals.format;

    match cmd {
        ApiCommands::Zones => {
            let zones = client.hazard_zones().await?;
            let rows: Vec<_> = zones.iter().map(ZoneRow).collect();
            print_list(&rows, format);
        }
        ApiCommands::Routes(args) => {
            let routes = client.safe_routes(&SafeRouteQuery::from(&args)).await?;
            let rows: Vec<_> = routes.iter().map(RouteRow).collect();
            print_list(&rows, format);
        }
        ApiCommands::Summary => {
            print_item(&client.hazard_summary().await?, format);
        }
        ApiCommands::Risk { lat, lon, radius } => {
            print_item(&client.risk_assessment(lat, lon, radius).await?, format);
        }
        ApiCommands::Evac(args) => {
            let routes = client.evacuation_routes(&EvacuationQuery::from(&args)).await?;
            let rows: Vec<_> = routes.iter().map(RouteRow).collect();
            print_list(&rows, format);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_only_evac_query() {
        let args = RouteArgs {
            origin_lat: Some(34.05),
            origin_lon: Some(-118.25),
            ..Default::default()
        };
        let query = EvacuationQuery::from(&args);
        assert_eq!(query.origin_lat, Some(34.05));
        assert!(query.destination_lat.is_none());
    }

    #[test]
    fn test_route_row_without_metrics() {
        let route = Route {
            id: "r1".to_string(),
            coordinates: vec![[0.0, 0.0], [1.0, 1.0]],
            distance_m: Some(2500.0),
            duration_s: None,
            hazards_avoided: vec!["z1".to_string()],
        };
        assert_eq!(RouteRow(&route).row(), vec!["r1", "2", "2.5 km", "-", "z1"]);
    }
}
