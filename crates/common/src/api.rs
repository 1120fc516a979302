//! Backend HTTP client for the dashboard's REST endpoints

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{
    EvacuationQuery, HazardSummary, HazardZone, RiskAssessment, Route, SafeRouteQuery,
};

/// Radius (km) used by `/api/risk-assessment` when the caller gives none
pub const DEFAULT_RISK_RADIUS: f64 = 10.0;

const NO_PARAMS: &[(&str, &str)] = &[];

#[derive(Serialize)]
struct RiskParams {
    latitude: f64,
    longitude: f64,
    radius: f64,
}

/// Client for the dashboard backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client with a default 10s request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(base_url));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/hazard-zones`
    pub async fn hazard_zones(&self) -> Result<Vec<HazardZone>> {
        self.get("/api/hazard-zones", NO_PARAMS).await
    }

    /// `GET /api/safe-routes`
    pub async fn safe_routes(&self, query: &SafeRouteQuery) -> Result<Vec<Route>> {
        self.get("/api/safe-routes", query).await
    }

    /// `GET /api/hazard-summary`
    pub async fn hazard_summary(&self) -> Result<HazardSummary> {
        self.get("/api/hazard-summary", NO_PARAMS).await
    }

    /// `GET /api/risk-assessment`; `radius` falls back to [`DEFAULT_RISK_RADIUS`]
    pub async fn risk_assessment(
        &self,
        latitude: f64,
        longitude: f64,
        radius: Option<f64>,
    ) -> Result<RiskAssessment> {
        let params = RiskParams {
            latitude,
            longitude,
            radius: radius.unwrap_or(DEFAULT_RISK_RADIUS),
        };
        self.get("/api/risk-assessment", &params).await
    }

    /// `GET /api/evacuation-routes`
    pub async fn evacuation_routes(&self, query: &EvacuationQuery) -> Result<Vec<Route>> {
        self.get("/api/evacuation-routes", query).await
    }

    async fn get<Q, T>(&self, path: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
