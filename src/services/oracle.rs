use async_trait::async_trait;
use geo::{HaversineDistance, Point};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::GeoPoint;

/// Errors from a distance lookup
///
/// Every variant means the distance is unavailable. Callers must treat it as
/// "cannot tell" rather than "too far".
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Routing request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Routing service returned status {0}")]
    Status(u16),

    #[error("Invalid routing URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("No route found: {0}")]
    NoRoute(String),

    #[error("Distance lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Converts two points into a travel distance
#[async_trait]
pub trait DistanceOracle: Send + Sync {
    /// Travel distance in kilometers from `source` to `destination`
    async fn distance_km(&self, source: GeoPoint, destination: GeoPoint) -> Result<f64, OracleError>;
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// Meters
    distance: f64,
}

/// OSRM `route` service client
///
/// Uses the driving profile with no intermediate waypoints and no route
/// geometry in the response.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    /// Create a client for the given OSRM endpoint (e.g. `http://router.project-osrm.org`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the route URL, coordinates go in `lng,lat` order
    pub fn route_url(&self, source: GeoPoint, destination: GeoPoint) -> Result<Url, OracleError> {
        let raw = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url, source.lng, source.lat, destination.lng, destination.lat
        );
        let mut url = Url::parse(&raw).map_err(|e| OracleError::InvalidUrl(format!("{}: {}", raw, e)))?;
        url.query_pairs_mut().append_pair("overview", "false");
        Ok(url)
    }
}

#[async_trait]
impl DistanceOracle for OsrmClient {
    async fn distance_km(&self, source: GeoPoint, destination: GeoPoint) -> Result<f64, OracleError> {
        let url = self.route_url(source, destination)?;

        tracing::debug!("Requesting route distance: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Routing service returned {}: {}", status, body);
            return Err(OracleError::Status(status.as_u16()));
        }

        let parsed: OsrmRouteResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        if parsed.code != "Ok" {
            return Err(OracleError::NoRoute(
                parsed.message.unwrap_or(parsed.code),
            ));
        }

        let meters = parsed
            .routes
            .first()
            .map(|route| route.distance)
            .ok_or_else(|| OracleError::NoRoute("response contained no routes".into()))?;

        if !meters.is_finite() || meters < 0.0 {
            return Err(OracleError::InvalidResponse(format!("route distance {} is not usable", meters)));
        }

        Ok(meters / 1000.0)
    }
}

/// Straight-line distance on the sphere, for running without a routing service
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineOracle;

#[async_trait]
impl DistanceOracle for HaversineOracle {
    async fn distance_km(&self, source: GeoPoint, destination: GeoPoint) -> Result<f64, OracleError> {
        let from = Point::new(source.lng, source.lat);
        let to = Point::new(destination.lng, destination.lat);
        Ok(from.haversine_distance(&to) / 1000.0)
    }
}
