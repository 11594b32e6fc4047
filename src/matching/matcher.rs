use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::matching::filters::{is_compatible, is_within_pickup_radius, is_within_window};
use crate::models::{GeoPoint, RidePosting, VehicleClass};
use crate::services::{DistanceOracle, OracleError, RegistryError, RideRegistry};

/// Tunables for the match predicate
#[derive(Debug, Clone, Copy)]
pub struct MatchRules {
    /// How long a provider posting stays eligible
    pub window: Duration,
    /// Largest source-to-source distance that still counts as a pickup
    pub max_pickup_distance_km: f64,
    /// Upper bound on a single distance lookup
    pub lookup_timeout: std::time::Duration,
    /// Distance lookups in flight at once while scanning candidates
    pub max_concurrent_lookups: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            window: Duration::minutes(10),
            max_pickup_distance_km: 2.0,
            lookup_timeout: std::time::Duration::from_secs(5),
            max_concurrent_lookups: 8,
        }
    }
}

/// Picks a provider for a taker
///
/// # Pipeline Stages
/// 1. Registry query for recent provider postings
/// 2. Recency, vehicle class and exact destination checks
/// 3. Concurrent source-to-source distance lookups
/// 4. First candidate in registry order within the pickup radius wins
#[derive(Clone)]
pub struct Matcher {
    oracle: Arc<dyn DistanceOracle>,
    rules: MatchRules,
}

impl Matcher {
    pub fn new(oracle: Arc<dyn DistanceOracle>, rules: MatchRules) -> Self {
        Self { oracle, rules }
    }

    pub fn with_default_rules(oracle: Arc<dyn DistanceOracle>) -> Self {
        Self::new(oracle, MatchRules::default())
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Find a provider for `taker` as of now
    pub async fn match_ride(
        &self,
        registry: &dyn RideRegistry,
        taker: &RidePosting,
    ) -> Result<Option<RidePosting>, RegistryError> {
        self.match_ride_at(registry, taker, Utc::now()).await
    }

    /// Find a provider for `taker` as of `now`
    ///
    /// Returns `Ok(None)` when nobody qualifies. Only a registry failure is an
    /// error; a failed distance lookup just disqualifies that candidate.
    pub async fn match_ride_at(
        &self,
        registry: &dyn RideRegistry,
        taker: &RidePosting,
        now: DateTime<Utc>,
    ) -> Result<Option<RidePosting>, RegistryError> {
        let candidates = self.recent_providers(registry, taker.vehicle_type, now).await?;

        tracing::debug!("Scanning {} provider postings for taker {}", candidates.len(), taker.id);

        Ok(self.select_provider(taker, candidates, now).await)
    }

    /// Provider postings of `vehicle` still inside the recency window at `now`
    pub async fn recent_providers(
        &self,
        registry: &dyn RideRegistry,
        vehicle: VehicleClass,
        now: DateTime<Utc>,
    ) -> Result<Vec<RidePosting>, RegistryError> {
        registry.query_providers(Some(vehicle), now - self.rules.window).await
    }

    /// Apply the match predicate to `candidates`, keeping their order
    pub async fn select_provider(
        &self,
        taker: &RidePosting,
        candidates: Vec<RidePosting>,
        now: DateTime<Utc>,
    ) -> Option<RidePosting> {
        let eligible: Vec<RidePosting> = candidates
            .into_iter()
            .filter(|candidate| is_within_window(candidate, now, self.rules.window))
            .filter(|candidate| is_compatible(candidate, taker))
            .collect();

        if eligible.is_empty() {
            return None;
        }

        // All lookups complete before selection; `buffered` preserves input order
        let lookups: Vec<(RidePosting, Result<f64, OracleError>)> = stream::iter(eligible)
            .map(|candidate| async move {
                let distance = self.lookup(taker.source, candidate.source).await;
                (candidate, distance)
            })
            .buffered(self.rules.max_concurrent_lookups.max(1))
            .collect()
            .await;

        lookups.into_iter().find_map(|(candidate, distance)| match distance {
            Ok(km) if is_within_pickup_radius(km, self.rules.max_pickup_distance_km) => {
                tracing::debug!("Provider {} qualifies at {:.3} km", candidate.id, km);
                Some(candidate)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping provider {}: distance unavailable: {}", candidate.id, e);
                None
            }
        })
    }

    /// Distance from the taker's source to their destination, used for pricing
    pub async fn trip_distance(&self, taker: &RidePosting) -> Result<f64, OracleError> {
        self.lookup(taker.source, taker.destination).await
    }

    async fn lookup(&self, from: GeoPoint, to: GeoPoint) -> Result<f64, OracleError> {
        match tokio::time::timeout(self.rules.lookup_timeout, self.oracle.distance_km(from, to)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.rules.lookup_timeout)),
        }
    }
}
