use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::matching::matcher::{MatchRules, Matcher};
use crate::matching::tariff::{self, TariffError};
use crate::models::{MatchOutcome, PostingId, RidePosting, RideRequest, Role};
use crate::services::{MatchPublisher, OracleError, RegistryError, RideRegistry};

/// Errors surfaced to callers of the ride endpoints
#[derive(Debug, Error)]
pub enum RideError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    UnknownVehicleClass(#[from] TariffError),

    #[error("Ride registry unavailable: {0}")]
    RegistryUnavailable(#[from] RegistryError),

    #[error("Matched provider {provider_id} but could not compute the trip cost: {source}")]
    CostUnavailable {
        posting_id: PostingId,
        provider_id: PostingId,
        #[source]
        source: OracleError,
    },
}

impl RideError {
    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        matches!(self, RideError::RegistryUnavailable(_) | RideError::CostUnavailable { .. })
    }
}

/// Outcome of a taker's request
#[derive(Debug, Clone)]
pub enum RideReport {
    Matched(MatchOutcome),
    NoMatch { posting_id: PostingId },
}

impl RideReport {
    pub fn posting_id(&self) -> PostingId {
        match self {
            RideReport::Matched(outcome) => outcome.taker.id,
            RideReport::NoMatch { posting_id } => *posting_id,
        }
    }
}

/// Ties the registry, matcher, tariff and publisher together for one request
pub struct RideService {
    registry: Arc<dyn RideRegistry>,
    matcher: Matcher,
    publisher: Arc<MatchPublisher>,
}

impl RideService {
    pub fn new(registry: Arc<dyn RideRegistry>, matcher: Matcher, publisher: Arc<MatchPublisher>) -> Self {
        Self {
            registry,
            matcher,
            publisher,
        }
    }

    pub fn publisher(&self) -> &MatchPublisher {
        &self.publisher
    }

    pub fn rules(&self) -> &MatchRules {
        self.matcher.rules()
    }

    pub async fn registry_healthy(&self) -> bool {
        self.registry.health_check().await
    }

    /// Record a provider's offer
    pub async fn offer_ride(&self, request: RideRequest) -> Result<RidePosting, RideError> {
        let posting = request.into_posting(Role::Provider)?;
        let stored = self.registry.append(posting).await?;

        tracing::info!(
            "Provider {} offered a {} ride to {}",
            stored.id,
            stored.vehicle_type,
            stored.destination_address
        );

        Ok(stored)
    }

    /// Record a taker's request and try to match it now
    pub async fn request_ride(&self, request: RideRequest) -> Result<RideReport, RideError> {
        self.request_ride_at(request, Utc::now()).await
    }

    /// Record a taker's request and try to match it as of `now`
    pub async fn request_ride_at(&self, request: RideRequest, now: DateTime<Utc>) -> Result<RideReport, RideError> {
        let posting = request.into_posting(Role::Taker)?;

        // Read before writing so a failed query leaves no taker posting behind
        let candidates = self
            .matcher
            .recent_providers(self.registry.as_ref(), posting.vehicle_type, now)
            .await?;
        let taker = self.registry.append(posting).await?;

        let Some(provider) = self.matcher.select_provider(&taker, candidates, now).await else {
            tracing::info!("No provider found for taker {}", taker.id);
            return Ok(RideReport::NoMatch { posting_id: taker.id });
        };

        // Pricing uses the taker's own trip, not the pickup distance
        let distance_km = self.matcher.trip_distance(&taker).await.map_err(|source| {
            tracing::error!(
                "Matched taker {} with provider {} but trip distance is unavailable: {}",
                taker.id,
                provider.id,
                source
            );
            RideError::CostUnavailable {
                posting_id: taker.id,
                provider_id: provider.id,
                source,
            }
        })?;

        let fare = tariff::quote(distance_km, taker.vehicle_type);

        let outcome = MatchOutcome {
            match_id: uuid::Uuid::new_v4(),
            taker,
            provider,
            distance_km,
            co2_emission_reduced_kg: fare.co2_kg,
            cost_taken: fare.cost,
            matched_at: now,
        };

        self.publisher
            .publish(outcome.taker_view(), outcome.provider_view())
            .await;

        tracing::info!(
            "Matched taker {} with provider {} ({:.2} km, cost {:.2})",
            outcome.taker.id,
            outcome.provider.id,
            outcome.distance_km,
            outcome.cost_taken
        );

        Ok(RideReport::Matched(outcome))
    }
}
