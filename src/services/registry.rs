use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{NewRidePosting, RidePosting, Role, VehicleClass};

/// Errors that can occur when reading or writing ride postings
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt posting row: {0}")]
    CorruptRow(String),

    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Append-only store of ride postings
///
/// `query_providers` returns postings oldest first, ties broken by id. The
/// matcher takes the first qualifying posting in that order.
#[async_trait]
pub trait RideRegistry: Send + Sync {
    /// Store a posting, assigning its id and creation timestamp
    async fn append(&self, posting: NewRidePosting) -> Result<RidePosting, RegistryError>;

    /// Provider postings created at or after `since`, optionally of one vehicle class
    async fn query_providers(
        &self,
        vehicle: Option<VehicleClass>,
        since: DateTime<Utc>,
    ) -> Result<Vec<RidePosting>, RegistryError>;

    /// Whether the backing store is reachable
    async fn health_check(&self) -> bool;
}

/// Process-local registry for development and single-instance deployments
///
/// Postings are lost on restart. With a retention period, postings older
/// than it are dropped on each append; without one the store grows forever.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    postings: RwLock<Vec<RidePosting>>,
    retention: Option<Duration>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep postings only while they are younger than `retention`
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            postings: RwLock::new(Vec::new()),
            retention: Some(retention),
        }
    }

    /// Number of stored postings of either role
    pub async fn len(&self) -> usize {
        self.postings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.postings.read().await.is_empty()
    }
}

#[async_trait]
impl RideRegistry for InMemoryRegistry {
    async fn append(&self, posting: NewRidePosting) -> Result<RidePosting, RegistryError> {
        let mut postings = self.postings.write().await;

        // Keep timestamps non-decreasing even if the wall clock steps back
        let now = Utc::now();
        let created_at = postings
            .last()
            .map(|last| last.created_at.max(now))
            .unwrap_or(now);

        // Timestamps are non-decreasing, so expired postings form a prefix
        if let Some(retention) = self.retention {
            let cutoff = created_at - retention;
            let expired = postings.partition_point(|p| p.created_at < cutoff);
            if expired > 0 {
                postings.drain(..expired);
                tracing::debug!("Dropped {} expired postings", expired);
            }
        }

        let stored = RidePosting::stored(posting, uuid::Uuid::new_v4(), created_at);
        postings.push(stored.clone());

        tracing::debug!("Stored {} posting {}", stored.role.as_str(), stored.id);

        Ok(stored)
    }

    async fn query_providers(
        &self,
        vehicle: Option<VehicleClass>,
        since: DateTime<Utc>,
    ) -> Result<Vec<RidePosting>, RegistryError> {
        let postings = self.postings.read().await;

        let mut providers: Vec<RidePosting> = postings
            .iter()
            .filter(|p| p.role == Role::Provider && p.created_at >= since)
            .filter(|p| vehicle.map_or(true, |v| p.vehicle_type == v))
            .cloned()
            .collect();

        providers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(providers)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn new_posting(role: Role, vehicle: VehicleClass) -> NewRidePosting {
        NewRidePosting {
            user_name: "user".to_string(),
            contact_no: "000".to_string(),
            source: GeoPoint::new(12.9, 77.6),
            source_address: "src".to_string(),
            destination: GeoPoint::new(13.0, 77.7),
            destination_address: "dst".to_string(),
            vehicle_type: vehicle,
            role,
        }
    }

    #[tokio::test]
    async fn test_append_assigns_identity() {
        let registry = InMemoryRegistry::new();
        let before = Utc::now();

        let a = registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();
        let b = registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.created_at >= before);
        assert!(b.created_at >= a.created_at);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_query_only_returns_providers() {
        let registry = InMemoryRegistry::new();
        registry.append(new_posting(Role::Taker, VehicleClass::Car)).await.unwrap();
        let provider = registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();

        let found = registry
            .query_providers(None, Utc::now() - chrono::Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, provider.id);
    }

    #[tokio::test]
    async fn test_query_filters_vehicle_and_since() {
        let registry = InMemoryRegistry::new();
        let car = registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();
        registry.append(new_posting(Role::Provider, VehicleClass::Bike)).await.unwrap();

        let cars = registry
            .query_providers(Some(VehicleClass::Car), car.created_at)
            .await
            .unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].id, car.id);

        let future = registry
            .query_providers(None, Utc::now() + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(future.is_empty());
    }

    #[tokio::test]
    async fn test_query_orders_oldest_first() {
        let registry = InMemoryRegistry::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(registry.append(new_posting(Role::Provider, VehicleClass::Sedan)).await.unwrap());
        }

        let found = registry
            .query_providers(None, Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();

        for pair in found.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
        assert_eq!(found.len(), ids.len());
    }

    #[tokio::test]
    async fn test_retention_drops_expired_postings() {
        let registry = InMemoryRegistry::with_retention(chrono::Duration::milliseconds(20));
        let old = registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();
        registry.append(new_posting(Role::Taker, VehicleClass::Car)).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let fresh = registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();

        assert_eq!(registry.len().await, 1);
        let found = registry.query_providers(None, old.created_at).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, fresh.id);
    }

    #[tokio::test]
    async fn test_without_retention_keeps_everything() {
        let registry = InMemoryRegistry::new();
        registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.append(new_posting(Role::Provider, VehicleClass::Car)).await.unwrap();

        assert_eq!(registry.len().await, 2);
    }
}
