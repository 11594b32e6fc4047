use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{GeoPoint, NewRidePosting, RidePosting, VehicleClass};
use crate::services::registry::{RegistryError, RideRegistry};

/// PostgreSQL-backed ride registry
///
/// Postings live in the `ride_postings` table. Timestamps come from the
/// database clock so that every service instance agrees on posting age.
pub struct PostgresRegistry {
    pool: PgPool,
}

impl PostgresRegistry {
    /// Connect, then run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a registry from the optional settings values
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
    ) -> Result<Self, RegistryError> {
        tracing::info!("Connecting to PostgreSQL ride registry");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
        )
        .await
    }
}

fn posting_from_row(row: &PgRow) -> Result<RidePosting, RegistryError> {
    let vehicle: String = row.try_get("vehicle_type")?;
    let role: String = row.try_get("user_type")?;

    Ok(RidePosting {
        id: row.try_get("id")?,
        user_name: row.try_get("user_name")?,
        contact_no: row.try_get("contact_no")?,
        source: GeoPoint::new(row.try_get("source_lat")?, row.try_get("source_lng")?),
        source_address: row.try_get("source_address")?,
        destination: GeoPoint::new(row.try_get("destination_lat")?, row.try_get("destination_lng")?),
        destination_address: row.try_get("destination_address")?,
        vehicle_type: vehicle
            .parse()
            .map_err(|e| RegistryError::CorruptRow(format!("{}", e)))?,
        role: role.parse().map_err(RegistryError::CorruptRow)?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl RideRegistry for PostgresRegistry {
    async fn append(&self, posting: NewRidePosting) -> Result<RidePosting, RegistryError> {
        let query = r#"
            INSERT INTO ride_postings (
                id, user_name, contact_no,
                source_lat, source_lng, source_address,
                destination_lat, destination_lng, destination_address,
                vehicle_type, user_type, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            RETURNING created_at
        "#;

        let id = uuid::Uuid::new_v4();

        let row = sqlx::query(query)
            .bind(id)
            .bind(&posting.user_name)
            .bind(&posting.contact_no)
            .bind(posting.source.lat)
            .bind(posting.source.lng)
            .bind(&posting.source_address)
            .bind(posting.destination.lat)
            .bind(posting.destination.lng)
            .bind(&posting.destination_address)
            .bind(posting.vehicle_type.as_str())
            .bind(posting.role.as_str())
            .fetch_one(&self.pool)
            .await?;

        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        tracing::debug!("Stored {} posting {}", posting.role.as_str(), id);

        Ok(RidePosting::stored(posting, id, created_at))
    }

    async fn query_providers(
        &self,
        vehicle: Option<VehicleClass>,
        since: DateTime<Utc>,
    ) -> Result<Vec<RidePosting>, RegistryError> {
        let query = r#"
            SELECT id, user_name, contact_no,
                   source_lat, source_lng, source_address,
                   destination_lat, destination_lng, destination_address,
                   vehicle_type, user_type, created_at
            FROM ride_postings
            WHERE user_type = 'serviceProvider'
              AND created_at >= $1
              AND ($2::TEXT IS NULL OR vehicle_type = $2)
            ORDER BY created_at ASC, id ASC
        "#;

        let rows = sqlx::query(query)
            .bind(since)
            .bind(vehicle.map(|v| v.as_str()))
            .fetch_all(&self.pool)
            .await?;

        let postings = rows
            .iter()
            .map(posting_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Registry returned {} provider postings since {}", postings.len(), since);

        Ok(postings)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
