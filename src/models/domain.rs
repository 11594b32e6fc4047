use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::matching::tariff::TariffError;

/// Identifier assigned to a ride posting when the registry stores it
pub type PostingId = uuid::Uuid;

/// Geographic coordinate in degrees
///
/// Equality is exact field equality. Destination matching relies on this,
/// so two points that differ in the last decimal place are different places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Vehicle class offered or requested for a ride
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Bike,
    Car,
    Sedan,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [VehicleClass::Bike, VehicleClass::Car, VehicleClass::Sedan];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Bike => "bike",
            VehicleClass::Car => "car",
            VehicleClass::Sedan => "sedan",
        }
    }
}

impl FromStr for VehicleClass {
    type Err = TariffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bike" => Ok(VehicleClass::Bike),
            "car" => Ok(VehicleClass::Car),
            "sedan" => Ok(VehicleClass::Sedan),
            other => Err(TariffError::UnknownVehicleClass(other.to_string())),
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a ride a posting is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "serviceTaker")]
    Taker,
    #[serde(rename = "serviceProvider")]
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Taker => "serviceTaker",
            Role::Provider => "serviceProvider",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "serviceTaker" => Ok(Role::Taker),
            "serviceProvider" => Ok(Role::Provider),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A validated posting that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRidePosting {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "contactNo")]
    pub contact_no: String,
    pub source: GeoPoint,
    #[serde(rename = "sourceAddress")]
    pub source_address: String,
    pub destination: GeoPoint,
    #[serde(rename = "destinationAddress")]
    pub destination_address: String,
    #[serde(rename = "vehicleType")]
    pub vehicle_type: VehicleClass,
    #[serde(rename = "userType")]
    pub role: Role,
}

/// Ride request or offer as held by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidePosting {
    pub id: PostingId,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "contactNo")]
    pub contact_no: String,
    pub source: GeoPoint,
    #[serde(rename = "sourceAddress")]
    pub source_address: String,
    pub destination: GeoPoint,
    #[serde(rename = "destinationAddress")]
    pub destination_address: String,
    #[serde(rename = "vehicleType")]
    pub vehicle_type: VehicleClass,
    #[serde(rename = "userType")]
    pub role: Role,
    #[serde(rename = "timestamp")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RidePosting {
    /// Attach the registry-assigned identity to a new posting
    pub fn stored(
        posting: NewRidePosting,
        id: PostingId,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            id,
            user_name: posting.user_name,
            contact_no: posting.contact_no,
            source: posting.source,
            source_address: posting.source_address,
            destination: posting.destination,
            destination_address: posting.destination_address,
            vehicle_type: posting.vehicle_type,
            role: posting.role,
            created_at,
        }
    }
}

/// Result of a successful pairing, shared by both parties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    #[serde(rename = "matchId")]
    pub match_id: uuid::Uuid,
    pub taker: RidePosting,
    pub provider: RidePosting,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "co2EmissionReducedKg")]
    pub co2_emission_reduced_kg: f64,
    #[serde(rename = "costTaken")]
    pub cost_taken: f64,
    #[serde(rename = "matchedAt")]
    pub matched_at: chrono::DateTime<chrono::Utc>,
}

impl MatchOutcome {
    /// What the taker sees: the provider's posting plus the trip figures
    pub fn taker_view(&self) -> MatchView {
        self.view(Role::Taker, self.taker.id, &self.provider)
    }

    /// What the provider sees: the taker's posting plus the trip figures
    pub fn provider_view(&self) -> MatchView {
        self.view(Role::Provider, self.provider.id, &self.taker)
    }

    fn view(&self, perspective: Role, posting_id: PostingId, counterparty: &RidePosting) -> MatchView {
        MatchView {
            match_id: self.match_id,
            perspective,
            posting_id,
            counterparty: counterparty.clone(),
            distance_km: self.distance_km,
            co2_emission_reduced_kg: self.co2_emission_reduced_kg,
            cost_taken: self.cost_taken,
            matched_at: self.matched_at,
        }
    }
}

/// One party's view of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    #[serde(rename = "matchId")]
    pub match_id: uuid::Uuid,
    pub perspective: Role,
    #[serde(rename = "postingId")]
    pub posting_id: PostingId,
    pub counterparty: RidePosting,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "co2EmissionReducedKg")]
    pub co2_emission_reduced_kg: f64,
    #[serde(rename = "costTaken")]
    pub cost_taken: f64,
    #[serde(rename = "matchedAt")]
    pub matched_at: chrono::DateTime<chrono::Utc>,
}
