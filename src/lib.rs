//! Carpool Match - ride matching service for carpool takers and providers
//!
//! This library pairs a ride request with a provider who recently offered a
//! compatible trip, then prices the shared ride and estimates the CO2 saved.

pub mod config;
pub mod matching;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use matching::{MatchRules, Matcher, RideError, RideReport, RideService};
pub use models::{GeoPoint, MatchOutcome, MatchView, RidePosting, RideRequest, Role, VehicleClass};
pub use services::{DistanceOracle, InMemoryRegistry, MatchPublisher, OsrmClient, RideRegistry};
