// Matching engine exports
pub mod filters;
pub mod matcher;
pub mod service;
pub mod tariff;

pub use filters::{is_compatible, is_within_pickup_radius, is_within_window};
pub use matcher::{MatchRules, Matcher};
pub use service::{RideError, RideReport, RideService};
pub use tariff::{calculate_co2_emission_reduced, calculate_cost, quote, FareQuote, TariffError};
