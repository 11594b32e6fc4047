// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{GeoPoint, MatchOutcome, MatchView, NewRidePosting, PostingId, RidePosting, Role, VehicleClass};
pub use requests::{MatchQuery, RideRequest};
pub use responses::{ErrorResponse, FindRideResponse, HealthResponse, NotFoundResponse, OfferResponse};
