use chrono::{DateTime, Duration, Utc};

use crate::models::{RidePosting, Role};

/// Check that a posting is still inside the recency window at `now`
///
/// A posting exactly `window` old has expired.
#[inline]
pub fn is_within_window(posting: &RidePosting, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(posting.created_at) < window
}

/// Check the parts of the match predicate that need no distance lookup
///
/// The candidate must be a provider offering the taker's vehicle class and
/// heading to exactly the taker's destination.
#[inline]
pub fn is_compatible(candidate: &RidePosting, taker: &RidePosting) -> bool {
    // Skip anything that is not a provider offer
    if candidate.role != Role::Provider {
        return false;
    }

    if candidate.vehicle_type != taker.vehicle_type {
        return false;
    }

    candidate.destination == taker.destination
}

/// Check the source-to-source distance against the pickup radius
#[inline]
pub fn is_within_pickup_radius(distance_km: f64, max_distance_km: f64) -> bool {
    // NaN compares false, so a nonsense distance never qualifies
    distance_km <= max_distance_km
}
