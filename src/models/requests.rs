use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::matching::service::RideError;
use crate::models::domain::{GeoPoint, NewRidePosting, PostingId, Role, VehicleClass};

/// Inbound ride request or offer
///
/// Both the taker and provider endpoints accept this shape and run it through
/// the same precondition check in [`RideRequest::into_posting`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RideRequest {
    #[validate(required)]
    #[serde(default)]
    pub source: Option<GeoPoint>,
    #[validate(length(min = 1))]
    #[serde(alias = "source_address", rename = "sourceAddress", default)]
    pub source_address: String,
    #[validate(required)]
    #[serde(default)]
    pub destination: Option<GeoPoint>,
    #[validate(length(min = 1))]
    #[serde(alias = "destination_address", rename = "destinationAddress", default)]
    pub destination_address: String,
    #[validate(length(min = 1))]
    #[serde(alias = "vehicle_type", rename = "vehicleType", default)]
    pub vehicle_type: String,
    #[validate(length(min = 1))]
    #[serde(alias = "user_name", rename = "userName", default)]
    pub user_name: String,
    #[validate(length(min = 1))]
    #[serde(alias = "contact_no", rename = "contactNo", default)]
    pub contact_no: String,
}

impl RideRequest {
    /// Validate every field and turn the request into a posting for `role`
    pub fn into_posting(self, role: Role) -> Result<NewRidePosting, RideError> {
        self.validate()
            .map_err(|errors| RideError::Validation(errors.to_string()))?;

        let vehicle_type: VehicleClass = self.vehicle_type.parse()?;
        let (Some(source), Some(destination)) = (self.source, self.destination) else {
            return Err(RideError::Validation("source and destination are required".into()));
        };

        Ok(NewRidePosting {
            user_name: self.user_name,
            contact_no: self.contact_no,
            source,
            source_address: self.source_address,
            destination,
            destination_address: self.destination_address,
            vehicle_type,
            role,
        })
    }
}

/// Query string for the match polling endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchQuery {
    #[serde(alias = "posting_id", rename = "postingId")]
    pub posting_id: Option<PostingId>,
}
