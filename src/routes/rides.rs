use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;

use crate::matching::{RideError, RideReport, RideService};
use crate::models::{
    ErrorResponse, FindRideResponse, HealthResponse, MatchQuery, NotFoundResponse, OfferResponse, RideRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub rides: Arc<RideService>,
}

/// Configure all ride-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/find-ride", web::post().to(find_ride))
        .route("/provide-service", web::post().to(provide_service))
        .route("/get-taker-match", web::get().to(get_taker_match))
        .route("/get-provider-match", web::get().to(get_provider_match));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.rides.registry_healthy().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

fn error_response(err: &RideError) -> HttpResponse {
    let (status, error) = match err {
        RideError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation failed"),
        RideError::UnknownVehicleClass(_) => (StatusCode::BAD_REQUEST, "Unknown vehicle class"),
        RideError::RegistryUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Ride registry unavailable"),
        RideError::CostUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "Match found but cost unavailable"),
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

/// Find ride endpoint
///
/// POST /api/v1/find-ride
///
/// Request body:
/// ```json
/// {
///   "source": {"lat": 12.9, "lng": 77.6},
///   "sourceAddress": "string",
///   "destination": {"lat": 13.0, "lng": 77.7},
///   "destinationAddress": "string",
///   "vehicleType": "bike|car|sedan",
///   "userName": "string",
///   "contactNo": "string"
/// }
/// ```
async fn find_ride(state: web::Data<AppState>, req: web::Json<RideRequest>) -> impl Responder {
    match state.rides.request_ride(req.into_inner()).await {
        Ok(report) => {
            let posting_id = report.posting_id();
            let response = match report {
                RideReport::Matched(outcome) => FindRideResponse {
                    message: "Match found!".to_string(),
                    matched: true,
                    posting_id,
                    match_id: Some(outcome.match_id),
                },
                RideReport::NoMatch { .. } => FindRideResponse {
                    message: format!(
                        "No match found within the {}-minute window.",
                        state.rides.rules().window.num_minutes()
                    ),
                    matched: false,
                    posting_id,
                    match_id: None,
                },
            };
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            tracing::error!("Error in find-ride: {}", e);
            error_response(&e)
        }
    }
}

/// Provide service endpoint
///
/// POST /api/v1/provide-service
///
/// Same body as find-ride. Every field is required.
async fn provide_service(state: web::Data<AppState>, req: web::Json<RideRequest>) -> impl Responder {
    match state.rides.offer_ride(req.into_inner()).await {
        Ok(posting) => HttpResponse::Ok().json(OfferResponse {
            message: "Service offer submitted successfully!".to_string(),
            posting_id: posting.id,
        }),
        Err(e) => {
            tracing::error!("Error saving service offer: {}", e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/get-taker-match?postingId={postingId}
///
/// Without `postingId` the most recent match is returned.
async fn get_taker_match(state: web::Data<AppState>, query: web::Query<MatchQuery>) -> impl Responder {
    match state.rides.publisher().get_taker_match(query.posting_id).await {
        Some(view) => HttpResponse::Ok().json(view),
        None => HttpResponse::NotFound().json(NotFoundResponse {
            message: "No match found for taker.".to_string(),
        }),
    }
}

/// GET /api/v1/get-provider-match?postingId={postingId}
async fn get_provider_match(state: web::Data<AppState>, query: web::Query<MatchQuery>) -> impl Responder {
    match state.rides.publisher().get_provider_match(query.posting_id).await {
        Some(view) => HttpResponse::Ok().json(view),
        None => HttpResponse::NotFound().json(NotFoundResponse {
            message: "No match found for provider.".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{MatchRules, Matcher};
    use crate::models::{GeoPoint, NewRidePosting, RidePosting, VehicleClass};
    use crate::services::{
        DistanceOracle, HaversineOracle, InMemoryRegistry, MatchPublisher, OracleError, RegistryError, RideRegistry,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn app_state() -> AppState {
        state_with(
            Arc::new(InMemoryRegistry::new()),
            Matcher::with_default_rules(Arc::new(HaversineOracle)),
        )
    }

    fn state_with(registry: Arc<dyn RideRegistry>, matcher: Matcher) -> AppState {
        let rides = RideService::new(registry, matcher, Arc::new(MatchPublisher::default()));
        AppState { rides: Arc::new(rides) }
    }

    struct OfflineRegistry;

    #[async_trait]
    impl RideRegistry for OfflineRegistry {
        async fn append(&self, _: NewRidePosting) -> Result<RidePosting, RegistryError> {
            Err(RegistryError::Unavailable("pool timed out".into()))
        }

        async fn query_providers(
            &self,
            _: Option<VehicleClass>,
            _: DateTime<Utc>,
        ) -> Result<Vec<RidePosting>, RegistryError> {
            Err(RegistryError::Unavailable("pool timed out".into()))
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    /// Answers pickup lookups but has no route to the shared destination
    struct NoTripRouteOracle;

    #[async_trait]
    impl DistanceOracle for NoTripRouteOracle {
        async fn distance_km(&self, _: GeoPoint, to: GeoPoint) -> Result<f64, OracleError> {
            if to == GeoPoint::new(13.00, 77.70) {
                Err(OracleError::Status(502))
            } else {
                Ok(0.5)
            }
        }
    }

    fn ride_body(name: &str, source: (f64, f64)) -> Value {
        json!({
            "source": {"lat": source.0, "lng": source.1},
            "sourceAddress": "Koramangala",
            "destination": {"lat": 13.00, "lng": 77.70},
            "destinationAddress": "Whitefield",
            "vehicleType": "car",
            "userName": name,
            "contactNo": "9876543210"
        })
    }

    #[actix_web::test]
    async fn test_find_ride_without_providers() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/find-ride")
            .set_json(ride_body("taker", (12.90, 77.60)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["matched"], false);
        assert_eq!(body["message"], "No match found within the 10-minute window.");

        let req = test::TestRequest::get().uri("/api/v1/get-taker-match").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_offer_then_match() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/provide-service")
            .set_json(ride_body("provider", (12.905, 77.605)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let offer: Value = test::read_body_json(resp).await;
        let provider_posting = offer["postingId"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/find-ride")
            .set_json(ride_body("taker", (12.90, 77.60)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let found: Value = test::read_body_json(resp).await;
        assert_eq!(found["matched"], true);
        let taker_posting = found["postingId"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/get-taker-match?postingId={}", taker_posting);
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), 200);
        let view: Value = test::read_body_json(resp).await;
        assert_eq!(view["counterparty"]["userName"], "provider");

        let uri = format!("/api/v1/get-provider-match?postingId={}", provider_posting);
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        let view: Value = test::read_body_json(resp).await;
        assert_eq!(view["counterparty"]["userName"], "taker");
        assert_eq!(view["matchId"], found["matchId"]);
    }

    #[actix_web::test]
    async fn test_provide_service_requires_all_fields() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let mut body = ride_body("provider", (12.9, 77.6));
        body["contactNo"] = json!("");
        let req = test::TestRequest::post()
            .uri("/api/v1/provide-service")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let mut body = ride_body("provider", (12.9, 77.6));
        body["vehicleType"] = json!("hovercraft");
        let req = test::TestRequest::post()
            .uri("/api/v1/find-ride")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Unknown vehicle class");
    }

    #[actix_web::test]
    async fn test_registry_outage_is_service_unavailable() {
        let state = state_with(
            Arc::new(OfflineRegistry),
            Matcher::with_default_rules(Arc::new(HaversineOracle)),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::routes::configure_routes),
        )
        .await;

        for uri in ["/api/v1/find-ride", "/api/v1/provide-service"] {
            let req = test::TestRequest::post()
                .uri(uri)
                .set_json(ride_body("someone", (12.90, 77.60)))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 503, "{}", uri);

            let err: Value = test::read_body_json(resp).await;
            assert_eq!(err["error"], "Ride registry unavailable");
            assert_eq!(err["status_code"], 503);
            assert!(err["message"].as_str().unwrap().contains("pool timed out"));
        }
    }

    #[actix_web::test]
    async fn test_missing_trip_distance_is_service_unavailable() {
        let state = state_with(
            Arc::new(InMemoryRegistry::new()),
            Matcher::with_default_rules(Arc::new(NoTripRouteOracle)),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/provide-service")
            .set_json(ride_body("provider", (12.905, 77.605)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri("/api/v1/find-ride")
            .set_json(ride_body("taker", (12.90, 77.60)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 503);

        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Match found but cost unavailable");
        assert_eq!(err["status_code"], 503);

        let req = test::TestRequest::get().uri("/api/v1/get-taker-match").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn test_no_match_message_follows_configured_window() {
        let rules = MatchRules {
            window: chrono::Duration::minutes(15),
            ..MatchRules::default()
        };
        let state = state_with(
            Arc::new(InMemoryRegistry::new()),
            Matcher::new(Arc::new(HaversineOracle), rules),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/find-ride")
            .set_json(ride_body("taker", (12.90, 77.60)))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["message"], "No match found within the 15-minute window.");
    }
}
