use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use carpool_match::config::{RegistryBackend, RoutingProvider, Settings};
use carpool_match::matching::{Matcher, RideService};
use carpool_match::routes::{self, AppState};
use carpool_match::services::{
    DistanceOracle, HaversineOracle, InMemoryRegistry, MatchPublisher, OsrmClient, PostgresRegistry, RideRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| std::io::Error::other(format!("Configuration error: {}", e)))?;

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.logging.level))
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    info!("Starting carpool match service...");

    // Distance oracle
    let oracle: Arc<dyn DistanceOracle> = match settings.routing.provider {
        RoutingProvider::Osrm => {
            let client = OsrmClient::new(
                &settings.routing.osrm_url,
                Duration::from_secs(settings.routing.timeout_secs),
            )
            .map_err(|e| std::io::Error::other(format!("Failed to build routing client: {}", e)))?;
            info!("Routing via OSRM at {}", settings.routing.osrm_url);
            Arc::new(client)
        }
        RoutingProvider::Haversine => {
            info!("Routing via straight-line distance");
            Arc::new(HaversineOracle)
        }
    };

    let rules = settings.matching.rules(&settings.routing);

    // Ride registry
    let registry: Arc<dyn RideRegistry> = match settings.registry.backend {
        RegistryBackend::Memory => {
            // Postings past the recency window can never match again
            info!("Using in-memory ride registry (single instance, not persisted)");
            Arc::new(InMemoryRegistry::with_retention(rules.window))
        }
        RegistryBackend::Postgres => {
            let url = settings.registry.database_url.clone().ok_or_else(|| {
                std::io::Error::other("registry.database_url (or DATABASE_URL) is required for the postgres backend")
            })?;
            let postgres = PostgresRegistry::from_settings(
                &url,
                settings.registry.max_connections,
                settings.registry.min_connections,
                settings.registry.acquire_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::other(format!("PostgreSQL connection error: {}", e))
            })?;
            info!("PostgreSQL ride registry initialized");
            Arc::new(postgres)
        }
    };

    let publisher = Arc::new(MatchPublisher::new(
        settings.publisher.max_entries,
        Duration::from_secs(settings.publisher.ttl_secs),
    ));

    info!("Matcher initialized with rules: {:?}", rules);

    let app_state = AppState {
        rides: Arc::new(RideService::new(registry, Matcher::new(oracle, rules), publisher)),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
