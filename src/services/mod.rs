// Service exports
pub mod oracle;
pub mod postgres;
pub mod publisher;
pub mod registry;

pub use oracle::{DistanceOracle, HaversineOracle, OracleError, OsrmClient};
pub use postgres::PostgresRegistry;
pub use publisher::MatchPublisher;
pub use registry::{InMemoryRegistry, RegistryError, RideRegistry};
