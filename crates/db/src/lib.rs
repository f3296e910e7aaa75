pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use fixtures::{DemoCatalogDataset, SeedResult, TableSeedInfo, VerificationResult};
pub use repositories::{sql_stores, InMemoryStore, RepositoryError};
