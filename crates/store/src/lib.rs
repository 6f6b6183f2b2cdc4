//! Persistence and refresh orchestration for the stress index system.
//!
//! This crate provides:
//! - Repository traits returning plain value collections
//! - In-memory and SQLite repositories
//! - Typed seeding of series, indicator configs and market symbols
//! - A refresh pipeline wiring repositories to the scoring and analysis crates

pub mod repository;
pub mod memory;
pub mod sqlite;
pub mod seed;
pub mod refresh;

pub use repository::{
    IndicatorConfigRepository, MarketRepository, ObservationRepository, RegimeReturnRepository,
    Repository, SeriesRepository,
};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use seed::{seed, SeedCatalog, SeedReport};
pub use refresh::{MarketOverview, Refresher};
