//! Common library for jelly servers
//!
//! This crate provides functionality shared by the auth module and the
//! server binary: configuration loading, store connectors, the persistence
//! error taxonomy and logging setup.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::sqlite("./db");
//!     let pool = init_pool(&config).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;

pub use config::{ApiConfig, Config, ConfigError};
pub use database::{Connector, ConnectorRegistry, DatabaseConfig, DatabaseKind};
pub use error::{DatabaseError, DatabaseResult};
