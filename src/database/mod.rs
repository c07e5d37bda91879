//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod repositories;
pub mod schema;
pub mod service;

// Re-export commonly used database components
pub use connection::{DatabasePool, DatabaseConfig, create_pool, health_check};
pub use repositories::{DealRepository, BanRepository};
pub use service::DatabaseService;
