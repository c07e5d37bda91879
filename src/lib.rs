//! TradeDesk Telegram Bot
//!
//! A Telegram bot that walks a buyer and a single admin through an in-game
//! currency deal: composing the request, agreeing on a time, assigning the
//! in-game nickname, payment and delivery. Deals live in SQLite, overdue
//! buyers are banned for a short window, and every stateful action passes a
//! ban and rate gate.

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod state;
pub mod utils;
pub mod middleware;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{TradeDeskError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;
pub use state::{ScenarioManager, StateStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
