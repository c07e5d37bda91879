//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod deal;
pub mod ban;
pub mod callback;

// Re-export commonly used models
pub use deal::{Deal, DealStatus, Currency, ActorRole, CreateDealRequest, DealFieldWrites};
pub use ban::BanRecord;
pub use callback::{CallbackAction, CallbackData};
