//! Database repositories module
//! 
//! This module contains all repository implementations for data access

pub mod deal;
pub mod ban;

// Re-export repositories
pub use deal::DealRepository;
pub use ban::BanRepository;
