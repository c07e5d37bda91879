//! Error handling for TradeDesk
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;
use chrono::{DateTime, Utc};
use crate::models::DealStatus;

/// Main error type for TradeDesk application
#[derive(Error, Debug)]
pub enum TradeDeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Deal not found: {deal_id}")]
    DealNotFound { deal_id: i64 },

    #[error("Stale action on deal {deal_id}: expected {expected}, found {actual}")]
    StaleTransition {
        deal_id: i64,
        expected: String,
        actual: String,
    },

    #[error("User {user_id} already has an active deal")]
    ActiveDealExists { user_id: i64 },

    #[error("User {user_id} is banned until {until}")]
    Banned { user_id: i64, until: DateTime<Utc> },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Quantity {quantity}kk is below the {floor}kk minimum")]
    BelowFloor { quantity: i64, floor: i64 },

    #[error("Delivery to chat {chat_id} failed: {source}")]
    Delivery {
        chat_id: i64,
        #[source]
        source: Box<TradeDeskError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TradeDesk operations
pub type Result<T> = std::result::Result<T, TradeDeskError>;

impl TradeDeskError {
    /// Stale transition against a deal observed in `actual`
    pub fn stale(deal_id: i64, expected: &[DealStatus], actual: Option<DealStatus>) -> Self {
        let expected = expected
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("|");
        TradeDeskError::StaleTransition {
            deal_id,
            expected,
            actual: actual.map(|s| s.as_str()).unwrap_or("missing").to_string(),
        }
    }

    /// A failed send to `chat_id`, keeping the cause as the error source
    pub fn delivery(chat_id: i64, source: TradeDeskError) -> Self {
        TradeDeskError::Delivery { chat_id, source: Box::new(source) }
    }

    /// True for the "already handled" family: the action lost a race or was replayed
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            TradeDeskError::StaleTransition { .. } | TradeDeskError::DealNotFound { .. }
        )
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            TradeDeskError::Database(_) => false,
            TradeDeskError::Telegram(_) => true,
            TradeDeskError::Config(_) => false,
            TradeDeskError::PermissionDenied(_) => false,
            TradeDeskError::DealNotFound { .. } => true,
            TradeDeskError::StaleTransition { .. } => true,
            TradeDeskError::ActiveDealExists { .. } => true,
            TradeDeskError::Banned { .. } => true,
            TradeDeskError::RateLimitExceeded => true,
            TradeDeskError::InvalidInput(_) => true,
            TradeDeskError::BelowFloor { .. } => true,
            TradeDeskError::Delivery { .. } => true,
            TradeDeskError::Io(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TradeDeskError::Database(_) => ErrorSeverity::Critical,
            TradeDeskError::Config(_) => ErrorSeverity::Critical,
            TradeDeskError::PermissionDenied(_) => ErrorSeverity::Warning,
            TradeDeskError::Banned { .. } => ErrorSeverity::Warning,
            TradeDeskError::RateLimitExceeded => ErrorSeverity::Info,
            TradeDeskError::InvalidInput(_) => ErrorSeverity::Info,
            TradeDeskError::BelowFloor { .. } => ErrorSeverity::Info,
            TradeDeskError::StaleTransition { .. } => ErrorSeverity::Info,
            TradeDeskError::DealNotFound { .. } => ErrorSeverity::Info,
            TradeDeskError::ActiveDealExists { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_error_formatting() {
        let err = TradeDeskError::stale(7, &[DealStatus::New], Some(DealStatus::TimeSet));
        assert!(err.is_stale());
        assert_eq!(err.to_string(), "Stale action on deal 7: expected new, found time_set");

        let missing = TradeDeskError::stale(8, &[DealStatus::Paid, DealStatus::NickSet], None);
        assert!(missing.to_string().ends_with("expected paid|nick_set, found missing"));
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(TradeDeskError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(TradeDeskError::RateLimitExceeded.severity(), ErrorSeverity::Info);
        let offline = std::io::Error::new(std::io::ErrorKind::NotConnected, "offline");
        assert_eq!(TradeDeskError::delivery(1, offline.into()).severity(), ErrorSeverity::Error);
        assert!(!TradeDeskError::Config("x".into()).is_recoverable());
        assert!(TradeDeskError::BelowFloor { quantity: 5, floor: 10 }.is_recoverable());
    }

    #[test]
    fn test_delivery_keeps_its_cause() {
        use std::error::Error as _;

        let offline = std::io::Error::new(std::io::ErrorKind::NotConnected, "offline");
        let err = TradeDeskError::delivery(77, TradeDeskError::from(offline));
        assert_eq!(err.to_string(), "Delivery to chat 77 failed: I/O error: offline");

        let cause = err.source().expect("Delivery error should expose its cause");
        assert_matches::assert_matches!(cause.downcast_ref::<TradeDeskError>(), Some(TradeDeskError::Io(_)));
    }
}
