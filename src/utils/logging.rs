//! Logging configuration and setup
//! 
//! This module provides logging initialization and structured logging utilities
//! for the TradeDesk application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use crate::config::LoggingConfig;
use crate::models::DealStatus;
use crate::utils::errors::{ErrorSeverity, Result, TradeDeskError};

/// Keeps the file writer flushing; hold it for the lifetime of the process
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TradeDeskError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let (file_layer, file_guard) = match &config.file_path {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "tradedesk.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .try_init()
        .map_err(|e| TradeDeskError::Config(format!("Logging already initialized: {}", e)))?;

    info!(level = %config.level, file = ?config.file_path, "Logging initialized");
    Ok(LoggingGuard { _file_guard: file_guard })
}

/// Log an applied deal transition
pub fn log_transition(deal_id: i64, user_id: i64, from: DealStatus, to: DealStatus) {
    info!(
        deal_id = deal_id,
        user_id = user_id,
        from = %from,
        to = %to,
        "Deal transition applied"
    );
}

/// Log a rejected action at a level matching its severity
pub fn log_rejection(user_id: i64, action: &str, error: &TradeDeskError) {
    match error.severity() {
        ErrorSeverity::Info => debug!(user_id = user_id, action = action, error = %error, "Action rejected"),
        ErrorSeverity::Warning => warn!(user_id = user_id, action = action, error = %error, "Action rejected"),
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(user_id = user_id, action = action, error = %error, severity = %error.severity(), "Action failed")
        }
    }
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        details = details,
        "Admin action performed"
    );
}
