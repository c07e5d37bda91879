//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{TradeDeskError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_deals_config(&settings.deals)?;
    validate_pricing_config(&settings.pricing)?;
    validate_floors_config(&settings.floors)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(TradeDeskError::Config(
            "Bot token is required".to_string()
        ));
    }

    if config.admin_id == 0 {
        return Err(TradeDeskError::Config(
            "Admin ID must be configured".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TradeDeskError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(TradeDeskError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(TradeDeskError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

fn validate_deals_config(config: &super::DealsConfig) -> Result<()> {
    if config.expiry_window_seconds == 0 || config.ban_seconds == 0 {
        return Err(TradeDeskError::Config(
            "Expiry window and ban duration must be greater than 0".to_string()
        ));
    }

    if config.sweep_interval_seconds == 0 {
        return Err(TradeDeskError::Config(
            "Sweep interval must be greater than 0".to_string()
        ));
    }

    if config.min_action_spacing_ms == 0 {
        return Err(TradeDeskError::Config(
            "Minimum action spacing must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_pricing_config(config: &super::PricingConfig) -> Result<()> {
    if config.uah_per_kk <= 0.0 || config.usdt_per_kk <= 0.0 {
        return Err(TradeDeskError::Config(
            "Rates must be positive".to_string()
        ));
    }

    Ok(())
}

fn validate_floors_config(config: &super::FloorsConfig) -> Result<()> {
    let all_positive = config.local > 0
        && config.crypto_default > 0
        && config.crypto.values().all(|floor| *floor > 0);

    if !all_positive {
        return Err(TradeDeskError::Config(
            "Quantity floors must be positive".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(TradeDeskError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(TradeDeskError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
