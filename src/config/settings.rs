//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::collections::HashMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::models::Currency;

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub deals: DealsConfig,
    pub pricing: PricingConfig,
    pub floors: FloorsConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: String,
    /// The single admin/seller identity
    pub admin_id: i64,
    /// Chat where new deals are announced, if any
    pub broadcast_chat_id: Option<i64>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Deal timing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DealsConfig {
    /// Time the buyer has to act after the nickname is assigned
    pub expiry_window_seconds: u64,
    /// Penalty applied to the owner of an expired deal
    pub ban_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub min_action_spacing_ms: u64,
}

/// Exchange rates per 1kk
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    pub uah_per_kk: f64,
    pub usdt_per_kk: f64,
}

/// Minimum quantity (in kk) per settlement rail
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FloorsConfig {
    pub local: i64,
    /// Network label -> floor; labels are matched case-insensitively
    pub crypto: HashMap<String, i64>,
    /// Floor for networks not listed in `crypto`
    pub crypto_default: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for daily-rolling log files; stdout only when unset
    pub file_path: Option<String>,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("TRADEDESK").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::TradeDeskError> {
        super::validation::validate_settings(self)
    }
}

impl DealsConfig {
    pub fn expiry_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiry_window_seconds as i64)
    }

    pub fn ban_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ban_seconds as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn min_action_spacing(&self) -> Duration {
        Duration::from_millis(self.min_action_spacing_ms)
    }
}

impl PricingConfig {
    /// Price of `quantity` kk, formatted with its currency suffix
    pub fn format_price(&self, currency: Currency, quantity: i64) -> String {
        match currency {
            Currency::Uah => format!("{} грн", (quantity as f64 * self.uah_per_kk).round() as i64),
            Currency::Usdt => format!("{:.2} USDT", quantity as f64 * self.usdt_per_kk),
        }
    }
}

impl FloorsConfig {
    /// Minimum quantity for the given rail
    pub fn floor_for(&self, currency: Currency, network: Option<&str>) -> i64 {
        match currency {
            Currency::Uah => self.local,
            Currency::Usdt => network
                .and_then(|net| {
                    let net = net.trim().to_lowercase();
                    self.crypto
                        .iter()
                        .find(|(label, _)| label.to_lowercase() == net)
                        .map(|(_, floor)| *floor)
                })
                .unwrap_or(self.crypto_default),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            admin_id: 0,
            broadcast_chat_id: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tradedesk.db".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

impl Default for DealsConfig {
    fn default() -> Self {
        Self {
            expiry_window_seconds: 10 * 60,
            ban_seconds: 15 * 60,
            sweep_interval_seconds: 5,
            min_action_spacing_ms: 1500,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            uah_per_kk: 60.0,
            usdt_per_kk: 1.4,
        }
    }
}

impl Default for FloorsConfig {
    fn default() -> Self {
        let mut crypto = HashMap::new();
        crypto.insert("BEP20".to_string(), 10_000_000);
        crypto.insert("TRC20".to_string(), 50_000_000);

        Self {
            local: 10,
            crypto,
            crypto_default: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            database: DatabaseConfig::default(),
            deals: DealsConfig::default(),
            pricing: PricingConfig::default(),
            floors: FloorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
