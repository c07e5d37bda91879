//! Test context for unified test setup
//!
//! Wires the real services over a private in-memory database and a
//! [`RecordingNotifier`], so flows can be driven exactly as the handlers do.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use TradeDesk::config::Settings;
use TradeDesk::database::{DatabaseConfig, DatabaseService};
use TradeDesk::models::{Deal, DealStatus};
use TradeDesk::services::{Actor, Notifier, ServiceFactory};
use TradeDesk::state::DealInput;
use TradeDesk::Result;

use super::recording_notifier::RecordingNotifier;

pub const ADMIN_ID: i64 = 1000;
pub const BUYER_ID: i64 = 2001;
pub const OTHER_BUYER_ID: i64 = 2002;
pub const BROADCAST_CHAT_ID: i64 = -100_500;

/// Unified test context that manages all test components
pub struct TestContext {
    pub settings: Settings,
    pub database: DatabaseService,
    pub notifier: Arc<RecordingNotifier>,
    pub services: ServiceFactory,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let database = DatabaseService::connect(&DatabaseConfig::in_memory())
            .await
            .expect("Failed to open in-memory database");
        let notifier = Arc::new(RecordingNotifier::new());
        let dyn_notifier: Arc<dyn Notifier> = notifier.clone();
        let services = ServiceFactory::new(&settings, database.clone(), dyn_notifier)
            .expect("Failed to build services");

        Self {
            settings,
            database,
            notifier,
            services,
        }
    }

    /// Apply a buyer action
    pub async fn buyer(&self, deal_id: i64, input: DealInput) -> Result<Deal> {
        self.as_buyer(BUYER_ID, deal_id, input).await
    }

    pub async fn as_buyer(&self, user_id: i64, deal_id: i64, input: DealInput) -> Result<Deal> {
        self.services
            .deal_service
            .apply(deal_id, Actor::buyer(user_id), input, Utc::now())
            .await
    }

    /// Apply an admin action
    pub async fn admin(&self, deal_id: i64, input: DealInput) -> Result<Deal> {
        self.admin_at(deal_id, input, Utc::now()).await
    }

    pub async fn admin_at(&self, deal_id: i64, input: DealInput, now: DateTime<Utc>) -> Result<Deal> {
        self.services
            .deal_service
            .apply(deal_id, Actor::admin(ADMIN_ID), input, now)
            .await
    }

    /// Current status straight from the store
    pub async fn status_of(&self, deal_id: i64) -> DealStatus {
        self.database
            .deals
            .find_by_id(deal_id)
            .await
            .expect("Failed to load deal")
            .expect("Deal does not exist")
            .status
    }
}

/// Settings with a known admin and broadcast chat, and no rate spacing worth noticing
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = "12345:test_token".to_string();
    settings.bot.admin_id = ADMIN_ID;
    settings.bot.broadcast_chat_id = Some(BROADCAST_CHAT_ID);
    settings.database.url = "sqlite::memory:".to_string();
    settings.deals.min_action_spacing_ms = 1;
    settings
}
