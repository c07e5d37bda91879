//! Services module
//!
//! This module contains business logic services

pub mod deal;
pub mod expiry;
pub mod notification;
pub mod session;

// Re-export commonly used services
pub use deal::{Actor, DealService};
pub use expiry::ExpiryWatcher;
pub use notification::{ActionButton, Notice, NotificationService, Notifier, TelegramNotifier};
pub use session::{SessionReply, SessionService};

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::middleware::{AccessGate, AuthMiddleware, RateLimitMiddleware};
use crate::state::{ScenarioManager, StateStorage};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub database: DatabaseService,
    pub storage: StateStorage,
    pub auth: AuthMiddleware,
    pub gate: AccessGate,
    pub notification_service: NotificationService,
    pub deal_service: DealService,
    pub session_service: SessionService,
    pub expiry_watcher: ExpiryWatcher,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, database: DatabaseService, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let storage = StateStorage::new();
        let auth = AuthMiddleware::new(settings.bot.admin_id);
        let rate_limit = RateLimitMiddleware::new(settings.deals.min_action_spacing())?;
        let gate = AccessGate::new(rate_limit, database.bans.clone(), settings.bot.admin_id);

        let notification_service = NotificationService::new(notifier, &settings.bot, settings.pricing.clone());
        let deal_service = DealService::new(
            database.clone(),
            notification_service.clone(),
            auth,
            &settings.deals,
        );
        let session_service = SessionService::new(
            database.clone(),
            storage.clone(),
            ScenarioManager::new()?,
            notification_service.clone(),
            settings.floors.clone(),
        );
        let expiry_watcher = ExpiryWatcher::new(database.clone(), notification_service.clone(), &settings.deals);

        Ok(Self {
            database,
            storage,
            auth,
            gate,
            notification_service,
            deal_service,
            session_service,
            expiry_watcher,
        })
    }
}
