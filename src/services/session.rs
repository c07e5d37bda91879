//! Conversation session manager
//!
//! Drives the field-by-field composition of a new deal. Nothing reaches the
//! store until the final quantity passes validation.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use crate::config::FloorsConfig;
use crate::database::DatabaseService;
use crate::models::Deal;
use crate::services::notification::NotificationService;
use crate::state::{ConversationContext, ScenarioManager, ScenarioStep, StateStorage, StepOutcome};
use crate::utils::errors::{Result, TradeDeskError};

/// What to tell the composing user after a message
#[derive(Debug)]
pub enum SessionReply {
    /// Ask for the next field
    Prompt(ScenarioStep),
    /// Ask for the same field again
    Retry { step: ScenarioStep, reason: TradeDeskError },
    /// The deal exists and the admin has been notified
    Created(Deal),
}

#[derive(Clone)]
pub struct SessionService {
    db: DatabaseService,
    storage: StateStorage,
    scenarios: ScenarioManager,
    notifications: NotificationService,
    floors: FloorsConfig,
}

impl SessionService {
    pub fn new(
        db: DatabaseService,
        storage: StateStorage,
        scenarios: ScenarioManager,
        notifications: NotificationService,
        floors: FloorsConfig,
    ) -> Self {
        Self {
            db,
            storage,
            scenarios,
            notifications,
            floors,
        }
    }

    /// Open a composition session, discarding any previous conversation state
    pub async fn start(&self, user_id: i64, now: DateTime<Utc>) -> Result<ScenarioStep> {
        self.storage.delete_context(user_id).await;
        self.ensure_can_create(user_id, now).await?;

        let context = ConversationContext::composing(user_id);
        let first = context.step().map(|step| self.scenarios.describe(step));
        self.storage.save_context(context).await;

        info!(user_id = user_id, "Deal composition started");
        first.ok_or_else(|| TradeDeskError::InvalidInput("New session has no step".to_string()))
    }

    /// Whether the user is in the middle of composing a deal
    pub async fn is_composing(&self, user_id: i64) -> bool {
        self.storage
            .load_context(user_id)
            .await
            .map(|context| context.is_composing())
            .unwrap_or(false)
    }

    /// Feed one message into the user's session; `None` when there is no session
    pub async fn submit_input(&self, user_id: i64, input: &str, now: DateTime<Utc>) -> Result<Option<SessionReply>> {
        let mut context = match self.storage.load_context(user_id).await {
            Some(context) if context.is_composing() => context,
            _ => return Ok(None),
        };

        let outcome = self.scenarios.apply_input(&mut context, input, &self.floors)?;
        let reply = match outcome {
            StepOutcome::Advanced(step) => {
                debug!(user_id = user_id, step = step.as_str(), "Session advanced");
                self.storage.save_context(context).await;
                SessionReply::Prompt(self.scenarios.describe(step))
            }
            StepOutcome::Rejected { step, reason } => {
                debug!(user_id = user_id, step = step.as_str(), reason = %reason, "Session input rejected");
                self.storage.save_context(context).await;
                SessionReply::Retry { step: self.scenarios.describe(step), reason }
            }
            StepOutcome::Ready(request) => {
                self.storage.delete_context(user_id).await;
                self.ensure_not_banned(user_id, now).await?;

                let deal = self
                    .db
                    .deals
                    .create(request, now)
                    .await?
                    .ok_or(TradeDeskError::ActiveDealExists { user_id })?;

                info!(deal_id = deal.id, user_id = user_id, quantity = deal.quantity, currency = deal.currency.as_str(), "Deal created");
                self.notifications.deal_created(&deal).await;
                SessionReply::Created(deal)
            }
        };

        Ok(Some(reply))
    }

    /// Drop the user's session without creating anything
    pub async fn abandon(&self, user_id: i64) -> bool {
        let dropped = self.storage.delete_context(user_id).await;
        if dropped {
            debug!(user_id = user_id, "Session abandoned");
        }
        dropped
    }

    async fn ensure_can_create(&self, user_id: i64, now: DateTime<Utc>) -> Result<()> {
        self.ensure_not_banned(user_id, now).await?;
        if self.db.deals.find_active_by_user(user_id).await?.is_some() {
            return Err(TradeDeskError::ActiveDealExists { user_id });
        }
        Ok(())
    }

    async fn ensure_not_banned(&self, user_id: i64, now: DateTime<Utc>) -> Result<()> {
        match self.db.ban_until(user_id, now).await? {
            Some(until) => Err(TradeDeskError::Banned { user_id, until }),
            None => Ok(()),
        }
    }
}
