//! Deal FSM controller
//!
//! Validates an action against the transition table, applies it with a
//! guarded store update and notifies the counterpart. A missing deal or a deal
//! that already left the expected status yields a stale error and no write.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use crate::config::DealsConfig;
use crate::database::DatabaseService;
use crate::middleware::AuthMiddleware;
use crate::models::{ActorRole, Deal, DealFieldWrites, DealStatus};
use crate::services::notification::NotificationService;
use crate::state::context::AdminPromptKind;
use crate::state::transitions::{self, DealInput, Trigger};
use crate::utils::errors::{Result, TradeDeskError};
use crate::utils::logging::{log_admin_action, log_transition};

/// Who is acting, and in which capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: ActorRole,
}

impl Actor {
    pub fn buyer(user_id: i64) -> Self {
        Self { user_id, role: ActorRole::Buyer }
    }

    pub fn admin(user_id: i64) -> Self {
        Self { user_id, role: ActorRole::Admin }
    }
}

#[derive(Clone)]
pub struct DealService {
    db: DatabaseService,
    notifications: NotificationService,
    auth: AuthMiddleware,
    expiry_window: Duration,
}

impl DealService {
    pub fn new(db: DatabaseService, notifications: NotificationService, auth: AuthMiddleware, deals: &DealsConfig) -> Self {
        Self {
            db,
            notifications,
            auth,
            expiry_window: deals.expiry_window(),
        }
    }

    /// Apply one action to a deal and notify whoever acts next
    pub async fn apply(&self, deal_id: i64, actor: Actor, input: DealInput, now: DateTime<Utc>) -> Result<Deal> {
        let deal = self
            .db
            .deals
            .find_by_id(deal_id)
            .await?
            .ok_or(TradeDeskError::DealNotFound { deal_id })?;

        self.authorize(actor, &deal)?;

        let trigger = input.trigger();
        let from = deal.status;
        let to = transitions::target(from, actor.role, trigger)
            .ok_or_else(|| TradeDeskError::stale(deal_id, &transitions::sources(actor.role, trigger), Some(from)))?;

        let writes = self.field_writes(input, now)?;

        let updated = match self.db.deals.transition(deal_id, from, to, writes).await? {
            Some(updated) => updated,
            None => {
                // Lost a race between the read and the guarded write
                let actual = self.db.deals.find_by_id(deal_id).await?.map(|d| d.status);
                debug!(deal_id = deal_id, from = %from, actual = ?actual, "Guarded update matched nothing");
                return Err(TradeDeskError::stale(deal_id, &[from], actual));
            }
        };

        log_transition(deal_id, actor.user_id, from, to);
        self.notifications.deal_transitioned(&updated, actor.role).await;
        Ok(updated)
    }

    /// Verify an admin prompt may be opened for this deal
    pub async fn check_prompt(&self, deal_id: i64, user_id: i64, kind: AdminPromptKind) -> Result<Deal> {
        self.auth.check_admin(user_id)?;

        let expected = match kind {
            AdminPromptKind::Time => DealStatus::New,
            AdminPromptKind::Nickname => DealStatus::TimeConfirmed,
        };

        match self.db.deals.find_by_id(deal_id).await? {
            Some(deal) if deal.status == expected => Ok(deal),
            Some(deal) => Err(TradeDeskError::stale(deal_id, &[expected], Some(deal.status))),
            None => Err(TradeDeskError::DealNotFound { deal_id }),
        }
    }

    /// Cancel every active deal; returns the number of affected users
    pub async fn clear_active(&self, user_id: i64) -> Result<usize> {
        self.auth.check_admin(user_id)?;

        let users = self.db.deals.cancel_all_active().await?;
        let details = format!("{} users", users.len());
        log_admin_action(user_id, "clear_active", Some(&details));
        Ok(users.len())
    }

    fn authorize(&self, actor: Actor, deal: &Deal) -> Result<()> {
        match actor.role {
            ActorRole::Admin => self.auth.check_admin(actor.user_id),
            ActorRole::Buyer => self.auth.check_owner(actor.user_id, deal.user_id),
        }
    }

    fn field_writes(&self, input: DealInput, now: DateTime<Utc>) -> Result<DealFieldWrites> {
        let writes = match input {
            DealInput::ProposeTime(time) => DealFieldWrites {
                deal_time: Some(non_empty(time, Trigger::ProposeTime)?),
                ..Default::default()
            },
            DealInput::AssignNick(nickname) => DealFieldWrites {
                nickname: Some(non_empty(nickname, Trigger::AssignNick)?),
                expires_at: Some(now + self.expiry_window),
                ..Default::default()
            },
            _ => DealFieldWrites::default(),
        };
        Ok(writes)
    }
}

fn non_empty(text: String, trigger: Trigger) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TradeDeskError::InvalidInput(format!("{:?} needs a non-empty value", trigger)));
    }
    Ok(trimmed.to_string())
}
