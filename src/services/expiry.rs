//! Expiry watcher
//!
//! Periodically cancels `nick_set` deals whose buyer let the deadline pass and
//! bans the owner for the penalty window.

use std::time::Duration as StdDuration;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use crate::config::DealsConfig;
use crate::database::DatabaseService;
use crate::services::notification::NotificationService;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct ExpiryWatcher {
    db: DatabaseService,
    notifications: NotificationService,
    ban_duration: Duration,
    interval: StdDuration,
}

impl ExpiryWatcher {
    pub fn new(db: DatabaseService, notifications: NotificationService, deals: &DealsConfig) -> Self {
        Self {
            db,
            notifications,
            ban_duration: deals.ban_duration(),
            interval: deals.sweep_interval(),
        }
    }

    /// One pass over overdue deals; returns how many were cancelled
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let overdue = self.db.deals.find_expired(now).await?;
        if overdue.is_empty() {
            return Ok(0);
        }

        let banned_until = now + self.ban_duration;
        let mut cancelled = 0;

        for candidate in overdue {
            match self.db.deals.expire_with_ban(candidate.id, banned_until).await {
                Ok(Some(deal)) => {
                    cancelled += 1;
                    info!(
                        deal_id = deal.id,
                        user_id = deal.user_id,
                        banned_until = %banned_until,
                        "Deal expired, owner banned"
                    );
                    self.notifications.deal_expired(&deal, banned_until).await;
                }
                Ok(None) => {
                    debug!(deal_id = candidate.id, "Deal moved on before expiry");
                }
                Err(e) => {
                    warn!(deal_id = candidate.id, error = %e, "Failed to expire deal");
                }
            }
        }

        Ok(cancelled)
    }

    /// Run [`sweep`](Self::sweep) forever on the configured interval
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = self.interval.as_secs(), "Expiry watcher started");

            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    error!(error = %e, severity = %e.severity(), "Expiry sweep failed");
                }
            }
        })
    }
}
