//! Rate limiting and ban gating
//!
//! Every stateful action passes through [`AccessGate::admit`] before anything
//! is mutated. Banned users are rejected visibly; users acting faster than the
//! configured spacing are dropped silently by the caller.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use tracing::{debug, info};
use crate::database::BanRepository;
use crate::utils::errors::{Result, TradeDeskError};

/// Per-user minimum spacing between accepted actions
pub struct RateLimitMiddleware<C: Clock = DefaultClock> {
    limiter: RateLimiter<i64, DashMapStateStore<i64>, C, NoOpMiddleware<C::Instant>>,
    spacing: Duration,
}

impl RateLimitMiddleware<DefaultClock> {
    pub fn new(spacing: Duration) -> Result<Self> {
        Self::with_clock(spacing, &DefaultClock::default())
    }
}

impl<C: Clock> RateLimitMiddleware<C> {
    /// Build a limiter driven by an explicit clock
    pub fn with_clock(spacing: Duration, clock: &C) -> Result<Self> {
        let quota = Quota::with_period(spacing)
            .ok_or_else(|| TradeDeskError::Config("Action spacing must be non-zero".to_string()))?;

        Ok(Self {
            limiter: RateLimiter::new(quota, DashMapStateStore::default(), clock),
            spacing,
        })
    }

    /// Record an action; false when it came too soon after the last accepted one
    pub fn check(&self, user_id: i64) -> bool {
        match self.limiter.check_key(&user_id) {
            Ok(()) => true,
            Err(_) => {
                debug!(user_id = user_id, spacing_ms = self.spacing.as_millis() as u64, "Action dropped by rate limit");
                false
            }
        }
    }

    /// Forget users whose buckets are full again
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
    }
}

/// Ban check followed by the rate check
pub struct AccessGate<C: Clock = DefaultClock> {
    rate_limit: Arc<RateLimitMiddleware<C>>,
    bans: BanRepository,
    admin_id: i64,
}

impl<C: Clock> Clone for AccessGate<C> {
    fn clone(&self) -> Self {
        Self {
            rate_limit: Arc::clone(&self.rate_limit),
            bans: self.bans.clone(),
            admin_id: self.admin_id,
        }
    }
}

impl<C: Clock> AccessGate<C> {
    pub fn new(rate_limit: RateLimitMiddleware<C>, bans: BanRepository, admin_id: i64) -> Self {
        Self {
            rate_limit: Arc::new(rate_limit),
            bans,
            admin_id,
        }
    }

    /// Fail with `Banned` if the user is banned at `now`. The admin is never banned.
    pub async fn check_ban(&self, user_id: i64, now: DateTime<Utc>) -> Result<()> {
        if user_id == self.admin_id {
            return Ok(());
        }
        match self.bans.active_ban(user_id, now).await? {
            Some(until) => {
                info!(user_id = user_id, until = %until, "Banned user rejected");
                Err(TradeDeskError::Banned { user_id, until })
            }
            None => Ok(()),
        }
    }

    /// Admit a stateful action or explain why not
    pub async fn admit(&self, user_id: i64, now: DateTime<Utc>) -> Result<()> {
        self.check_ban(user_id, now).await?;
        if !self.rate_limit.check(user_id) {
            return Err(TradeDeskError::RateLimitExceeded);
        }
        Ok(())
    }

    /// Drop limiter state for users idle past the spacing window
    pub fn cleanup(&self) {
        self.rate_limit.cleanup();
    }
}
