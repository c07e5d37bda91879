//! Database service layer
//!
//! This module provides a high-level interface to database operations

use chrono::{DateTime, Utc};
use crate::database::{create_pool, schema, DatabaseConfig, DatabasePool, DealRepository, BanRepository};
use crate::models::*;
use crate::utils::errors::TradeDeskError;

/// Number of completed deals shown in a history view
pub const HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub pool: DatabasePool,
    pub deals: DealRepository,
    pub bans: BanRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            deals: DealRepository::new(pool.clone()),
            bans: BanRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, TradeDeskError> {
        let pool = create_pool(config).await?;
        schema::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Active deals of a user. At most one in practice, but legacy data may hold more.
    pub async fn active_deals_of(&self, user_id: i64) -> Result<Vec<Deal>, TradeDeskError> {
        let deals = self.deals.list_by_user(user_id).await?;
        Ok(deals.into_iter().filter(|deal| !deal.status.is_terminal()).collect())
    }

    /// History view: admins see everyone's latest completed deals, users their own
    pub async fn history(&self, user_id: i64, is_admin: bool) -> Result<Vec<Deal>, TradeDeskError> {
        let owner = if is_admin { None } else { Some(user_id) };
        self.deals.list_completed(owner, HISTORY_LIMIT).await
    }

    /// Ban expiry of a user if currently banned
    pub async fn ban_until(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, TradeDeskError> {
        self.bans.active_ban(user_id, now).await
    }
}
