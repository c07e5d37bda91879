//! Ban repository implementation

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use crate::models::ban::BanRecord;
use crate::utils::errors::TradeDeskError;

#[derive(Clone, Debug)]
pub struct BanRepository {
    pool: SqlitePool,
}

impl BanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the ban row of a user
    pub async fn find(&self, user_id: i64) -> Result<Option<BanRecord>, TradeDeskError> {
        let record = sqlx::query_as::<_, BanRecord>(
            "SELECT user_id, banned_until FROM users WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert or overwrite the ban of a user
    pub async fn upsert(&self, user_id: i64, banned_until: DateTime<Utc>) -> Result<BanRecord, TradeDeskError> {
        let record = sqlx::query_as::<_, BanRecord>(
            r#"
            INSERT INTO users (user_id, banned_until) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET banned_until = excluded.banned_until
            RETURNING user_id, banned_until
            "#
        )
        .bind(user_id)
        .bind(banned_until.timestamp())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// The ban expiry if the user is banned at `now`
    pub async fn active_ban(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, TradeDeskError> {
        Ok(self
            .find(user_id)
            .await?
            .filter(|record| record.is_active(now))
            .map(|record| record.banned_until))
    }

    /// All ban rows, including expired ones
    pub async fn list(&self) -> Result<Vec<BanRecord>, TradeDeskError> {
        let records = sqlx::query_as::<_, BanRecord>(
            "SELECT user_id, banned_until FROM users ORDER BY user_id"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
