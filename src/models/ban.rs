//! Ban model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row};

/// Temporary ban. A user is banned iff `banned_until > now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    pub user_id: i64,
    pub banned_until: DateTime<Utc>,
}

impl BanRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.banned_until > now
    }
}

impl<'r> FromRow<'r, SqliteRow> for BanRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let seconds = row.try_get::<Option<i64>, _>("banned_until")?.unwrap_or(0);
        let banned_until = DateTime::from_timestamp(seconds, 0).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "banned_until".to_string(),
            source: format!("timestamp out of range: {}", seconds).into(),
        })?;

        Ok(BanRecord {
            user_id: row.try_get("user_id")?,
            banned_until,
        })
    }
}
