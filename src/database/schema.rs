//! Schema bootstrap and additive column upgrades
//!
//! Tables are created when absent, then audited column by column. Any column
//! a newer build expects but an older database lacks is added in place;
//! nothing is ever dropped or renamed.

use sqlx::Row;
use tracing::{info, warn};
use crate::database::DatabasePool;
use crate::utils::errors::Result;

const CREATE_DEALS: &str = r#"
    CREATE TABLE IF NOT EXISTS deals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        currency TEXT NOT NULL,
        bank TEXT,
        initials TEXT,
        usdt_net TEXT,
        amount_kk INTEGER NOT NULL,
        deal_time TEXT,
        nick TEXT,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        timer_until INTEGER
    )
"#;

/// One row per user who was ever banned or swept by a bulk clear
const CREATE_USERS: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        banned_until INTEGER NOT NULL DEFAULT 0
    )
"#;

/// Column definitions usable with `ALTER TABLE ... ADD COLUMN`
const DEAL_COLUMNS: &[(&str, &str)] = &[
    ("user_id", "INTEGER NOT NULL DEFAULT 0"),
    ("currency", "TEXT NOT NULL DEFAULT 'UAH'"),
    ("bank", "TEXT"),
    ("initials", "TEXT"),
    ("usdt_net", "TEXT"),
    ("amount_kk", "INTEGER NOT NULL DEFAULT 0"),
    ("deal_time", "TEXT"),
    ("nick", "TEXT"),
    ("status", "TEXT NOT NULL DEFAULT 'new'"),
    ("created_at", "INTEGER NOT NULL DEFAULT 0"),
    ("timer_until", "INTEGER"),
];

const USER_COLUMNS: &[(&str, &str)] = &[
    ("banned_until", "INTEGER NOT NULL DEFAULT 0"),
];

/// Create missing tables, add missing columns and indexes
pub async fn ensure_schema(pool: &DatabasePool) -> Result<()> {
    info!("Verifying database schema...");

    sqlx::query(CREATE_DEALS).execute(pool).await?;
    sqlx::query(CREATE_USERS).execute(pool).await?;

    add_missing_columns(pool, "deals", DEAL_COLUMNS).await?;
    add_missing_columns(pool, "users", USER_COLUMNS).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_deals_status ON deals (status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_deals_user ON deals (user_id)")
        .execute(pool)
        .await?;

    // Legacy data may already hold duplicates; the guarded insert still enforces the rule.
    if let Err(e) = sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_deals_one_active ON deals (user_id) \
         WHERE status NOT IN ('done', 'cancelled')",
    )
    .execute(pool)
    .await
    {
        warn!(error = %e, "Could not create one-active-deal index");
    }

    info!("Database schema is up to date");
    Ok(())
}

/// Names of the columns currently present in `table`
pub async fn table_columns(pool: &DatabasePool, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push(row.try_get::<String, _>("name")?);
    }
    Ok(columns)
}

async fn add_missing_columns(pool: &DatabasePool, table: &str, expected: &[(&str, &str)]) -> Result<()> {
    let present = table_columns(pool, table).await?;

    for (name, definition) in expected {
        if present.iter().any(|c| c == name) {
            continue;
        }
        info!(table = table, column = name, "Adding missing column");
        sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, name, definition))
            .execute(pool)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_pool, DatabaseConfig};

    #[tokio::test]
    async fn test_fresh_schema_has_every_column() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let columns = table_columns(&pool, "deals").await.unwrap();
        for (name, _) in DEAL_COLUMNS {
            assert!(columns.iter().any(|c| c == name), "missing {}", name);
        }
        assert!(table_columns(&pool, "users").await.unwrap().contains(&"banned_until".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
