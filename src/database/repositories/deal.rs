//! Deal repository implementation
//!
//! Every mutation is a single guarded statement (or a short transaction), so
//! a live user action and the expiry sweep can race on the same row and the
//! loser simply observes `None`.

use std::collections::BTreeSet;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use crate::models::deal::{CreateDealRequest, Deal, DealFieldWrites, DealStatus};
use crate::utils::errors::TradeDeskError;

const DEAL_COLUMNS: &str =
    "id, user_id, currency, bank, initials, usdt_net, amount_kk, deal_time, nick, status, created_at, timer_until";

const TERMINAL: &str = "('done', 'cancelled')";

#[derive(Clone, Debug)]
pub struct DealRepository {
    pool: SqlitePool,
}

impl DealRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new deal in `new` status.
    ///
    /// Returns `None` without writing anything when the user already owns an
    /// active deal.
    pub async fn create(&self, request: CreateDealRequest, now: DateTime<Utc>) -> Result<Option<Deal>, TradeDeskError> {
        let sql = format!(
            r#"
            INSERT INTO deals (user_id, currency, bank, initials, usdt_net, amount_kk, status, created_at)
            SELECT $1, $2, $3, $4, $5, $6, 'new', $7
            WHERE NOT EXISTS (
                SELECT 1 FROM deals WHERE user_id = $1 AND status NOT IN {terminal}
            )
            RETURNING {columns}
            "#,
            terminal = TERMINAL,
            columns = DEAL_COLUMNS,
        );

        let result = sqlx::query_as::<_, Deal>(&sql)
            .bind(request.user_id)
            .bind(request.currency.as_str())
            .bind(request.bank)
            .bind(request.initials)
            .bind(request.network)
            .bind(request.quantity)
            .bind(now.timestamp())
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(deal) => Ok(deal),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!(user_id = request.user_id, "Active deal index rejected insert");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find deal by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Deal>, TradeDeskError> {
        let deal = sqlx::query_as::<_, Deal>(&format!("SELECT {} FROM deals WHERE id = $1", DEAL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(deal)
    }

    /// Find the user's active deal, if any
    pub async fn find_active_by_user(&self, user_id: i64) -> Result<Option<Deal>, TradeDeskError> {
        let deal = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {} FROM deals WHERE user_id = $1 AND status NOT IN {} ORDER BY id DESC LIMIT 1",
            DEAL_COLUMNS, TERMINAL
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deal)
    }

    /// List every deal of a user, newest first
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Deal>, TradeDeskError> {
        let deals = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {} FROM deals WHERE user_id = $1 ORDER BY id DESC",
            DEAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(deals)
    }

    /// List deals whose status is in `statuses`, oldest first
    pub async fn list_by_statuses(&self, statuses: &[DealStatus]) -> Result<Vec<Deal>, TradeDeskError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=statuses.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM deals WHERE status IN ({}) ORDER BY id ASC",
            DEAL_COLUMNS, placeholders
        );

        let mut query = sqlx::query_as::<_, Deal>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Completed deals, newest first; all users when `user_id` is `None`
    pub async fn list_completed(&self, user_id: Option<i64>, limit: i64) -> Result<Vec<Deal>, TradeDeskError> {
        let deals = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, Deal>(&format!(
                    "SELECT {} FROM deals WHERE user_id = $1 AND status = 'done' ORDER BY id DESC LIMIT $2",
                    DEAL_COLUMNS
                ))
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Deal>(&format!(
                    "SELECT {} FROM deals WHERE status = 'done' ORDER BY id DESC LIMIT $1",
                    DEAL_COLUMNS
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(deals)
    }

    /// Move a deal from `from` to `to`, applying `writes`.
    ///
    /// Returns `None` when the deal is missing or no longer in `from`.
    pub async fn transition(
        &self,
        id: i64,
        from: DealStatus,
        to: DealStatus,
        writes: DealFieldWrites,
    ) -> Result<Option<Deal>, TradeDeskError> {
        let deal = sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET status = $1,
                deal_time = COALESCE($2, deal_time),
                nick = COALESCE($3, nick),
                timer_until = COALESCE($4, timer_until)
            WHERE id = $5 AND status = $6
            RETURNING {}
            "#,
            DEAL_COLUMNS
        ))
        .bind(to.as_str())
        .bind(writes.deal_time)
        .bind(writes.nickname)
        .bind(writes.expires_at.map(|t| t.timestamp()))
        .bind(id)
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(deal)
    }

    /// Deals waiting on the buyer whose deadline is strictly before `now`
    pub async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Deal>, TradeDeskError> {
        let deals = sqlx::query_as::<_, Deal>(&format!(
            "SELECT {} FROM deals WHERE status = 'nick_set' AND timer_until IS NOT NULL AND timer_until < $1 ORDER BY id ASC",
            DEAL_COLUMNS
        ))
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await?;

        Ok(deals)
    }

    /// Cancel an expired `nick_set` deal and ban its owner in one transaction.
    ///
    /// Returns `None` (and bans nobody) if the buyer moved the deal on first.
    pub async fn expire_with_ban(&self, id: i64, banned_until: DateTime<Utc>) -> Result<Option<Deal>, TradeDeskError> {
        let mut tx = self.pool.begin().await?;

        let deal = sqlx::query_as::<_, Deal>(&format!(
            "UPDATE deals SET status = 'cancelled' WHERE id = $1 AND status = 'nick_set' RETURNING {}",
            DEAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(ref deal) = deal {
            sqlx::query(
                r#"
                INSERT INTO users (user_id, banned_until) VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET banned_until = excluded.banned_until
                "#,
            )
            .bind(deal.user_id)
            .bind(banned_until.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(deal)
    }

    /// Cancel every active deal and make sure each affected user has a ban row.
    ///
    /// Existing ban rows are left untouched. Returns the affected user ids.
    pub async fn cancel_all_active(&self) -> Result<Vec<i64>, TradeDeskError> {
        let mut tx = self.pool.begin().await?;

        // Opening with the write takes the write lock up front
        let cancelled: Vec<(i64,)> = sqlx::query_as(&format!(
            "UPDATE deals SET status = 'cancelled' WHERE status NOT IN {} RETURNING user_id",
            TERMINAL
        ))
        .fetch_all(&mut *tx)
        .await?;

        let users: BTreeSet<i64> = cancelled.into_iter().map(|(user_id,)| user_id).collect();

        for user_id in &users {
            sqlx::query("INSERT OR IGNORE INTO users (user_id, banned_until) VALUES ($1, 0)")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(users.into_iter().collect())
    }

    /// Count deals in a given status
    pub async fn count_by_status(&self, status: DealStatus) -> Result<i64, TradeDeskError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM deals WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::database::{create_pool, schema::ensure_schema, DatabaseConfig};
    use crate::models::Currency;

    async fn repo() -> DealRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        DealRepository::new(pool)
    }

    fn request(user_id: i64) -> CreateDealRequest {
        CreateDealRequest {
            user_id,
            currency: Currency::Uah,
            bank: Some("Монобанк".to_string()),
            initials: Some("I.I.".to_string()),
            network: None,
            quantity: 20,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_monotonic_ids() {
        let repo = repo().await;
        let now = Utc::now();
        let first = repo.create(request(1), now).await.unwrap().unwrap();
        let second = repo.create(request(2), now).await.unwrap().unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.status, DealStatus::New);
        assert_eq!(first.created_at.timestamp(), now.timestamp());
        assert!(first.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_second_active_deal_is_refused() {
        let repo = repo().await;
        let now = Utc::now();
        let first = repo.create(request(1), now).await.unwrap().unwrap();
        assert!(repo.create(request(1), now).await.unwrap().is_none());

        repo.transition(first.id, DealStatus::New, DealStatus::Cancelled, DealFieldWrites::default())
            .await
            .unwrap()
            .unwrap();
        assert!(repo.create(request(1), now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_transition_is_guarded_by_source_state() {
        let repo = repo().await;
        let deal = repo.create(request(1), Utc::now()).await.unwrap().unwrap();
        let writes = DealFieldWrites { deal_time: Some("18:00".to_string()), ..Default::default() };

        let moved = repo.transition(deal.id, DealStatus::New, DealStatus::TimeSet, writes.clone()).await.unwrap();
        assert_eq!(moved.unwrap().deal_time.as_deref(), Some("18:00"));

        let replay = repo.transition(deal.id, DealStatus::New, DealStatus::TimeSet, writes).await.unwrap();
        assert!(replay.is_none());
        assert!(repo.transition(9999, DealStatus::New, DealStatus::TimeSet, DealFieldWrites::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expire_with_ban_only_touches_nick_set() {
        let repo = repo().await;
        let now = Utc::now();
        let deal = repo.create(request(1), now).await.unwrap().unwrap();

        assert!(repo.expire_with_ban(deal.id, now + Duration::minutes(15)).await.unwrap().is_none());
        assert_eq!(repo.find_by_id(deal.id).await.unwrap().unwrap().status, DealStatus::New);
    }

    #[tokio::test]
    async fn test_list_by_statuses_and_completed() {
        let repo = repo().await;
        let now = Utc::now();
        let a = repo.create(request(1), now).await.unwrap().unwrap();
        let b = repo.create(request(2), now).await.unwrap().unwrap();
        repo.transition(b.id, DealStatus::New, DealStatus::Done, DealFieldWrites::default()).await.unwrap();

        let new_deals = repo.list_by_statuses(&[DealStatus::New]).await.unwrap();
        assert_eq!(new_deals.iter().map(|d| d.id).collect::<Vec<_>>(), vec![a.id]);

        assert_eq!(repo.list_completed(None, 10).await.unwrap().len(), 1);
        assert!(repo.list_completed(Some(1), 10).await.unwrap().is_empty());
        assert_eq!(repo.count_by_status(DealStatus::Done).await.unwrap(), 1);
        assert!(repo.list_by_statuses(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_all_active_alongside_another_writer() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("deals.db").display()),
            max_connections: 4,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        let repo = DealRepository::new(pool);
        let now = Utc::now();

        for user_id in [3, 1, 2] {
            repo.create(request(user_id), now).await.unwrap().unwrap();
        }
        let done = repo.create(request(4), now).await.unwrap().unwrap();
        repo.transition(done.id, DealStatus::New, DealStatus::Done, DealFieldWrites::default()).await.unwrap();

        // A file database with several connections: both writers must get through
        let (cleared, created) = tokio::join!(repo.cancel_all_active(), repo.create(request(5), now));
        let cleared = cleared.unwrap();
        assert!(created.unwrap().is_some());

        assert_eq!(&cleared[..3], &[1, 2, 3]);
        assert!(cleared.len() <= 4);
        assert_eq!(repo.find_by_id(done.id).await.unwrap().unwrap().status, DealStatus::Done);
        for user_id in [1, 2, 3] {
            assert!(repo.find_active_by_user(user_id).await.unwrap().is_none());
        }
    }
}
