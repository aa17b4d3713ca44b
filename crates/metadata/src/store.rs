//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{
    CommitReceipt, NewVideo, StationRow, TransactionRow, UserRow, VideoRow,
};
use crate::repos::{LedgerRepo, PricingRepo, StationRepo, VideoRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    StationRepo + VideoRepo + LedgerRepo + PricingRepo + Send + Sync
{
    /// Apply the database schema.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(db = %path.display(), "SQLite metadata store ready");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(e: std::io::Error) -> Self {
        MetadataError::Internal(format!("I/O error: {e}"))
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl StationRepo for SqliteStore {
        async fn create_user(&self, user: &UserRow) -> MetadataResult<()> {
            if self.get_user(user.user_id).await?.is_some() {
                return Err(MetadataError::AlreadyExists(format!(
                    "user_id {} already exists",
                    user.user_id
                )));
            }

            sqlx::query(
                "INSERT INTO users (user_id, username, coins, coins_updated_at, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(user.user_id)
            .bind(&user.username)
            .bind(user.coins)
            .bind(user.coins_updated_at)
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_user(&self, user_id: Uuid) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn create_station(&self, station: &StationRow) -> MetadataResult<()> {
            if self.get_station(station.station_id).await?.is_some() {
                return Err(MetadataError::AlreadyExists(format!(
                    "station_id {} already exists",
                    station.station_id
                )));
            }

            sqlx::query(
                "INSERT INTO stations (station_id, user_id, station_name, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(station.station_id)
            .bind(station.user_id)
            .bind(&station.station_name)
            .bind(station.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_station(&self, station_id: Uuid) -> MetadataResult<Option<StationRow>> {
            let row =
                sqlx::query_as::<_, StationRow>("SELECT * FROM stations WHERE station_id = ?")
                    .bind(station_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn grant_coins(
            &self,
            user_id: Uuid,
            amount: i64,
            at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE users SET coins = coins + ?, coins_updated_at = ? WHERE user_id = ?",
            )
            .bind(amount)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "user_id {user_id} not found"
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl VideoRepo for SqliteStore {
        async fn get_video(&self, video_id: Uuid) -> MetadataResult<Option<VideoRow>> {
            let row = sqlx::query_as::<_, VideoRow>("SELECT * FROM videos WHERE video_id = ?")
                .bind(video_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_videos(&self, station_id: Uuid) -> MetadataResult<Vec<VideoRow>> {
            let rows = sqlx::query_as::<_, VideoRow>(
                "SELECT * FROM videos WHERE station_id = ? ORDER BY created_at DESC",
            )
            .bind(station_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn count_videos(&self, station_id: Uuid) -> MetadataResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE station_id = ?")
                    .bind(station_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl PricingRepo for SqliteStore {
        async fn get_cost(&self, action: &str) -> MetadataResult<i64> {
            let cost: Option<i64> = sqlx::query_scalar("SELECT cost FROM prices WHERE action = ?")
                .bind(action)
                .fetch_optional(&self.pool)
                .await?;
            cost.ok_or_else(|| MetadataError::NotFound(format!("price for action {action}")))
        }

        async fn set_cost(&self, action: &str, cost: i64) -> MetadataResult<()> {
            sqlx::query(
                "INSERT INTO prices (action, cost) VALUES (?, ?)
                 ON CONFLICT(action) DO UPDATE SET cost = excluded.cost",
            )
            .bind(action)
            .bind(cost)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl LedgerRepo for SqliteStore {
        async fn commit_video(
            &self,
            station_id: Uuid,
            video: &NewVideo,
            at: OffsetDateTime,
        ) -> MetadataResult<CommitReceipt> {
            // One transaction around all three effects: the video row, the
            // debit and the log entry commit together or roll back together.
            let mut tx = self.pool.begin().await?;

            let owner: Option<Uuid> =
                sqlx::query_scalar("SELECT user_id FROM stations WHERE station_id = ?")
                    .bind(station_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let user_id = owner.ok_or_else(|| {
                MetadataError::NotFound(format!("station_id {station_id} not found"))
            })?;

            let cost: Option<i64> = sqlx::query_scalar("SELECT cost FROM prices WHERE action = ?")
                .bind(crate::UPLOAD_ACTION)
                .fetch_optional(&mut *tx)
                .await?;
            let cost = cost.ok_or_else(|| {
                MetadataError::NotFound(format!("price for action {}", crate::UPLOAD_ACTION))
            })?;

            let balance: Option<i64> =
                sqlx::query_scalar("SELECT coins FROM users WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let balance = balance.ok_or_else(|| {
                MetadataError::NotFound(format!("user_id {user_id} not found"))
            })?;

            if balance < cost {
                tx.rollback().await?;
                return Err(MetadataError::InsufficientFunds { balance, cost });
            }

            let video_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO videos (
                    video_id, station_id, filename, size_bytes, title,
                    status, classification, priority, created_at
                ) VALUES (?, ?, ?, ?, ?, 'ready', ?, ?, ?)
                "#,
            )
            .bind(video_id)
            .bind(station_id)
            .bind(&video.filename)
            .bind(video.size_bytes)
            .bind(&video.title)
            .bind(&video.classification)
            .bind(video.priority)
            .bind(at)
            .execute(&mut *tx)
            .await?;

            // Guarded debit: re-checks the balance inside the UPDATE so a
            // racing debit between the SELECT and here cannot drive the
            // balance negative.
            let debited = sqlx::query(
                "UPDATE users SET coins = coins - ?, coins_updated_at = ? WHERE user_id = ? AND coins >= ?",
            )
            .bind(cost)
            .bind(at)
            .bind(user_id)
            .bind(cost)
            .execute(&mut *tx)
            .await?;

            if debited.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(MetadataError::InsufficientFunds { balance, cost });
            }

            sqlx::query(
                r#"
                INSERT INTO coin_transactions (
                    tx_id, user_id, video_id, amount,
                    balance_before, balance_after, description, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(video_id)
            .bind(cost)
            .bind(balance)
            .bind(balance - cost)
            .bind(format!("Video upload: {}", video.title))
            .bind(at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(CommitReceipt {
                video_id,
                cost,
                balance_before: balance,
                balance_after: balance - cost,
            })
        }

        async fn get_balance(&self, user_id: Uuid) -> MetadataResult<i64> {
            let balance: Option<i64> =
                sqlx::query_scalar("SELECT coins FROM users WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?;
            balance.ok_or_else(|| MetadataError::NotFound(format!("user_id {user_id} not found")))
        }

        async fn list_transactions(&self, user_id: Uuid) -> MetadataResult<Vec<TransactionRow>> {
            let rows = sqlx::query_as::<_, TransactionRow>(
                "SELECT * FROM coin_transactions WHERE user_id = ? ORDER BY created_at DESC, tx_id",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id BLOB PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    coins INTEGER NOT NULL DEFAULT 0 CHECK (coins >= 0),
    coins_updated_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stations (
    station_id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES users(user_id),
    station_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stations_user ON stations(user_id);

CREATE TABLE IF NOT EXISTS videos (
    video_id BLOB PRIMARY KEY,
    station_id BLOB NOT NULL REFERENCES stations(station_id),
    filename TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    classification TEXT NOT NULL,
    priority INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (station_id, filename)
);

CREATE INDEX IF NOT EXISTS idx_videos_station ON videos(station_id);

CREATE TABLE IF NOT EXISTS coin_transactions (
    tx_id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES users(user_id),
    video_id BLOB REFERENCES videos(video_id),
    amount INTEGER NOT NULL,
    balance_before INTEGER NOT NULL,
    balance_after INTEGER NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_coin_transactions_user ON coin_transactions(user_id);

CREATE TABLE IF NOT EXISTS prices (
    action TEXT PRIMARY KEY,
    cost INTEGER NOT NULL
);

INSERT OR IGNORE INTO prices (action, cost) VALUES ('video_upload', 10);
"#;
