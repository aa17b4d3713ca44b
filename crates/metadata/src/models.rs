//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Platform user owning one or more stations and a coin balance.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub username: String,
    /// Prepaid balance; never negative.
    pub coins: i64,
    pub coins_updated_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Broadcast station record.
#[derive(Debug, Clone, FromRow)]
pub struct StationRow {
    pub station_id: Uuid,
    pub user_id: Uuid,
    pub station_name: String,
    pub created_at: OffsetDateTime,
}

/// Durable video record, created only by a successful ledger commit.
#[derive(Debug, Clone, FromRow)]
pub struct VideoRow {
    pub video_id: Uuid,
    pub station_id: Uuid,
    /// Stored filename within the station's library directory.
    pub filename: String,
    pub size_bytes: i64,
    pub title: String,
    pub status: String,
    pub classification: String,
    pub priority: i64,
    pub created_at: OffsetDateTime,
}

/// Immutable coin transaction log entry.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub tx_id: Uuid,
    pub user_id: Uuid,
    /// The video this charge paid for.
    pub video_id: Option<Uuid>,
    /// Amount charged (positive for debits).
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: String,
    pub created_at: OffsetDateTime,
}

/// Input for a video commit: everything but the identifiers the ledger
/// allocates itself.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub filename: String,
    pub size_bytes: i64,
    pub title: String,
    pub classification: String,
    pub priority: i64,
}

/// Outcome of a successful ledger commit.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub video_id: Uuid,
    pub cost: i64,
    pub balance_before: i64,
    pub balance_after: i64,
}
