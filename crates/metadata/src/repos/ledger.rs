//! Ledger repository: the atomic settlement of a finished upload.

use crate::error::MetadataResult;
use crate::models::{CommitReceipt, NewVideo, TransactionRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository guarding the three database effects of a successful upload.
#[async_trait]
pub trait LedgerRepo: Send + Sync {
    /// Atomically create the video row, debit the station owner's balance
    /// by the configured upload cost and append the transaction log entry.
    ///
    /// All three effects become visible together or not at all. Fails with
    /// [`MetadataError::InsufficientFunds`] when the owner's balance does
    /// not cover the cost, leaving the ledger untouched.
    ///
    /// [`MetadataError::InsufficientFunds`]: crate::error::MetadataError::InsufficientFunds
    async fn commit_video(
        &self,
        station_id: Uuid,
        video: &NewVideo,
        at: OffsetDateTime,
    ) -> MetadataResult<CommitReceipt>;

    /// Current balance of a user.
    async fn get_balance(&self, user_id: Uuid) -> MetadataResult<i64>;

    /// A user's transaction log, newest first.
    async fn list_transactions(&self, user_id: Uuid) -> MetadataResult<Vec<TransactionRow>>;
}
