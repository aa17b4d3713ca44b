//! Station and user repository.

use crate::error::MetadataResult;
use crate::models::{StationRow, UserRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for stations and their owning users.
#[async_trait]
pub trait StationRepo: Send + Sync {
    /// Create a new user.
    async fn create_user(&self, user: &UserRow) -> MetadataResult<()>;

    /// Get a user by ID.
    async fn get_user(&self, user_id: Uuid) -> MetadataResult<Option<UserRow>>;

    /// Create a new station.
    async fn create_station(&self, station: &StationRow) -> MetadataResult<()>;

    /// Get a station by ID.
    async fn get_station(&self, station_id: Uuid) -> MetadataResult<Option<StationRow>>;

    /// Credit coins to a user's balance (top-up path, out of band of the
    /// upload pipeline).
    async fn grant_coins(
        &self,
        user_id: Uuid,
        amount: i64,
        at: OffsetDateTime,
    ) -> MetadataResult<()>;
}
