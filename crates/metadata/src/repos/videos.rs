//! Video record repository.

use crate::error::MetadataResult;
use crate::models::VideoRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for durable video records.
///
/// Creation is deliberately absent here: video rows come into existence
/// only through [`crate::repos::LedgerRepo::commit_video`].
#[async_trait]
pub trait VideoRepo: Send + Sync {
    /// Get a video by ID.
    async fn get_video(&self, video_id: Uuid) -> MetadataResult<Option<VideoRow>>;

    /// List a station's videos, newest first.
    async fn list_videos(&self, station_id: Uuid) -> MetadataResult<Vec<VideoRow>>;

    /// Count a station's videos (cap enforcement at init).
    async fn count_videos(&self, station_id: Uuid) -> MetadataResult<u64>;
}
