//! Ledger and video metadata store for Airlift.
//!
//! This crate owns the database-visible half of the upload pipeline:
//! - stations and their owning users' coin balances
//! - durable video records
//! - the append-only coin transaction log
//! - per-action pricing
//!
//! The financial correctness core lives in [`repos::LedgerRepo::commit_video`]:
//! video insert, balance debit and log append applied as one transaction.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use airlift_core::config::MetadataConfig;
use std::sync::Arc;

/// Pricing key for the video upload action.
pub const UPLOAD_ACTION: &str = "video_upload";

/// Default cost in coins for a video upload, seeded into the pricing table.
pub const DEFAULT_UPLOAD_COST: i64 = 10;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = SqliteStore::new(&config.path).await?;
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
