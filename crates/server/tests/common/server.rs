//! Server test harness.

use super::fixtures::MultipartForm;
use airlift_core::config::AppConfig;
use airlift_metadata::models::{StationRow, UserRow};
use airlift_metadata::{MetadataStore, SqliteStore};
use airlift_server::{AppState, create_router};
use airlift_spool::{ChunkSpool, FilesystemLibrary, FilesystemSpool, VideoLibrary};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

/// A test server wrapper with all dependencies over a tempdir.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary spool, library and database.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let spool_path = temp_dir.path().join("spool");
        let library_path = temp_dir.path().join("videos");
        let db_path = temp_dir.path().join("airlift.db");

        let spool: Arc<dyn ChunkSpool> = Arc::new(
            FilesystemSpool::new(&spool_path)
                .await
                .expect("Failed to create spool"),
        );
        let library: Arc<dyn VideoLibrary> = Arc::new(
            FilesystemLibrary::new(&library_path)
                .await
                .expect("Failed to create library"),
        );
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig::for_testing();
        config.storage.spool_path = spool_path;
        config.storage.library_path = library_path;
        config.metadata.path = db_path;

        let state = AppState::new(config, spool, library, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Create a station owned by a fresh user holding `coins`.
    /// Returns (station_id, user_id).
    pub async fn seed_station(&self, coins: i64) -> (Uuid, Uuid) {
        let now = OffsetDateTime::now_utc();
        let user_id = Uuid::new_v4();
        let station_id = Uuid::new_v4();

        self.state
            .metadata
            .create_user(&UserRow {
                user_id,
                username: format!("user-{user_id}"),
                coins,
                coins_updated_at: None,
                created_at: now,
            })
            .await
            .expect("Failed to create user");
        self.state
            .metadata
            .create_station(&StationRow {
                station_id,
                user_id,
                station_name: "Test FM".to_string(),
                created_at: now,
            })
            .await
            .expect("Failed to create station");

        (station_id, user_id)
    }

    /// POST a multipart form and return (status, parsed body).
    pub async fn post(&self, uri: &str, form: MultipartForm) -> (StatusCode, Value) {
        let (content_type, body) = form.finish();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Init a session with sensible defaults and return the parsed body.
    pub async fn init(
        &self,
        station_id: Uuid,
        filename: &str,
        filesize: u64,
        title: &str,
    ) -> Value {
        let form = MultipartForm::new()
            .text("station_id", &station_id.to_string())
            .text("filename", filename)
            .text("filesize", &filesize.to_string())
            .text("title", title)
            .text("content_type", "entertainment")
            .text("priority", "3");
        let (status, body) = self.post("/v1/upload/init", form).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Init and unwrap the upload id, asserting success.
    pub async fn init_ok(
        &self,
        station_id: Uuid,
        filename: &str,
        filesize: u64,
        title: &str,
    ) -> String {
        let body = self.init(station_id, filename, filesize, title).await;
        assert_eq!(body["success"], true, "init failed: {body}");
        body["upload_id"].as_str().unwrap().to_string()
    }

    /// Upload one chunk.
    pub async fn send_chunk(
        &self,
        upload_id: &str,
        index: u32,
        total: u32,
        data: &[u8],
    ) -> Value {
        let form = MultipartForm::new()
            .text("upload_id", upload_id)
            .text("chunk_index", &index.to_string())
            .text("total_chunks", &total.to_string())
            .bytes("chunk", data);
        let (status, body) = self.post("/v1/upload/chunk", form).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Finalize an upload.
    pub async fn finalize(&self, upload_id: &str) -> Value {
        let form = MultipartForm::new().text("upload_id", upload_id);
        let (status, body) = self.post("/v1/upload/finalize", form).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Cancel an upload.
    pub async fn cancel(&self, upload_id: &str) -> Value {
        let form = MultipartForm::new().text("upload_id", upload_id);
        let (status, body) = self.post("/v1/upload/cancel", form).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Path of a session's staging directory.
    pub fn session_dir(&self, upload_id: &str) -> PathBuf {
        self.state.config.storage.spool_path.join(upload_id)
    }

    /// Path of a stored video file.
    pub fn video_path(&self, station_id: Uuid, filename: &str) -> PathBuf {
        self.state
            .config
            .storage
            .library_path
            .join(station_id.to_string())
            .join(filename)
    }
}
