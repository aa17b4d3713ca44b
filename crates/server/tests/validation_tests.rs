//! Input validation tests: session ids, field checks, normalization.

mod common;

use airlift_core::session::SessionId;
use axum::http::StatusCode;
use common::TestServer;
use common::fixtures::{MultipartForm, seeded_bytes};
use uuid::Uuid;

/// Session ids that must be rejected everywhere, including traversal
/// attempts that would otherwise become path components.
const BAD_SESSION_IDS: &[&str] = &[
    "../../etc",
    "..%2f..%2fetc",
    "short",
    "ABCDEF00112233445566778899AABBCC",
    "g0112233445566778899aabbccddeeff",
    "00112233445566778899aabbccddeeff/",
];

#[tokio::test]
async fn chunk_rejects_malformed_session_ids() {
    let server = TestServer::new().await;

    for bad in BAD_SESSION_IDS {
        let form = MultipartForm::new()
            .text("upload_id", bad)
            .text("chunk_index", "0")
            .text("total_chunks", "1")
            .bytes("chunk", b"data");
        let (status, body) = server.post("/v1/upload/chunk", form).await;
        assert_eq!(status, StatusCode::OK, "errors are signaled in-band");
        assert_eq!(body["success"], false, "accepted {bad:?}");
        assert_eq!(body["error"], "invalid session id");
    }
}

#[tokio::test]
async fn finalize_and_cancel_reject_malformed_session_ids() {
    let server = TestServer::new().await;

    for bad in BAD_SESSION_IDS {
        let form = MultipartForm::new().text("upload_id", bad);
        let (_, body) = server.post("/v1/upload/finalize", form).await;
        assert_eq!(body["success"], false, "finalize accepted {bad:?}");

        let form = MultipartForm::new().text("upload_id", bad);
        let (_, body) = server.post("/v1/upload/cancel", form).await;
        assert_eq!(body["success"], false, "cancel accepted {bad:?}");
    }
}

#[tokio::test]
async fn unknown_but_wellformed_session_errors_cleanly() {
    let server = TestServer::new().await;
    let ghost = SessionId::new().to_string();

    let body = server.send_chunk(&ghost, 0, 1, b"data").await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unknown upload session");

    let body = server.finalize(&ghost).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unknown upload session");
}

#[tokio::test]
async fn init_rejects_oversized_declaration() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    // 600 MiB declared against the 500 MiB cap.
    let body = server
        .init(station_id, "big.mp4", 600 * 1024 * 1024, "Too big")
        .await;
    assert_eq!(body["success"], false);
    assert!(
        body["error"].as_str().unwrap().contains("file too large"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
async fn init_rejects_disallowed_extension() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    for bad in ["virus.exe", "script.php", "noextension"] {
        let body = server.init(station_id, bad, 1024, "Nope").await;
        assert_eq!(body["success"], false, "accepted {bad:?}");
        assert!(body["error"].as_str().unwrap().contains("not allowed"));
    }
}

#[tokio::test]
async fn init_rejects_missing_fields() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    // No filename.
    let form = MultipartForm::new()
        .text("station_id", &station_id.to_string())
        .text("filesize", "1024")
        .text("title", "No filename");
    let (_, body) = server.post("/v1/upload/init", form).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("filename"));

    // Empty title.
    let form = MultipartForm::new()
        .text("station_id", &station_id.to_string())
        .text("filename", "a.mp4")
        .text("filesize", "1024")
        .text("title", "   ");
    let (_, body) = server.post("/v1/upload/init", form).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn init_rejects_unknown_station() {
    let server = TestServer::new().await;

    let body = server
        .init(Uuid::new_v4(), "a.mp4", 1024, "Ghost station")
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "station not found");
}

#[tokio::test]
async fn classification_and_priority_normalize_instead_of_rejecting() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    let form = MultipartForm::new()
        .text("station_id", &station_id.to_string())
        .text("filename", "odd.mp4")
        .text("filesize", "256")
        .text("title", "Odd inputs")
        .text("content_type", "definitely-not-a-genre")
        .text("priority", "9000");
    let (_, body) = server.post("/v1/upload/init", form).await;
    assert_eq!(body["success"], true, "init failed: {body}");

    let upload_id = body["upload_id"].as_str().unwrap();
    let id = SessionId::parse(upload_id).unwrap();
    let session = server
        .state
        .spool
        .load_session(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.classification.as_str(), "other");
    assert_eq!(session.priority.get(), 3);
}

#[tokio::test]
async fn chunk_rejects_bad_index_and_count() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;
    let upload_id = server.init_ok(station_id, "idx.mp4", 1024, "Indices").await;

    for (index, total) in [("-1", "1"), ("abc", "1"), ("0", "0"), ("0", "x")] {
        let form = MultipartForm::new()
            .text("upload_id", &upload_id)
            .text("chunk_index", index)
            .text("total_chunks", total)
            .bytes("chunk", b"data");
        let (_, body) = server.post("/v1/upload/chunk", form).await;
        assert_eq!(
            body["success"], false,
            "accepted index={index} total={total}"
        );
    }
}

#[tokio::test]
async fn chunk_requires_binary_part() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;
    let upload_id = server.init_ok(station_id, "nobin.mp4", 1024, "No binary").await;

    let form = MultipartForm::new()
        .text("upload_id", &upload_id)
        .text("chunk_index", "0")
        .text("total_chunks", "1");
    let (_, body) = server.post("/v1/upload/chunk", form).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("chunk"));
}

#[tokio::test]
async fn oversized_chunk_is_rejected_with_size_error() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;
    let upload_id = server.init_ok(station_id, "fat.mp4", 1024, "Fat chunk").await;

    let max = server.state.config.server.max_chunk_bytes as usize;
    let body = server
        .send_chunk(&upload_id, 0, 1, &seeded_bytes(5, max + 1))
        .await;
    assert_eq!(body["success"], false);
    assert!(
        body["error"].as_str().unwrap().contains("size limit"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
async fn errors_use_the_in_band_envelope() {
    let server = TestServer::new().await;

    let form = MultipartForm::new().text("upload_id", "nope");
    let (status, body) = server.post("/v1/upload/cancel", form).await;

    // Always HTTP 200; failure is carried in the body.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}
