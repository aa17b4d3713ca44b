//! End-to-end upload flow tests: init -> chunks -> finalize.

mod common;

use common::TestServer;
use common::fixtures::seeded_bytes;

#[tokio::test]
async fn full_upload_flow_settles_ledger_and_cleans_spool() {
    let server = TestServer::new().await;
    let (station_id, user_id) = server.seed_station(50).await;

    let chunk_a = seeded_bytes(1, 1024);
    let chunk_b = seeded_bytes(2, 1024);
    let declared = (chunk_a.len() + chunk_b.len()) as u64;

    let upload_id = server
        .init_ok(station_id, "morning show.mp4", declared, "Morning Show")
        .await;
    assert_eq!(upload_id.len(), 32);
    assert!(server.session_dir(&upload_id).is_dir());

    let body = server.send_chunk(&upload_id, 0, 2, &chunk_a).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["chunk_index"], 0);
    assert_eq!(body["chunks_received"], 1);
    assert_eq!(body["total_chunks"], 2);

    let body = server.send_chunk(&upload_id, 1, 2, &chunk_b).await;
    assert_eq!(body["chunks_received"], 2);

    let body = server.finalize(&upload_id).await;
    assert_eq!(body["success"], true, "finalize failed: {body}");
    assert_eq!(body["coins_deducted"], 10);
    assert_eq!(body["new_balance"], 40);

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("morning_show_"));
    assert!(filename.ends_with(".mp4"));

    // The assembled file is exactly the concatenation of the chunks.
    let stored = std::fs::read(server.video_path(station_id, filename)).unwrap();
    assert_eq!(stored.len() as u64, declared);
    assert_eq!(&stored[..1024], &chunk_a[..]);
    assert_eq!(&stored[1024..], &chunk_b[..]);

    // The ledger agrees with the response.
    assert_eq!(server.state.metadata.get_balance(user_id).await.unwrap(), 40);
    let txs = server
        .state
        .metadata
        .list_transactions(user_id)
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(
        txs[0].video_id.map(|v| v.to_string()),
        body["video_id"].as_str().map(String::from)
    );

    // The video row is ready and carries the normalized attributes.
    let videos = server.state.metadata.list_videos(station_id).await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].status, "ready");
    assert_eq!(videos[0].classification, "entertainment");
    assert_eq!(videos[0].priority, 3);
    assert_eq!(videos[0].title, "Morning Show");

    // The staging directory is gone.
    assert!(!server.session_dir(&upload_id).exists());
}

#[tokio::test]
async fn chunks_may_arrive_out_of_order() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    let chunks: Vec<Vec<u8>> = (0..3).map(|i| seeded_bytes(i, 512)).collect();
    let declared = 3 * 512;

    let upload_id = server
        .init_ok(station_id, "ooo.mp4", declared, "Out of order")
        .await;

    for index in [2u32, 0, 1] {
        let body = server
            .send_chunk(&upload_id, index, 3, &chunks[index as usize])
            .await;
        assert_eq!(body["success"], true);
    }

    let body = server.finalize(&upload_id).await;
    assert_eq!(body["success"], true, "finalize failed: {body}");

    // Index order, not arrival order, defines the file layout.
    let filename = body["filename"].as_str().unwrap();
    let stored = std::fs::read(server.video_path(station_id, filename)).unwrap();
    assert_eq!(&stored[..512], &chunks[0][..]);
    assert_eq!(&stored[512..1024], &chunks[1][..]);
    assert_eq!(&stored[1024..], &chunks[2][..]);
}

#[tokio::test]
async fn chunk_retry_does_not_inflate_progress() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    let upload_id = server.init_ok(station_id, "retry.mp4", 2048, "Retry").await;

    let data = seeded_bytes(7, 1024);
    let body = server.send_chunk(&upload_id, 0, 2, &data).await;
    assert_eq!(body["chunks_received"], 1);

    // A flaky client resends the same index.
    let body = server.send_chunk(&upload_id, 0, 2, &data).await;
    assert_eq!(body["chunks_received"], 1);

    let body = server.send_chunk(&upload_id, 1, 2, &seeded_bytes(8, 1024)).await;
    assert_eq!(body["chunks_received"], 2);

    let body = server.finalize(&upload_id).await;
    assert_eq!(body["success"], true, "finalize failed: {body}");
}

#[tokio::test]
async fn size_within_tolerance_is_accepted() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    // Declared size is 500 bytes over the actual bytes: inside the
    // 1024-byte tolerance, so finalize succeeds.
    let chunk_a = seeded_bytes(3, 5 * 1024);
    let chunk_b = seeded_bytes(4, 5 * 1024);
    let declared = (chunk_a.len() + chunk_b.len()) as u64 + 500;

    let upload_id = server
        .init_ok(station_id, "close.mp4", declared, "Close enough")
        .await;
    server.send_chunk(&upload_id, 0, 2, &chunk_a).await;
    server.send_chunk(&upload_id, 1, 2, &chunk_b).await;

    let body = server.finalize(&upload_id).await;
    assert_eq!(body["success"], true, "finalize failed: {body}");
}

#[tokio::test]
async fn second_upload_gets_distinct_filename() {
    let server = TestServer::new().await;
    let (station_id, _) = server.seed_station(50).await;

    let data = seeded_bytes(9, 256);

    let first = {
        let id = server
            .init_ok(station_id, "same name.mp4", 256, "First")
            .await;
        server.send_chunk(&id, 0, 1, &data).await;
        server.finalize(&id).await
    };
    let second = {
        let id = server
            .init_ok(station_id, "same name.mp4", 256, "Second")
            .await;
        server.send_chunk(&id, 0, 1, &data).await;
        server.finalize(&id).await
    };

    assert_eq!(first["success"], true);
    assert_eq!(second["success"], true, "second finalize failed: {second}");
    assert_ne!(first["filename"], second["filename"]);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let server = TestServer::new().await;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let response = server
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
