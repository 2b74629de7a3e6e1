/// API integration tests
/// Drives the full router against a real gallery directory and database
mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, write_png, TestServer};
use serde_json::json;
use std::time::Duration;
use vuvur_core::settings::SettingsResolver;
use vuvur_scanner::{FileScanLock, ScanLock};

#[tokio::test]
async fn test_health_endpoints() {
    let server = TestServer::new().await;

    let (status, body) = server.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = server.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_gallery_pagination_and_metadata() {
    let server = TestServer::new().await;
    write_png(&server.path("a.png"), 8, 8, Some("misty harbor at dawn"));
    write_png(&server.path("b.png"), 8, 8, None);
    write_png(&server.path("c.png"), 8, 8, None);
    server.scan().await;

    let (status, body) = server
        .get("/api/gallery?page=1&limit=2&sort=file_asc")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["page"], 1);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["filename"], "a.png");
    assert_eq!(items[0]["type"], "image");
    assert_eq!(items[0]["descriptive_text"], "misty harbor at dawn");
    assert_eq!(
        items[0]["raw_metadata"],
        json!({ "parameters": "misty harbor at dawn" })
    );
    // Null metadata is still an object
    assert_eq!(items[1]["raw_metadata"], json!({}));

    let (_, body) = server
        .get("/api/gallery?page=2&limit=2&sort=file_asc")
        .await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["filename"], "c.png");
}

#[tokio::test]
async fn test_gallery_unknown_sort_uses_default() {
    let server = TestServer::new().await;
    write_png(&server.path("only.png"), 4, 4, None);
    server.scan().await;

    let (status, body) = server.get("/api/gallery?sort=sideways").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 1);
}

#[tokio::test]
async fn test_gallery_search_filter() {
    let server = TestServer::new().await;
    write_png(&server.path("one.png"), 4, 4, Some("red lighthouse"));
    write_png(&server.path("two.png"), 4, 4, Some("blue meadow"));
    server.scan().await;

    let (_, body) = server.get("/api/gallery?q=lighth").await;
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["items"][0]["filename"], "one.png");
}

#[tokio::test]
async fn test_groups_and_subgroups() {
    let server = TestServer::new().await;
    write_png(&server.path("cats/tabby/a.png"), 4, 4, None);
    write_png(&server.path("cats/tabby/b.png"), 4, 4, None);
    write_png(&server.path("cats/black/c.png"), 4, 4, None);
    write_png(&server.path("cats/loose.png"), 4, 4, None);
    write_png(&server.path("dogs/d.png"), 4, 4, None);
    write_png(&server.path("top.png"), 4, 4, None);
    server.scan().await;

    let (status, body) = server.get("/api/gallery/groups").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "group_tag": "cats", "count": 4 },
            { "group_tag": "dogs", "count": 1 },
        ])
    );

    let (status, body) = server.get("/api/gallery/subgroups?group=cats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["black", "tabby"]));

    let (status, _) = server.get("/api/gallery/subgroups").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = server.get("/api/gallery?group=cats").await;
    assert_eq!(body["total_items"], 4);

    let (_, body) = server
        .get("/api/gallery?group=cats&subgroup=tabby")
        .await;
    assert_eq!(body["total_items"], 2);

    let (status, _) = server
        .get("/api/gallery?group=cats&subgroup=..%2Fdogs")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_endpoint() {
    let server = TestServer::new().await;
    write_png(&server.path("x.png"), 4, 4, Some("castle in the clouds"));
    write_png(&server.path("y.png"), 4, 4, Some("castle ruins"));
    write_png(&server.path("z.png"), 4, 4, Some("forest"));
    server.scan().await;

    let (status, body) = server.get("/api/search?q=castle").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = server.get("/api/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing search query");

    let (status, _) = server.get("/api/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_random_endpoints() {
    let server = TestServer::new().await;
    for i in 0..4 {
        write_png(&server.path(&format!("r{}.png", i)), 4, 4, Some("sunset"));
    }
    server.scan().await;

    let (status, body) = server.get("/api/files/random?count=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = server.get("/api/random-single?q=sunset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = server.get("/api/random-single?q=glacier").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scan_trigger_and_status() {
    let server = TestServer::new().await;
    write_png(&server.path("new.png"), 4, 4, None);

    let (status, body) = server.post("/api/scan").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");

    server.wait_idle().await;

    let (status, body) = server.get("/api/scan/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["total"], 1);
    assert!(body["finished_at"].is_string());
    assert!(body["last_error"].is_null());

    let (_, body) = server.get("/api/gallery").await;
    assert_eq!(body["total_items"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_scan_trigger_conflicts() {
    let server = TestServer::with_slow_extractor(Duration::from_millis(300)).await;
    write_png(&server.path("slow.png"), 4, 4, None);

    let (status, _) = server.post("/api/scan").await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = server.post("/api/scan").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "busy");
    assert_eq!(body["message"], "scan already in progress");

    server.wait_idle().await;
    let (status, _) = server.post("/api/scan").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    server.wait_idle().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scan_trigger_conflicts_with_other_process() {
    let server = TestServer::new().await;
    write_png(&server.path("shared.png"), 4, 4, None);

    // Another server process sharing the data directory is mid-scan
    let other = FileScanLock::new(server.state.config.lock_path());
    let held = other.acquire(Duration::from_secs(1)).await.unwrap().unwrap();

    let (status, body) = server.post("/api/scan").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "busy");
    assert_eq!(
        body["message"],
        "scan already in progress in another process"
    );
    assert!(!server.state.guard.is_busy());

    drop(held);
    let (status, _) = server.post("/api/scan").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    server.wait_idle().await;

    let (_, body) = server.get("/api/gallery").await;
    assert_eq!(body["total_items"], 1);
}

#[tokio::test]
async fn test_settings_read_and_update() {
    let server = TestServer::new().await;
    let mut interval = server.state.settings.subscribe_interval();

    let (status, body) = server.get("/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["scan_interval"], 3600);
    assert_eq!(body["settings"]["default_sort"], "date_desc");
    assert_eq!(body["locked_keys"], json!([]));

    let (status, body) = server
        .post_json("/api/settings", &json!({ "scan_interval": 60 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["scan_interval"], 60);

    // The scheduler's interval follows the new value
    assert!(interval.has_changed().unwrap());
    assert_eq!(*interval.borrow_and_update(), Duration::from_secs(60));

    let (_, body) = server.get("/api/settings").await;
    assert_eq!(body["settings"]["scan_interval"], 60);
}

#[tokio::test]
async fn test_settings_rejects_bad_updates() {
    let server = TestServer::new().await;

    let (status, _) = server
        .post_json("/api/settings", &json!({ "theme": "dark" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post_json("/api/settings", &json!({ "scan_interval": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post_json("/api/settings", &json!([1, 2])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A bad key rejects the whole update
    let (status, _) = server
        .post_json(
            "/api/settings",
            &json!({ "default_sort": "random", "scan_interval": "soon" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = server.get("/api/settings").await;
    assert_eq!(body["settings"]["default_sort"], "date_desc");
}

#[tokio::test]
async fn test_env_locked_setting() {
    let resolver = SettingsResolver::from_vars([("VUVUR_SCAN_INTERVAL", "0")]);
    let server = TestServer::with_resolver(resolver).await;

    let (_, body) = server.get("/api/settings").await;
    assert_eq!(body["settings"]["scan_interval"], 0);
    assert_eq!(body["locked_keys"], json!(["scan_interval"]));

    let (status, _) = server
        .post_json("/api/settings", &json!({ "scan_interval": 30 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .post_json("/api/settings", &json!({ "default_sort": "file_asc" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["default_sort"], "file_asc");
    assert_eq!(body["settings"]["scan_interval"], 0);
}

#[tokio::test]
async fn test_toggle_like() {
    let server = TestServer::new().await;
    write_png(&server.path("fav.png"), 4, 4, None);
    server.scan().await;
    let id = server.id_of("fav.png").await;

    let (status, body) = server.post(&format!("/api/toggle_like/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);

    // Survives a rescan
    server.scan().await;
    let (_, body) = server.get("/api/gallery").await;
    assert_eq!(body["items"][0]["liked"], true);

    let (_, body) = server.post(&format!("/api/toggle_like/{}", id)).await;
    assert_eq!(body["liked"], false);

    let (status, _) = server.post("/api/toggle_like/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_moves_to_recycle_bin() {
    let server = TestServer::new().await;
    write_png(&server.path("trip/photo.png"), 4, 4, None);
    write_png(&server.path("other/photo.png"), 4, 4, None);
    server.scan().await;

    let first = server.id_of("trip/photo.png").await;
    let second = server.id_of("other/photo.png").await;

    let (status, body) = server.post(&format!("/api/delete/{}", first)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(!server.path("trip/photo.png").exists());
    assert!(server.path("recyclebin/photo.png").exists());

    let (_, body) = server.post(&format!("/api/delete/{}", second)).await;
    assert_eq!(body["status"], "ok");
    assert!(server.path("recyclebin/photo (1).png").exists());

    let (_, body) = server.get("/api/gallery").await;
    assert_eq!(body["total_items"], 0);

    // The bin is never indexed
    server.scan().await;
    let (_, body) = server.get("/api/gallery").await;
    assert_eq!(body["total_items"], 0);

    let (status, _) = server.post(&format!("/api/delete/{}", first)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_file_still_removes_record() {
    let server = TestServer::new().await;
    write_png(&server.path("ghost.png"), 4, 4, None);
    server.scan().await;
    let id = server.id_of("ghost.png").await;

    std::fs::remove_file(server.path("ghost.png")).unwrap();

    let (status, body) = server.post(&format!("/api/delete/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "warning");

    let (_, body) = server.get("/api/gallery").await;
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
async fn test_thumbnail_and_preview_are_cached() {
    let server = TestServer::new().await;
    write_png(&server.path("wide.png"), 800, 400, None);
    server.scan().await;
    let id = server.id_of("wide.png").await;

    let response = server
        .get_raw(&format!("/api/thumbnails/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = body_bytes(response).await;
    let thumb = image::load_from_memory(&bytes).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (400, 200));

    let cached = server.data.join("thumbs").join(format!("{}.jpg", id));
    assert!(cached.exists());

    let response = server.get_raw(&format!("/api/preview/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let preview = image::load_from_memory(&body_bytes(response).await).unwrap();
    // Already inside 1920x1080
    assert_eq!((preview.width(), preview.height()), (800, 400));
    assert!(server
        .data
        .join("previews")
        .join(format!("{}.jpg", id))
        .exists());

    let response = server.get_raw("/api/thumbnails/9999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_full_and_range() {
    let server = TestServer::new().await;
    let path = server.path("clip.png");
    write_png(&path, 16, 16, None);
    server.scan().await;
    let id = server.id_of("clip.png").await;
    let original = std::fs::read(&path).unwrap();

    let response = server.get_raw(&format!("/api/stream/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, original);

    let response = server
        .get_raw(&format!("/api/stream/{}", id), Some("bytes=4-11"))
        .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes 4-11/{}", original.len()).as_str()
    );
    assert_eq!(body_bytes(response).await, original[4..12].to_vec());

    std::fs::remove_file(&path).unwrap();
    let response = server.get_raw(&format!("/api/stream/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_cleanup_removes_orphans_and_rescans() {
    let server = TestServer::new().await;
    write_png(&server.path("keep.png"), 64, 64, None);
    server.scan().await;
    let id = server.id_of("keep.png").await;

    let response = server
        .get_raw(&format!("/api/thumbnails/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let thumbs = server.data.join("thumbs");
    std::fs::write(thumbs.join("9999.jpg"), b"stale").unwrap();
    std::fs::write(server.data.join("previews").join("8888.jpg"), b"stale").unwrap();

    let (status, body) = server.post("/api/cache/cleanup").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["removed"], 2);
    assert_eq!(body["scan"]["status"], "accepted");

    assert!(thumbs.join(format!("{}.jpg", id)).exists());
    assert!(!thumbs.join("9999.jpg").exists());

    server.wait_idle().await;
}
