use std::sync::Arc;

use reqwest::Url;
use serde_json::json;

use super::*;
use crate::cache::{DiskCacheStorage, MemoryCacheStorage};
use crate::clients::LocalClients;
use crate::models::StoredResponse;
use crate::net::CacheMode;
use crate::testing::FakeNetwork;

const ORIGIN: &str = "http://localhost:8049";

struct Harness {
    router: CacheRouter,
    storage: Arc<MemoryCacheStorage>,
    network: Arc<FakeNetwork>,
    clients: Arc<LocalClients>,
}

fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

fn options(version: u32, manifest: &[&str]) -> RouterOptions {
    RouterOptions::new(Url::parse(ORIGIN).unwrap(), version)
        .with_manifest(Manifest::new(manifest.iter().map(|s| s.to_string()).collect()))
}

fn harness(version: u32, manifest: &[&str]) -> Harness {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(FakeNetwork::new());
    let clients = Arc::new(LocalClients::new());
    let router = CacheRouter::new(
        options(version, manifest),
        storage.clone(),
        network.clone(),
        clients.clone(),
    );
    Harness {
        router,
        storage,
        network,
        clients,
    }
}

fn html(body: &str) -> StoredResponse {
    StoredResponse::new(200, body.to_string()).with_header("content-type", "text/html")
}

fn get(path: &str) -> Request {
    Request::get(Url::parse(&url(path)).unwrap())
}

// -------------------------------------------------------------------------
// Routing
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_network_response_is_returned_and_cached() {
    let h = harness(4, &[]);
    h.network.respond(&url("/about"), html("<html>about</html>"));

    let routed = h.router.on_fetch(get("/about")).await.unwrap();
    assert_eq!(routed.source, ResponseSource::Network);
    assert_eq!(routed.response, html("<html>about</html>"));

    let cached = h.storage.match_entry("rambling-4", "/about").await.unwrap().unwrap();
    assert_eq!(cached.data, html("<html>about</html>"));

    let calls = h.network.calls();
    let (_, opts) = &calls[0];
    assert_eq!(*opts, FetchOptions::routing());
    assert_eq!(opts.cache, CacheMode::NoStore);
}

#[tokio::test]
async fn test_cache_key_ignores_query() {
    let h = harness(4, &[]);
    h.network.respond(&url("/about?ref=home"), html("about"));

    h.router.on_fetch(get("/about?ref=home")).await.unwrap();
    assert!(h.storage.match_entry("rambling-4", "/about").await.unwrap().is_some());
}

#[tokio::test]
async fn test_offline_serves_cached_copy_byte_for_byte() {
    let h = harness(4, &[]);
    let stored = StoredResponse::new(200, vec![0u8, 1, 2, 255])
        .with_header("content-type", "image/gif")
        .with_header("etag", "\"v1\"");
    h.storage.put("rambling-4", "/images/logo.gif", stored.clone()).await.unwrap();
    h.network.set_offline(true);

    let routed = h.router.on_fetch(get("/images/logo.gif")).await.unwrap();
    assert_eq!(routed.source, ResponseSource::Cache);
    assert_eq!(routed.response, stored);
}

#[tokio::test]
async fn test_offline_without_cache_yields_nothing() {
    let h = harness(4, &[]);
    h.network.set_offline(true);

    assert!(h.router.on_fetch(get("/contact")).await.is_none());
}

#[tokio::test]
async fn test_error_status_is_not_cached() {
    let h = harness(4, &[]);
    h.network.respond(&url("/broken"), StoredResponse::new(500, "oops"));

    assert!(h.router.on_fetch(get("/broken")).await.is_none());
    assert!(h.storage.match_entry("rambling-4", "/broken").await.unwrap().is_none());
}

#[tokio::test]
async fn test_error_status_falls_back_to_cache() {
    let h = harness(4, &[]);
    h.storage.put("rambling-4", "/", html("home")).await.unwrap();
    h.network.respond(&url("/"), StoredResponse::new(503, "down"));

    let routed = h.router.on_fetch(get("/")).await.unwrap();
    assert_eq!(routed.source, ResponseSource::Cache);
    assert_eq!(routed.response.body.as_ref(), b"home");
}

#[tokio::test]
async fn test_cross_origin_is_not_routed() {
    let h = harness(4, &[]);
    let request = Request::get(Url::parse("https://cdn.example.com/lib.js").unwrap());

    assert!(h.router.on_fetch(request).await.is_none());
    assert!(h.network.calls().is_empty());
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_response() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(DiskCacheStorage::new(dir.path().to_path_buf()).unwrap());
    let network = Arc::new(FakeNetwork::new());
    network.respond(&url("/about"), html("about"));
    // A prefix the disk backend refuses as a store name
    let router = CacheRouter::new(
        options(4, &[]).with_prefix("bad/prefix"),
        storage,
        network,
        Arc::new(LocalClients::new()),
    );

    let routed = router.on_fetch(get("/about")).await.unwrap();
    assert_eq!(routed.source, ResponseSource::Network);
}

// -------------------------------------------------------------------------
// Manifest seeding
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_seeding_skips_cached_urls_without_force() {
    let h = harness(4, &["/", "/about"]);
    h.storage.put("rambling-4", "/about", html("cached")).await.unwrap();
    h.network.respond(&url("/"), html("home"));
    h.network.respond(&url("/about"), html("fresh"));

    let report = h.router.cache_logged_out_files(false).await;

    assert_eq!(report.outcome("/"), Some(SeedOutcome::Stored));
    assert_eq!(report.outcome("/about"), Some(SeedOutcome::AlreadyCached));
    assert_eq!(h.network.call_count(&url("/about")), 0);
    let about = h.storage.match_entry("rambling-4", "/about").await.unwrap().unwrap();
    assert_eq!(about.data.body.as_ref(), b"cached");
}

#[tokio::test]
async fn test_seeding_with_force_overwrites() {
    let h = harness(4, &["/", "/about"]);
    h.storage.put("rambling-4", "/", html("old home")).await.unwrap();
    h.storage.put("rambling-4", "/about", html("old about")).await.unwrap();
    h.network.respond(&url("/"), html("new home"));
    h.network.respond(&url("/about"), html("new about"));

    let report = h.router.cache_logged_out_files(true).await;

    assert_eq!(report.stored(), 2);
    for (path, body) in [("/", "new home"), ("/about", "new about")] {
        let entry = h.storage.match_entry("rambling-4", path).await.unwrap().unwrap();
        assert_eq!(entry.data.body.as_ref(), body.as_bytes());
    }
    assert!(h
        .network
        .calls()
        .iter()
        .all(|(_, opts)| opts.cache == CacheMode::NoCache));
}

#[tokio::test]
async fn test_seeding_failures_do_not_propagate() {
    let h = harness(4, &["/", "/about", "/missing"]);
    h.network.respond(&url("/"), html("home"));
    h.network.fail(&url("/about"));

    let report = h.router.cache_logged_out_files(true).await;

    assert_eq!(report.outcome("/"), Some(SeedOutcome::Stored));
    assert_eq!(report.outcome("/about"), Some(SeedOutcome::Failed));
    assert_eq!(report.outcome("/missing"), Some(SeedOutcome::Rejected(404)));
    assert!(h.storage.match_entry("rambling-4", "/missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_seeding_fully_offline_still_completes() {
    let h = harness(4, &["/", "/about"]);
    h.network.set_offline(true);

    let report = h.router.cache_logged_out_files(false).await;
    assert_eq!(report.count(SeedOutcome::Failed), 2);
    assert!(h.storage.keys().await.unwrap().is_empty());
}

// -------------------------------------------------------------------------
// Lifecycle
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_activation_replaces_previous_version() {
    let h = harness(5, &["/about"]);
    h.storage.put("rambling-4", "/about", html("<html>OLD</html>")).await.unwrap();
    h.network.respond(&url("/about"), html("<html>NEW</html>"));

    h.router.on_activate().await.unwrap();

    assert_eq!(h.storage.keys().await.unwrap(), vec!["rambling-5"]);
    let about = h.storage.match_entry("rambling-5", "/about").await.unwrap().unwrap();
    assert_eq!(about.data.body.as_ref(), b"<html>NEW</html>");
}

#[tokio::test]
async fn test_activation_deletes_only_stale_versions_of_our_prefix() {
    let h = harness(5, &[]);
    for name in ["rambling-1", "rambling-3", "rambling-6", "rambling-0", "avatars-2", "rambling-5"] {
        h.storage.open(name).await.unwrap();
    }

    h.router.on_activate().await.unwrap();

    // Enumerates the real store names rather than the running store's name
    assert_eq!(
        h.storage.keys().await.unwrap(),
        vec!["avatars-2", "rambling-0", "rambling-5"]
    );
}

#[tokio::test]
async fn test_activation_creates_store_and_claims_pages() {
    let h = harness(5, &["/"]);
    h.network.set_offline(true);
    let (page, _inbox) = h.clients.register("/", false).await;

    h.router.on_activate().await.unwrap();

    assert_eq!(h.storage.keys().await.unwrap(), vec!["rambling-5"]);
    assert_eq!(h.clients.is_controlled(page).await, Some(true));
}

#[tokio::test]
async fn test_install_skips_waiting_without_touching_cache() {
    let h = harness(4, &["/"]);

    h.router.on_install().await.unwrap();

    assert!(h.clients.skip_waiting_requested().await);
    assert!(h.storage.keys().await.unwrap().is_empty());
    assert!(h.network.calls().is_empty());
}

// -------------------------------------------------------------------------
// Messages
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_status_update_overwrites_both_fields() {
    let h = harness(4, &[]);

    h.router
        .on_message(&json!({ "statusUpdate": { "isOnline": false, "isLoggedIn": true } }))
        .await;

    assert_eq!(
        h.router.status(),
        Status {
            is_online: false,
            is_logged_in: true
        }
    );
}

#[tokio::test]
async fn test_unknown_messages_leave_status_alone() {
    let h = harness(4, &[]);

    h.router.on_message(&json!({ "hello": "world" })).await;
    h.router.on_message(&json!([1, 2, 3])).await;

    assert_eq!(h.router.status(), Status::default());
}

#[tokio::test]
async fn test_injected_status_is_shared() {
    let h = harness(4, &[]);
    let status = SharedStatus::default();
    let router = h.router.clone().with_status(status.clone());

    router
        .on_message(&json!({ "statusUpdate": { "isOnline": false, "isLoggedIn": false } }))
        .await;

    assert!(!status.get().is_online);
    // The original router keeps its own status
    assert!(h.router.status().is_online);
}

#[tokio::test]
async fn test_broadcast_replies_update_status() {
    let h = harness(4, &[]);
    let (_page, mut inbox) = h.clients.register("/", false).await;

    let page = tokio::spawn(async move {
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.message, json!({ "requestStatusUpdate": true }));
        envelope
            .reply
            .send(json!({ "statusUpdate": { "isOnline": true, "isLoggedIn": true } }))
            .await
            .unwrap();
    });

    let broadcast = h
        .router
        .send_message(OutboundMessage::request_status_update())
        .await;
    assert_eq!(broadcast.delivered, 1);

    page.await.unwrap();
    assert_eq!(broadcast.replies.await.unwrap(), 1);
    assert!(h.router.status().is_logged_in);
}

#[tokio::test]
async fn test_start_requests_status_and_seeds() {
    let h = harness(4, &["/"]);
    h.network.respond(&url("/"), html("home"));
    let (_page, mut inbox) = h.clients.register("/", false).await;

    let report = h.router.start().await;

    assert_eq!(report.outcome("/"), Some(SeedOutcome::Stored));
    let envelope = inbox.try_recv().unwrap();
    assert_eq!(envelope.message, json!({ "requestStatusUpdate": true }));
}

#[tokio::test]
async fn test_start_seeds_even_if_a_page_stops_reading() {
    let h = harness(4, &["/"]);
    h.network.respond(&url("/"), html("home"));
    let (stuck, _inbox) = h.clients.register("/", true).await;
    let (reply_tx, _reply_rx) = mpsc::channel(1);
    while h.clients.post_message(stuck, json!({}), reply_tx.clone()).await {}

    let report = tokio::time::timeout(std::time::Duration::from_secs(2), h.router.start())
        .await
        .expect("startup blocked on a page that stopped reading");

    assert_eq!(report.outcome("/"), Some(SeedOutcome::Stored));
    assert!(h.storage.match_entry("rambling-4", "/").await.unwrap().is_some());
}
