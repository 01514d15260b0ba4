//! End-to-end conditional-GET tests against a live relay instance.
//!
//! Each test spins up the full router on an ephemeral port with its own
//! in-memory metadata database and payload directory, then drives it with
//! a plain HTTP client the way a browser would.

use bytes::Bytes;
use object_relay::{
    handlers::AppState,
    pipeline::ContentPipeline,
    routes,
    services::store::BlobStore,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use uuid::Uuid;

const CONTAINER: &str = "tutorial-streaming";
const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

struct Relay {
    addr: SocketAddr,
    store: BlobStore,
    payload_dir: PathBuf,
}

impl Relay {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.payload_dir);
    }
}

async fn spawn_relay(pipeline: ContentPipeline) -> Relay {
    // A single connection keeps the in-memory database shared.
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    for stmt in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(stmt).execute(&db).await.unwrap();
    }

    let payload_dir = std::env::temp_dir().join(format!("object-relay-it-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&payload_dir).unwrap();

    let store = BlobStore::new(Arc::new(db), payload_dir.clone());
    store.create_container(CONTAINER).await.unwrap();

    let state = AppState {
        store: store.clone(),
        pipeline,
        container: CONTAINER.to_string(),
        showcase_object: "test-object.png".to_string(),
    };
    let app = routes::routes::routes().with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Relay {
        addr,
        store,
        payload_dir,
    }
}

fn png_fixture() -> Vec<u8> {
    let frame = image::RgbaImage::from_pixel(96, 64, image::Rgba([30, 120, 220, 255]));
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(frame)
        .write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .unwrap();
    encoded
}

#[tokio::test]
async fn unconditional_get_streams_the_exact_bytes() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    let payload = b"some binary payload \x00\x01\x02".to_vec();
    relay
        .store
        .put_object(
            CONTAINER,
            "blob.bin",
            Some("application/x-demo".into()),
            Bytes::from(payload.clone()),
        )
        .await
        .unwrap();

    let resp = reqwest::get(relay.url("/download/blob.bin")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/x-demo"
    );
    let last_modified = resp.headers().get("last-modified").unwrap();
    assert!(last_modified.to_str().unwrap().ends_with("GMT"));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), payload.as_slice());
}

#[tokio::test]
async fn missing_content_type_falls_back_to_octet_stream() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    relay
        .store
        .put_object(CONTAINER, "blob.bin", None, Bytes::from_static(b"x"))
        .await
        .unwrap();

    let resp = reqwest::get(relay.url("/download/blob.bin")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn echoing_last_modified_yields_304_until_the_object_changes() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    let meta = relay
        .store
        .put_object(CONTAINER, "a.png", None, Bytes::from_static(b"v1"))
        .await
        .unwrap();

    // First round trip: full body plus a Last-Modified to echo back.
    let client = reqwest::Client::new();
    let first = client
        .get(relay.url("/download/a.png"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    let last_modified = first
        .headers()
        .get("last-modified")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    // Second round trip with the condition: 304, empty body, header kept.
    let second = client
        .get(relay.url("/download/a.png"))
        .header("If-Modified-Since", &last_modified)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 304);
    assert!(second.headers().get("last-modified").is_some());
    assert!(second.bytes().await.unwrap().is_empty());

    // Backend update: bump the modification time past the condition.
    sqlx::query("UPDATE objects SET last_modified = ? WHERE key = ?")
        .bind(meta.last_modified + chrono::Duration::seconds(5))
        .bind("a.png")
        .execute(&*relay.store.db)
        .await
        .unwrap();

    let third = client
        .get(relay.url("/download/a.png"))
        .header("If-Modified-Since", &last_modified)
        .send()
        .await
        .unwrap();
    assert_eq!(third.status(), 200);
    assert_eq!(third.bytes().await.unwrap().as_ref(), b"v1");
}

#[tokio::test]
async fn condition_newer_than_object_yields_304() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    relay
        .store
        .put_object(CONTAINER, "a.png", None, Bytes::from_static(b"v1"))
        .await
        .unwrap();

    let resp = reqwest::Client::new()
        .get(relay.url("/download/a.png"))
        .header("If-Modified-Since", "Fri, 01 Jan 2100 00:00:00 GMT")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 304);
}

#[tokio::test]
async fn obsolete_date_formats_yield_304() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    relay
        .store
        .put_object(CONTAINER, "a.png", None, Bytes::from_static(b"v1"))
        .await
        .unwrap();

    // RFC 850 and asctime conditions far in the future must short-circuit
    // just like their RFC 1123 equivalent.
    let client = reqwest::Client::new();
    for legacy in [
        "Sunday, 01-Jan-68 00:00:00 GMT", // two-digit 68 pivots to 2068
        "Fri Jan  1 00:00:00 2100",
    ] {
        let resp = client
            .get(relay.url("/download/a.png"))
            .header("If-Modified-Since", legacy)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 304, "header {:?}", legacy);
        assert!(resp.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn malformed_condition_serves_the_full_body() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    relay
        .store
        .put_object(CONTAINER, "a.png", None, Bytes::from_static(b"v1"))
        .await
        .unwrap();

    let resp = reqwest::Client::new()
        .get(relay.url("/download/a.png"))
        .header("If-Modified-Since", "certainly not an http date")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"v1");
}

#[tokio::test]
async fn missing_object_is_404_with_or_without_condition() {
    let relay = spawn_relay(ContentPipeline::Identity).await;

    let bare = reqwest::get(relay.url("/download/missing.png"))
        .await
        .unwrap();
    assert_eq!(bare.status(), 404);
    assert!(bare.headers().get("last-modified").is_none());

    let conditional = reqwest::Client::new()
        .get(relay.url("/download/missing.png"))
        .header("If-Modified-Since", "Wed, 21 Oct 2015 07:28:00 GMT")
        .send()
        .await
        .unwrap();
    assert_eq!(conditional.status(), 404);
    assert!(conditional.headers().get("last-modified").is_none());
}

#[tokio::test]
async fn watermark_reencodes_to_png() {
    let relay = spawn_relay(ContentPipeline::Watermark {
        max_input_bytes: 16 * 1024 * 1024,
    })
    .await;
    let source = png_fixture();
    relay
        .store
        .put_object(
            CONTAINER,
            "test-object.png",
            Some("image/png".into()),
            Bytes::from(source.clone()),
        )
        .await
        .unwrap();

    let resp = reqwest::get(relay.url("/download/test-object.png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    assert!(resp.headers().get("last-modified").is_some());

    let body = resp.bytes().await.unwrap();
    assert_ne!(body.as_ref(), source.as_slice());
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (96, 64));
}

#[tokio::test]
async fn watermark_skips_the_transform_on_304() {
    let relay = spawn_relay(ContentPipeline::Watermark {
        max_input_bytes: 16 * 1024 * 1024,
    })
    .await;
    relay
        .store
        .put_object(
            CONTAINER,
            "test-object.png",
            Some("image/png".into()),
            Bytes::from(png_fixture()),
        )
        .await
        .unwrap();

    // A corrupt-image transform would 500; a 304 must never reach it.
    let resp = reqwest::Client::new()
        .get(relay.url("/download/test-object.png"))
        .header("If-Modified-Since", "Fri, 01 Jan 2100 00:00:00 GMT")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 304);
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_object_fails_the_transform_cleanly() {
    let relay = spawn_relay(ContentPipeline::Watermark {
        max_input_bytes: 16,
    })
    .await;
    relay
        .store
        .put_object(
            CONTAINER,
            "test-object.png",
            Some("image/png".into()),
            Bytes::from(png_fixture()),
        )
        .await
        .unwrap();

    let resp = reqwest::get(relay.url("/download/test-object.png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    // Generic body, no internal detail.
    assert!(resp.text().await.unwrap().contains("internal error"));
}

#[tokio::test]
async fn backend_failure_is_a_500_not_a_304() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    relay
        .store
        .put_object(CONTAINER, "a.png", None, Bytes::from_static(b"v1"))
        .await
        .unwrap();

    // Break the backend out from under the relay.
    sqlx::query("DROP TABLE objects")
        .execute(&*relay.store.db)
        .await
        .unwrap();

    let resp = reqwest::Client::new()
        .get(relay.url("/download/a.png"))
        .header("If-Modified-Since", "Fri, 01 Jan 2100 00:00:00 GMT")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.text().await.unwrap().contains("internal error"));
}

#[tokio::test]
async fn index_page_links_to_the_showcase_object() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    let resp = reqwest::get(relay.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("/download/test-object.png"));
    assert!(body.contains(CONTAINER));
}

#[tokio::test]
async fn health_endpoints_respond() {
    let relay = spawn_relay(ContentPipeline::Identity).await;
    let live = reqwest::get(relay.url("/healthz")).await.unwrap();
    assert_eq!(live.status(), 200);
    let ready = reqwest::get(relay.url("/readyz")).await.unwrap();
    assert_eq!(ready.status(), 200);
}
