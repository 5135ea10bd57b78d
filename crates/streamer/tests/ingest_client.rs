//! Ingest client against a local HTTP sink.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use clickstream_core::{DeliveryBatch, DeliveryTransport, TransportError};
use clickstream_streamer::IngestClient;
use clickstream_test_helpers::user;
use clickstream_types::{Event, Timestamp};
use flate2::read::GzDecoder;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

type Received = Arc<Mutex<Vec<(HashMap<String, String>, Vec<Value>)>>>;

async fn collect(
    State(received): State<Received>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Vec<Value>>,
) -> StatusCode {
    received.lock().push((params, body));
    StatusCode::OK
}

async fn collect_gzip(
    State(received): State<Received>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> StatusCode {
    let mut json = String::new();
    if GzDecoder::new(&body[..]).read_to_string(&mut json).is_err() {
        return StatusCode::BAD_REQUEST;
    }
    match serde_json::from_str(&json) {
        Ok(events) => {
            received.lock().push((params, events));
            StatusCode::OK
        }
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

/// Start a sink on an ephemeral port and return its base URL.
async fn start_sink(received: Received) -> String {
    let app = Router::new()
        .route("/collect", post(collect))
        .route("/collect-gzip", post(collect_gzip))
        .route("/down", post(unavailable))
        .with_state(received);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_batch_is_posted_as_json_array() {
    let received = Received::default();
    let base = start_sink(Arc::clone(&received)).await;
    let client = IngestClient::new(format!("{}/collect", base), "shop").unwrap();

    let user = user(3);
    let events = vec![
        Event::new("_session_start", Timestamp(1_000)).with_attribute("session_id", "abc-001"),
        Event::new("_screen_view", Timestamp(1_500)).with_attribute("screen_name", "MainActivity"),
    ];
    client
        .deliver(DeliveryBatch::for_user(&user, &events, 9))
        .await
        .unwrap();

    let received = received.lock();
    assert_eq!(received.len(), 1);
    let (params, body) = &received[0];
    assert_eq!(params["appId"], "shop");
    assert_eq!(params["platform"], "Android");
    assert_eq!(params["fakeIp"], "198.51.100.7");
    assert_eq!(params["compression"], "");
    assert_eq!(params["event_bundle_sequence_id"], "9");

    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["event_type"], "_session_start");
    assert_eq!(body[0]["timestamp"], 1_000);
    assert_eq!(body[0]["session_id"], "abc-001");
    assert_eq!(body[1]["screen_name"], "MainActivity");
}

#[tokio::test]
async fn test_gzip_batch_is_decoded_by_sink() {
    let received = Received::default();
    let base = start_sink(Arc::clone(&received)).await;
    let client = IngestClient::new(format!("{}/collect-gzip", base), "shop")
        .unwrap()
        .with_gzip(true);

    let events = vec![
        Event::new("_page_view", Timestamp(2_000)),
        Event::new("_user_engagement", Timestamp(2_400)),
    ];
    client
        .deliver(DeliveryBatch::bulk(&events, 11))
        .await
        .unwrap();

    let received = received.lock();
    assert_eq!(received.len(), 1);
    let (params, body) = &received[0];
    assert_eq!(params["compression"], "gzip");
    assert_eq!(params["event_bundle_sequence_id"], "11");
    assert_eq!(body.len(), 2);
    assert_eq!(body[1]["event_type"], "_user_engagement");
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let base = start_sink(Received::default()).await;
    let client = IngestClient::new(format!("{}/down", base), "shop").unwrap();

    let events = vec![Event::new("_screen_view", Timestamp(5))];
    let result = client.deliver(DeliveryBatch::bulk(&events, 1)).await;
    assert!(matches!(result, Err(TransportError::Status { status: 503 })));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_request_error() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = IngestClient::new(format!("http://{}/collect", addr), "shop").unwrap();
    let events = vec![Event::new("_screen_view", Timestamp(5))];
    let result = client.deliver(DeliveryBatch::bulk(&events, 1)).await;
    assert!(matches!(result, Err(TransportError::Request(_))));
}
