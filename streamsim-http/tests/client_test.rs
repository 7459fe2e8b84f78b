//! HttpServiceClient against a local axum server

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamsim_core::FixedSimNow;
use streamsim_http::{HttpError, HttpServiceClient, ServiceClient, ServiceClientConfig};
use streamsim_resilience::RetryPolicy;

#[derive(Default)]
struct Seen {
    time_headers: Mutex<Vec<String>>,
    genre_calls: AtomicU32,
}

async fn sign_in(State(seen): State<Arc<Seen>>, headers: HeaderMap) -> Json<Value> {
    if let Some(value) = headers.get("Override-Current-Time") {
        seen.time_headers
            .lock()
            .push(value.to_str().unwrap_or_default().to_string());
    }
    Json(json!({ "access_token": "abc" }))
}

async fn genres(State(seen): State<Arc<Seen>>) -> Result<Json<Value>, StatusCode> {
    if seen.genre_calls.fetch_add(1, Ordering::SeqCst) < 2 {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!([])))
}

async fn random_song() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn subscribe() -> StatusCode {
    StatusCode::FORBIDDEN
}

async fn serve() -> (String, Arc<Seen>) {
    let seen = Arc::new(Seen::default());
    let app = Router::new()
        .route("/auth/sign_in", post(sign_in))
        .route("/music/genres", get(genres))
        .route("/music/song/random", get(random_song))
        .route("/api/subscribe", post(subscribe))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), seen)
}

fn client(base_url: String) -> HttpServiceClient {
    let config = ServiceClientConfig {
        base_url,
        retry: RetryPolicy::linear(3, Duration::from_millis(5)),
        ..Default::default()
    };
    let now = Utc.with_ymd_and_hms(2031, 7, 4, 9, 30, 0).unwrap();
    HttpServiceClient::new(config, Arc::new(FixedSimNow(now))).unwrap()
}

#[tokio::test]
async fn test_requests_carry_simulated_time() {
    let (url, seen) = serve().await;
    let client = client(url);

    let token = client.sign_in("a@example.com", "pw").await.unwrap();
    assert_eq!(token.as_str(), "abc");

    let headers = seen.time_headers.lock().clone();
    assert_eq!(headers.len(), 1);
    let stamped = chrono::DateTime::parse_from_rfc3339(&headers[0]).unwrap();
    assert_eq!(stamped, Utc.with_ymd_and_hms(2031, 7, 4, 9, 30, 0).unwrap());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let (url, seen) = serve().await;
    let client = client(url);

    let genres = client.list_genres(Some("NO")).await.unwrap();
    assert!(genres.is_empty());
    assert_eq!(seen.genre_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_random_not_found_is_none() {
    let (url, _) = serve().await;
    let client = client(url);

    assert!(client.get_random_track(None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (url, _) = serve().await;
    let client = client(url);
    let token = streamsim_http::AccessToken("abc".to_string());

    let err = client.subscribe(&token).await.unwrap_err();
    assert!(matches!(err, HttpError::Status { status: 403, .. }));
}

#[test]
fn test_invalid_base_url_rejected() {
    let config = ServiceClientConfig {
        base_url: "not a url".to_string(),
        ..Default::default()
    };
    let now = Arc::new(FixedSimNow(Utc::now()));
    assert!(matches!(
        HttpServiceClient::new(config, now),
        Err(HttpError::InvalidUrl(_))
    ));
}
