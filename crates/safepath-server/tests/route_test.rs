//! Route search integration tests.
//!
//! Tests the end-to-end route API against a live server.
//!
//! Run with: cargo test --test route_test -- --ignored
//! Requires a running safepath server.

use reqwest::Client;
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("SAFEPATH_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

async fn request_route(client: &Client, safety_weight: f64) -> Value {
    let resp = client
        .post(format!("{}/v1/route", base_url()))
        .json(&json!({
            "start_lat": 37.7694,
            "start_lng": -122.4862,
            "end_lat": 37.8087,
            "end_lng": -122.4098,
            "safety_weight": safety_weight
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    resp.json().await.unwrap()
}

/// A live server must always produce a best-effort route.
#[tokio::test]
#[ignore]
async fn test_route_endpoint_returns_route() {
    let client = Client::new();
    let body = request_route(&client, 0.7).await;

    assert_eq!(body["success"], json!(true));
    assert!(body["best_route"].is_object());
    assert!(body["all_options"].as_array().unwrap().len() >= 1);

    let route = &body["best_route"];
    assert!(route["total_distance_m"].as_f64().unwrap() > 0.0);
    let score = route["avg_safety_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
}

/// Raising the safety weight must not lower the selected route's
/// average safety.
#[tokio::test]
#[ignore]
async fn test_safety_weight_monotonicity() {
    let client = Client::new();
    let fast = request_route(&client, 0.1).await;
    let safe = request_route(&client, 0.95).await;

    let fast_score = fast["best_route"]["avg_safety_score"].as_f64().unwrap();
    let safe_score = safe["best_route"]["avg_safety_score"].as_f64().unwrap();
    assert!(safe_score >= fast_score);
}

/// Invalid arguments are rejected up front with HTTP 400.
#[tokio::test]
#[ignore]
async fn test_invalid_arguments_rejected() {
    let client = Client::new();
    let resp = client
        .post(format!("{}/v1/route", base_url()))
        .json(&json!({
            "start_lat": 137.0,
            "start_lng": -122.4862,
            "end_lat": 37.8087,
            "end_lng": -122.4098
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
