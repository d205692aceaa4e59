//! Integration tests for the REST endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Subscribers are attached straight to the relay
//! so broadcasts triggered over HTTP can be observed.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use obsentra_core::{ChannelSubscriber, Relay, Subscriber};
use obsentra_server::router::build_router;
use obsentra_server::state::AppState;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(Relay::new())))
}

fn attach(state: &AppState) -> mpsc::Receiver<Bytes> {
    let (sub, mut rx) = ChannelSubscriber::new(16);
    state.relay.accept(Arc::new(sub) as Arc<dyn Subscriber>);
    // Discard the greeting.
    let _ = rx.try_recv().unwrap();
    rx
}

fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn next_event(rx: &mut mpsc::Receiver<Bytes>) -> Value {
    let msg = rx.try_recv().unwrap();
    serde_json::from_slice(&msg).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_get_sensor_defaults_to_none() {
    let router = build_router(make_state());

    let response = router
        .oneshot(Request::get("/get-sensor").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!({"sensor": "NONE"}));
}

#[tokio::test]
async fn test_set_sensor_updates_and_broadcasts() {
    let state = make_state();
    let mut rx = attach(&state);
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json("/set-sensor", r#"{"sensor":"temp"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["message"], "Sensor updated");
    assert_eq!(json["sensor"], "temp");

    assert_eq!(state.relay.selection(), "temp");
    let event = next_event(&mut rx);
    assert_eq!(event, serde_json::json!({"type": "SENSOR_UPDATE", "sensor": "temp"}));
}

#[tokio::test]
async fn test_last_selection_wins() {
    let state = make_state();

    for sensor in ["A", "B"] {
        let response = build_router(Arc::clone(&state))
            .oneshot(post_json("/set-sensor", &format!(r#"{{"sensor":"{sensor}"}}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = build_router(state)
        .oneshot(Request::get("/get-sensor").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["sensor"], "B");
}

#[tokio::test]
async fn test_set_sensor_missing_field_is_rejected() {
    let state = make_state();
    let mut rx = attach(&state);
    state.relay.set_selection("keep");
    let _ = next_event(&mut rx);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/set-sensor", r#"{"name":"temp"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].is_string());
    assert_eq!(state.relay.selection(), "keep");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_set_sensor_invalid_json_is_rejected() {
    let state = make_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/set-sensor", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.relay.selection(), "NONE");
}

#[tokio::test]
async fn test_set_sensor_without_content_type_is_rejected() {
    let state = make_state();

    let request = Request::post("/set-sensor")
        .body(Body::from(r#"{"sensor":"temp"}"#))
        .unwrap();
    let response = build_router(Arc::clone(&state)).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.relay.selection(), "NONE");
}

#[tokio::test]
async fn test_sensor_data_fans_out_to_every_subscriber() {
    let state = make_state();
    let mut receivers: Vec<_> = (0..3).map(|_| attach(&state)).collect();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/sensor-data", r#"{"sensor":"temp","value":21.5}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!({"message": "Data received"}));

    for rx in &mut receivers {
        let event = next_event(rx);
        assert_eq!(event["type"], "SENSOR_DATA");
        assert_eq!(event["sensor"], "temp");
        assert_eq!(event["value"], 21.5);
        assert!(event["timestamp"].is_string());
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn test_sensor_data_does_not_change_selection() {
    let state = make_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/sensor-data", r#"{"sensor":"gas","value":{"ppm":400}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.relay.selection(), "NONE");
}

#[tokio::test]
async fn test_sensor_data_missing_value_is_rejected() {
    let state = make_state();
    let mut rx = attach(&state);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/sensor-data", r#"{"sensor":"temp"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_subscriber_disappears_from_status() {
    let state = make_state();
    let mut alive_a = attach(&state);
    let mut alive_b = attach(&state);
    let dead = attach(&state);
    drop(dead);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/sensor-data", r#"{"sensor":"temp","value":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(next_event(&mut alive_a)["sensor"], "temp");
    assert_eq!(next_event(&mut alive_b)["sensor"], "temp");

    let response = build_router(state)
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["subscriberCount"], 2);
}

#[tokio::test]
async fn test_status_reports_selection_and_time() {
    let state = make_state();
    state.relay.set_selection("co2");
    let _rx = attach(&state);

    let response = build_router(state)
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["selection"], "co2");
    assert_eq!(json["subscriberCount"], 1);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let router = build_router(make_state());

    let response = router
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let router = build_router(make_state());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/set-sensor")
        .header("origin", "http://dashboard.local")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
