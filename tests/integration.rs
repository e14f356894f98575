use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use freight_auction::api::rest::router;
use freight_auction::config::EngineSettings;
use freight_auction::engine::pipeline::run_auction_engine;
use freight_auction::state::AppState;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> (axum::Router, mpsc::Receiver<Uuid>) {
    let (state, rx) = AppState::new(EngineSettings::default());
    (router(Arc::new(state)), rx)
}

fn setup_with_engine() -> axum::Router {
    let (state, rx) = AppState::new(EngineSettings::default());
    let shared = Arc::new(state);
    tokio::spawn(run_auction_engine(shared.clone(), rx));
    router(shared)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn patch_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_carrier(app: &axum::Router, name: &str, rating: f64) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/carriers",
            json!({
                "name": name,
                "available_weight_kg": 24000.0,
                "vehicle_types": ["DryVan"],
                "service_radius_km": 300.0,
                "distance_to_pickup_km": 40.0,
                "reliability_rating": rating,
                "on_time_rate": 96.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["id"].as_str().unwrap().to_string()
}

async fn create_shipment(app: &axum::Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/shipments", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn shipment_body() -> Value {
    json!({
        "shipper_id": Uuid::from_u128(7),
        "weight_kg": 18000.0,
        "vehicle_type": "DryVan",
        "origin": "Hamburg",
        "destination": "Munich"
    })
}

async fn place_bid(app: &axum::Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/bids", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["shipments"], 0);
    assert_eq!(body["bids"], 0);
    assert_eq!(body["carriers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("settlements_in_queue"));
}

#[tokio::test]
async fn register_carrier_clamps_rating_and_rejects_empty_name() {
    let (app, _rx) = setup();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/carriers",
            json!({
                "name": "Nordfracht GmbH",
                "available_weight_kg": 24000.0,
                "vehicle_types": ["DryVan", "Reefer"],
                "service_radius_km": 300.0,
                "distance_to_pickup_km": 40.0,
                "reliability_rating": 9.9,
                "on_time_rate": 150.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reliability_rating"], 5.0);
    assert_eq!(body["on_time_rate"], 100.0);
    assert_eq!(body["total_shipments_assigned"], 0);

    let response = app
        .oneshot(json_request(
            "POST",
            "/carriers",
            json!({
                "name": "  ",
                "available_weight_kg": 24000.0,
                "vehicle_types": ["DryVan"],
                "service_radius_km": 300.0,
                "distance_to_pickup_km": 40.0,
                "reliability_rating": 4.0,
                "on_time_rate": 90.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_shipment_starts_open_for_bids() {
    let (app, _rx) = setup();
    let shipment = create_shipment(&app, shipment_body()).await;

    assert_eq!(shipment["status"], "OpenForBids");
    assert!(shipment["awarded_bid"].is_null());
    assert!(shipment["bid_expires_at"].is_null());
}

#[tokio::test]
async fn create_shipment_rejects_invalid_weight_and_broken_rule() {
    let (app, _rx) = setup();

    let mut invalid_weight = shipment_body();
    invalid_weight["weight_kg"] = json!(-5.0);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/shipments", invalid_weight))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut broken_rule = shipment_body();
    broken_rule["auto_accept_rule"] = json!({
        "enabled": true,
        "price_threshold": null,
        "min_rating": 4.0,
        "max_delivery_days": 3
    });
    let response = app
        .oneshot(json_request("POST", "/shipments", broken_rule))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_shipment_returns_404() {
    let (app, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/shipments/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn place_bid_validates_amount_and_proxy_floor() {
    let (app, _rx) = setup();
    let shipment = create_shipment(&app, shipment_body()).await;
    let carrier_id = register_carrier(&app, "Nordfracht GmbH", 4.5).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/bids",
            json!({
                "shipment_id": shipment["id"],
                "carrier_id": carrier_id,
                "amount": -100.0,
                "estimated_delivery_days": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/bids",
            json!({
                "shipment_id": shipment["id"],
                "carrier_id": carrier_id,
                "amount": 42000.0,
                "estimated_delivery_days": 2,
                "proxy": { "enabled": true, "floor_amount": 50000.0, "increment": 1000.0 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bid_on_unknown_shipment_or_carrier_returns_404() {
    let (app, _rx) = setup();
    let shipment = create_shipment(&app, shipment_body()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/bids",
            json!({
                "shipment_id": Uuid::from_u128(424242),
                "carrier_id": Uuid::from_u128(1),
                "amount": 42000.0,
                "estimated_delivery_days": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "POST",
            "/bids",
            json!({
                "shipment_id": shipment["id"],
                "carrier_id": Uuid::from_u128(1),
                "amount": 42000.0,
                "estimated_delivery_days": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_window_rejects_bids_and_closes_the_shipment() {
    let (app, _rx) = setup();
    let carrier_id = register_carrier(&app, "Nordfracht GmbH", 4.5).await;

    let mut body = shipment_body();
    body["bid_expires_at"] = json!(Utc::now() - Duration::seconds(5));
    let shipment = create_shipment(&app, body).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/shipments/{shipment_id}/clock")))
        .await
        .unwrap();
    let clock = body_json(response).await;
    assert_eq!(clock["expired"], true);
    assert!(clock["remaining_ms"].as_i64().unwrap() <= 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/bids",
            json!({
                "shipment_id": shipment_id,
                "carrier_id": carrier_id,
                "amount": 42000.0,
                "estimated_delivery_days": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get_request(&format!("/shipments/{shipment_id}")))
        .await
        .unwrap();
    let closed = body_json(response).await;
    assert_eq!(closed["status"], "Expired");
}

#[tokio::test]
async fn clock_reports_never_expiring_shipments() {
    let (app, _rx) = setup();
    let shipment = create_shipment(&app, shipment_body()).await;
    let shipment_id = shipment["id"].as_str().unwrap();

    let response = app
        .oneshot(get_request(&format!("/shipments/{shipment_id}/clock")))
        .await
        .unwrap();
    let clock = body_json(response).await;
    assert_eq!(clock["expired"], false);
    assert!(clock["remaining_ms"].is_null());
}

#[tokio::test]
async fn full_auction_flow_with_proxy_settles_to_expected_ranking() {
    let app = setup_with_engine();

    let c1 = register_carrier(&app, "Nordfracht GmbH", 4.5).await;
    let c2 = register_carrier(&app, "Baltic Haulage", 4.4).await;
    let c3 = register_carrier(&app, "Elbe Logistik", 4.3).await;

    let shipment = create_shipment(&app, shipment_body()).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    let b1 = place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c1,
            "amount": 60000.0,
            "estimated_delivery_days": 2,
            "proxy": { "enabled": true, "floor_amount": 50000.0, "increment": 2000.0 }
        }),
    )
    .await;
    assert_eq!(b1["status"], "Active");
    assert!(b1["ranking"].is_null());

    place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c2,
            "amount": 55000.0,
            "estimated_delivery_days": 2
        }),
    )
    .await;
    place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c3,
            "amount": 55000.0,
            "estimated_delivery_days": 2
        }),
    )
    .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let response = app
        .oneshot(get_request(&format!("/shipments/{shipment_id}/bids")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bids = body_json(response).await;
    let list = bids.as_array().unwrap();
    assert_eq!(list.len(), 4);

    // Proxy superseded the 60k bid with a 53k one that now leads.
    assert_eq!(list[0]["ranking"], 1);
    assert_eq!(list[0]["amount"], 53000.0);
    assert_eq!(list[0]["carrier_id"], json!(c1));

    // Equal 55k amounts keep first-come priority.
    assert_eq!(list[1]["ranking"], 2);
    assert_eq!(list[1]["carrier_id"], json!(c2));
    assert_eq!(list[2]["ranking"], 3);
    assert_eq!(list[2]["carrier_id"], json!(c3));

    assert_eq!(list[3]["id"], b1["id"]);
    assert_eq!(list[3]["status"], "Superseded");
    assert!(list[3]["ranking"].is_null());
}

#[tokio::test]
async fn qualifying_bid_is_auto_accepted() {
    let app = setup_with_engine();
    let carrier_id = register_carrier(&app, "Nordfracht GmbH", 4.2).await;

    let mut body = shipment_body();
    body["auto_accept_rule"] = json!({
        "enabled": true,
        "price_threshold": 50000.0,
        "min_rating": 4.0,
        "max_delivery_days": 3
    });
    let shipment = create_shipment(&app, body).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    let bid = place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": carrier_id,
            "amount": 48000.0,
            "estimated_delivery_days": 2
        }),
    )
    .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/shipments/{shipment_id}")))
        .await
        .unwrap();
    let awarded = body_json(response).await;
    assert_eq!(awarded["status"], "Awarded");
    assert_eq!(awarded["awarded_bid"], bid["id"]);

    let bid_id = bid["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get_request(&format!("/bids/{bid_id}")))
        .await
        .unwrap();
    let stored = body_json(response).await;
    assert_eq!(stored["status"], "Awarded");

    // Bidding is closed once awarded.
    let response = app
        .oneshot(json_request(
            "POST",
            "/bids",
            json!({
                "shipment_id": shipment_id,
                "carrier_id": carrier_id,
                "amount": 40000.0,
                "estimated_delivery_days": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bid_violating_one_rule_factor_stays_open() {
    let app = setup_with_engine();
    let carrier_id = register_carrier(&app, "Nordfracht GmbH", 3.9).await;

    let mut body = shipment_body();
    body["auto_accept_rule"] = json!({
        "enabled": true,
        "price_threshold": 50000.0,
        "min_rating": 4.0,
        "max_delivery_days": 3
    });
    let shipment = create_shipment(&app, body).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": carrier_id,
            "amount": 48000.0,
            "estimated_delivery_days": 2
        }),
    )
    .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let response = app
        .oneshot(get_request(&format!("/shipments/{shipment_id}")))
        .await
        .unwrap();
    let shipment = body_json(response).await;
    assert_eq!(shipment["status"], "OpenForBids");
}

#[tokio::test]
async fn manual_award_rejects_other_bids_and_cannot_repeat() {
    let app = setup_with_engine();
    let c1 = register_carrier(&app, "Nordfracht GmbH", 4.5).await;
    let c2 = register_carrier(&app, "Baltic Haulage", 4.1).await;

    let shipment = create_shipment(&app, shipment_body()).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    let cheap = place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c1,
            "amount": 50000.0,
            "estimated_delivery_days": 2
        }),
    )
    .await;
    let pricey = place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c2,
            "amount": 52000.0,
            "estimated_delivery_days": 1
        }),
    )
    .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    // The shipper is free to pick a bid other than rank 1.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/shipments/{shipment_id}/award"),
            json!({ "bid_id": pricey["id"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let awarded = body_json(response).await;
    assert_eq!(awarded["status"], "Awarded");
    assert_eq!(awarded["awarded_bid"], pricey["id"]);

    let cheap_id = cheap["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get_request(&format!("/bids/{cheap_id}")))
        .await
        .unwrap();
    let rejected = body_json(response).await;
    assert_eq!(rejected["status"], "Rejected");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/shipments/{shipment_id}/award"),
            json!({ "bid_id": cheap["id"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn withdrawing_the_leader_promotes_the_next_bid() {
    let app = setup_with_engine();
    let c1 = register_carrier(&app, "Nordfracht GmbH", 4.5).await;
    let c2 = register_carrier(&app, "Baltic Haulage", 4.1).await;

    let shipment = create_shipment(&app, shipment_body()).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    let leader = place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c1,
            "amount": 50000.0,
            "estimated_delivery_days": 2
        }),
    )
    .await;
    let runner_up = place_bid(
        &app,
        json!({
            "shipment_id": shipment_id,
            "carrier_id": c2,
            "amount": 52000.0,
            "estimated_delivery_days": 1
        }),
    )
    .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let leader_id = leader["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(patch_request(
            &format!("/bids/{leader_id}/withdraw"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let withdrawn = body_json(response).await;
    assert_eq!(withdrawn["status"], "Withdrawn");

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let runner_up_id = runner_up["id"].as_str().unwrap();
    let response = app
        .oneshot(get_request(&format!("/bids/{runner_up_id}")))
        .await
        .unwrap();
    let promoted = body_json(response).await;
    assert_eq!(promoted["ranking"], 1);
}

#[tokio::test]
async fn match_suggestions_are_ranked_and_filtered() {
    let (app, _rx) = setup();
    let shipment = create_shipment(&app, shipment_body()).await;
    let shipment_id = shipment["id"].as_str().unwrap().to_string();

    // No carriers registered yet: a positive threshold is a bad request.
    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/shipments/{shipment_id}/matches?min_score=60"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let perfect = register_carrier(&app, "Nordfracht GmbH", 4.8).await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/carriers",
            json!({
                "name": "Tank und Trans",
                "available_weight_kg": 0.0,
                "vehicle_types": ["Tanker"],
                "service_radius_km": 50.0,
                "distance_to_pickup_km": 900.0,
                "reliability_rating": 1.0,
                "on_time_rate": 40.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hopeless = body_json(response).await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/shipments/{shipment_id}/matches")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let suggestions = body_json(response).await;
    let list = suggestions.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["carrier_id"], json!(perfect));
    assert_eq!(list[1]["carrier_id"], hopeless["id"]);
    assert!(list[0]["match_score"].as_f64().unwrap() > list[1]["match_score"].as_f64().unwrap());
    for suggestion in list {
        let score = suggestion["match_score"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&score));
        for key in [
            "route_compatibility",
            "capacity_match",
            "vehicle_match",
            "reliability_score",
        ] {
            let sub = suggestion["score_breakdown"][key].as_f64().unwrap();
            assert!((0.0..=100.0).contains(&sub));
        }
    }

    let response = app
        .oneshot(get_request(&format!(
            "/shipments/{shipment_id}/matches?min_score=60"
        )))
        .await
        .unwrap();
    let filtered = body_json(response).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["carrier_id"], json!(perfect));
}
