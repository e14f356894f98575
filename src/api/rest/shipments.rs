use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::clock::{ClockState, clock_state};
use crate::engine::matching;
use crate::engine::pipeline;
use crate::error::AppError;
use crate::models::bid::Bid;
use crate::models::carrier::{CarrierProfile, VehicleType};
use crate::models::shipment::{AutoAcceptRule, Shipment, ShipmentStatus};
use crate::models::suggestion::MatchSuggestion;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shipments", post(create_shipment))
        .route("/shipments/:id", get(get_shipment))
        .route("/shipments/:id/bids", get(list_shipment_bids))
        .route("/shipments/:id/clock", get(get_clock))
        .route("/shipments/:id/award", post(award_shipment))
        .route("/shipments/:id/matches", get(list_matches))
}

#[derive(Deserialize)]
pub struct CreateShipmentRequest {
    pub shipper_id: Uuid,
    pub weight_kg: f64,
    pub vehicle_type: VehicleType,
    pub origin: String,
    pub destination: String,
    pub bid_expires_at: Option<DateTime<Utc>>,
    pub auto_accept_rule: Option<AutoAcceptRule>,
}

#[derive(Deserialize)]
pub struct AwardRequest {
    pub bid_id: Uuid,
}

#[derive(Deserialize)]
pub struct MatchQuery {
    pub min_score: Option<f64>,
}

async fn create_shipment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateShipmentRequest>,
) -> Result<Json<Shipment>, AppError> {
    if payload.origin.trim().is_empty() || payload.destination.trim().is_empty() {
        return Err(AppError::BadRequest(
            "origin and destination cannot be empty".to_string(),
        ));
    }
    if !payload.weight_kg.is_finite() || payload.weight_kg <= 0.0 {
        return Err(AppError::BadRequest(
            "weight_kg must be positive".to_string(),
        ));
    }
    if let Some(rule) = &payload.auto_accept_rule {
        rule.requirements()?;
    }

    let shipment = Shipment {
        id: Uuid::new_v4(),
        shipper_id: payload.shipper_id,
        weight_kg: payload.weight_kg,
        vehicle_type: payload.vehicle_type,
        origin: payload.origin,
        destination: payload.destination,
        bid_expires_at: payload.bid_expires_at,
        auto_accept_rule: payload.auto_accept_rule,
        status: ShipmentStatus::OpenForBids,
        awarded_bid: None,
        created_at: Utc::now(),
    };

    state.shipments.insert(shipment.id, shipment.clone());
    Ok(Json(shipment))
}

async fn get_shipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    let shipment = state
        .shipments
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("shipment {} not found", id)))?;

    Ok(Json(shipment.value().clone()))
}

async fn list_shipment_bids(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, AppError> {
    if !state.shipments.contains_key(&id) {
        return Err(AppError::NotFound(format!("shipment {} not found", id)));
    }

    let mut bids = pipeline::shipment_bids(&state, id);
    bids.sort_by(|a, b| match (a.ranking, b.ranking) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.submitted_at.cmp(&b.submitted_at),
    });

    Ok(Json(bids))
}

async fn get_clock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClockState>, AppError> {
    let shipment = state
        .shipments
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("shipment {} not found", id)))?;

    Ok(Json(clock_state(shipment.bid_expires_at, Utc::now())))
}

async fn award_shipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AwardRequest>,
) -> Result<Json<Shipment>, AppError> {
    let shipment = state
        .shipments
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("shipment {} not found", id)))?;
    if !shipment.is_open() {
        return Err(AppError::Conflict(format!(
            "shipment {} is not open for bids",
            id
        )));
    }

    pipeline::apply_award(&state, id, payload.bid_id, false)?;

    let awarded = state
        .shipments
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::Internal(format!("shipment {} vanished during award", id)))?;
    Ok(Json(awarded))
}

async fn list_matches(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<Vec<MatchSuggestion>>, AppError> {
    let shipment = state
        .shipments
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("shipment {} not found", id)))?;

    let carriers: Vec<CarrierProfile> = state
        .carriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    let suggestions = matching::rank_matches(
        &shipment,
        &carriers,
        query.min_score.unwrap_or(0.0),
        &state.match_params,
    )?;

    Ok(Json(suggestions))
}
