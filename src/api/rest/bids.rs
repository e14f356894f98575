use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::clock::clock_state;
use crate::engine::pipeline;
use crate::engine::queue::enqueue_settlement;
use crate::error::AppError;
use crate::models::bid::{Bid, BidStatus, ProxyBid};
use crate::models::event::AuctionEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bids", post(place_bid))
        .route("/bids/:id", get(get_bid))
        .route("/bids/:id/withdraw", patch(withdraw_bid))
}

#[derive(Deserialize)]
pub struct PlaceBidRequest {
    pub shipment_id: Uuid,
    pub carrier_id: Uuid,
    pub amount: f64,
    pub estimated_delivery_days: u32,
    pub proxy: Option<ProxyBid>,
}

async fn place_bid(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<Json<Bid>, AppError> {
    if !payload.amount.is_finite() || payload.amount <= 0.0 {
        return Err(AppError::BadRequest(
            "bid amount must be positive".to_string(),
        ));
    }
    if payload.estimated_delivery_days == 0 {
        return Err(AppError::BadRequest(
            "estimated_delivery_days must be positive".to_string(),
        ));
    }
    if let Some(proxy) = &payload.proxy {
        if proxy.enabled {
            if !proxy.floor_amount.is_finite() || proxy.floor_amount <= 0.0 {
                return Err(AppError::BadRequest(
                    "proxy floor_amount must be positive".to_string(),
                ));
            }
            if !proxy.increment.is_finite() || proxy.increment <= 0.0 {
                return Err(AppError::BadRequest(
                    "proxy increment must be positive".to_string(),
                ));
            }
            if proxy.floor_amount > payload.amount {
                return Err(AppError::BadRequest(
                    "proxy floor_amount cannot exceed the bid amount".to_string(),
                ));
            }
        }
    }

    let shipment = state
        .shipments
        .get(&payload.shipment_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            AppError::NotFound(format!("shipment {} not found", payload.shipment_id))
        })?;
    if !shipment.is_open() {
        return Err(AppError::BiddingClosed);
    }
    if clock_state(shipment.bid_expires_at, Utc::now()).expired {
        pipeline::close_expired_shipment(&state, shipment.id);
        return Err(AppError::BiddingClosed);
    }
    if !state.carriers.contains_key(&payload.carrier_id) {
        return Err(AppError::NotFound(format!(
            "carrier {} not found",
            payload.carrier_id
        )));
    }

    let bid = Bid {
        id: Uuid::new_v4(),
        shipment_id: payload.shipment_id,
        carrier_id: payload.carrier_id,
        amount: payload.amount,
        status: BidStatus::Active,
        ranking: None,
        proxy: payload.proxy,
        estimated_delivery_days: payload.estimated_delivery_days,
        submitted_at: Utc::now(),
    };

    state.bids.insert(bid.id, bid.clone());
    let _ = state.auction_events_tx.send(AuctionEvent::BidPlaced {
        shipment_id: bid.shipment_id,
        bid_id: bid.id,
        carrier_id: bid.carrier_id,
        amount: bid.amount,
        proxy: false,
    });
    enqueue_settlement(&state, bid.shipment_id).await?;

    Ok(Json(bid))
}

async fn get_bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bid>, AppError> {
    let bid = state
        .bids
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("bid {} not found", id)))?;

    Ok(Json(bid.value().clone()))
}

async fn withdraw_bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bid>, AppError> {
    let (shipment_id, withdrawn) = {
        let mut bid = state
            .bids
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("bid {} not found", id)))?;
        if !bid.is_active() {
            return Err(AppError::Conflict(format!("bid {} is not active", id)));
        }
        bid.status = BidStatus::Withdrawn;
        bid.ranking = None;
        (bid.shipment_id, bid.clone())
    };

    enqueue_settlement(&state, shipment_id).await?;
    Ok(Json(withdrawn))
}
