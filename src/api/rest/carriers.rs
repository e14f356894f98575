use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::carrier::{CarrierProfile, VehicleType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/carriers", post(register_carrier).get(list_carriers))
        .route("/carriers/:id/availability", patch(update_availability))
}

#[derive(Deserialize)]
pub struct RegisterCarrierRequest {
    pub name: String,
    pub available_weight_kg: f64,
    pub vehicle_types: Vec<VehicleType>,
    pub service_radius_km: f64,
    pub distance_to_pickup_km: f64,
    pub reliability_rating: f64,
    pub on_time_rate: f64,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available_weight_kg: Option<f64>,
    pub distance_to_pickup_km: Option<f64>,
    pub service_radius_km: Option<f64>,
}

async fn register_carrier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCarrierRequest>,
) -> Result<Json<CarrierProfile>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    for (field, value) in [
        ("available_weight_kg", payload.available_weight_kg),
        ("service_radius_km", payload.service_radius_km),
        ("distance_to_pickup_km", payload.distance_to_pickup_km),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::BadRequest(format!(
                "{field} must be a non-negative number"
            )));
        }
    }

    let carrier = CarrierProfile {
        id: Uuid::new_v4(),
        name: payload.name,
        available_weight_kg: payload.available_weight_kg,
        vehicle_types: payload.vehicle_types,
        service_radius_km: payload.service_radius_km,
        distance_to_pickup_km: payload.distance_to_pickup_km,
        reliability_rating: payload.reliability_rating.clamp(0.0, 5.0),
        on_time_rate: payload.on_time_rate.clamp(0.0, 100.0),
        total_shipments_assigned: 0,
        updated_at: Utc::now(),
    };

    state.carriers.insert(carrier.id, carrier.clone());
    Ok(Json(carrier))
}

async fn list_carriers(State(state): State<Arc<AppState>>) -> Json<Vec<CarrierProfile>> {
    let carriers = state
        .carriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(carriers)
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<CarrierProfile>, AppError> {
    for (field, value) in [
        ("available_weight_kg", payload.available_weight_kg),
        ("distance_to_pickup_km", payload.distance_to_pickup_km),
        ("service_radius_km", payload.service_radius_km),
    ] {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
    }

    let mut carrier = state
        .carriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("carrier {} not found", id)))?;

    if let Some(weight) = payload.available_weight_kg {
        carrier.available_weight_kg = weight;
    }
    if let Some(distance) = payload.distance_to_pickup_km {
        carrier.distance_to_pickup_km = distance;
    }
    if let Some(radius) = payload.service_radius_km {
        carrier.service_radius_km = radius;
    }
    carrier.updated_at = Utc::now();

    Ok(Json(carrier.clone()))
}
