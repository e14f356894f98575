use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::carrier::VehicleType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ShipmentStatus {
    OpenForBids,
    Awarded,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAcceptRule {
    pub enabled: bool,
    pub price_threshold: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_delivery_days: Option<u32>,
}

/// Thresholds extracted from an enabled rule, with required fields present.
#[derive(Debug, Clone, Copy)]
pub struct RuleRequirements {
    pub price_threshold: f64,
    pub min_rating: Option<f64>,
    pub max_delivery_days: u32,
}

impl AutoAcceptRule {
    /// Returns `None` when the rule is disabled. An enabled rule must carry a
    /// positive price threshold and a positive delivery window.
    pub fn requirements(&self) -> Result<Option<RuleRequirements>, EngineError> {
        if !self.enabled {
            return Ok(None);
        }

        let price_threshold = self.price_threshold.ok_or_else(|| {
            EngineError::InvalidInput("enabled rule is missing price_threshold".to_string())
        })?;
        if !price_threshold.is_finite() || price_threshold <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "price_threshold must be positive, got {price_threshold}"
            )));
        }

        let max_delivery_days = self.max_delivery_days.ok_or_else(|| {
            EngineError::InvalidInput("enabled rule is missing max_delivery_days".to_string())
        })?;
        if max_delivery_days == 0 {
            return Err(EngineError::InvalidInput(
                "max_delivery_days must be positive".to_string(),
            ));
        }

        if let Some(min_rating) = self.min_rating {
            if !min_rating.is_finite() || !(1.0..=5.0).contains(&min_rating) {
                return Err(EngineError::InvalidInput(format!(
                    "min_rating must be within 1.0..=5.0, got {min_rating}"
                )));
            }
        }

        Ok(Some(RuleRequirements {
            price_threshold,
            min_rating: self.min_rating,
            max_delivery_days,
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub shipper_id: Uuid,
    pub weight_kg: f64,
    pub vehicle_type: VehicleType,
    pub origin: String,
    pub destination: String,
    pub bid_expires_at: Option<DateTime<Utc>>,
    pub auto_accept_rule: Option<AutoAcceptRule>,
    pub status: ShipmentStatus,
    pub awarded_bid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    pub fn is_open(&self) -> bool {
        self.status == ShipmentStatus::OpenForBids
    }
}
