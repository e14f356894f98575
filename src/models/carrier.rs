use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VehicleType {
    DryVan,
    Reefer,
    Flatbed,
    StepDeck,
    BoxTruck,
    Tanker,
}

impl VehicleType {
    /// Whether a carrier equipped with `self` can take a load that prefers
    /// `preferred`, short of an exact match. A reefer hauls dry freight with
    /// the unit off; step decks take most flatbed freight; box trucks and dry
    /// vans are interchangeable for enclosed loads. Tankers carry nothing else.
    pub fn is_compatible_with(self, preferred: VehicleType) -> bool {
        matches!(
            (self, preferred),
            (VehicleType::Reefer, VehicleType::DryVan)
                | (VehicleType::BoxTruck, VehicleType::DryVan)
                | (VehicleType::DryVan, VehicleType::BoxTruck)
                | (VehicleType::StepDeck, VehicleType::Flatbed)
                | (VehicleType::Flatbed, VehicleType::StepDeck)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub id: Uuid,
    pub name: String,
    pub available_weight_kg: f64,
    pub vehicle_types: Vec<VehicleType>,
    /// Radius the carrier services from its current position. Supplied by the
    /// caller's geo layer; the engine never computes distances.
    pub service_radius_km: f64,
    pub distance_to_pickup_km: f64,
    pub reliability_rating: f64,
    pub on_time_rate: f64,
    pub total_shipments_assigned: u64,
    pub updated_at: DateTime<Utc>,
}
