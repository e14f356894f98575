use crate::error::EngineError;
use crate::models::carrier::{CarrierProfile, VehicleType};
use crate::models::shipment::Shipment;
use crate::models::suggestion::{MatchSuggestion, ScoreBreakdown};

/// Percent weights for the composite score. Operators tune these through the
/// environment; the shape of the algorithm never changes.
#[derive(Debug, Clone, Copy)]
pub struct MatchWeights {
    pub route: f64,
    pub capacity: f64,
    pub vehicle: f64,
    pub reliability: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            route: 30.0,
            capacity: 30.0,
            vehicle: 20.0,
            reliability: 20.0,
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> Result<(), EngineError> {
        let parts = [self.route, self.capacity, self.vehicle, self.reliability];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EngineError::InvalidConfig(
                "match weights must be finite and non-negative".to_string(),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 100.0).abs() > 1e-6 {
            return Err(EngineError::InvalidConfig(format!(
                "match weights must sum to 100, got {sum}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    pub weights: MatchWeights,
    /// Score granted for a compatible-but-not-exact vehicle type.
    pub partial_vehicle_score: f64,
    /// Distance past the service radius at which route compatibility reaches 0.
    pub route_falloff_km: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            partial_vehicle_score: 50.0,
            route_falloff_km: 500.0,
        }
    }
}

/// Scores one carrier against one load. Deterministic and pure: identical
/// inputs always produce identical suggestions.
pub fn score_match(
    load: &Shipment,
    carrier: &CarrierProfile,
    params: &MatchParams,
) -> Result<MatchSuggestion, EngineError> {
    if !load.weight_kg.is_finite() || load.weight_kg <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "shipment {} has malformed weight {}",
            load.id, load.weight_kg
        )));
    }

    let breakdown = ScoreBreakdown {
        route_compatibility: route_score(
            carrier.distance_to_pickup_km,
            carrier.service_radius_km,
            params.route_falloff_km,
        ),
        capacity_match: capacity_score(carrier.available_weight_kg, load.weight_kg),
        vehicle_match: vehicle_score(
            &carrier.vehicle_types,
            load.vehicle_type,
            params.partial_vehicle_score,
        ),
        reliability_score: reliability_score(carrier.reliability_rating),
    };

    Ok(MatchSuggestion {
        carrier_id: carrier.id,
        match_score: weighted_score(&breakdown, &params.weights),
        score_breakdown: breakdown,
    })
}

/// Scores every candidate, filters to the minimum composite score and sorts
/// best-first. Ties break toward the more reliable carrier, then by carrier
/// id so the output order is reproducible.
pub fn rank_matches(
    load: &Shipment,
    carriers: &[CarrierProfile],
    min_score: f64,
    params: &MatchParams,
) -> Result<Vec<MatchSuggestion>, EngineError> {
    if !min_score.is_finite() || min_score < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "min_score must be a non-negative number, got {min_score}"
        )));
    }
    if carriers.is_empty() && min_score > 0.0 {
        return Err(EngineError::InvalidInput(
            "no carriers supplied for matching".to_string(),
        ));
    }

    let mut suggestions = carriers
        .iter()
        .map(|carrier| score_match(load, carrier, params))
        .collect::<Result<Vec<_>, _>>()?;

    suggestions.retain(|s| s.match_score >= min_score);
    suggestions.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then_with(|| {
                b.score_breakdown
                    .reliability_score
                    .total_cmp(&a.score_breakdown.reliability_score)
            })
            .then_with(|| a.carrier_id.cmp(&b.carrier_id))
    });

    Ok(suggestions)
}

pub fn weighted_score(breakdown: &ScoreBreakdown, weights: &MatchWeights) -> f64 {
    let composite = (breakdown.route_compatibility * weights.route
        + breakdown.capacity_match * weights.capacity
        + breakdown.vehicle_match * weights.vehicle
        + breakdown.reliability_score * weights.reliability)
        / 100.0;
    composite.clamp(0.0, 100.0)
}

fn capacity_score(available_kg: f64, required_kg: f64) -> f64 {
    if available_kg >= required_kg {
        return 100.0;
    }
    (available_kg / required_kg * 100.0).clamp(0.0, 100.0)
}

fn vehicle_score(types: &[VehicleType], preferred: VehicleType, partial: f64) -> f64 {
    if types.contains(&preferred) {
        100.0
    } else if types.iter().any(|t| t.is_compatible_with(preferred)) {
        partial.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn route_score(distance_km: f64, radius_km: f64, falloff_km: f64) -> f64 {
    let gap = distance_km - radius_km;
    if gap <= 0.0 {
        return 100.0;
    }
    if falloff_km <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - gap / falloff_km)).clamp(0.0, 100.0)
}

fn reliability_score(rating: f64) -> f64 {
    (rating / 5.0 * 100.0).clamp(0.0, 100.0)
}
