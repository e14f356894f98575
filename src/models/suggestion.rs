use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub route_compatibility: f64,
    pub capacity_match: f64,
    pub vehicle_match: f64,
    pub reliability_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSuggestion {
    pub carrier_id: Uuid,
    pub match_score: f64,
    pub score_breakdown: ScoreBreakdown,
}
