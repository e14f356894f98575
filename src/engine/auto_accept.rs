use serde::Serialize;

use crate::error::EngineError;
use crate::models::bid::Bid;
use crate::models::carrier::CarrierProfile;
use crate::models::shipment::AutoAcceptRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Criterion {
    Price,
    Rating,
    DeliveryWindow,
}

#[derive(Debug, Clone)]
pub struct AutoAcceptDecision {
    pub award: bool,
    /// Criteria the rank-1 bid failed, empty when awarding or when the rule
    /// is disabled.
    pub unmet: Vec<Criterion>,
}

impl AutoAcceptDecision {
    fn no_action() -> Self {
        Self {
            award: false,
            unmet: Vec::new(),
        }
    }
}

/// Evaluates the shipment rule against the current rank-1 bid. All criteria
/// must hold together; a disabled rule never awards. Callers only ever pass
/// the rank-1 bid — lower ranks cannot trigger an award.
pub fn evaluate(
    rule: &AutoAcceptRule,
    top_bid: &Bid,
    carrier: &CarrierProfile,
) -> Result<AutoAcceptDecision, EngineError> {
    let Some(requirements) = rule.requirements()? else {
        return Ok(AutoAcceptDecision::no_action());
    };

    if !top_bid.amount.is_finite() || top_bid.amount <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "bid {} has malformed amount {}",
            top_bid.id, top_bid.amount
        )));
    }

    let mut unmet = Vec::new();
    if top_bid.amount > requirements.price_threshold {
        unmet.push(Criterion::Price);
    }
    if let Some(min_rating) = requirements.min_rating {
        if carrier.reliability_rating < min_rating {
            unmet.push(Criterion::Rating);
        }
    }
    if top_bid.estimated_delivery_days > requirements.max_delivery_days {
        unmet.push(Criterion::DeliveryWindow);
    }

    Ok(AutoAcceptDecision {
        award: unmet.is_empty(),
        unmet,
    })
}
