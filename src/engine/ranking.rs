use std::collections::HashMap;

use uuid::Uuid;

use crate::error::EngineError;
use crate::models::bid::{Bid, BidStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBid {
    pub bid_id: Uuid,
    pub status: BidStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RankingOutcome {
    /// Dense 1..=N ranks over the active bids, 1 = lowest price.
    pub ranks: HashMap<Uuid, u32>,
    /// Non-active bids found in the input, reported rather than ranked.
    pub skipped: Vec<SkippedBid>,
}

/// Orders a shipment's bids by amount ascending, ties broken by earlier
/// submission, then by bid id so re-runs on the same input are identical.
pub fn rank_bids(bids: &[Bid]) -> Result<RankingOutcome, EngineError> {
    let mut active: Vec<&Bid> = Vec::with_capacity(bids.len());
    let mut skipped = Vec::new();

    for bid in bids {
        if !bid.is_active() {
            skipped.push(SkippedBid {
                bid_id: bid.id,
                status: bid.status,
            });
            continue;
        }

        if !bid.amount.is_finite() || bid.amount <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "bid {} has malformed amount {}",
                bid.id, bid.amount
            )));
        }

        active.push(bid);
    }

    active.sort_by(|a, b| {
        a.amount
            .total_cmp(&b.amount)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let ranks = active
        .iter()
        .enumerate()
        .map(|(index, bid)| (bid.id, index as u32 + 1))
        .collect();

    Ok(RankingOutcome { ranks, skipped })
}

/// The active bid currently holding rank 1, if any.
pub fn top_bid<'a>(bids: &'a [Bid], ranks: &HashMap<Uuid, u32>) -> Option<&'a Bid> {
    bids.iter()
        .find(|bid| bid.is_active() && ranks.get(&bid.id) == Some(&1))
}
