use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::ranking::{rank_bids, top_bid};
use crate::error::EngineError;
use crate::models::bid::{Bid, BidStatus};

/// A proxy bid that could not re-enter: undercutting the leader by its
/// increment would land below the carrier's floor.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldBid {
    pub bid_id: Uuid,
    pub floor_amount: f64,
    pub candidate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ProxyStepOutcome {
    /// Replacement bids emitted this step, not yet persisted anywhere.
    pub emitted: Vec<Bid>,
    /// Prior bid ids replaced by an entry in `emitted`.
    pub superseded: Vec<Uuid>,
    pub held: Vec<HeldBid>,
}

impl ProxyStepOutcome {
    pub fn is_fixed_point(&self) -> bool {
        self.emitted.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProxyLoopOutcome {
    pub emitted: Vec<Bid>,
    pub superseded: Vec<Uuid>,
    pub held: Vec<HeldBid>,
    /// Ranking of the settled bid set (emitted bids included, superseded and
    /// held bids excluded).
    pub final_ranks: HashMap<Uuid, u32>,
    pub iterations: u32,
    /// True when the iteration cap stopped the loop before a fixed point.
    pub saturated: bool,
}

/// One proxy round over a consistent snapshot: every outbid proxy-enabled bid
/// tries to undercut the current rank-1 amount by its increment. Floor
/// protection holds any bid whose candidate would fall below its floor.
pub fn run_proxy_step(bids: &[Bid], now: DateTime<Utc>) -> Result<ProxyStepOutcome, EngineError> {
    let ranking = rank_bids(bids)?;
    let Some(leader) = top_bid(bids, &ranking.ranks) else {
        return Ok(ProxyStepOutcome::default());
    };

    let mut outcome = ProxyStepOutcome::default();

    for bid in bids {
        if !bid.is_active() || bid.id == leader.id {
            continue;
        }
        let Some(proxy) = bid.active_proxy() else {
            continue;
        };

        if !proxy.increment.is_finite() || proxy.increment <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "bid {} has malformed proxy increment {}",
                bid.id, proxy.increment
            )));
        }
        if !proxy.floor_amount.is_finite() || proxy.floor_amount <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "bid {} has malformed proxy floor {}",
                bid.id, proxy.floor_amount
            )));
        }

        let candidate = leader.amount - proxy.increment;
        if candidate < proxy.floor_amount {
            outcome.held.push(HeldBid {
                bid_id: bid.id,
                floor_amount: proxy.floor_amount,
                candidate,
            });
            continue;
        }

        outcome.emitted.push(Bid {
            id: Uuid::new_v4(),
            shipment_id: bid.shipment_id,
            carrier_id: bid.carrier_id,
            amount: candidate,
            status: BidStatus::Active,
            ranking: None,
            proxy: bid.proxy,
            estimated_delivery_days: bid.estimated_delivery_days,
            submitted_at: now,
        });
        outcome.superseded.push(bid.id);
    }

    Ok(outcome)
}

/// Drives proxy steps and re-ranking to a fixed point. Held bids leave the
/// running (marked outbid by the caller), so each round either emits strictly
/// lower amounts or terminates; the cap bounds pathological floor/increment
/// configurations and hitting it is recoverable, not fatal.
pub fn run_proxy_loop(
    bids: &[Bid],
    max_iterations: u32,
    now: DateTime<Utc>,
) -> Result<ProxyLoopOutcome, EngineError> {
    let mut working: Vec<Bid> = bids.to_vec();
    let mut emitted = Vec::new();
    let mut superseded = Vec::new();
    let mut held = Vec::new();
    let mut iterations = 0;

    let saturated = loop {
        let step = run_proxy_step(&working, now)?;

        for held_bid in &step.held {
            if let Some(entry) = working.iter_mut().find(|b| b.id == held_bid.bid_id) {
                entry.status = BidStatus::Outbid;
                entry.ranking = None;
            }
        }
        let fixed_point = step.is_fixed_point();
        held.extend(step.held);

        if fixed_point {
            break false;
        }
        if iterations >= max_iterations {
            break true;
        }
        iterations += 1;

        for bid_id in &step.superseded {
            if let Some(entry) = working.iter_mut().find(|b| b.id == *bid_id) {
                entry.status = BidStatus::Superseded;
                entry.ranking = None;
            }
        }
        superseded.extend(step.superseded);
        working.extend(step.emitted.iter().cloned());
        emitted.extend(step.emitted);
    };

    let final_ranks = rank_bids(&working)?.ranks;

    Ok(ProxyLoopOutcome {
        emitted,
        superseded,
        held,
        final_ranks,
        iterations,
        saturated,
    })
}
