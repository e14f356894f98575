use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::auto_accept;
use crate::engine::clock::clock_state;
use crate::engine::proxy::run_proxy_loop;
use crate::engine::ranking::{rank_bids, top_bid};
use crate::error::AppError;
use crate::models::bid::{Bid, BidStatus};
use crate::models::event::AuctionEvent;
use crate::models::shipment::{Shipment, ShipmentStatus};
use crate::state::AppState;

pub async fn run_auction_engine(state: Arc<AppState>, mut settle_rx: mpsc::Receiver<Uuid>) {
    info!("auction engine started");

    while let Some(shipment_id) = settle_rx.recv().await {
        state.metrics.settlements_in_queue.dec();

        let start = Instant::now();
        match settle_shipment(&state, shipment_id) {
            Ok(()) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .settlement_latency_seconds
                    .with_label_values(&["success"])
                    .observe(elapsed);
                state
                    .metrics
                    .settlements_total
                    .with_label_values(&["success"])
                    .inc();
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .settlement_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                state
                    .metrics
                    .settlements_total
                    .with_label_values(&["error"])
                    .inc();
                error!(shipment_id = %shipment_id, error = %err, "failed to settle auction");
            }
        }
    }

    warn!("auction engine stopped: queue channel closed");
}

/// Periodically closes shipments whose bidding window has elapsed. The clock
/// only reports; this task applies the close, once per shipment.
pub async fn run_expiry_sweeper(state: Arc<AppState>, interval: Duration) {
    info!("expiry sweeper started");

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let now = Utc::now();
        let due: Vec<Uuid> = state
            .shipments
            .iter()
            .filter(|entry| {
                entry.value().is_open()
                    && clock_state(entry.value().bid_expires_at, now).expired
            })
            .map(|entry| *entry.key())
            .collect();

        for shipment_id in due {
            close_expired_shipment(&state, shipment_id);
        }
    }
}

/// Drives one shipment's auction over a consistent snapshot:
/// rank, auto-accept on the leader, proxy loop to a fixed point, re-rank,
/// auto-accept once more on the settled leader. All bid processing flows
/// through the single engine worker, so two simultaneous bids for one
/// shipment can never both observe themselves at rank 1.
pub fn settle_shipment(state: &AppState, shipment_id: Uuid) -> Result<(), AppError> {
    let Some(shipment) = state
        .shipments
        .get(&shipment_id)
        .map(|entry| entry.value().clone())
    else {
        return Err(AppError::NotFound(format!(
            "shipment {shipment_id} not found"
        )));
    };

    if !shipment.is_open() {
        return Ok(());
    }

    let now = Utc::now();
    if clock_state(shipment.bid_expires_at, now).expired {
        close_expired_shipment(state, shipment_id);
        return Ok(());
    }

    let snapshot = shipment_bids(state, shipment_id);
    let ranking = rank_bids(&snapshot)?;
    apply_ranks(state, shipment_id, &ranking.ranks);

    if try_auto_accept(state, &shipment, &snapshot, &ranking.ranks)? {
        return Ok(());
    }

    let outcome = run_proxy_loop(&snapshot, state.proxy_max_iterations, now)?;
    if outcome.saturated {
        state.metrics.proxy_saturations_total.inc();
        warn!(
            shipment_id = %shipment_id,
            iterations = outcome.iterations,
            "proxy loop hit iteration cap; keeping last stable ranking"
        );
    }

    for bid_id in &outcome.superseded {
        if let Some(mut bid) = state.bids.get_mut(bid_id) {
            bid.status = BidStatus::Superseded;
            bid.ranking = None;
        }
    }
    for held in &outcome.held {
        if let Some(mut bid) = state.bids.get_mut(&held.bid_id) {
            bid.status = BidStatus::Outbid;
            bid.ranking = None;
        }
        debug!(
            bid_id = %held.bid_id,
            floor = held.floor_amount,
            candidate = held.candidate,
            "proxy bid held at floor"
        );
    }
    for new_bid in &outcome.emitted {
        state.bids.insert(new_bid.id, new_bid.clone());
        state.metrics.proxy_bids_emitted_total.inc();
        let _ = state.auction_events_tx.send(AuctionEvent::BidPlaced {
            shipment_id,
            bid_id: new_bid.id,
            carrier_id: new_bid.carrier_id,
            amount: new_bid.amount,
            proxy: true,
        });
    }
    apply_ranks(state, shipment_id, &outcome.final_ranks);

    // The settled leader may now satisfy the rule even though the original
    // top bid did not.
    let snapshot = shipment_bids(state, shipment_id);
    try_auto_accept(state, &shipment, &snapshot, &outcome.final_ranks)?;

    Ok(())
}

/// Awards one active bid: the shipment closes, the winner transitions to
/// Awarded and every other active bid to Rejected. Re-applying to an
/// already-closed shipment is a no-op.
pub fn apply_award(
    state: &AppState,
    shipment_id: Uuid,
    winning_bid_id: Uuid,
    auto: bool,
) -> Result<(), AppError> {
    let Some(winner) = state
        .bids
        .get(&winning_bid_id)
        .map(|entry| entry.value().clone())
    else {
        return Err(AppError::NotFound(format!(
            "bid {winning_bid_id} not found"
        )));
    };
    if winner.shipment_id != shipment_id {
        return Err(AppError::BadRequest(format!(
            "bid {winning_bid_id} does not belong to shipment {shipment_id}"
        )));
    }

    {
        let mut shipment = state.shipments.get_mut(&shipment_id).ok_or_else(|| {
            AppError::NotFound(format!("shipment {shipment_id} not found"))
        })?;
        if !shipment.is_open() {
            // Re-awarding the winner is a no-op; awarding anything else on a
            // closed shipment is a conflict.
            if shipment.awarded_bid == Some(winning_bid_id) {
                return Ok(());
            }
            return Err(AppError::Conflict(format!(
                "shipment {shipment_id} is not open for bids"
            )));
        }
        if !winner.is_active() {
            return Err(AppError::Conflict(format!(
                "bid {winning_bid_id} is not active"
            )));
        }
        shipment.status = ShipmentStatus::Awarded;
        shipment.awarded_bid = Some(winning_bid_id);
    }

    for mut entry in state.bids.iter_mut() {
        let bid = entry.value_mut();
        if bid.shipment_id != shipment_id {
            continue;
        }
        if bid.id == winning_bid_id {
            bid.status = BidStatus::Awarded;
            bid.ranking = None;
        } else if bid.is_active() {
            bid.status = BidStatus::Rejected;
            bid.ranking = None;
        }
    }

    if let Some(mut carrier) = state.carriers.get_mut(&winner.carrier_id) {
        carrier.total_shipments_assigned += 1;
        carrier.updated_at = Utc::now();
    }

    state
        .metrics
        .awards_total
        .with_label_values(&[if auto { "auto" } else { "manual" }])
        .inc();
    let _ = state.auction_events_tx.send(AuctionEvent::Awarded {
        shipment_id,
        bid_id: winning_bid_id,
        carrier_id: winner.carrier_id,
        amount: winner.amount,
        auto,
    });

    info!(
        shipment_id = %shipment_id,
        bid_id = %winning_bid_id,
        carrier_id = %winner.carrier_id,
        amount = winner.amount,
        auto,
        "shipment awarded"
    );

    Ok(())
}

/// Applies the expiry close exactly once: the shipment leaves open bidding
/// and its competing bids transition to Expired.
pub fn close_expired_shipment(state: &AppState, shipment_id: Uuid) {
    {
        let Some(mut shipment) = state.shipments.get_mut(&shipment_id) else {
            return;
        };
        if !shipment.is_open() {
            return;
        }
        shipment.status = ShipmentStatus::Expired;
    }

    for mut entry in state.bids.iter_mut() {
        let bid = entry.value_mut();
        if bid.shipment_id != shipment_id {
            continue;
        }
        if matches!(bid.status, BidStatus::Active | BidStatus::Outbid) {
            bid.status = BidStatus::Expired;
            bid.ranking = None;
        }
    }

    state.metrics.shipments_expired_total.inc();
    let _ = state
        .auction_events_tx
        .send(AuctionEvent::ShipmentExpired { shipment_id });

    info!(shipment_id = %shipment_id, "bidding window expired");
}

pub fn shipment_bids(state: &AppState, shipment_id: Uuid) -> Vec<Bid> {
    state
        .bids
        .iter()
        .filter(|entry| entry.value().shipment_id == shipment_id)
        .map(|entry| entry.value().clone())
        .collect()
}

fn apply_ranks(state: &AppState, shipment_id: Uuid, ranks: &HashMap<Uuid, u32>) {
    for mut entry in state.bids.iter_mut() {
        let bid = entry.value_mut();
        if bid.shipment_id != shipment_id {
            continue;
        }
        bid.ranking = if bid.is_active() {
            ranks.get(&bid.id).copied()
        } else {
            None
        };
    }
}

fn try_auto_accept(
    state: &AppState,
    shipment: &Shipment,
    bids: &[Bid],
    ranks: &HashMap<Uuid, u32>,
) -> Result<bool, AppError> {
    let Some(rule) = shipment.auto_accept_rule.as_ref() else {
        return Ok(false);
    };
    let Some(top) = top_bid(bids, ranks) else {
        return Ok(false);
    };
    let Some(carrier) = state
        .carriers
        .get(&top.carrier_id)
        .map(|entry| entry.value().clone())
    else {
        return Err(AppError::Internal(format!(
            "carrier {} missing for bid {}",
            top.carrier_id, top.id
        )));
    };

    let decision = auto_accept::evaluate(rule, top, &carrier)?;
    if decision.award {
        apply_award(state, shipment.id, top.id, true)?;
        return Ok(true);
    }

    if !decision.unmet.is_empty() {
        debug!(
            shipment_id = %shipment.id,
            bid_id = %top.id,
            unmet = ?decision.unmet,
            "auto-accept criteria not met"
        );
    }
    Ok(false)
}
