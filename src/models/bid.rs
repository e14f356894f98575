use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BidStatus {
    Active,
    Outbid,
    Superseded,
    Withdrawn,
    Awarded,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProxyBid {
    pub enabled: bool,
    pub floor_amount: f64,
    pub increment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub carrier_id: Uuid,
    pub amount: f64,
    pub status: BidStatus,
    /// 1-based position among the shipment's active bids, 1 = lowest price.
    /// None for any non-active status.
    pub ranking: Option<u32>,
    pub proxy: Option<ProxyBid>,
    pub estimated_delivery_days: u32,
    pub submitted_at: DateTime<Utc>,
}

impl Bid {
    pub fn is_active(&self) -> bool {
        self.status == BidStatus::Active
    }

    pub fn active_proxy(&self) -> Option<&ProxyBid> {
        self.proxy.as_ref().filter(|proxy| proxy.enabled)
    }
}
