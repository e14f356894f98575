use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    BidPlaced {
        shipment_id: Uuid,
        bid_id: Uuid,
        carrier_id: Uuid,
        amount: f64,
        proxy: bool,
    },
    Awarded {
        shipment_id: Uuid,
        bid_id: Uuid,
        carrier_id: Uuid,
        amount: f64,
        auto: bool,
    },
    ShipmentExpired {
        shipment_id: Uuid,
    },
}
