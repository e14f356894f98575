use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::engine::matching::MatchParams;
use crate::models::bid::Bid;
use crate::models::carrier::CarrierProfile;
use crate::models::event::AuctionEvent;
use crate::models::shipment::Shipment;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub shipments: DashMap<Uuid, Shipment>,
    pub bids: DashMap<Uuid, Bid>,
    pub carriers: DashMap<Uuid, CarrierProfile>,
    pub settle_tx: mpsc::Sender<Uuid>,
    pub auction_events_tx: broadcast::Sender<AuctionEvent>,
    pub metrics: Metrics,
    pub proxy_max_iterations: u32,
    pub match_params: MatchParams,
}

impl AppState {
    pub fn new(settings: EngineSettings) -> (Self, mpsc::Receiver<Uuid>) {
        let (settle_tx, settle_rx) = mpsc::channel(settings.settle_queue_size);
        let (auction_events_tx, _unused_rx) = broadcast::channel(settings.event_buffer_size);

        (
            Self {
                shipments: DashMap::new(),
                bids: DashMap::new(),
                carriers: DashMap::new(),
                settle_tx,
                auction_events_tx,
                metrics: Metrics::new(),
                proxy_max_iterations: settings.proxy_max_iterations,
                match_params: settings.match_params,
            },
            settle_rx,
        )
    }
}
