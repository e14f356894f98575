use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub settlements_total: IntCounterVec,
    pub settlements_in_queue: IntGauge,
    pub settlement_latency_seconds: HistogramVec,
    pub awards_total: IntCounterVec,
    pub proxy_bids_emitted_total: IntCounter,
    pub proxy_saturations_total: IntCounter,
    pub shipments_expired_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let settlements_total = IntCounterVec::new(
            Opts::new("settlements_total", "Total auction settlements by outcome"),
            &["outcome"],
        )
        .expect("valid settlements_total metric");

        let settlements_in_queue = IntGauge::new(
            "settlements_in_queue",
            "Current number of settlements waiting in the queue",
        )
        .expect("valid settlements_in_queue metric");

        let settlement_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "settlement_latency_seconds",
                "Latency of auction settlement processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid settlement_latency_seconds metric");

        let awards_total = IntCounterVec::new(
            Opts::new("awards_total", "Total shipment awards by mode"),
            &["mode"],
        )
        .expect("valid awards_total metric");

        let proxy_bids_emitted_total = IntCounter::new(
            "proxy_bids_emitted_total",
            "Total replacement bids emitted by the proxy controller",
        )
        .expect("valid proxy_bids_emitted_total metric");

        let proxy_saturations_total = IntCounter::new(
            "proxy_saturations_total",
            "Times the proxy loop hit its iteration cap",
        )
        .expect("valid proxy_saturations_total metric");

        let shipments_expired_total = IntCounter::new(
            "shipments_expired_total",
            "Shipments closed because their bidding window elapsed",
        )
        .expect("valid shipments_expired_total metric");

        registry
            .register(Box::new(settlements_total.clone()))
            .expect("register settlements_total");
        registry
            .register(Box::new(settlements_in_queue.clone()))
            .expect("register settlements_in_queue");
        registry
            .register(Box::new(settlement_latency_seconds.clone()))
            .expect("register settlement_latency_seconds");
        registry
            .register(Box::new(awards_total.clone()))
            .expect("register awards_total");
        registry
            .register(Box::new(proxy_bids_emitted_total.clone()))
            .expect("register proxy_bids_emitted_total");
        registry
            .register(Box::new(proxy_saturations_total.clone()))
            .expect("register proxy_saturations_total");
        registry
            .register(Box::new(shipments_expired_total.clone()))
            .expect("register shipments_expired_total");

        Self {
            registry,
            settlements_total,
            settlements_in_queue,
            settlement_latency_seconds,
            awards_total,
            proxy_bids_emitted_total,
            proxy_saturations_total,
            shipments_expired_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
