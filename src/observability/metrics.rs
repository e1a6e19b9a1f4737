use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_enqueued_total: IntCounter,
    pub orders_requeued_total: IntCounter,
    pub assignments_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_enqueued_total = IntCounter::new(
            "orders_enqueued_total",
            "Orders pushed onto the dispatch queue",
        )
        .expect("valid orders_enqueued_total metric");

        let orders_requeued_total = IntCounter::new(
            "orders_requeued_total",
            "Orders re-enqueued after a failed or impossible assignment",
        )
        .expect("valid orders_requeued_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        registry
            .register(Box::new(orders_enqueued_total.clone()))
            .expect("register orders_enqueued_total");
        registry
            .register(Box::new(orders_requeued_total.clone()))
            .expect("register orders_requeued_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");

        Self {
            registry,
            orders_enqueued_total,
            orders_requeued_total,
            assignments_total,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
