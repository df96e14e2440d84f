use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounterVec,
    pub status_transitions_total: IntCounterVec,
    pub assignment_attempts_total: IntCounterVec,
    pub location_pings_total: IntCounterVec,
    pub admission_decisions_total: IntCounterVec,
    pub active_deliveries: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total = IntCounterVec::new(
            Opts::new("orders_created_total", "Orders accepted by intake, by kind"),
            &["kind"],
        )
        .expect("valid orders_created_total metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Applied status transitions by target status",
            ),
            &["to"],
        )
        .expect("valid status_transitions_total metric");

        let assignment_attempts_total = IntCounterVec::new(
            Opts::new(
                "assignment_attempts_total",
                "Assignment attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("valid assignment_attempts_total metric");

        let location_pings_total = IntCounterVec::new(
            Opts::new("location_pings_total", "Location pings by outcome"),
            &["outcome"],
        )
        .expect("valid location_pings_total metric");

        let admission_decisions_total = IntCounterVec::new(
            Opts::new(
                "admission_decisions_total",
                "Rate admission decisions by policy and outcome",
            ),
            &["policy", "outcome"],
        )
        .expect("valid admission_decisions_total metric");

        let active_deliveries =
            IntGauge::new("active_deliveries", "Orders currently assigned or moving")
                .expect("valid active_deliveries metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(assignment_attempts_total.clone()))
            .expect("register assignment_attempts_total");
        registry
            .register(Box::new(location_pings_total.clone()))
            .expect("register location_pings_total");
        registry
            .register(Box::new(admission_decisions_total.clone()))
            .expect("register admission_decisions_total");
        registry
            .register(Box::new(active_deliveries.clone()))
            .expect("register active_deliveries");

        Self {
            registry,
            orders_created_total,
            status_transitions_total,
            assignment_attempts_total,
            location_pings_total,
            admission_decisions_total,
            active_deliveries,
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
