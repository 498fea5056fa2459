use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

/// Request metrics for the exposition endpoint itself.
///
/// Registered on the same registry the endpoint serves, so a scrape reports
/// on the scrapes before it.
#[derive(Clone)]
pub struct HandlerMetrics {
    requests_total: IntCounterVec,
    in_flight: IntGauge,
}

/// Keeps the in-flight gauge raised until dropped.
#[must_use = "the request stops counting as in flight when the guard is dropped"]
pub struct InFlight {
    gauge: IntGauge,
}

impl HandlerMetrics {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "vitrine_exposition_requests_total",
                "Total number of scrapes by HTTP status code",
            ),
            &["code"],
        )?;
        let in_flight = IntGauge::new(
            "vitrine_exposition_requests_in_flight",
            "Current number of scrapes being served",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            requests_total,
            in_flight,
        })
    }

    #[inline]
    pub fn track(&self) -> InFlight {
        self.in_flight.inc();
        InFlight {
            gauge: self.in_flight.clone(),
        }
    }

    /// Count one finished request with status `code`.
    #[inline]
    pub fn observe(&self, code: u16) {
        let mut buf = itoa::Buffer::new();
        self.requests_total
            .with_label_values(&[buf.format(code)])
            .inc();
    }

    pub fn requests(&self, code: u16) -> u64 {
        let mut buf = itoa::Buffer::new();
        self.requests_total
            .with_label_values(&[buf.format(code)])
            .get()
    }

    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    // ── Registration ─────────────────────────────────────────────

    #[test]
    fn register_twice_on_one_registry_fails() {
        let registry = Registry::new();
        HandlerMetrics::register(&registry).unwrap();
        assert!(HandlerMetrics::register(&registry).is_err());
    }

    #[test]
    fn gauge_is_exposed_before_any_request() {
        let registry = Registry::new();
        HandlerMetrics::register(&registry).unwrap();
        let output = render(&registry);
        assert!(output.contains("vitrine_exposition_requests_in_flight 0"));
    }

    // ── Counting ─────────────────────────────────────────────────

    #[test]
    fn observe_counts_by_status_code() {
        let registry = Registry::new();
        let metrics = HandlerMetrics::register(&registry).unwrap();
        metrics.observe(200);
        metrics.observe(200);
        metrics.observe(500);
        assert_eq!(metrics.requests(200), 2);
        assert_eq!(metrics.requests(500), 1);

        let output = render(&registry);
        assert!(output.contains(r#"vitrine_exposition_requests_total{code="200"} 2"#));
        assert!(output.contains(r#"vitrine_exposition_requests_total{code="500"} 1"#));
    }

    #[test]
    fn in_flight_guard_decrements_on_drop() {
        let registry = Registry::new();
        let metrics = HandlerMetrics::register(&registry).unwrap();
        let first = metrics.track();
        let second = metrics.track();
        assert_eq!(metrics.in_flight(), 2);
        drop(first);
        assert_eq!(metrics.in_flight(), 1);
        drop(second);
        assert_eq!(metrics.in_flight(), 0);
    }

    #[test]
    fn clones_share_the_same_series() {
        let registry = Registry::new();
        let metrics = HandlerMetrics::register(&registry).unwrap();
        let clone = metrics.clone();
        clone.observe(503);
        assert_eq!(metrics.requests(503), 1);
    }
}
