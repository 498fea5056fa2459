use crate::error::GatherError;
use prometheus::Registry;
use prometheus::proto::{Metric, MetricFamily};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

/// Result of one gather: whatever was collected, plus the failures.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub families: Vec<MetricFamily>,
    pub error: Option<GatherError>,
}

impl Snapshot {
    pub fn ok(families: Vec<MetricFamily>) -> Self {
        Self { families, error: None }
    }

    pub fn partial(families: Vec<MetricFamily>, error: GatherError) -> Self {
        Self {
            families,
            error: error.into_option(),
        }
    }

    pub fn failed(error: GatherError) -> Self {
        Self::partial(Vec::new(), error)
    }
}

/// A source of metric families, gathered once per exposition cycle.
///
/// May be called from several request threads at once.
pub trait Gatherer: Send + Sync {
    fn gather(&self) -> Snapshot;
}

impl Gatherer for Registry {
    fn gather(&self) -> Snapshot {
        // The registry logs and skips failing collectors itself.
        Snapshot::ok(Registry::gather(self))
    }
}

impl<G: Gatherer + ?Sized> Gatherer for Arc<G> {
    fn gather(&self) -> Snapshot {
        (**self).gather()
    }
}

/// Adapts a closure into a [`Gatherer`].
pub struct GatherFn<F>(pub F);

impl<F> Gatherer for GatherFn<F>
where
    F: Fn() -> Snapshot + Send + Sync,
{
    fn gather(&self) -> Snapshot {
        (self.0)()
    }
}

/// Several gatherers served as one.
///
/// Families sharing a name are merged when their type and help agree;
/// otherwise the later family is dropped and reported. Metrics repeating an
/// already-seen label set are dropped and reported as well. Output is sorted
/// by family name.
#[derive(Clone, Default)]
pub struct Gatherers {
    sources: Vec<Arc<dyn Gatherer>>,
}

impl Gatherers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Gatherer + 'static) -> Self {
        self.push(source);
        self
    }

    pub fn push(&mut self, source: impl Gatherer + 'static) {
        self.sources.push(Arc::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Gatherer for Gatherers {
    fn gather(&self) -> Snapshot {
        let mut errors = GatherError::default();
        let mut merged: BTreeMap<String, MetricFamily> = BTreeMap::new();

        for source in &self.sources {
            let snapshot = source.gather();
            if let Some(err) = snapshot.error {
                errors.extend(err);
            }
            for mut family in snapshot.families {
                match merged.entry(family.get_name().to_owned()) {
                    Entry::Vacant(slot) => {
                        slot.insert(family);
                    }
                    Entry::Occupied(mut slot) => {
                        let existing = slot.get_mut();
                        if existing.get_field_type() != family.get_field_type() {
                            errors.push(format!(
                                "gathered metric family {} has type {:?} but should have {:?}",
                                family.get_name(),
                                family.get_field_type(),
                                existing.get_field_type()
                            ));
                            continue;
                        }
                        if existing.get_help() != family.get_help() {
                            errors.push(format!(
                                "gathered metric family {} has help {:?} but should have {:?}",
                                family.get_name(),
                                family.get_help(),
                                existing.get_help()
                            ));
                            continue;
                        }
                        for metric in family.take_metric().into_vec() {
                            let labels = label_signature(&metric);
                            let seen = existing.get_metric().iter().any(|m| label_signature(m) == labels);
                            if seen {
                                errors.push(format!(
                                    "collected metric {} {:?} was collected before with the same name and label values",
                                    existing.get_name(),
                                    labels
                                ));
                                continue;
                            }
                            existing.mut_metric().push(metric);
                        }
                    }
                }
            }
        }

        Snapshot::partial(merged.into_values().collect(), errors)
    }
}

fn label_signature(metric: &Metric) -> Vec<(&str, &str)> {
    let mut labels: Vec<(&str, &str)> = metric
        .get_label()
        .iter()
        .map(|pair| (pair.get_name(), pair.get_value()))
        .collect();
    labels.sort_unstable();
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};

    fn registry_with_source(source: &str, help: &str) -> Registry {
        let registry = Registry::new();
        let vec = IntCounterVec::new(Opts::new("requests_total", help), &["source"]).unwrap();
        registry.register(Box::new(vec.clone())).unwrap();
        vec.with_label_values(&[source]).inc();
        registry
    }

    #[test]
    fn registry_gather_never_errors() {
        let registry = Registry::new();
        let gauge = IntGauge::new("up", "Up").unwrap();
        registry.register(Box::new(gauge)).unwrap();
        let snap = Gatherer::gather(&registry);
        assert_eq!(snap.families.len(), 1);
        assert!(snap.error.is_none());
    }

    #[test]
    fn gather_fn_returns_closure_snapshot() {
        let g = GatherFn(|| Snapshot::failed(GatherError::new("no collectors")));
        let snap = g.gather();
        assert!(snap.families.is_empty());
        assert_eq!(snap.error.unwrap().failures(), ["no collectors"]);
    }

    #[test]
    fn partial_with_empty_error_is_ok() {
        let snap = Snapshot::partial(Vec::new(), GatherError::default());
        assert!(snap.error.is_none());
    }

    #[test]
    fn arc_gatherer_forwards() {
        let registry = Arc::new(registry_with_source("a", "Requests"));
        assert_eq!(Gatherer::gather(&registry).families.len(), 1);
    }

    #[test]
    fn same_named_families_are_merged() {
        let gatherers = Gatherers::new()
            .with(registry_with_source("a", "Requests"))
            .with(registry_with_source("b", "Requests"));
        assert_eq!(gatherers.len(), 2);

        let snap = gatherers.gather();
        assert!(snap.error.is_none());
        assert_eq!(snap.families.len(), 1);
        assert_eq!(snap.families[0].get_metric().len(), 2);
    }

    #[test]
    fn output_is_sorted_by_name() {
        let zeta = Registry::new();
        zeta.register(Box::new(IntCounter::new("zeta_total", "Z").unwrap())).unwrap();
        let alpha = Registry::new();
        alpha.register(Box::new(IntCounter::new("alpha_total", "A").unwrap())).unwrap();

        let snap = Gatherers::new().with(zeta).with(alpha).gather();
        let names: Vec<_> = snap.families.iter().map(|f| f.get_name().to_owned()).collect();
        assert_eq!(names, ["alpha_total", "zeta_total"]);
    }

    #[test]
    fn inconsistent_help_is_reported_and_dropped() {
        let snap = Gatherers::new()
            .with(registry_with_source("a", "Requests"))
            .with(registry_with_source("b", "Something else"))
            .gather();
        assert_eq!(snap.families.len(), 1);
        assert_eq!(snap.families[0].get_metric().len(), 1);
        let err = snap.error.unwrap();
        assert_eq!(err.len(), 1);
        assert!(err.failures()[0].contains("has help"));
    }

    #[test]
    fn inconsistent_type_is_reported_and_dropped() {
        let counters = Registry::new();
        counters.register(Box::new(IntCounter::new("things", "Things").unwrap())).unwrap();
        let gauges = Registry::new();
        gauges.register(Box::new(IntGauge::new("things", "Things").unwrap())).unwrap();

        let snap = Gatherers::new().with(counters).with(gauges).gather();
        assert_eq!(snap.families.len(), 1);
        assert!(snap.error.unwrap().failures()[0].contains("has type"));
    }

    #[test]
    fn duplicate_label_values_are_reported() {
        let snap = Gatherers::new()
            .with(registry_with_source("a", "Requests"))
            .with(registry_with_source("a", "Requests"))
            .gather();
        assert_eq!(snap.families[0].get_metric().len(), 1);
        assert!(snap.error.unwrap().failures()[0].contains("collected before"));
    }

    #[test]
    fn source_errors_are_collected_with_partial_families() {
        let snap = Gatherers::new()
            .with(registry_with_source("a", "Requests"))
            .with(GatherFn(|| Snapshot::failed(GatherError::new("disk collector: permission denied"))))
            .with(GatherFn(|| Snapshot::failed(GatherError::new("net collector: timeout"))))
            .gather();
        assert_eq!(snap.families.len(), 1);
        let err = snap.error.unwrap();
        assert_eq!(err.len(), 2);
        assert!(err.to_string().starts_with("2 error(s) occurred:"));
    }
}
