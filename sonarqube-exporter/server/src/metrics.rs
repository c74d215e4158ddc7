use prometheus::{
    core::Collector,
    proto::{Metric, MetricFamily},
    Gauge, GaugeVec, IntCounter, Opts, Registry,
};

const COMPONENT_KEY_LABEL: &str = "component_key";
const METRIC_LABEL: &str = "metric";

/// Collectors exposed by the exporter, registered in their own registry.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,

    up: Gauge,

    scrapes_total: IntCounter,

    measures: GaugeVec,
}

impl ExporterMetrics {
    /// # Errors
    ///
    /// Returns an error if `namespace` is not a valid metric name prefix
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let up = Gauge::with_opts(
            Opts::new("up", "Was the last scrape of SonarQube successful.").namespace(namespace),
        )?;
        let scrapes_total = IntCounter::with_opts(
            Opts::new("exporter_scrapes_total", "Total scrapes of the SonarQube exporter.")
                .namespace(namespace),
        )?;
        let measures = GaugeVec::new(
            Opts::new("measures", "A measure of a project in SonarQube.").namespace(namespace),
            &[COMPONENT_KEY_LABEL, METRIC_LABEL],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(measures.clone()))?;

        Ok(Self { registry, up, scrapes_total, measures })
    }

    pub fn set_up(&self, up: bool) { self.up.set(if up { 1.0 } else { 0.0 }); }

    #[must_use]
    pub fn is_up(&self) -> bool { self.up.get() > 0.0 }

    pub fn inc_scrapes(&self) { self.scrapes_total.inc(); }

    #[must_use]
    pub fn scrapes(&self) -> u64 { self.scrapes_total.get() }

    pub fn set_measure(&self, project_key: &str, metric_key: &str, value: f64) {
        self.measures.with_label_values(&[project_key, metric_key]).set(value);
    }

    /// Last value recorded for a project and metric, if any.
    #[must_use]
    pub fn measure(&self, project_key: &str, metric_key: &str) -> Option<f64> {
        let has_label = |metric: &Metric, name: &str, value: &str| {
            metric
                .get_label()
                .iter()
                .any(|pair| pair.get_name() == name && pair.get_value() == value)
        };

        self.measures
            .collect()
            .iter()
            .flat_map(MetricFamily::get_metric)
            .find(|metric| {
                has_label(metric, COMPONENT_KEY_LABEL, project_key)
                    && has_label(metric, METRIC_LABEL, metric_key)
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of (project, metric) pairs recorded so far.
    #[must_use]
    pub fn measure_count(&self) -> usize {
        self.measures.collect().iter().map(|family| family.get_metric().len()).sum()
    }

    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> { self.registry.gather() }
}
