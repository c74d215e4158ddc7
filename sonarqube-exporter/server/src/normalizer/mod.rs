pub mod error;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use snafu::{ensure, OptionExt, ResultExt};
use sonarqube_exporter_core::model::{
    default_enumerated_metrics, EnumeratedValues, MetricDefinition, MetricType,
};

pub use self::error::{Error, Result};

/// How the textual value of a metric is turned into a number.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasureKind {
    /// Free-form base-10 number
    Numeric,

    /// Fixed token looked up in a table
    Enumerated(Arc<EnumeratedValues>),
}

impl MeasureKind {
    /// Convert a raw measure value.
    ///
    /// An empty value of a numeric metric is recorded as `0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a token of the enumerated table or
    /// is not a number. Callers discard such measures.
    pub fn normalize(&self, value: &str) -> Result<f64> {
        match self {
            Self::Enumerated(table) => table
                .get(value)
                .copied()
                .context(error::UnknownEnumeratedValueSnafu { value }),
            // FIXME: an empty value is exposed as `0`, which can not be told
            // apart from a real zero. Skipping it like a parse failure may be
            // what dashboards expect.
            Self::Numeric if value.is_empty() => Ok(0.0),
            Self::Numeric => {
                let number = value.parse::<f64>().context(error::ParseValueSnafu { value })?;
                ensure!(
                    number.is_finite() || is_non_finite_literal(value),
                    error::ValueOutOfRangeSnafu { value }
                );
                Ok(number)
            }
        }
    }
}

/// Whether `value` spells infinity or NaN, as opposed to a number too large
/// for `f64`.
fn is_non_finite_literal(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value).to_ascii_lowercase();
    matches!(unsigned.as_str(), "inf" | "infinity" | "nan")
}

/// A metric whose measures are requested, with its kind resolved.
#[derive(Clone, Debug, PartialEq)]
struct CatalogEntry {
    key: String,
    kind: MeasureKind,
}

/// Metrics retained for one refresh cycle, in the order of the upstream catalog.
#[derive(Clone, Debug, Default)]
pub struct MetricCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl MetricCatalog {
    #[must_use]
    pub fn keys(&self) -> Vec<&str> { self.entries.iter().map(|entry| entry.key.as_str()).collect() }

    #[must_use]
    pub fn kind_of(&self, key: &str) -> Option<&MeasureKind> {
        self.index.get(key).map(|&position| &self.entries[position].kind)
    }

    fn push(&mut self, entry: CatalogEntry) {
        // The upstream catalog is not expected to repeat keys, keep the first one
        if !self.index.contains_key(&entry.key) {
            let _ = self.index.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }
}

/// Turns raw measures into numbers according to immutable tables given at
/// construction.
#[derive(Clone, Debug)]
pub struct Normalizer {
    accepted_types: HashSet<MetricType>,
    enumerated_metrics: HashMap<String, Arc<EnumeratedValues>>,
}

impl Default for Normalizer {
    fn default() -> Self { Self::new(MetricType::default_accepted(), default_enumerated_metrics()) }
}

impl Normalizer {
    pub fn new<T, E>(accepted_types: T, enumerated_metrics: E) -> Self
    where
        T: IntoIterator<Item = MetricType>,
        E: IntoIterator<Item = (String, EnumeratedValues)>,
    {
        Self {
            accepted_types: accepted_types.into_iter().collect(),
            enumerated_metrics: enumerated_metrics
                .into_iter()
                .map(|(key, values)| (key, Arc::new(values)))
                .collect(),
        }
    }

    #[must_use]
    pub fn is_accepted(&self, metric_type: &MetricType) -> bool {
        self.accepted_types.contains(metric_type)
    }

    #[must_use]
    pub fn classify(&self, metric_key: &str) -> MeasureKind {
        self.enumerated_metrics
            .get(metric_key)
            .map_or(MeasureKind::Numeric, |table| MeasureKind::Enumerated(Arc::clone(table)))
    }

    /// Keep the definitions of accepted types and resolve their kind.
    pub fn build_catalog<I>(&self, definitions: I) -> MetricCatalog
    where
        I: IntoIterator<Item = MetricDefinition>,
    {
        let mut catalog = MetricCatalog::default();
        for MetricDefinition { key, metric_type } in definitions {
            if self.is_accepted(&metric_type) {
                let kind = self.classify(&key);
                catalog.push(CatalogEntry { key, kind });
            }
        }
        catalog
    }

    /// Convert the raw value of `metric_key`.
    ///
    /// # Errors
    ///
    /// See [`MeasureKind::normalize`].
    pub fn normalize(&self, metric_key: &str, value: &str) -> Result<f64> {
        self.classify(metric_key).normalize(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn definition(key: &str, metric_type: &str) -> MetricDefinition {
        MetricDefinition { key: key.to_string(), metric_type: metric_type.parse().unwrap() }
    }

    #[test]
    fn test_quality_gate_status() {
        let normalizer = Normalizer::default();

        assert_eq!(normalizer.normalize("alert_status", "OK").unwrap(), 0.0);
        assert_eq!(normalizer.normalize("alert_status", "WARN").unwrap(), 1.0);
        assert_eq!(normalizer.normalize("alert_status", "ERROR").unwrap(), 2.0);
        assert!(matches!(
            normalizer.normalize("alert_status", "UNKNOWN_FUTURE_VALUE"),
            Err(Error::UnknownEnumeratedValue { .. })
        ));
    }

    #[test]
    fn test_ratings_and_gate_details() {
        let normalizer = Normalizer::default();

        assert_eq!(normalizer.normalize("reliability_rating", "A").unwrap(), 0.0);
        assert_eq!(normalizer.normalize("reliability_rating", "E").unwrap(), 4.0);
        assert_eq!(normalizer.normalize("quality_gate_details", "Passed").unwrap(), 0.0);
        assert_eq!(normalizer.normalize("quality_gate_details", "Failed").unwrap(), 1.0);
        // Enumerated values are not parsed even when they look numeric
        assert!(normalizer.normalize("reliability_rating", "1.0").is_err());
        assert!(normalizer.normalize("reliability_rating", "").is_err());
    }

    #[test]
    fn test_numeric_values() {
        let normalizer = Normalizer::default();

        assert_eq!(normalizer.normalize("branch_coverage", "35.4").unwrap(), 35.4);
        assert_eq!(normalizer.normalize("conditions_to_cover", "794").unwrap(), 794.0);
        assert_eq!(normalizer.normalize("duplicated_lines_density", "-1.5e2").unwrap(), -150.0);
        assert!(matches!(
            normalizer.normalize("branch_coverage", "not-a-number"),
            Err(Error::ParseValue { .. })
        ));
    }

    #[test]
    fn test_out_of_range_value_is_discarded() {
        let normalizer = Normalizer::default();

        assert!(matches!(
            normalizer.normalize("ncloc", "1e400"),
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(normalizer.normalize("ncloc", "-1e400").is_err());
        // Spelled-out infinities are accepted like any other number
        assert_eq!(normalizer.normalize("ncloc", "+Inf").unwrap(), f64::INFINITY);
        assert_eq!(normalizer.normalize("ncloc", "-infinity").unwrap(), f64::NEG_INFINITY);
        assert!(normalizer.normalize("ncloc", "NaN").unwrap().is_nan());
        assert_eq!(normalizer.normalize("ncloc", "1.7e308").unwrap(), 1.7e308);
    }

    #[test]
    fn test_empty_numeric_value_is_zero() {
        assert_eq!(Normalizer::default().normalize("new_bugs", "").unwrap(), 0.0);
    }

    #[test]
    fn test_build_catalog_keeps_accepted_types_in_order() {
        let normalizer = Normalizer::default();

        let catalog = normalizer.build_catalog(vec![
            definition("ncloc", "INT"),
            definition("last_commit_date", "MILLISEC"),
            definition("alert_status", "LEVEL"),
            definition("ncloc_language_distribution", "DATA"),
            definition("sqale_index", "WORK_DUR"),
            definition("branch_coverage", "PERCENT"),
            definition("ncloc", "INT"),
        ]);

        assert_eq!(
            catalog.keys(),
            vec!["ncloc", "alert_status", "ncloc_language_distribution", "branch_coverage"]
        );
        assert_eq!(catalog.kind_of("ncloc"), Some(&MeasureKind::Numeric));
        assert!(matches!(catalog.kind_of("alert_status"), Some(MeasureKind::Enumerated(_))));
        assert_eq!(catalog.kind_of("sqale_index"), None);
    }

    #[test]
    fn test_injected_tables() {
        let normalizer = Normalizer::new(
            vec![MetricType::Other("WORK_DUR".to_string())],
            vec![(
                "security_rating".to_string(),
                BTreeMap::from([("A".to_string(), 1.0), ("B".to_string(), 2.0)]),
            )],
        );

        let catalog = normalizer.build_catalog(vec![
            definition("sqale_index", "WORK_DUR"),
            definition("ncloc", "INT"),
        ]);
        assert_eq!(catalog.keys(), vec!["sqale_index"]);

        assert_eq!(normalizer.normalize("security_rating", "B").unwrap(), 2.0);
        // Default tables are replaced, not merged
        assert_eq!(normalizer.normalize("alert_status", "").unwrap(), 0.0);
        assert!(normalizer.normalize("alert_status", "OK").is_err());
    }
}
