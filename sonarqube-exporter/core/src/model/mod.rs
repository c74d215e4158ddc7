// Resources of the SonarQube web API consumed by the exporter.

use std::{
    collections::BTreeMap,
    convert::Infallible,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::Deserialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Value type of a SonarQube metric, as reported by `api/metrics/search`.
#[derive(Clone, Debug, DeserializeFromStr, Eq, Hash, PartialEq, SerializeDisplay)]
pub enum MetricType {
    Int,
    Percent,
    Float,
    Data,
    Rating,
    Level,
    /// Any type the exporter has no dedicated variant for, e.g. `WORK_DUR`
    Other(String),
}

impl MetricType {
    /// Types whose measures are requested unless configured otherwise.
    #[must_use]
    pub fn default_accepted() -> Vec<Self> {
        vec![Self::Int, Self::Percent, Self::Float, Self::Data, Self::Rating, Self::Level]
    }
}

impl FromStr for MetricType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "INT" => Self::Int,
            "PERCENT" => Self::Percent,
            "FLOAT" => Self::Float,
            "DATA" => Self::Data,
            "RATING" => Self::Rating,
            "LEVEL" => Self::Level,
            other => Self::Other(other.to_string()),
        })
    }
}

impl Display for MetricType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "INT"),
            Self::Percent => write!(f, "PERCENT"),
            Self::Float => write!(f, "FLOAT"),
            Self::Data => write!(f, "DATA"),
            Self::Rating => write!(f, "RATING"),
            Self::Level => write!(f, "LEVEL"),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct MetricDefinition {
    pub key: String,

    #[serde(rename = "type")]
    pub metric_type: MetricType,
}

/// A project (`TRK` component) of the SonarQube instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ProjectDescriptor {
    /// Internal identifier, used to query measures
    pub id: String,

    /// Human readable key, used as label and for filtering
    pub key: String,
}

/// Measure of one metric for one component, value still in its textual form.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawMeasure {
    pub metric: String,

    #[serde(default)]
    pub value: String,
}

/// Mapping from the textual tokens of an enumerated metric to the number
/// exposed for them.
pub type EnumeratedValues = BTreeMap<String, f64>;

/// Canonical tables of the metrics whose values are tokens rather than numbers.
#[must_use]
pub fn default_enumerated_metrics() -> BTreeMap<String, EnumeratedValues> {
    fn table(entries: &[(&str, f64)]) -> EnumeratedValues {
        entries.iter().map(|(token, value)| ((*token).to_string(), *value)).collect()
    }

    BTreeMap::from([
        ("alert_status".to_string(), table(&[("OK", 0.0), ("WARN", 1.0), ("ERROR", 2.0)])),
        ("quality_gate_details".to_string(), table(&[("Passed", 0.0), ("Failed", 1.0)])),
        (
            "reliability_rating".to_string(),
            table(&[("A", 0.0), ("B", 1.0), ("C", 2.0), ("D", 3.0), ("E", 4.0)]),
        ),
    ])
}
