//! Metrics Model - Usage Counts and Impact Metrics
//!
//! Two kinds of metrics leave the engine:
//!
//! - A [`MetricsBucket`]: per-feature yes/no counts and variant counts
//!   accumulated by evaluations. Reading it flushes the engine's counters.
//! - [`ImpactMetric`]s: application-defined counters, gauges and histograms,
//!   one [`MetricSample`] per distinct label set. They can be collected as
//!   a snapshot and restored later, for example after a failed upload.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Evaluation counts for one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBucket {
    pub start: SystemTime,
    pub stop: SystemTime,
    pub toggles: HashMap<String, FeatureCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCount {
    pub yes: i64,
    pub no: i64,
    #[serde(default)]
    pub variants: HashMap<String, i64>,
}

/// A feature known to the engine's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub name: String,
    pub project: String,
    #[serde(rename = "type")]
    pub feature_type: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactMetric {
    pub name: String,
    pub help: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub samples: Vec<MetricSample>,
}

impl ImpactMetric {
    /// The sample recorded for exactly this label set.
    pub fn sample(&self, labels: &[(&str, &str)]) -> Option<&MetricSample> {
        self.samples.iter().find(|s| s.has_labels(labels))
    }
}

/// One time series of an impact metric.
///
/// Counters and gauges carry `value`; histograms carry `count`, `sum` and
/// `buckets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<HistogramBucket>>,
}

impl MetricSample {
    pub fn has_labels(&self, labels: &[(&str, &str)]) -> bool {
        self.labels.len() == labels.len()
            && labels
                .iter()
                .all(|(k, v)| self.labels.get(*k).map(String::as_str) == Some(*v))
    }
}

/// Cumulative histogram bucket. The upper bound `le` may be `+Inf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    #[serde(with = "upper_bound")]
    pub le: f64,
    pub count: u64,
}

/// Bucket bounds travel as JSON numbers, except infinity which is the
/// string `"+Inf"`.
mod upper_bound {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(le: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if le.is_infinite() && le.is_sign_positive() {
            serializer.serialize_str("+Inf")
        } else {
            serializer.serialize_f64(*le)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        struct Bound;

        impl Visitor<'_> for Bound {
            type Value = f64;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or \"+Inf\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
                Ok(v as f64)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
                Ok(v as f64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
                match v {
                    "+Inf" | "Inf" | "inf" => Ok(f64::INFINITY),
                    other => other.parse().map_err(E::custom),
                }
            }
        }

        deserializer.deserialize_any(Bound)
    }
}

pub(crate) fn from_millis(ms: i64) -> SystemTime {
    if ms >= 0 {
        UNIX_EPOCH + Duration::from_millis(ms as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(ms.unsigned_abs())
    }
}

pub(crate) fn to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}
