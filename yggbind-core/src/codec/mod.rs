//! Message Codec - Typed Requests and Responses over FlatBuffers
//!
//! Requests are described by borrowing host types and written straight
//! into the builder of a caller-supplied [`RequestBuffer`]. Responses are
//! verified FlatBuffers views over the bytes of a native buffer, read into
//! host types and lifted into a [`ResponseEnvelope`].
//!
//! # Decoding rules:
//! - An empty byte slice (a null buffer) is the absent message: "not
//!   found" for evaluations, success for void calls, nothing for lists.
//! - Bytes that fail verification are a [`YggError::Protocol`]: the library
//!   on the other side speaks a different schema.

pub mod messages;

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat};
use flatbuffers::{FlatBufferBuilder, Follow, UnionWIPOffset, Verifiable, WIPOffset};

use crate::context::{Context, Evaluated, Payload, Variant};
use crate::envelope::ResponseEnvelope;
use crate::error::{Result, YggError};
use crate::ffi::RequestBuffer;
use crate::metrics::{self, FeatureCount, FeatureDefinition, MetricsBucket};
use crate::strategy::{FeatureStrategies, StrategyDefinition};

/// Feature declarations and warnings returned by a state load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub features: Vec<FeatureStrategies>,
    pub warnings: Vec<String>,
}

// ---- requests -----------------------------------------------------------

/// A message the engine reads as a FlatBuffers root table.
pub trait Request {
    /// Write the message into `fbb` and return its root table.
    fn build<'b>(&self, fbb: &mut FlatBufferBuilder<'b>) -> Result<WIPOffset<UnionWIPOffset>>;
}

/// Evaluation request for one toggle.
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    pub toggle: &'a str,
    pub context: &'a Context,
    pub custom_results: &'a BTreeMap<String, bool>,
    pub runtime_hostname: Option<&'a str>,
}

/// Describe the evaluation request for `toggle`.
pub fn context_message<'a>(
    toggle: &'a str,
    context: &'a Context,
    custom_results: &'a BTreeMap<String, bool>,
    runtime_hostname: Option<&'a str>,
) -> ContextRequest<'a> {
    ContextRequest {
        toggle,
        context,
        custom_results,
        runtime_hostname,
    }
}

/// RFC 3339 in UTC with millisecond precision.
fn timestamp(time: SystemTime) -> Result<String> {
    DateTime::from_timestamp_millis(metrics::to_millis(time))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| YggError::invalid("current time is out of range"))
}

fn optional_string<'b>(
    fbb: &mut FlatBufferBuilder<'b>,
    value: Option<&str>,
) -> Option<WIPOffset<&'b str>> {
    value.map(|value| fbb.create_string(value))
}

impl Request for ContextRequest<'_> {
    fn build<'b>(&self, fbb: &mut FlatBufferBuilder<'b>) -> Result<WIPOffset<UnionWIPOffset>> {
        let ctx = self.context;
        let current_time = ctx.current_time.map(timestamp).transpose()?;

        let toggle_name = fbb.create_string(self.toggle);
        let app_name = optional_string(fbb, ctx.app_name.as_deref());
        let current_time = optional_string(fbb, current_time.as_deref());
        let environment = optional_string(fbb, ctx.environment.as_deref());
        let remote_address = optional_string(fbb, ctx.remote_address.as_deref());
        let session_id = optional_string(fbb, ctx.session_id.as_deref());
        let user_id = optional_string(fbb, ctx.user_id.as_deref());

        let entries: Vec<_> = ctx
            .properties
            .iter()
            .map(|(key, value)| {
                let key = fbb.create_string(key);
                let value = fbb.create_string(value);
                messages::PropertyEntry::create(
                    fbb,
                    &messages::PropertyEntryArgs {
                        key,
                        value: Some(value),
                    },
                )
            })
            .collect();
        let properties = fbb.create_vector(&entries);

        let results: Vec<_> = self
            .custom_results
            .iter()
            .map(|(key, value)| {
                let key = fbb.create_string(key);
                messages::CustomStrategyResult::create(
                    fbb,
                    &messages::CustomStrategyResultArgs { key, value: *value },
                )
            })
            .collect();
        let custom_strategies_results = fbb.create_vector(&results);

        let runtime_hostname = optional_string(fbb, self.runtime_hostname);

        let message = messages::ContextMessage::create(
            fbb,
            &messages::ContextMessageArgs {
                toggle_name: Some(toggle_name),
                app_name,
                current_time,
                environment,
                custom_strategies_results: Some(custom_strategies_results),
                remote_address,
                session_id,
                user_id,
                properties: Some(properties),
                runtime_hostname,
            },
        );
        Ok(message.as_union_value())
    }
}

/// One of the impact metric requests.
#[derive(Debug, Clone, Copy)]
pub enum MetricRequest<'a> {
    DefineCounter {
        name: &'a str,
        help: &'a str,
    },
    IncCounter {
        name: &'a str,
        value: i64,
        labels: Option<&'a HashMap<String, String>>,
    },
    DefineGauge {
        name: &'a str,
        help: &'a str,
    },
    SetGauge {
        name: &'a str,
        value: f64,
        labels: Option<&'a HashMap<String, String>>,
    },
    DefineHistogram {
        name: &'a str,
        help: &'a str,
        buckets: Option<&'a [f64]>,
    },
    ObserveHistogram {
        name: &'a str,
        value: f64,
        labels: Option<&'a HashMap<String, String>>,
    },
}

pub fn define_counter<'a>(name: &'a str, help: &'a str) -> MetricRequest<'a> {
    MetricRequest::DefineCounter { name, help }
}

pub fn inc_counter<'a>(
    name: &'a str,
    value: i64,
    labels: Option<&'a HashMap<String, String>>,
) -> MetricRequest<'a> {
    MetricRequest::IncCounter {
        name,
        value,
        labels,
    }
}

pub fn define_gauge<'a>(name: &'a str, help: &'a str) -> MetricRequest<'a> {
    MetricRequest::DefineGauge { name, help }
}

pub fn set_gauge<'a>(
    name: &'a str,
    value: f64,
    labels: Option<&'a HashMap<String, String>>,
) -> MetricRequest<'a> {
    MetricRequest::SetGauge {
        name,
        value,
        labels,
    }
}

pub fn define_histogram<'a>(
    name: &'a str,
    help: &'a str,
    buckets: Option<&'a [f64]>,
) -> MetricRequest<'a> {
    MetricRequest::DefineHistogram {
        name,
        help,
        buckets,
    }
}

pub fn observe_histogram<'a>(
    name: &'a str,
    value: f64,
    labels: Option<&'a HashMap<String, String>>,
) -> MetricRequest<'a> {
    MetricRequest::ObserveHistogram {
        name,
        value,
        labels,
    }
}

/// `None` stays absent on the wire; an empty map becomes an empty vector.
/// Labels are written in key order.
fn label_vector<'b>(
    fbb: &mut FlatBufferBuilder<'b>,
    labels: Option<&HashMap<String, String>>,
) -> Option<WIPOffset<messages::TableVector<'b, messages::MetricLabel<'b>>>> {
    let labels = labels?;
    let mut pairs: Vec<_> = labels.iter().collect();
    pairs.sort();
    let entries: Vec<_> = pairs
        .into_iter()
        .map(|(key, value)| {
            let key = fbb.create_string(key);
            let value = fbb.create_string(value);
            messages::MetricLabel::create(
                fbb,
                &messages::MetricLabelArgs {
                    key,
                    value: Some(value),
                },
            )
        })
        .collect();
    Some(fbb.create_vector(&entries))
}

impl Request for MetricRequest<'_> {
    fn build<'b>(&self, fbb: &mut FlatBufferBuilder<'b>) -> Result<WIPOffset<UnionWIPOffset>> {
        let root = match *self {
            Self::DefineCounter { name, help } => {
                let args = messages::DefineMetricArgs {
                    name: Some(fbb.create_string(name)),
                    help: Some(fbb.create_string(help)),
                };
                messages::DefineCounter::create(fbb, &args).as_union_value()
            }
            Self::DefineGauge { name, help } => {
                let args = messages::DefineMetricArgs {
                    name: Some(fbb.create_string(name)),
                    help: Some(fbb.create_string(help)),
                };
                messages::DefineGauge::create(fbb, &args).as_union_value()
            }
            Self::IncCounter {
                name,
                value,
                labels,
            } => {
                let name = fbb.create_string(name);
                let labels = label_vector(fbb, labels);
                let args = messages::IncCounterArgs {
                    name: Some(name),
                    value,
                    labels,
                };
                messages::IncCounter::create(fbb, &args).as_union_value()
            }
            Self::SetGauge {
                name,
                value,
                labels,
            } => {
                let name = fbb.create_string(name);
                let labels = label_vector(fbb, labels);
                let args = messages::SampleArgs {
                    name: Some(name),
                    value,
                    labels,
                };
                messages::SetGauge::create(fbb, &args).as_union_value()
            }
            Self::ObserveHistogram {
                name,
                value,
                labels,
            } => {
                let name = fbb.create_string(name);
                let labels = label_vector(fbb, labels);
                let args = messages::SampleArgs {
                    name: Some(name),
                    value,
                    labels,
                };
                messages::ObserveHistogram::create(fbb, &args).as_union_value()
            }
            Self::DefineHistogram {
                name,
                help,
                buckets,
            } => {
                let name = fbb.create_string(name);
                let help = fbb.create_string(help);
                let buckets = buckets.map(|bounds| fbb.create_vector(bounds));
                let args = messages::DefineHistogramArgs {
                    name: Some(name),
                    help: Some(help),
                    buckets,
                };
                messages::DefineHistogram::create(fbb, &args).as_union_value()
            }
        };
        Ok(root)
    }
}

/// Encode `request` into `buffer` and lend out the bytes.
pub fn encode<'b, R: Request + ?Sized>(
    buffer: &'b mut RequestBuffer,
    request: &R,
) -> Result<&'b [u8]> {
    buffer.encode(request)
}

// ---- responses ----------------------------------------------------------

/// Verify `bytes` as a `T` root. Empty bytes are the absent message.
fn read<'a, T>(bytes: &'a [u8], what: &str) -> Result<Option<T::Inner>>
where
    T: Follow<'a> + Verifiable + 'a,
{
    if bytes.is_empty() {
        return Ok(None);
    }
    flatbuffers::root::<T>(bytes)
        .map(Some)
        .map_err(|e| YggError::protocol(format!("undecodable {what}: {e}")))
}

pub fn decode_enabled(bytes: &[u8]) -> Result<ResponseEnvelope<Evaluated<bool>>> {
    let Some(response) = read::<messages::Response>(bytes, "Response")? else {
        return Ok(ResponseEnvelope::not_found());
    };
    let enabled = response.has_enabled().then(|| Evaluated {
        value: response.enabled(),
        impression_data: response.impression_data(),
    });
    Ok(ResponseEnvelope::from_parts(
        response.error().map(str::to_string),
        enabled,
    ))
}

pub fn decode_variant(bytes: &[u8]) -> Result<ResponseEnvelope<Evaluated<Variant>>> {
    let Some(response) = read::<messages::Variant>(bytes, "Variant")? else {
        return Ok(ResponseEnvelope::not_found());
    };

    let variant = response.name().map(|name| Evaluated {
        value: Variant {
            name: name.to_string(),
            payload: response.payload().map(|p| Payload {
                payload_type: p.payload_type().unwrap_or_default().to_string(),
                value: p.value().unwrap_or_default().to_string(),
            }),
            enabled: response.enabled(),
            feature_enabled: response.feature_enabled(),
        },
        impression_data: response.impression_data(),
    });
    Ok(ResponseEnvelope::from_parts(
        response.error().map(str::to_string),
        variant,
    ))
}

pub fn decode_void(bytes: &[u8]) -> Result<ResponseEnvelope<()>> {
    let error = read::<messages::VoidResponse>(bytes, "VoidResponse")?
        .and_then(|response| response.error())
        .map(str::to_string);
    Ok(ResponseEnvelope::from_parts(error, Some(())))
}

pub fn decode_take_state(bytes: &[u8]) -> Result<ResponseEnvelope<StateUpdate>> {
    let Some(response) = read::<messages::TakeStateResponse>(bytes, "TakeStateResponse")? else {
        return Ok(ResponseEnvelope::ok(StateUpdate::default()));
    };
    if let Some(error) = response.error() {
        return Ok(ResponseEnvelope::error(error));
    }

    let features = response
        .features()
        .into_iter()
        .flatten()
        .map(|feature| {
            let name = feature
                .feature_name()
                .ok_or_else(|| YggError::protocol("strategy feature without a name"))?;
            let strategies = feature
                .strategies()
                .into_iter()
                .flatten()
                .map(|s| StrategyDefinition {
                    name: s.name().unwrap_or_default().to_string(),
                    parameters: s
                        .parameters()
                        .into_iter()
                        .flatten()
                        .filter_map(|p| {
                            let key = p.key()?;
                            Some((key.to_string(), p.value().unwrap_or_default().to_string()))
                        })
                        .collect(),
                })
                .collect();
            Ok(FeatureStrategies {
                feature: name.to_string(),
                strategies,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let warnings = response
        .warnings()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();

    Ok(ResponseEnvelope::ok(StateUpdate { features, warnings }))
}

/// `None` when nothing was counted since the last read.
pub fn decode_metrics(bytes: &[u8]) -> Result<Option<MetricsBucket>> {
    let Some(response) = read::<messages::MetricsResponse>(bytes, "MetricsResponse")? else {
        return Ok(None);
    };
    let Some(entries) = response.toggles().filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let toggles = entries
        .iter()
        .map(|entry| {
            let count = entry
                .value()
                .map(|stats| FeatureCount {
                    yes: i64::from(stats.yes()),
                    no: i64::from(stats.no()),
                    variants: stats
                        .variants()
                        .into_iter()
                        .flatten()
                        .map(|v| (v.key().to_string(), i64::from(v.value())))
                        .collect(),
                })
                .unwrap_or_default();
            (entry.key().to_string(), count)
        })
        .collect();

    Ok(Some(MetricsBucket {
        start: metrics::from_millis(response.start()),
        stop: metrics::from_millis(response.stop()),
        toggles,
    }))
}

pub fn decode_feature_defs(bytes: &[u8]) -> Result<Vec<FeatureDefinition>> {
    let Some(response) = read::<messages::FeatureDefs>(bytes, "FeatureDefs")? else {
        return Ok(Vec::new());
    };
    Ok(response
        .items()
        .into_iter()
        .flatten()
        .map(|item| FeatureDefinition {
            name: item.name().unwrap_or_default().to_string(),
            project: item.project().unwrap_or_default().to_string(),
            feature_type: item.type_().map(str::to_string),
            enabled: item.enabled(),
        })
        .collect())
}

pub fn decode_built_in_strategies(bytes: &[u8]) -> Result<Vec<String>> {
    let Some(response) = read::<messages::BuiltInStrategies>(bytes, "BuiltInStrategies")? else {
        return Ok(Vec::new());
    };
    Ok(response
        .values()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}
