//! In-process engine exporting the native ABI as `extern "C"` functions.
//!
//! It understands a small subset of the toggle state format (`default`,
//! `userWithId`, `applicationHostname` and custom strategy results), keeps
//! usage counts and impact metrics, and counts every buffer, string and
//! engine it hands out or takes back. Counters are per thread, and each
//! test runs on its own thread.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use flatbuffers::{FlatBufferBuilder, Follow, Verifiable, WIPOffset};
use libc::{c_char, c_void, size_t};
use serde::Deserialize;
use serde_json::{json, Value};
use yggbind_core::codec::messages::{self, TableVector};
use yggbind_core::ffi::{Buf, EngineSymbols, NativeApi};
use yggbind_core::{
    Engine, HistogramBucket, ImpactMetric, MetricSample, MetricType, Strategy,
};

pub const BUILT_IN: &[&str] = &[
    "default",
    "userWithId",
    "gradualRolloutUserId",
    "gradualRolloutSessionId",
    "gradualRolloutRandom",
    "applicationHostname",
    "remoteAddress",
    "flexibleRollout",
];

const DEFAULT_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

pub const STATE: &str = r##"{
    "version": 1,
    "features": [
        {
            "name": "Feature.A",
            "enabled": true,
            "impressionData": true,
            "strategies": [{"name": "default"}]
        },
        {
            "name": "Feature.B",
            "enabled": false,
            "strategies": [{"name": "default"}]
        },
        {
            "name": "Feature.C",
            "enabled": true,
            "type": "release",
            "strategies": [{"name": "userWithId", "parameters": {"userIds": "7,8"}}],
            "variants": [{"name": "blue", "payload": {"type": "string", "value": "#00f"}}]
        },
        {
            "name": "Feature.Custom",
            "enabled": true,
            "strategies": [
                {"name": "colorStrategy", "parameters": {"color": "red"}},
                {"name": "colorStrategy", "parameters": {"color": "blue"}}
            ]
        },
        {
            "name": "Feature.Mixed",
            "enabled": true,
            "strategies": [
                {"name": "unregistered", "parameters": {}},
                {"name": "userWithId", "parameters": {"userIds": "1"}},
                {"name": "colorStrategy", "parameters": {"color": "green"}}
            ]
        },
        {
            "name": "Feature.Host",
            "enabled": true,
            "strategies": [{"name": "applicationHostname", "parameters": {"hostNames": "web-1"}}]
        }
    ]
}"##;

// ---------------------------------------------------------------------------
// Allocation accounting
// ---------------------------------------------------------------------------

thread_local! {
    static BUFFERS_ALLOCATED: Cell<usize> = const { Cell::new(0) };
    static BUFFERS_FREED: Cell<usize> = const { Cell::new(0) };
    static STRINGS_ALLOCATED: Cell<usize> = const { Cell::new(0) };
    static STRINGS_FREED: Cell<usize> = const { Cell::new(0) };
    static ENGINES_CREATED: Cell<usize> = const { Cell::new(0) };
    static ENGINES_FREED: Cell<usize> = const { Cell::new(0) };
    static LAST_LABELS_PRESENT: Cell<Option<bool>> = const { Cell::new(None) };
    static LAST_CURRENT_TIME: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
    counter.with(|c| c.set(c.get() + 1));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub buffers_allocated: usize,
    pub buffers_freed: usize,
    pub strings_allocated: usize,
    pub strings_freed: usize,
    pub engines_created: usize,
    pub engines_freed: usize,
}

impl Counters {
    pub fn balanced(&self) -> bool {
        self.buffers_allocated == self.buffers_freed
            && self.strings_allocated == self.strings_freed
    }
}

pub fn counters() -> Counters {
    Counters {
        buffers_allocated: BUFFERS_ALLOCATED.with(Cell::get),
        buffers_freed: BUFFERS_FREED.with(Cell::get),
        strings_allocated: STRINGS_ALLOCATED.with(Cell::get),
        strings_freed: STRINGS_FREED.with(Cell::get),
        engines_created: ENGINES_CREATED.with(Cell::get),
        engines_freed: ENGINES_FREED.with(Cell::get),
    }
}

/// The `current_time` string of the last evaluation request.
pub fn last_current_time() -> Option<String> {
    LAST_CURRENT_TIME.with(|t| t.borrow().clone())
}

/// Whether the last metric update carried a label set.
pub fn last_labels_present() -> Option<bool> {
    LAST_LABELS_PRESENT.with(Cell::get)
}

fn respond_bytes(bytes: Vec<u8>) -> Buf {
    bump(&BUFFERS_ALLOCATED);
    Buf::from_vec(bytes)
}

fn respond_json(value: Value) -> *mut c_char {
    respond_text(value.to_string())
}

fn respond_text(text: String) -> *mut c_char {
    bump(&STRINGS_ALLOCATED);
    CString::new(text).unwrap().into_raw()
}

fn ok(value: Value) -> Value {
    json!({"status_code": "Ok", "value": value, "error_message": null})
}

fn error(message: impl Into<String>) -> Value {
    json!({"status_code": "Error", "value": null, "error_message": message.into()})
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Outcome of a call answered with a `VoidResponse`.
type VoidReply = Result<(), String>;

#[derive(Debug, Clone, Default)]
struct VariantReply {
    name: Option<String>,
    payload: Option<PayloadDoc>,
    enabled: bool,
    feature_enabled: bool,
    impression_data: bool,
    error: Option<String>,
}

fn finished<T>(mut fbb: FlatBufferBuilder<'_>, root: WIPOffset<T>) -> Vec<u8> {
    fbb.finish(root, None);
    fbb.finished_data().to_vec()
}

fn enabled_response(enabled: Option<bool>, impression_data: bool, error: Option<&str>) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let error = error.map(|e| fbb.create_string(e));
    let root = messages::Response::create(
        &mut fbb,
        &messages::ResponseArgs {
            impression_data,
            enabled: enabled.unwrap_or(false),
            has_enabled: enabled.is_some(),
            error,
        },
    );
    finished(fbb, root)
}

fn variant_response(reply: &VariantReply) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let payload = reply.payload.as_ref().map(|p| {
        let payload_type = fbb.create_string(&p.payload_type);
        let value = fbb.create_string(&p.value);
        messages::VariantPayload::create(
            &mut fbb,
            &messages::VariantPayloadArgs {
                payload_type: Some(payload_type),
                value: Some(value),
            },
        )
    });
    let name = reply.name.as_deref().map(|n| fbb.create_string(n));
    let error = reply.error.as_deref().map(|e| fbb.create_string(e));
    let root = messages::Variant::create(
        &mut fbb,
        &messages::VariantArgs {
            feature_enabled: reply.feature_enabled,
            impression_data: reply.impression_data,
            enabled: reply.enabled,
            name,
            payload,
            error,
        },
    );
    finished(fbb, root)
}

fn void_response(reply: VoidReply) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let error = reply.err().map(|e| fbb.create_string(&e));
    let root = messages::VoidResponse::create(&mut fbb, &messages::VoidResponseArgs { error });
    finished(fbb, root)
}

fn state_error(message: &str) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();
    let error = fbb.create_string(message);
    let root = messages::TakeStateResponse::create(
        &mut fbb,
        &messages::TakeStateResponseArgs {
            error: Some(error),
            ..Default::default()
        },
    );
    finished(fbb, root)
}

// ---------------------------------------------------------------------------
// Engine model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct StateDoc {
    #[serde(default)]
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureDoc {
    name: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    project: Option<String>,
    #[serde(default, rename = "type")]
    feature_type: Option<String>,
    #[serde(default)]
    impression_data: bool,
    #[serde(default)]
    strategies: Vec<StrategyDoc>,
    #[serde(default)]
    variants: Vec<VariantDoc>,
}

#[derive(Debug, Clone, Deserialize)]
struct StrategyDoc {
    name: String,
    #[serde(default)]
    parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct VariantDoc {
    name: String,
    #[serde(default)]
    payload: Option<PayloadDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PayloadDoc {
    #[serde(rename = "type")]
    payload_type: String,
    value: String,
}

type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
struct Series {
    value: f64,
    count: u64,
    sum: f64,
    buckets: Vec<u64>,
}

#[derive(Debug, Clone)]
struct Metric {
    help: String,
    kind: MetricType,
    bounds: Vec<f64>,
    series: BTreeMap<Labels, Series>,
}

impl Metric {
    fn new(help: &str, kind: MetricType, mut bounds: Vec<f64>) -> Self {
        if kind == MetricType::Histogram {
            bounds.retain(|b| b.is_finite());
            bounds.push(f64::INFINITY);
        }
        Self {
            help: help.to_string(),
            kind,
            bounds,
            series: BTreeMap::new(),
        }
    }

    fn series(&mut self, labels: Labels) -> &mut Series {
        let width = self.bounds.len();
        self.series.entry(labels).or_insert_with(|| Series {
            buckets: vec![0; width],
            ..Series::default()
        })
    }

    fn observe(&mut self, labels: Labels, value: f64) {
        let bounds = self.bounds.clone();
        let series = self.series(labels);
        series.count += 1;
        series.sum += value;
        for (bound, count) in bounds.iter().zip(series.buckets.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
    }

    fn drain(&mut self, name: &str) -> Option<ImpactMetric> {
        if self.series.is_empty() {
            return None;
        }
        let bounds = self.bounds.clone();
        let kind = self.kind;
        let samples = std::mem::take(&mut self.series)
            .into_iter()
            .map(|(labels, series)| match kind {
                MetricType::Histogram => MetricSample {
                    labels,
                    count: Some(series.count),
                    sum: Some(series.sum),
                    buckets: Some(
                        bounds
                            .iter()
                            .zip(series.buckets)
                            .map(|(le, count)| HistogramBucket { le: *le, count })
                            .collect(),
                    ),
                    ..MetricSample::default()
                },
                _ => MetricSample {
                    labels,
                    value: Some(series.value),
                    ..MetricSample::default()
                },
            })
            .collect();
        Some(ImpactMetric {
            name: name.to_string(),
            help: self.help.clone(),
            metric_type: kind,
            samples,
        })
    }

    fn restore(&mut self, samples: Vec<MetricSample>) {
        for sample in samples {
            match self.kind {
                MetricType::Counter => {
                    self.series(sample.labels).value += sample.value.unwrap_or_default();
                }
                MetricType::Gauge => {
                    self.series(sample.labels).value = sample.value.unwrap_or_default();
                }
                MetricType::Histogram => {
                    let series = self.series(sample.labels);
                    series.count += sample.count.unwrap_or_default();
                    series.sum += sample.sum.unwrap_or_default();
                    for (slot, bucket) in series
                        .buckets
                        .iter_mut()
                        .zip(sample.buckets.unwrap_or_default())
                    {
                        *slot += bucket.count;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct FakeEngine {
    state: Option<Value>,
    features: Vec<FeatureDoc>,
    counts: BTreeMap<String, (i64, i64, BTreeMap<String, i64>)>,
    window_start: i64,
    metrics: BTreeMap<String, Metric>,
}

fn labels_of(labels: Option<TableVector<'_, messages::MetricLabel<'_>>>) -> Labels {
    LAST_LABELS_PRESENT.with(|c| c.set(Some(labels.is_some())));
    labels
        .into_iter()
        .flatten()
        .map(|l| (l.key().to_string(), l.value().unwrap_or_default().to_string()))
        .collect()
}

impl FakeEngine {
    fn feature(&self, name: &str) -> Option<FeatureDoc> {
        self.features.iter().find(|f| f.name == name).cloned()
    }

    fn take_state(&mut self, text: &str) -> Vec<u8> {
        let parsed = serde_json::from_str::<Value>(text).and_then(|value| {
            let doc = serde_json::from_value::<StateDoc>(value.clone())?;
            Ok((value, doc))
        });
        let (value, doc) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return state_error(&format!("Failed to parse state: {e}")),
        };

        let mut warnings = Vec::new();
        if value.get("version").is_none() {
            warnings.push("state document has no version");
        }
        self.state = Some(value);
        self.features = doc.features;

        let mut fbb = FlatBufferBuilder::new();
        let mut features = Vec::new();
        for feature in &self.features {
            let mut strategies = Vec::new();
            for strategy in &feature.strategies {
                let mut parameters = Vec::new();
                for (key, value) in &strategy.parameters {
                    let key = fbb.create_string(key);
                    let value = fbb.create_string(value);
                    parameters.push(messages::StrategyParameter::create(
                        &mut fbb,
                        &messages::StrategyParameterArgs {
                            key: Some(key),
                            value: Some(value),
                        },
                    ));
                }
                let parameters = fbb.create_vector(&parameters);
                let name = fbb.create_string(&strategy.name);
                strategies.push(messages::StrategyDefinition::create(
                    &mut fbb,
                    &messages::StrategyDefinitionArgs {
                        name: Some(name),
                        parameters: Some(parameters),
                    },
                ));
            }
            let strategies = fbb.create_vector(&strategies);
            let feature_name = fbb.create_string(&feature.name);
            features.push(messages::StrategyFeature::create(
                &mut fbb,
                &messages::StrategyFeatureArgs {
                    feature_name: Some(feature_name),
                    strategies: Some(strategies),
                },
            ));
        }
        let features = fbb.create_vector(&features);
        let warnings: Vec<_> = warnings.into_iter().map(|w| fbb.create_string(w)).collect();
        let warnings = fbb.create_vector(&warnings);
        let root = messages::TakeStateResponse::create(
            &mut fbb,
            &messages::TakeStateResponseArgs {
                features: Some(features),
                warnings: Some(warnings),
                error: None,
            },
        );
        finished(fbb, root)
    }

    fn evaluate(feature: &FeatureDoc, ctx: messages::ContextMessage<'_>) -> bool {
        if !feature.enabled {
            return false;
        }
        if feature.strategies.is_empty() {
            return true;
        }

        let listed = |param: Option<&String>, value: Option<&str>| match (param, value) {
            (Some(list), Some(value)) => list.split(',').any(|item| item.trim() == value),
            _ => false,
        };

        let mut custom_index = 0;
        let mut enabled = false;
        for strategy in &feature.strategies {
            let result = match strategy.name.as_str() {
                "default" => true,
                "userWithId" => listed(strategy.parameters.get("userIds"), ctx.user_id()),
                "applicationHostname" => {
                    listed(strategy.parameters.get("hostNames"), ctx.runtime_hostname())
                }
                name if BUILT_IN.contains(&name) => false,
                _ => {
                    custom_index += 1;
                    let key = format!("customStrategy{custom_index}");
                    ctx.custom_strategies_results()
                        .into_iter()
                        .flatten()
                        .any(|r| r.key() == key && r.value())
                }
            };
            enabled |= result;
        }
        enabled
    }

    fn count(&mut self, toggle: &str, enabled: Option<bool>, variant: Option<&str>) {
        let entry = self.counts.entry(toggle.to_string()).or_default();
        match enabled {
            Some(true) => entry.0 += 1,
            Some(false) => entry.1 += 1,
            None => {}
        }
        if let Some(variant) = variant {
            *entry.2.entry(variant.to_string()).or_default() += 1;
        }
    }

    fn check_enabled(&mut self, ctx: messages::ContextMessage<'_>) -> Vec<u8> {
        LAST_CURRENT_TIME.with(|t| *t.borrow_mut() = ctx.current_time().map(str::to_string));
        let Some(name) = ctx.toggle_name() else {
            return enabled_response(None, false, Some("Missing toggle name"));
        };
        let Some(feature) = self.feature(name) else {
            return enabled_response(None, false, None);
        };
        let enabled = Self::evaluate(&feature, ctx);
        self.count(name, Some(enabled), None);
        enabled_response(Some(enabled), feature.impression_data, None)
    }

    fn check_variant(&mut self, ctx: messages::ContextMessage<'_>) -> Vec<u8> {
        let Some(name) = ctx.toggle_name() else {
            return variant_response(&VariantReply {
                error: Some("Missing toggle name".into()),
                ..Default::default()
            });
        };
        let Some(feature) = self.feature(name) else {
            return variant_response(&VariantReply::default());
        };
        let enabled = Self::evaluate(&feature, ctx);
        let chosen = if enabled { feature.variants.first() } else { None };

        let reply = match chosen {
            Some(variant) => VariantReply {
                name: Some(variant.name.clone()),
                payload: variant.payload.clone(),
                enabled: true,
                feature_enabled: true,
                impression_data: feature.impression_data,
                error: None,
            },
            None => VariantReply {
                name: Some("disabled".into()),
                payload: None,
                enabled: false,
                feature_enabled: enabled,
                impression_data: feature.impression_data,
                error: None,
            },
        };
        self.count(name, None, reply.name.as_deref());
        variant_response(&reply)
    }

    fn define(&mut self, name: &str, help: &str, kind: MetricType, bounds: Vec<f64>) -> VoidReply {
        if name.is_empty() {
            return Err("Metric name must not be empty".into());
        }
        if let Some(existing) = self.metrics.get(name) {
            if existing.kind != kind {
                return Err(format!("Metric {name} is already defined as {:?}", existing.kind));
            }
            return Ok(());
        }
        self.metrics
            .insert(name.to_string(), Metric::new(help, kind, bounds));
        Ok(())
    }

    fn metric(&mut self, name: &str, kind: MetricType) -> Result<&mut Metric, String> {
        match self.metrics.get_mut(name) {
            Some(metric) if metric.kind == kind => Ok(metric),
            _ => Err(format!("{kind:?} {name} is not defined")),
        }
    }

    fn inc_counter(&mut self, msg: messages::IncCounter<'_>) -> VoidReply {
        let labels = labels_of(msg.labels());
        let metric = self.metric(msg.name().unwrap_or_default(), MetricType::Counter)?;
        metric.series(labels).value += msg.value() as f64;
        Ok(())
    }

    fn set_gauge(&mut self, msg: messages::SetGauge<'_>) -> VoidReply {
        let labels = labels_of(msg.labels());
        let metric = self.metric(msg.name().unwrap_or_default(), MetricType::Gauge)?;
        metric.series(labels).value = msg.value();
        Ok(())
    }

    fn observe_histogram(&mut self, msg: messages::ObserveHistogram<'_>) -> VoidReply {
        let labels = labels_of(msg.labels());
        let metric = self.metric(msg.name().unwrap_or_default(), MetricType::Histogram)?;
        metric.observe(labels, msg.value());
        Ok(())
    }

    fn collect(&mut self) -> Vec<ImpactMetric> {
        self.metrics
            .iter_mut()
            .filter_map(|(name, metric)| metric.drain(name))
            .collect()
    }

    fn restore(&mut self, snapshot: Vec<ImpactMetric>) {
        for metric in snapshot {
            let bounds: Vec<f64> = metric
                .samples
                .iter()
                .find_map(|s| s.buckets.as_ref())
                .map(|b| b.iter().map(|b| b.le).collect())
                .unwrap_or_default();
            self.metrics
                .entry(metric.name.clone())
                .or_insert_with(|| Metric::new(&metric.help, metric.metric_type, bounds))
                .restore(metric.samples);
        }
    }

    fn take_metrics(&mut self) -> Vec<u8> {
        let stop = now_millis();
        let start = std::mem::replace(&mut self.window_start, stop);

        let mut fbb = FlatBufferBuilder::new();
        let mut toggles = Vec::new();
        for (key, (yes, no, variants)) in std::mem::take(&mut self.counts) {
            let mut entries = Vec::new();
            for (name, count) in variants {
                let key = fbb.create_string(&name);
                entries.push(messages::VariantEntry::create(
                    &mut fbb,
                    &messages::VariantEntryArgs {
                        key,
                        value: count as u32,
                    },
                ));
            }
            let variants = fbb.create_vector(&entries);
            let stats = messages::ToggleStats::create(
                &mut fbb,
                &messages::ToggleStatsArgs {
                    yes: yes as u32,
                    no: no as u32,
                    variants: Some(variants),
                },
            );
            let key = fbb.create_string(&key);
            toggles.push(messages::ToggleEntry::create(
                &mut fbb,
                &messages::ToggleEntryArgs {
                    key,
                    value: Some(stats),
                },
            ));
        }
        let toggles = fbb.create_vector(&toggles);
        let root = messages::MetricsResponse::create(
            &mut fbb,
            &messages::MetricsResponseArgs {
                start,
                stop,
                toggles: Some(toggles),
            },
        );
        finished(fbb, root)
    }

    fn known_toggles(&self) -> Vec<u8> {
        let mut fbb = FlatBufferBuilder::new();
        let mut items = Vec::new();
        for feature in &self.features {
            let name = fbb.create_string(&feature.name);
            let project = fbb.create_string(feature.project.as_deref().unwrap_or("default"));
            let type_ = feature.feature_type.as_deref().map(|t| fbb.create_string(t));
            items.push(messages::FeatureDef::create(
                &mut fbb,
                &messages::FeatureDefArgs {
                    name: Some(name),
                    project: Some(project),
                    enabled: feature.enabled,
                    type_,
                },
            ));
        }
        let items = fbb.create_vector(&items);
        let root = messages::FeatureDefs::create(
            &mut fbb,
            &messages::FeatureDefsArgs { items: Some(items) },
        );
        finished(fbb, root)
    }
}

// ---------------------------------------------------------------------------
// Exported ABI
// ---------------------------------------------------------------------------

fn with_engine<R>(engine: *mut c_void, f: impl FnOnce(&mut FakeEngine) -> R) -> R {
    assert!(!engine.is_null(), "engine pointer must not be null");
    // SAFETY: every engine pointer comes from `new_engine` and is only freed
    // by `free_engine`.
    let engine = unsafe { &*(engine as *const Mutex<FakeEngine>) };
    let mut guard = engine.lock().unwrap();
    f(&mut guard)
}

/// Verify the lent request bytes as a `T` root, the way the engine does.
fn request<'a, T: Follow<'a> + Verifiable + 'a>(
    msg: *const u8,
    len: size_t,
) -> Result<T::Inner, String> {
    if msg.is_null() || len == 0 {
        return Err("Empty request".into());
    }
    // SAFETY: the caller lends `len` bytes for the duration of the call.
    let bytes = unsafe { std::slice::from_raw_parts(msg, len) };
    flatbuffers::root::<T>(bytes).map_err(|e| format!("Invalid request: {e}"))
}

fn c_text(text: *const c_char) -> String {
    // SAFETY: callers pass NUL-terminated strings valid for the call.
    unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}

extern "C" fn new_engine() -> *mut c_void {
    bump(&ENGINES_CREATED);
    let engine = FakeEngine {
        window_start: now_millis(),
        ..FakeEngine::default()
    };
    Box::into_raw(Box::new(Mutex::new(engine))).cast()
}

extern "C" fn free_engine(engine: *mut c_void) {
    if engine.is_null() {
        return;
    }
    bump(&ENGINES_FREED);
    // SAFETY: created by `new_engine`, freed once.
    drop(unsafe { Box::from_raw(engine.cast::<Mutex<FakeEngine>>()) });
}

extern "C" fn get_state(engine: *mut c_void) -> *mut c_char {
    let state = with_engine(engine, |e| {
        e.state
            .clone()
            .unwrap_or_else(|| json!({"version": 1, "features": []}))
    });
    respond_json(ok(state))
}

extern "C" fn take_state(engine: *mut c_void, json: *const c_char) -> Buf {
    let text = c_text(json);
    respond_bytes(with_engine(engine, |e| e.take_state(&text)))
}

extern "C" fn check_enabled(engine: *mut c_void, msg: *const u8, len: size_t) -> Buf {
    let response = match request::<messages::ContextMessage>(msg, len) {
        Ok(ctx) => with_engine(engine, |e| e.check_enabled(ctx)),
        Err(e) => enabled_response(None, false, Some(&e)),
    };
    respond_bytes(response)
}

extern "C" fn check_variant(engine: *mut c_void, msg: *const u8, len: size_t) -> Buf {
    let response = match request::<messages::ContextMessage>(msg, len) {
        Ok(ctx) => with_engine(engine, |e| e.check_variant(ctx)),
        Err(error) => variant_response(&VariantReply {
            error: Some(error),
            ..Default::default()
        }),
    };
    respond_bytes(response)
}

macro_rules! void_call {
    ($name:ident, $msg:ty, |$engine:ident, $m:ident| $body:expr) => {
        extern "C" fn $name(engine: *mut c_void, msg: *const u8, len: size_t) -> Buf {
            let reply = match request::<$msg>(msg, len) {
                Ok($m) => with_engine(engine, |$engine| $body),
                Err(e) => Err(e),
            };
            respond_bytes(void_response(reply))
        }
    };
}

void_call!(define_counter, messages::DefineCounter, |e, m| e.define(
    m.name().unwrap_or_default(),
    m.help().unwrap_or_default(),
    MetricType::Counter,
    Vec::new()
));
void_call!(inc_counter, messages::IncCounter, |e, m| e.inc_counter(m));
void_call!(define_gauge, messages::DefineGauge, |e, m| e.define(
    m.name().unwrap_or_default(),
    m.help().unwrap_or_default(),
    MetricType::Gauge,
    Vec::new()
));
void_call!(set_gauge, messages::SetGauge, |e, m| e.set_gauge(m));
void_call!(define_histogram, messages::DefineHistogram, |e, m| e.define(
    m.name().unwrap_or_default(),
    m.help().unwrap_or_default(),
    MetricType::Histogram,
    m.buckets()
        .map(|b| b.iter().collect())
        .unwrap_or_else(|| DEFAULT_BUCKETS.to_vec())
));
void_call!(observe_histogram, messages::ObserveHistogram, |e, m| e
    .observe_histogram(m));

extern "C" fn list_known_toggles(engine: *mut c_void) -> Buf {
    respond_bytes(with_engine(engine, |e| e.known_toggles()))
}

extern "C" fn built_in_strategies() -> Buf {
    let mut fbb = FlatBufferBuilder::new();
    let values: Vec<_> = BUILT_IN.iter().map(|s| fbb.create_string(s)).collect();
    let values = fbb.create_vector(&values);
    let root = messages::BuiltInStrategies::create(
        &mut fbb,
        &messages::BuiltInStrategiesArgs {
            values: Some(values),
        },
    );
    respond_bytes(finished(fbb, root))
}

extern "C" fn get_metrics(engine: *mut c_void) -> Buf {
    respond_bytes(with_engine(engine, |e| e.take_metrics()))
}

extern "C" fn collect_impact_metrics(engine: *mut c_void) -> *mut c_char {
    let metrics = with_engine(engine, |e| e.collect());
    match serde_json::to_value(metrics) {
        Ok(value) => respond_json(ok(value)),
        Err(e) => respond_json(error(e.to_string())),
    }
}

extern "C" fn restore_impact_metrics(engine: *mut c_void, json: *const c_char) -> *mut c_char {
    let text = c_text(json);
    match serde_json::from_str::<Vec<ImpactMetric>>(&text) {
        Ok(snapshot) => {
            with_engine(engine, |e| e.restore(snapshot));
            respond_json(ok(Value::Null))
        }
        Err(e) => respond_json(error(format!("Failed to parse impact metrics: {e}"))),
    }
}

extern "C" fn free_response(text: *mut c_char) {
    if text.is_null() {
        return;
    }
    bump(&STRINGS_FREED);
    // SAFETY: produced by `CString::into_raw` in `respond_text`.
    drop(unsafe { CString::from_raw(text) });
}

extern "C" fn free_buffer(buf: Buf) {
    bump(&BUFFERS_FREED);
    // SAFETY: produced by `Buf::from_vec` in `respond_bytes`.
    drop(unsafe { buf.into_vec() });
}

extern "C" fn core_version() -> *const c_char {
    b"fake-0.1.0\0".as_ptr().cast()
}

// Misbehaving entry points for protocol tests.

pub extern "C" fn garbage_message(_: *mut c_void, _: *const u8, _: size_t) -> Buf {
    respond_bytes(vec![0xff, 0xff, 0xff])
}

pub extern "C" fn null_message(_: *mut c_void, _: *const u8, _: size_t) -> Buf {
    Buf::empty()
}

pub extern "C" fn null_engine() -> *mut c_void {
    ptr::null_mut()
}

pub extern "C" fn garbage_json(_: *mut c_void) -> *mut c_char {
    respond_text("{not an envelope".to_string())
}

pub extern "C" fn null_json(_: *mut c_void) -> *mut c_char {
    ptr::null_mut()
}

pub extern "C" fn garbage_take_state(_: *mut c_void, _: *const c_char) -> Buf {
    respond_bytes(vec![0xff, 0xff, 0xff])
}

pub extern "C" fn garbage_built_ins() -> Buf {
    respond_bytes(vec![0xff, 0xff, 0xff])
}

// ---------------------------------------------------------------------------
// Helpers for tests
// ---------------------------------------------------------------------------

pub fn symbols() -> EngineSymbols {
    EngineSymbols {
        new_engine,
        free_engine,
        get_state,
        take_state,
        check_enabled,
        check_variant,
        define_counter,
        inc_counter,
        define_gauge,
        set_gauge,
        define_histogram,
        observe_histogram,
        list_known_toggles,
        built_in_strategies,
        get_metrics,
        collect_impact_metrics,
        restore_impact_metrics,
        free_response,
        free_buffer,
        core_version: Some(core_version),
    }
}

pub fn api() -> Arc<NativeApi> {
    Arc::new(NativeApi::from_symbols(symbols()))
}

pub fn engine() -> Engine {
    engine_with(Vec::new())
}

pub fn engine_with(strategies: Vec<Arc<dyn Strategy>>) -> Engine {
    Engine::new(api(), strategies).unwrap()
}

/// An engine with [`STATE`] loaded.
pub fn loaded_engine(strategies: Vec<Arc<dyn Strategy>>) -> Engine {
    let engine = engine_with(strategies);
    engine.load_state(STATE).unwrap();
    engine
}

pub fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
