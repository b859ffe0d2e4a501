//! Engine - Host-Facing Binding to the Native Evaluation Engine
//!
//! [`Engine`] owns one native engine instance and the custom strategy
//! registry that belongs to it. Every call follows the same path:
//!
//! 1. check preconditions locally (empty names, NUL bytes, disposal)
//! 2. compute custom strategy results for the toggle being evaluated
//! 3. encode the request into a host-owned buffer and make the native call
//! 4. decode the native buffer and release it, whatever the outcome
//! 5. unwrap the response envelope into a value, `None` or an error
//!
//! # Concurrency:
//! The native handle and the registry sit behind one `RwLock`. Loading
//! state, registering strategies and disposing take the write lock; all
//! other calls share the read lock, so disposal waits for in-flight calls
//! and never frees the engine underneath one.
//!
//! Request encoding needs scratch space. [`Engine::worker`] hands out an
//! [`EngineWorker`] that keeps one buffer for all of its calls; the plain
//! `Engine` methods use a fresh buffer per call.

pub mod handle;

use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::IgnoredAny;
use tracing::{debug, info, warn};

use crate::codec::{self, Request};
use crate::config::BindingConfig;
use crate::context::{Context, Evaluated, Variant};
use crate::envelope::ResponseEnvelope;
use crate::error::{require_name, Result, YggError};
use crate::ffi::{MessageCall, NativeApi, RequestBuffer};
use crate::metrics::{FeatureDefinition, ImpactMetric, MetricsBucket};
use crate::strategy::{Strategy, StrategyRegistry};

pub use handle::EngineHandle;

struct EngineState {
    handle: Option<EngineHandle>,
    registry: StrategyRegistry,
}

impl EngineState {
    fn handle(&self) -> Result<&EngineHandle> {
        self.handle.as_ref().ok_or(YggError::Disposed)
    }
}

/// A feature-flag engine instance.
pub struct Engine {
    api: Arc<NativeApi>,
    runtime_hostname: Option<String>,
    state: RwLock<EngineState>,
}

impl Engine {
    /// Create an engine with default configuration.
    pub fn new(api: Arc<NativeApi>, strategies: Vec<Arc<dyn Strategy>>) -> Result<Self> {
        Self::with_config(api, &BindingConfig::default(), strategies)
    }

    /// Create an engine on an already loaded native API.
    pub fn with_config(
        api: Arc<NativeApi>,
        config: &BindingConfig,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Result<Self> {
        let handle = EngineHandle::create(Arc::clone(&api))?;
        let built_in = {
            let response = api.built_in_strategies();
            codec::decode_built_in_strategies(response.bytes())?
        };

        let mut registry = StrategyRegistry::new(built_in);
        if !strategies.is_empty() {
            registry.register(strategies);
        }

        info!(
            built_in_strategies = registry.built_in().len(),
            runtime_hostname = config.runtime_hostname.as_deref().unwrap_or("-"),
            "Engine created"
        );

        Ok(Self {
            api,
            runtime_hostname: config.runtime_hostname.clone(),
            state: RwLock::new(EngineState {
                handle: Some(handle),
                registry,
            }),
        })
    }

    /// Locate and load the native library, then create an engine on it.
    pub fn open(config: &BindingConfig, strategies: Vec<Arc<dyn Strategy>>) -> Result<Self> {
        let api = Arc::new(NativeApi::open(config)?);
        Self::with_config(api, config, strategies)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn api(&self) -> &NativeApi {
        &self.api
    }

    /// A worker that reuses one request buffer across calls.
    pub fn worker(&self) -> EngineWorker<'_> {
        EngineWorker {
            engine: self,
            request: RequestBuffer::default(),
        }
    }

    /// Free the native engine. Later calls fail with
    /// [`YggError::Disposed`]; disposing again does nothing.
    pub fn dispose(&self) {
        let mut state = self.write_state();
        if state.handle.take().is_some() {
            info!("Engine disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.read_state().handle.is_none()
    }

    /// Replace the engine state with a JSON toggle document.
    pub fn load_state(&self, json: &str) -> Result<()> {
        if json.trim().is_empty() {
            return Err(YggError::invalid("state document must not be empty"));
        }
        let json = CString::new(json)
            .map_err(|_| YggError::invalid("state document contains a NUL byte"))?;

        let mut guard = self.write_state();
        let state = &mut *guard;
        let handle = state.handle()?;
        let update = {
            let response = handle.take_state(&json);
            codec::decode_take_state(response.bytes())?.into_value()?
        };

        for warning in &update.warnings {
            warn!(warning = %warning, "Engine reported a problem with the state document");
        }
        let features = update.features.len();
        state.registry.load(update.features);

        info!(
            features,
            custom_mapped = state.registry.mapped_feature_count(),
            warnings = update.warnings.len(),
            "State loaded"
        );
        Ok(())
    }

    /// The engine's current state as JSON.
    pub fn get_state(&self) -> Result<serde_json::Value> {
        let state = self.read_state();
        let handle = state.handle()?;
        let response = handle.get_state();
        let envelope = ResponseEnvelope::<serde_json::Value>::from_json(response.to_str()?)?;
        envelope.into_value()
    }

    /// `Some(enabled)` for a known toggle, `None` for an unknown one.
    pub fn is_enabled(&self, toggle: &str, context: &Context) -> Result<Option<bool>> {
        self.worker().is_enabled(toggle, context)
    }

    /// Like [`Engine::is_enabled`], with the toggle's impression-data flag.
    pub fn check_enabled(&self, toggle: &str, context: &Context) -> Result<Option<Evaluated<bool>>> {
        self.worker().check_enabled(toggle, context)
    }

    /// The variant for a known toggle, `None` for an unknown one.
    pub fn get_variant(&self, toggle: &str, context: &Context) -> Result<Option<Variant>> {
        self.worker().get_variant(toggle, context)
    }

    pub fn check_variant(
        &self,
        toggle: &str,
        context: &Context,
    ) -> Result<Option<Evaluated<Variant>>> {
        self.worker().check_variant(toggle, context)
    }

    pub fn define_counter(&self, name: &str, help: &str) -> Result<()> {
        self.worker().define_counter(name, help)
    }

    pub fn inc_counter(
        &self,
        name: &str,
        value: i64,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        self.worker().inc_counter(name, value, labels)
    }

    pub fn define_gauge(&self, name: &str, help: &str) -> Result<()> {
        self.worker().define_gauge(name, help)
    }

    pub fn set_gauge(
        &self,
        name: &str,
        value: f64,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        self.worker().set_gauge(name, value, labels)
    }

    pub fn define_histogram(&self, name: &str, help: &str, buckets: Option<&[f64]>) -> Result<()> {
        self.worker().define_histogram(name, help, buckets)
    }

    pub fn observe_histogram(
        &self,
        name: &str,
        value: f64,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        self.worker().observe_histogram(name, value, labels)
    }

    /// Evaluation counts since the last call, or `None` if nothing was
    /// evaluated. Reading resets the engine's counters.
    pub fn get_metrics(&self) -> Result<Option<MetricsBucket>> {
        let state = self.read_state();
        let handle = state.handle()?;
        let response = handle.get_metrics();
        let bucket = codec::decode_metrics(response.bytes())?;
        Ok(bucket)
    }

    pub fn list_known_toggles(&self) -> Result<Vec<FeatureDefinition>> {
        let state = self.read_state();
        let handle = state.handle()?;
        let response = handle.list_known_toggles();
        let toggles = codec::decode_feature_defs(response.bytes())?;
        Ok(toggles)
    }

    /// Take every impact metric recorded since the last collect or restore.
    pub fn collect_impact_metrics(&self) -> Result<Vec<ImpactMetric>> {
        let state = self.read_state();
        let handle = state.handle()?;
        let response = handle.collect_impact_metrics();
        let envelope = ResponseEnvelope::<Vec<ImpactMetric>>::from_json(response.to_str()?)?;
        let metrics = envelope.into_result()?.unwrap_or_default();
        debug!(metrics = metrics.len(), "Collected impact metrics");
        Ok(metrics)
    }

    /// Put a collected snapshot back, for example after a failed upload.
    pub fn restore_impact_metrics(&self, metrics: &[ImpactMetric]) -> Result<()> {
        let json = CString::new(serde_json::to_string(metrics)?)
            .map_err(|_| YggError::invalid("impact metrics contain a NUL byte"))?;

        let state = self.read_state();
        let handle = state.handle()?;
        let response = handle.restore_impact_metrics(&json);
        let envelope = ResponseEnvelope::<IgnoredAny>::from_json(response.to_str()?)?;
        envelope.into_unit()
    }

    /// Register custom strategy implementations and remap the loaded state.
    pub fn register_custom_strategies(&self, strategies: Vec<Arc<dyn Strategy>>) -> Result<()> {
        let mut state = self.write_state();
        state.handle()?;
        state.registry.register(strategies);
        Ok(())
    }

    /// Evaluate custom strategies that have no registered implementation
    /// with `fallback`. `None` restores the default of leaving them out.
    pub fn set_fallback_strategy(&self, fallback: Option<Arc<dyn Strategy>>) -> Result<()> {
        let mut state = self.write_state();
        state.handle()?;
        state.registry.set_fallback(fallback);
        Ok(())
    }

    /// Names of the strategies the native engine evaluates itself.
    pub fn built_in_strategies(&self) -> Result<Vec<String>> {
        let state = self.read_state();
        state.handle()?;
        Ok(state.registry.built_in())
    }

    /// Version of the native core, if the library reports one.
    ///
    /// Fails with [`YggError::Disposed`] once the engine is gone. The
    /// library-level query without an engine is [`NativeApi::core_version`].
    pub fn core_version(&self) -> Result<Option<String>> {
        self.read_state().handle()?;
        Ok(self.api.core_version())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.handle.take().is_some() {
            debug!("Engine dropped without dispose, freeing native engine");
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("api", &self.api)
            .field("runtime_hostname", &self.runtime_hostname)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Makes engine calls through one reusable request buffer.
pub struct EngineWorker<'e> {
    engine: &'e Engine,
    request: RequestBuffer,
}

impl<'e> EngineWorker<'e> {
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn is_enabled(&mut self, toggle: &str, context: &Context) -> Result<Option<bool>> {
        Ok(self.check_enabled(toggle, context)?.map(|e| e.value))
    }

    pub fn check_enabled(
        &mut self,
        toggle: &str,
        context: &Context,
    ) -> Result<Option<Evaluated<bool>>> {
        self.evaluate(MessageCall::CheckEnabled, toggle, context, codec::decode_enabled)
    }

    pub fn get_variant(&mut self, toggle: &str, context: &Context) -> Result<Option<Variant>> {
        Ok(self.check_variant(toggle, context)?.map(|e| e.value))
    }

    pub fn check_variant(
        &mut self,
        toggle: &str,
        context: &Context,
    ) -> Result<Option<Evaluated<Variant>>> {
        self.evaluate(MessageCall::CheckVariant, toggle, context, codec::decode_variant)
    }

    pub fn define_counter(&mut self, name: &str, help: &str) -> Result<()> {
        require_name("metric", name)?;
        self.send_void(MessageCall::DefineCounter, &codec::define_counter(name, help))
    }

    pub fn inc_counter(
        &mut self,
        name: &str,
        value: i64,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        require_name("metric", name)?;
        self.send_void(MessageCall::IncCounter, &codec::inc_counter(name, value, labels))
    }

    pub fn define_gauge(&mut self, name: &str, help: &str) -> Result<()> {
        require_name("metric", name)?;
        self.send_void(MessageCall::DefineGauge, &codec::define_gauge(name, help))
    }

    pub fn set_gauge(
        &mut self,
        name: &str,
        value: f64,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        require_name("metric", name)?;
        self.send_void(MessageCall::SetGauge, &codec::set_gauge(name, value, labels))
    }

    pub fn define_histogram(
        &mut self,
        name: &str,
        help: &str,
        buckets: Option<&[f64]>,
    ) -> Result<()> {
        require_name("metric", name)?;
        self.send_void(
            MessageCall::DefineHistogram,
            &codec::define_histogram(name, help, buckets),
        )
    }

    pub fn observe_histogram(
        &mut self,
        name: &str,
        value: f64,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        require_name("metric", name)?;
        self.send_void(
            MessageCall::ObserveHistogram,
            &codec::observe_histogram(name, value, labels),
        )
    }

    fn evaluate<T>(
        &mut self,
        call: MessageCall,
        toggle: &str,
        context: &Context,
        decode: fn(&[u8]) -> Result<ResponseEnvelope<T>>,
    ) -> Result<Option<T>> {
        require_name("toggle", toggle)?;
        let engine = self.engine;
        let state = engine.read_state();
        let handle = state.handle()?;

        let custom_results = state.registry.evaluate(toggle, context);
        let message = codec::context_message(
            toggle,
            context,
            &custom_results,
            engine.runtime_hostname.as_deref(),
        );
        let response = handle.send(call, self.request.encode(&message)?);
        let envelope = decode(response.bytes())?;
        envelope.into_result()
    }

    fn send_void<R: Request>(&mut self, call: MessageCall, message: &R) -> Result<()> {
        let engine = self.engine;
        let state = engine.read_state();
        let handle = state.handle()?;
        let response = handle.send(call, self.request.encode(message)?);
        let envelope = codec::decode_void(response.bytes())?;
        envelope.into_unit()
    }
}

impl fmt::Debug for EngineWorker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineWorker")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
