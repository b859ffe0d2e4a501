//! Yggbind Core - Rust Binding for the Yggdrasil Feature-Flag Engine
//!
//! Toggle evaluation runs in a native engine library reached through a C
//! ABI. This crate owns everything between application code and that ABI:
//! the engine's lifecycle, the binary message protocol, ownership of every
//! buffer that crosses the boundary, and custom strategies the engine
//! cannot run itself.
//!
//! # Layers, leaf-first:
//! - [`ffi`]: function-pointer table of the native API and buffer guards
//! - [`codec`]: FlatBuffers request and response tables
//! - [`envelope`]: Ok / Error / NotFound unwrapping
//! - [`strategy`]: host-implemented strategies and their mapping to toggles
//! - [`engine`]: the [`Engine`] applications talk to
//!
//! ```no_run
//! use yggbind_core::{BindingConfig, Context, Engine};
//!
//! # fn main() -> yggbind_core::Result<()> {
//! let engine = Engine::open(&BindingConfig::from_env(), Vec::new())?;
//! engine.load_state(r#"{"version": 1, "features": []}"#)?;
//! let enabled = engine.is_enabled("checkout", &Context::new().with_user_id("7"))?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod ffi;
pub mod metrics;
pub mod strategy;

pub use config::BindingConfig;
pub use context::{Context, Evaluated, Payload, Variant};
pub use engine::{Engine, EngineWorker};
pub use envelope::{ResponseEnvelope, StatusCode};
pub use error::{Result, YggError};
pub use ffi::{Buf, EngineSymbols, NativeApi};
pub use metrics::{
    FeatureCount, FeatureDefinition, HistogramBucket, ImpactMetric, MetricSample, MetricType,
    MetricsBucket,
};
pub use strategy::{FnStrategy, Strategy, StrategyDefinition};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that honours `RUST_LOG` (default
/// `info`). Does nothing if a subscriber is already installed.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        info!("Yggbind v{}", env!("CARGO_PKG_VERSION"));
    }
}
