//! Custom Strategies - Host-Implemented Enablement Predicates
//!
//! The native engine evaluates its own built-in strategies. Anything else a
//! feature declares has to be evaluated here and the outcome sent along
//! with the evaluation request. A [`Strategy`] is one such predicate,
//! looked up by name; [`StrategyRegistry`] ties the predicates to the
//! features that declare them.

mod registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;

pub use registry::{
    CustomResults, FeatureStrategies, MappedFeature, MappedStrategy, StrategyRegistry,
};

/// A named predicate deciding whether a feature is enabled for a context.
///
/// `parameters` are the values configured for this use of the strategy on
/// the feature being evaluated; the same strategy may appear several times
/// on one feature with different parameters.
pub trait Strategy: Send + Sync {
    /// Name the strategy is declared under in the engine state.
    fn name(&self) -> &str;

    fn is_enabled(&self, parameters: &HashMap<String, String>, context: &Context) -> bool;
}

/// A strategy as declared on a feature in the engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyDefinition {
    pub name: String,
    pub parameters: HashMap<String, String>,
}

impl StrategyDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Adapts a closure into a [`Strategy`].
pub struct FnStrategy<F> {
    name: String,
    predicate: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&HashMap<String, String>, &Context) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    /// Wrap straight into the form the registry takes.
    pub fn shared(name: impl Into<String>, predicate: F) -> Arc<dyn Strategy>
    where
        F: 'static,
    {
        Arc::new(Self::new(name, predicate))
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&HashMap<String, String>, &Context) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, parameters: &HashMap<String, String>, context: &Context) -> bool {
        (self.predicate)(parameters, context)
    }
}

impl<F> fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy").field("name", &self.name).finish()
    }
}
