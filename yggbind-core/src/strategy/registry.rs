use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use super::{Strategy, StrategyDefinition};
use crate::context::Context;

/// Result name → outcome, in the form sent to the engine.
pub type CustomResults = Cow<'static, BTreeMap<String, bool>>;

static NO_RESULTS: BTreeMap<String, bool> = BTreeMap::new();

/// The strategies one feature declares, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStrategies {
    pub feature: String,
    pub strategies: Vec<StrategyDefinition>,
}

/// One custom strategy use on a feature, bound to its implementation.
#[derive(Debug, Clone)]
pub struct MappedStrategy {
    index: usize,
    result_name: String,
    strategy: String,
    parameters: HashMap<String, String>,
    implementation: Weak<dyn Strategy>,
}

impl MappedStrategy {
    /// 1-based position among the feature's custom strategies.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Key the engine looks the outcome up under.
    pub fn result_name(&self) -> &str {
        &self.result_name
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// `None` if the implementation has been unregistered since mapping.
    pub fn evaluate(&self, context: &Context) -> Option<bool> {
        let implementation = self.implementation.upgrade()?;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            implementation.is_enabled(&self.parameters, context)
        }));
        match outcome {
            Ok(enabled) => Some(enabled),
            Err(_) => {
                warn!(
                    strategy = %self.strategy,
                    result = %self.result_name,
                    "Custom strategy panicked, treating it as disabled"
                );
                Some(false)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappedFeature {
    name: String,
    custom_strategies: Vec<MappedStrategy>,
}

impl MappedFeature {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn custom_strategies(&self) -> &[MappedStrategy] {
        &self.custom_strategies
    }

    fn evaluate(&self, context: &Context) -> BTreeMap<String, bool> {
        self.custom_strategies
            .iter()
            .filter_map(|s| Some((s.result_name.clone(), s.evaluate(context)?)))
            .collect()
    }
}

/// Maps features to the custom strategies they declare and evaluates them.
///
/// A declared strategy is custom when the engine does not know its name.
/// Custom strategies are numbered per feature, counting every custom
/// declaration in order, and reported as `customStrategy{n}`. Declarations
/// without an implementation (and no fallback) are left out, so they
/// contribute no result.
pub struct StrategyRegistry {
    built_in: HashSet<String>,
    implementations: HashMap<String, Arc<dyn Strategy>>,
    fallback: Option<Arc<dyn Strategy>>,
    declared: Vec<FeatureStrategies>,
    mapped_features: HashMap<String, MappedFeature>,
}

impl StrategyRegistry {
    pub fn new(built_in: impl IntoIterator<Item = String>) -> Self {
        Self {
            built_in: built_in.into_iter().collect(),
            implementations: HashMap::new(),
            fallback: None,
            declared: Vec::new(),
            mapped_features: HashMap::new(),
        }
    }

    /// Add implementations, replacing any registered under the same name,
    /// and remap the current state.
    pub fn register(&mut self, strategies: impl IntoIterator<Item = Arc<dyn Strategy>>) {
        for strategy in strategies {
            let name = strategy.name().to_string();
            if self.built_in.contains(&name) {
                warn!(
                    strategy = %name,
                    "Strategy has the name of a built-in strategy and will never be called"
                );
            }
            debug!(strategy = %name, "Registered custom strategy");
            self.implementations.insert(name, strategy);
        }
        self.remap();
    }

    /// Evaluate custom strategies that have no implementation with
    /// `fallback` instead of leaving them out.
    pub fn set_fallback(&mut self, fallback: Option<Arc<dyn Strategy>>) {
        self.fallback = fallback;
        self.remap();
    }

    /// Replace the feature declarations, as after a state load.
    pub fn load(&mut self, features: Vec<FeatureStrategies>) {
        self.declared = features;
        self.remap();
    }

    /// Custom results for one evaluation of `feature`.
    pub fn evaluate(&self, feature: &str, context: &Context) -> CustomResults {
        match self.mapped_features.get(feature) {
            Some(mapped) => Cow::Owned(mapped.evaluate(context)),
            None => Cow::Borrowed(&NO_RESULTS),
        }
    }

    pub fn is_built_in(&self, name: &str) -> bool {
        self.built_in.contains(name)
    }

    /// Built-in strategy names, sorted.
    pub fn built_in(&self) -> Vec<String> {
        let mut names: Vec<String> = self.built_in.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn mapped_feature(&self, feature: &str) -> Option<&MappedFeature> {
        self.mapped_features.get(feature)
    }

    pub fn mapped_feature_count(&self) -> usize {
        self.mapped_features.len()
    }

    fn remap(&mut self) {
        let mapped: HashMap<String, MappedFeature> = self
            .declared
            .iter()
            .filter_map(|feature| self.map_feature(feature))
            .map(|mapped| (mapped.name.clone(), mapped))
            .collect();
        self.mapped_features = mapped;
    }

    fn map_feature(&self, feature: &FeatureStrategies) -> Option<MappedFeature> {
        let mut custom_strategies = Vec::new();
        let mut index = 0;

        for definition in &feature.strategies {
            if self.built_in.contains(&definition.name) {
                continue;
            }
            index += 1;

            let implementation = self
                .implementations
                .get(&definition.name)
                .or(self.fallback.as_ref());
            let Some(implementation) = implementation else {
                warn!(
                    feature = %feature.feature,
                    strategy = %definition.name,
                    "No implementation registered for custom strategy, ignoring it"
                );
                continue;
            };

            custom_strategies.push(MappedStrategy {
                index,
                result_name: format!("customStrategy{index}"),
                strategy: definition.name.clone(),
                parameters: definition.parameters.clone(),
                implementation: Arc::downgrade(implementation),
            });
        }

        if custom_strategies.is_empty() {
            return None;
        }
        Some(MappedFeature {
            name: feature.feature.clone(),
            custom_strategies,
        })
    }
}
