//! Workflow kind → strategy lookup.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::WorkflowKind;
use crate::strategy::Strategy;

/// Registry of progress strategies, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<WorkflowKind, Strategy>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding a strategy for every known workflow kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in WorkflowKind::ALL {
            registry.register(Strategy::for_kind(kind));
        }
        registry
    }

    /// Registers `strategy` under its own kind, replacing any previous one.
    pub fn register(&mut self, strategy: Strategy) {
        debug!(kind = %strategy.kind(), "Registering progress strategy");
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn get(&self, kind: WorkflowKind) -> Option<&Strategy> {
        self.strategies.get(&kind)
    }

    /// Every registered strategy, in kind order.
    pub fn all(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
