//! Ordered strategy registry.
//!
//! Registration order is significant: it is the row order of every payload
//! group in the report. Names are unique per run.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::StrategyConfig;
use crate::error::ConfigurationError;
use crate::strategy::Strategy;
use crate::types::StrategyName;

/// Registry of the strategies compared in a run.
/// Holds no per-payload state; strategies are shared immutably across pairs.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
    names: HashSet<StrategyName>,
}

impl StrategyRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from validated configuration entries.
    pub fn from_config(entries: &[StrategyConfig]) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry.kind.instantiate(entry.name.clone(), entry.level))?;
        }
        Ok(registry)
    }

    /// Register a strategy.
    /// Returns DuplicateStrategy if the name is already taken.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Result<(), ConfigurationError> {
        let name = strategy.name().clone();

        // Check for duplicate - fail fast
        if !self.names.insert(name.clone()) {
            return Err(ConfigurationError::DuplicateStrategy {
                name: name.to_string(),
            });
        }

        tracing::debug!(strategy = %name, position = self.strategies.len(), "Registered strategy");
        self.strategies.push(strategy);
        Ok(())
    }

    /// Registered strategies in registration order.
    pub fn list(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Strategy>> {
        self.strategies.iter().find(|s| s.name().as_str() == name)
    }

    /// Check if a strategy exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get the number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;
    use crate::types::CompressionLevel;

    fn make(kind: StrategyKind, name: &str) -> Arc<dyn Strategy> {
        kind.instantiate(StrategyName::new(name).unwrap(), CompressionLevel::DEFAULT)
    }

    #[test]
    fn test_register_and_list() {
        let mut registry = StrategyRegistry::new();
        registry.register(make(StrategyKind::Pako, "pako")).unwrap();
        registry.register(make(StrategyKind::Base64, "base64")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("pako"));
        assert!(!registry.contains("uzip"));
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = StrategyRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(make(StrategyKind::Uzip, name)).unwrap();
        }
        let names: Vec<_> = registry.list().iter().map(|s| s.name().as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = StrategyRegistry::new();
        registry.register(make(StrategyKind::Pako, "shared")).unwrap();
        let err = registry
            .register(make(StrategyKind::Fflate, "shared"))
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::DuplicateStrategy { ref name } if name == "shared"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_config_rejects_duplicates() {
        let entries = vec![
            StrategyConfig {
                kind: StrategyKind::Pako,
                name: StrategyName::new("pako").unwrap(),
                level: CompressionLevel::DEFAULT,
            },
            StrategyConfig {
                kind: StrategyKind::Pako,
                name: StrategyName::new("pako").unwrap(),
                level: CompressionLevel::new(9).unwrap(),
            },
        ];
        assert!(StrategyRegistry::from_config(&entries).is_err());
    }
}
