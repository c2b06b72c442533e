//! Name-to-factory registry.

use super::tasks::{
    AntFourRoomsLayout, BallInCupLayout, DrawbridgeLayout, PendulumLayout, PlatformsLayout,
    Tennis2DLayout, Ur5ReacherLayout,
};
use super::{BoxSubtaskSpecFactory, DictSubtaskSpecFactory, SubtaskSpecFactory};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a factory.
pub type FactoryConstructor = fn() -> Arc<dyn SubtaskSpecFactory>;

/// Factories by the name used in `graph_params.json`.
#[derive(Clone)]
pub struct FactoryRegistry {
    constructors: BTreeMap<String, FactoryConstructor>,
}

impl FactoryRegistry {
    /// A registry without any factory.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry with every bundled factory.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("PendulumHACSubtaskSpecFactory", || {
            Arc::new(BoxSubtaskSpecFactory::new(PendulumLayout))
        });
        registry.register("UR5ReacherSubtaskSpecFactory", || {
            Arc::new(BoxSubtaskSpecFactory::new(Ur5ReacherLayout))
        });
        registry.register("AntFourRoomsSubtaskSpecFactory", || {
            Arc::new(BoxSubtaskSpecFactory::new(AntFourRoomsLayout))
        });
        registry.register("PlatformsSubtaskSpecFactory", || {
            Arc::new(DictSubtaskSpecFactory::new(PlatformsLayout::new()))
        });
        registry.register("PlatformsTimeSubtaskSpecFactory", || {
            Arc::new(DictSubtaskSpecFactory::new(PlatformsLayout::timed()))
        });
        registry.register("DrawbridgeSubtaskSpecFactory", || {
            Arc::new(DictSubtaskSpecFactory::new(DrawbridgeLayout))
        });
        registry.register("Tennis2DSubtaskSpecFactory", || {
            Arc::new(DictSubtaskSpecFactory::new(Tennis2DLayout))
        });
        registry.register("BallInCupSubtaskSpecFactory", || {
            Arc::new(BoxSubtaskSpecFactory::new(BallInCupLayout))
        });
        registry
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, constructor: FactoryConstructor) {
        let name = name.into();
        if self.constructors.insert(name.clone(), constructor).is_some() {
            log::debug!("Replaced subtask spec factory {}", name);
        }
    }

    /// Builds the factory registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SubtaskSpecFactory>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| Error::UnknownFactory(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names_match_factories() {
        let registry = FactoryRegistry::with_defaults();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names.len(), 8);
        for name in names {
            assert_eq!(registry.get(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_factory() {
        let registry = FactoryRegistry::with_defaults();
        assert!(matches!(
            registry.get("HumanoidSubtaskSpecFactory"),
            Err(Error::UnknownFactory(_))
        ));
        assert!(FactoryRegistry::empty().get("PendulumHACSubtaskSpecFactory").is_err());
    }

    #[test]
    fn test_register_custom_factory() {
        let mut registry = FactoryRegistry::empty();
        registry.register("MyPendulum", || {
            Arc::new(BoxSubtaskSpecFactory::new(PendulumLayout))
        });
        assert!(registry.contains("MyPendulum"));
        assert!(registry.get("MyPendulum").is_ok());
    }
}
