//! Registry of native binding factories.
//!
//! Built at startup and passed to [`Board::from_registry`](crate::Board::from_registry).
//! No global state.

use crate::bindings::{simulation, sysfs};
use galileo_common::binding::{BindingError, BindingFactory, IoBinding};
use galileo_common::config::BoardConfig;
use std::collections::HashMap;

pub struct BindingRegistry {
    factories: HashMap<&'static str, BindingFactory>,
}

impl BindingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding the `simulation` and `sysfs` bindings.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("simulation", simulation::create_binding);
        registry.register("sysfs", sysfs::create_binding);
        registry
    }

    /// Register a binding factory.
    ///
    /// # Panics
    /// Panics if a binding with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BindingFactory) {
        if self.factories.contains_key(name) {
            panic!("Binding '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    pub fn get_factory(&self, name: &str) -> Option<BindingFactory> {
        self.factories.get(name).copied()
    }

    /// Create a binding instance by name.
    ///
    /// # Errors
    /// `BindingError::BindingNotFound` if no binding has that name, or the
    /// factory's own error.
    pub fn create_binding(
        &self,
        name: &str,
        config: &BoardConfig,
    ) -> Result<Box<dyn IoBinding>, BindingError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| BindingError::BindingNotFound(name.to_string()))?;
        factory(config)
    }

    /// Registered binding names, sorted.
    pub fn list_bindings(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::simulation::SimulationBinding;

    fn create_test_binding(_config: &BoardConfig) -> Result<Box<dyn IoBinding>, BindingError> {
        Ok(Box::new(SimulationBinding::new(13, 104, 0)))
    }

    fn failing_binding(_config: &BoardConfig) -> Result<Box<dyn IoBinding>, BindingError> {
        Err(BindingError::InitFailed("no hardware".into()))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = BindingRegistry::new();
        reg.register("test_binding", create_test_binding);

        let binding = reg
            .create_binding("test_binding", &BoardConfig::default())
            .expect("should create");
        assert_eq!(binding.platform_type(), 13);
    }

    #[test]
    fn registry_binding_not_found() {
        let reg = BindingRegistry::new();
        let result = reg.create_binding("nonexistent", &BoardConfig::default());
        assert!(matches!(result, Err(BindingError::BindingNotFound(_))));
    }

    #[test]
    fn registry_factory_error_propagates() {
        let mut reg = BindingRegistry::new();
        reg.register("broken", failing_binding);
        let result = reg.create_binding("broken", &BoardConfig::default());
        assert!(matches!(result, Err(BindingError::InitFailed(_))));
    }

    #[test]
    fn builtin_bindings() {
        assert_eq!(
            BindingRegistry::with_builtin().list_bindings(),
            vec!["simulation", "sysfs"]
        );
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = BindingRegistry::new();
        reg.register("dup", create_test_binding);
        reg.register("dup", create_test_binding);
    }
}
