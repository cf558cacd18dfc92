//! Named vehicle templates.

use std::collections::BTreeMap;

use log::debug;

use crate::descriptor::VehicleDescriptor;
use crate::error::{PhysicsError, Result};

/// Vehicle class templates by name.
///
/// A vehicle descriptor naming a class inherits every field it leaves unset
/// from the registered template.
#[derive(Debug, Clone, Default)]
pub struct VehicleClassRegistry {
    classes: BTreeMap<String, VehicleDescriptor>,
}

impl VehicleClassRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Registering an existing name replaces it.
    ///
    /// # Errors
    ///
    /// A template may not itself refer to a class.
    pub fn register_vehicle_class(&mut self, name: impl Into<String>, template: VehicleDescriptor) -> Result<()> {
        let name = name.into();
        if template.class.is_some() {
            return Err(PhysicsError::InvalidDescriptor {
                name,
                reason: "vehicle classes cannot derive from other classes".to_string(),
            });
        }
        if self.classes.insert(name.clone(), template).is_some() {
            debug!("vehicle class '{name}' replaced");
        }
        Ok(())
    }

    /// Template registered under `name`.
    pub fn get(&self, name: &str) -> Option<&VehicleDescriptor> {
        self.classes.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = VehicleClassRegistry::new();
        let template = VehicleDescriptor {
            log: Some(true),
            ..Default::default()
        };
        registry.register_vehicle_class("logger", template.clone()).unwrap();
        assert_eq!(registry.get("logger"), Some(&template));
        assert!(registry.get("other").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["logger"]);
    }

    #[test]
    fn test_nested_class_rejected() {
        let mut registry = VehicleClassRegistry::new();
        let template = VehicleDescriptor {
            class: Some("base".into()),
            ..Default::default()
        };
        assert!(registry.register_vehicle_class("derived", template).is_err());
        assert!(registry.is_empty());
    }
}
