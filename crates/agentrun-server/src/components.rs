//! Registry of settings-surface components.
//!
//! The interactive configuration surface registers its inputs here by id.
//! Starting a run requires the task input component to be present.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;

/// Component the start operation writes the submitted task into.
pub const TASK_INPUT: &str = "agent.task_input";

/// Component errors.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Component not registered: {0}")]
    Unknown(String),

    #[error("Component registry lock poisoned: {0}")]
    Poisoned(String),
}

/// Component id → current value.
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<BTreeMap<String, Value>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with its initial value, replacing any previous one.
    pub fn register(&self, id: impl Into<String>, value: Value) -> Result<(), ComponentError> {
        let mut components = self
            .components
            .write()
            .map_err(|e| ComponentError::Poisoned(e.to_string()))?;
        components.insert(id.into(), value);
        Ok(())
    }

    /// Update the value of a registered component.
    pub fn set(&self, id: &str, value: Value) -> Result<(), ComponentError> {
        let mut components = self
            .components
            .write()
            .map_err(|e| ComponentError::Poisoned(e.to_string()))?;
        match components.get_mut(id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ComponentError::Unknown(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Value>, ComponentError> {
        let components = self
            .components
            .read()
            .map_err(|e| ComponentError::Poisoned(e.to_string()))?;
        Ok(components.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> Result<bool, ComponentError> {
        Ok(self.get(id)?.is_some())
    }

    /// All registered ids, sorted.
    pub fn keys(&self) -> Result<Vec<String>, ComponentError> {
        let components = self
            .components
            .read()
            .map_err(|e| ComponentError::Poisoned(e.to_string()))?;
        Ok(components.keys().cloned().collect())
    }
}
