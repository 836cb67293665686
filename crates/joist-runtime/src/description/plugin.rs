#![forbid(unsafe_code)]

//! Named factories for description logic.
//!
//! A simulation registers its logic factories up front; the service then
//! swaps between them by name at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::description::{DescriptionError, DescriptionLogic};

/// Builds a fresh logic instance.
pub type LogicFactory = Rc<dyn Fn() -> Rc<dyn DescriptionLogic>>;

/// Name-to-factory table.
#[derive(Clone, Default)]
pub struct DescriptionPlugins {
    factories: BTreeMap<String, LogicFactory>,
}

impl fmt::Debug for DescriptionPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl DescriptionPlugins {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Rc<dyn DescriptionLogic> + 'static,
    ) {
        let name = name.into();
        if self.factories.insert(name.clone(), Rc::new(factory)).is_some() {
            tracing::debug!(plugin = %name, "replaced description plugin");
        }
    }

    /// Instantiate the logic registered under `name`.
    pub fn create(&self, name: &str) -> Result<Rc<dyn DescriptionLogic>, DescriptionError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DescriptionError::UnknownPlugin(name.to_string()))?;
        Ok(factory())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
