//! Type-key registry for element and data provider variants
//!
//! Serialized templates name variants by short type keys. The registry maps
//! each key to a factory; it is filled at startup and read-only afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::element::CompositionElement;
use super::elements::{
    SEPARATOR_KEY, STATIC_LABEL_KEY, SeparatorElement, StaticLabelElement, TABLE_KEY,
    TableElement, VERTICAL_CONTAINER_KEY, VerticalContainerElement,
};
use crate::data::db::{DB_PROVIDER_KEY, DbDataProvider};
use crate::data::script::{SCRIPT_PROVIDER_KEY, ScriptDataProvider};
use crate::data::static_provider::{STATIC_PROVIDER_KEY, StaticDataProvider};
use crate::data::DataProvider;

pub type ElementFactory = Arc<dyn Fn() -> Box<dyn CompositionElement> + Send + Sync>;
pub type ProviderFactory = Arc<dyn Fn() -> Box<dyn DataProvider> + Send + Sync>;

static DEFAULT_REGISTRY: Lazy<Arc<TypeRegistry>> =
    Lazy::new(|| Arc::new(TypeRegistry::with_defaults()));

/// Maps type keys to element and data provider factories
#[derive(Clone, Default)]
pub struct TypeRegistry {
    elements: BTreeMap<String, ElementFactory>,
    providers: BTreeMap<String, ProviderFactory>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in element and provider
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_element(VERTICAL_CONTAINER_KEY, || Box::new(VerticalContainerElement))
            .register_element(STATIC_LABEL_KEY, || Box::new(StaticLabelElement))
            .register_element(TABLE_KEY, || Box::new(TableElement))
            .register_element(SEPARATOR_KEY, || Box::new(SeparatorElement))
            .register_provider(STATIC_PROVIDER_KEY, || Box::new(StaticDataProvider::new()))
            .register_provider(DB_PROVIDER_KEY, || Box::new(DbDataProvider::new()))
            .register_provider(SCRIPT_PROVIDER_KEY, || Box::new(ScriptDataProvider::new()));
        registry
    }

    /// Shared registry holding the built-in types
    pub fn shared() -> Arc<TypeRegistry> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    pub fn register_element<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn CompositionElement> + Send + Sync + 'static,
    {
        self.elements.insert(key.into(), Arc::new(factory));
        self
    }

    pub fn register_provider<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn DataProvider> + Send + Sync + 'static,
    {
        self.providers.insert(key.into(), Arc::new(factory));
        self
    }

    pub fn create_element(&self, key: &str) -> Option<Box<dyn CompositionElement>> {
        self.elements.get(key).map(|f| f())
    }

    pub fn create_provider(&self, key: &str) -> Option<Box<dyn DataProvider>> {
        self.providers.get(key).map(|f| f())
    }

    pub fn element_keys(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn provider_keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
