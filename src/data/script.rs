//! Script-driven data provider

use std::sync::Arc;

use tracing::{debug, warn};

use super::{DataError, DataProvider, RetrievalContext};
use crate::models::{DataSet, PropertyContainer};
use crate::scripting::ScriptExecutionOptions;

pub const SCRIPT_PROVIDER_KEY: &str = "script";
pub const SCRIPT_TYPE_PROPERTY: &str = "script-type";
pub const SCRIPT_TEXT_PROPERTY: &str = "text";

/// Provider delegating retrieval to a registered scripting provider
///
/// The scripting provider is the first one in the engine's extension
/// collection that accepts the `script-type` property. Script failures
/// propagate unchanged as [`DataError::Script`].
#[derive(Debug, Default, Clone)]
pub struct ScriptDataProvider {
    properties: PropertyContainer,
    parameters: Vec<serde_json::Value>,
    data: Option<Arc<DataSet>>,
}

impl ScriptDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_script(&mut self, script_type: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.properties.set(SCRIPT_TYPE_PROPERTY, script_type);
        self.properties.set(SCRIPT_TEXT_PROPERTY, text);
        self
    }

    /// Free-form parameters handed to the script
    pub fn add_parameter(&mut self, value: serde_json::Value) -> &mut Self {
        self.parameters.push(value);
        self
    }
}

impl DataProvider for ScriptDataProvider {
    fn type_key(&self) -> Option<&str> {
        Some(SCRIPT_PROVIDER_KEY)
    }

    fn properties(&self) -> &PropertyContainer {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyContainer {
        &mut self.properties
    }

    fn retrieve_data(&mut self, context: &RetrievalContext<'_>) -> Result<(), DataError> {
        let script_type = self.properties.get(SCRIPT_TYPE_PROPERTY).unwrap_or_default();
        let candidates = context.extensions.matching_scripting_providers(&script_type);

        let Some(provider) = candidates.first() else {
            warn!(
                source = %context.source_name,
                script_type = %script_type,
                "No scripting provider accepts this script type"
            );
            return Ok(());
        };
        if candidates.len() > 1 {
            warn!(
                source = %context.source_name,
                script_type = %script_type,
                matches = candidates.len(),
                chosen = %provider.name(),
                "Several scripting providers accept this script type, using the first"
            );
        }

        let text = self.properties.get(SCRIPT_TEXT_PROPERTY).unwrap_or_default();
        let options = ScriptExecutionOptions {
            source_name: context.source_name.to_string(),
            provider_properties: self.properties.clone(),
            parameters: self.parameters.clone(),
        };
        debug!(source = %context.source_name, provider = %provider.name(), "Executing script");

        if let Some(data) = provider.execute(&text, &options)? {
            self.data = Some(Arc::new(data));
        }
        Ok(())
    }

    fn data(&self) -> Option<Arc<DataSet>> {
        self.data.clone()
    }
}
