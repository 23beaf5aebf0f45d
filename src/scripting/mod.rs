//! Scripting extensions
//!
//! Scripting providers turn script text into a data set for the script data
//! provider. They are registered explicitly on the engine's
//! [`ExtensionCollection`] at startup and only read during generation.

pub mod json;

pub use json::JsonScriptingProvider;

use std::sync::Arc;

use thiserror::Error;

use crate::models::{DataSet, PropertyContainer};

/// Errors raised by scripting providers
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script could not be parsed or compiled
    #[error("Script compilation failed ({script_type}): {message}")]
    Compile {
        script_type: String,
        message: String,
    },

    /// The script failed while running
    #[error("Script execution failed: {0}")]
    Execution(String),

    /// The script produced something that is not a data set
    #[error("Script returned an invalid result: {0}")]
    InvalidResult(String),
}

impl ScriptError {
    pub fn compile(script_type: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Compile {
            script_type: script_type.into(),
            message: message.to_string(),
        }
    }

    pub fn execution(message: impl std::fmt::Display) -> Self {
        Self::Execution(message.to_string())
    }
}

/// Inputs handed to a script besides its text
#[derive(Debug, Clone, Default)]
pub struct ScriptExecutionOptions {
    /// Name of the data source the script runs for
    pub source_name: String,
    /// Properties of the calling data provider
    pub provider_properties: PropertyContainer,
    pub parameters: Vec<serde_json::Value>,
}

/// A scripting language backend
pub trait ScriptingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this provider runs scripts of `script_type`
    fn can_execute(&self, script_type: &str) -> bool;

    /// Run `script`; `None` means the script produced no data
    fn execute(
        &self,
        script: &str,
        options: &ScriptExecutionOptions,
    ) -> Result<Option<DataSet>, ScriptError>;
}

/// Extensions available to data providers during retrieval
#[derive(Clone, Default)]
pub struct ExtensionCollection {
    scripting: Vec<Arc<dyn ScriptingProvider>>,
}

impl ExtensionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection with the built-in scripting providers
    pub fn with_defaults() -> Self {
        let mut extensions = Self::new();
        extensions.add_scripting_provider(JsonScriptingProvider);
        extensions
    }

    pub fn add_scripting_provider(&mut self, provider: impl ScriptingProvider + 'static) -> &mut Self {
        self.scripting.push(Arc::new(provider));
        self
    }

    pub fn scripting_providers(&self) -> &[Arc<dyn ScriptingProvider>] {
        &self.scripting
    }

    /// Providers accepting `script_type`, in registration order
    pub fn matching_scripting_providers(&self, script_type: &str) -> Vec<&Arc<dyn ScriptingProvider>> {
        self.scripting
            .iter()
            .filter(|p| p.can_execute(script_type))
            .collect()
    }
}

impl std::fmt::Debug for ExtensionCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionCollection")
            .field(
                "scripting",
                &self.scripting.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_json() {
        let extensions = ExtensionCollection::with_defaults();
        assert_eq!(extensions.scripting_providers().len(), 1);
        assert_eq!(extensions.matching_scripting_providers("JSON").len(), 1);
        assert!(extensions.matching_scripting_providers("cs").is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = ScriptError::compile("json", "expected value at line 1");
        assert!(err.to_string().contains("json"));
        assert!(err.to_string().contains("line 1"));
    }
}
