/// Configuration for an editing session
use crate::models::{SchemaError, SchemaRegistry};
use crate::operations::DEFAULT_MAX_UNDO_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of undoable operations kept by `OperationHistory`
    pub max_undo_depth: usize,

    /// Run `Document::check_consistency` after every history step
    pub verify_consistency: bool,

    /// Schema table to load instead of the built-in NDEF table
    pub schema_path: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: DEFAULT_MAX_UNDO_DEPTH,
            verify_consistency: false,
            schema_path: None,
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json_str(&json)?)
    }

    /// Load the configured schema table, or the built-in one
    pub fn load_schema(&self) -> Result<Arc<SchemaRegistry>, SchemaError> {
        match &self.schema_path {
            Some(path) => {
                tracing::info!("Loading schema table from {:?}", path);
                Ok(Arc::new(SchemaRegistry::from_path(path)?))
            }
            None => SchemaRegistry::ndef(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_undo_depth == 0 {
            return Err("max_undo_depth must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.max_undo_depth, 100);
        assert!(!config.verify_consistency);
        assert!(config.schema_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "verify_consistency": true }"#).unwrap();
        assert!(config.verify_consistency);
        assert_eq!(config.max_undo_depth, 100);
    }

    #[test]
    fn test_config_validation() {
        let config = EditorConfig {
            max_undo_depth: 0,
            ..EditorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builtin_schema_when_no_path() {
        let schema = EditorConfig::default().load_schema().unwrap();
        assert!(schema.record_type("generic_control").is_ok());
    }
}
