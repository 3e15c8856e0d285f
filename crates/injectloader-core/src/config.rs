use crate::errors::InjectError;
use crate::filter::FilterSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "injectconfig.yaml";

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectConfig {
    /// Dependency filters (path -> flag)
    #[serde(default)]
    pub filters: FilterSet,

    /// File extensions picked up when walking directories
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Output directory for rewritten modules
    #[serde(default)]
    pub out_dir: Option<String>,
}

fn default_extensions() -> Vec<String> {
    ["js", "jsx", "mjs", "cjs"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            extensions: default_extensions(),
            out_dir: None,
        }
    }
}

/// Values given on the command line, applied over the file configuration
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub filters: Option<FilterSet>,
    pub out_dir: Option<String>,
}

impl InjectConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, InjectError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, InjectError> {
        serde_yaml::from_str(content).map_err(|e| InjectError::Config(e.to_string()))
    }

    /// Write the default configuration to a file
    pub fn init_file(path: &Path) -> Result<(), InjectError> {
        let yaml = serde_yaml::to_string(&InjectConfig::default())
            .map_err(|e| InjectError::Config(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply command line overrides; a query string replaces the file's filters wholesale
    pub fn merge(&mut self, overrides: &CliOverrides) {
        if let Some(ref filters) = overrides.filters {
            self.filters = filters.clone();
        }
        if let Some(ref out_dir) = overrides.out_dir {
            self.out_dir = Some(out_dir.clone());
        }
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}
