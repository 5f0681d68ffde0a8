//! Engine configuration
//!
//! Read from a TOML file. Every field has a default, so an empty file is a
//! valid configuration.
//!
//! ```toml
//! tree_folder = "/data/treebank"
//! dev_files = "wsj_0001, wsj_0002"
//! test_files = "wsj_2300"
//! tree_extension = "stp"
//! tree_limit = 30000
//! rules_file = "rules.json"
//! show_tagged = false
//! ```

use crate::corpus::{DEFAULT_TREE_EXTENSION, DEFAULT_TREE_LIMIT};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Folder holding the tree files
    pub tree_folder: PathBuf,
    /// Comma-separated file names (without extension) of the development set
    pub dev_files: String,
    /// Comma-separated file names (without extension) of the test set
    pub test_files: String,
    pub tree_extension: String,
    /// Maximum trees per data set
    pub tree_limit: usize,
    /// Rules document read and written by the repository
    pub rules_file: PathBuf,
    /// Annotate sentences with part-of-speech tags
    pub show_tagged: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tree_folder: PathBuf::new(),
            dev_files: String::new(),
            test_files: String::new(),
            tree_extension: DEFAULT_TREE_EXTENSION.to_string(),
            tree_limit: DEFAULT_TREE_LIMIT,
            rules_file: PathBuf::from("rules.json"),
            show_tagged: false,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
