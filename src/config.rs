//! # Parser Configuration
//!
//! Options that change how a parse reports, read from YAML:
//!
//! ```yaml
//! warnings: true   # collect and log warnings
//! trace: false     # log every grammar production at trace level
//! strict: false    # treat warnings as fatal errors
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{GuidoError, Result};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ParserConfig {
    pub warnings: bool,
    pub trace: bool,
    pub strict: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            warnings: true,
            trace: false,
            strict: false,
        }
    }
}

impl ParserConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document is all defaults.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| GuidoError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| GuidoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}
