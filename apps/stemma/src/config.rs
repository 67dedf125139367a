//! # Configuration
//!
//! `stemma.toml` settings. Every key has a default, so an absent file and
//! an empty file mean the same thing.
//!
//! ```toml
//! [tree]
//! default_path = "family.json"
//!
//! [ids]
//! style = "sequential"
//! prefix = "M"
//!
//! [merge]
//! threshold_per_mille = 800
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stemma_core::{
    BlockIdGenerator, IdGenerator, MemberId, ReconcileConfig, SequentialIdGenerator, StemmaError,
};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stemma.toml";

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemmaConfig {
    pub tree: TreeSettings,
    pub ids: IdSettings,
    pub merge: ReconcileConfig,
}

/// Where the tree lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Tree file used when `--tree` is not given.
    pub default_path: PathBuf,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from("family.json"),
        }
    }
}

/// How new member ids are generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    pub style: IdStyle,
    /// Prefix of sequential ids.
    pub prefix: String,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            style: IdStyle::Block,
            prefix: "M".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStyle {
    /// `FXXX-MXXX-BXXX-RXXX` random blocks.
    #[default]
    Block,
    /// `prefix` plus a counter.
    Sequential,
}

impl IdSettings {
    /// Build the generator these settings describe, numbering sequential
    /// ids after those already in use.
    #[must_use]
    pub fn generator<'a>(
        &self,
        existing: impl IntoIterator<Item = &'a MemberId>,
    ) -> Box<dyn IdGenerator> {
        match self.style {
            IdStyle::Block => Box::new(BlockIdGenerator),
            IdStyle::Sequential => Box::new(
                SequentialIdGenerator::new(self.prefix.clone()).resume_after(existing),
            ),
        }
    }
}

impl StemmaConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, StemmaError> {
        toml::from_str(text).map_err(|e| {
            StemmaError::invalid_input(
                "load_config",
                Some("config"),
                format!("Malformed configuration: {}", e),
            )
        })
    }

    /// Load `path`, or the default configuration when it does not exist.
    pub fn load(path: &Path) -> Result<Self, StemmaError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let metadata = std::fs::metadata(path)
            .map_err(|e| StemmaError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(StemmaError::invalid_input(
                "load_config",
                Some("config"),
                format!(
                    "Configuration file is {} bytes; maximum is {}",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
            ));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| StemmaError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// Render as TOML, as written by `stemma init`.
    pub fn to_toml(&self) -> Result<String, StemmaError> {
        toml::to_string_pretty(self)
            .map_err(|e| StemmaError::SerializationError(format!("Config: {}", e)))
    }
}
