//! Instance configuration.
//!
//! # Example configuration
//!
//! ```toml
//! access = "storage-root"
//! storage_root = "/home/user/.local/share/handlefs"
//! debug = true
//! return_mode = "structured"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::access::{AccessProvider, PickerAccess, StorageRootAccess};
use crate::error::ReturnMode;
use crate::handle::HandleError;

/// Errors loading a configuration or building its provider.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("picker access requires a chooser")]
    MissingChooser,

    #[error("storage root '{path}' is unusable: {source}")]
    StorageRoot {
        path: PathBuf,
        #[source]
        source: HandleError,
    },
}

/// How the root handle is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Ask a chooser on every access request
    Picker,
    /// Fixed storage root, granted without asking
    #[default]
    StorageRoot,
}

/// Settings for a [`HandleFs`](crate::HandleFs) instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub access: AccessMode,

    /// Directory used by [`AccessMode::StorageRoot`]. Without one, an
    /// ephemeral in-memory store is used.
    pub storage_root: Option<PathBuf>,

    /// Emit error reports through `tracing`
    pub debug: bool,

    pub return_mode: ReturnMode,
}

impl FsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Build the access provider selected by [`FsConfig::access`].
    ///
    /// `picker` is only consulted in [`AccessMode::Picker`].
    pub async fn build_provider(
        &self,
        picker: Option<PickerAccess>,
    ) -> Result<Arc<dyn AccessProvider>, ConfigError> {
        match self.access {
            AccessMode::Picker => {
                let picker = picker.ok_or(ConfigError::MissingChooser)?;
                debug!("Using picker access");
                Ok(Arc::new(picker))
            }
            AccessMode::StorageRoot => match &self.storage_root {
                Some(path) => {
                    let access = StorageRootAccess::local(path.clone()).await.map_err(|source| {
                        ConfigError::StorageRoot {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    debug!(root = %path.display(), "Using local storage root");
                    Ok(Arc::new(access))
                }
                None => {
                    debug!("Using in-memory storage root");
                    Ok(Arc::new(StorageRootAccess::in_memory()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FsConfig::from_toml_str("").unwrap();
        assert_eq!(config, FsConfig::default());
        assert_eq!(config.access, AccessMode::StorageRoot);
        assert_eq!(config.return_mode, ReturnMode::Boolean);
        assert!(!config.debug);
    }

    #[test]
    fn test_parse_full() {
        let config = FsConfig::from_toml_str(
            r#"
            access = "picker"
            storage_root = "/srv/data"
            debug = true
            return_mode = "structured"
            "#,
        )
        .unwrap();
        assert_eq!(config.access, AccessMode::Picker);
        assert_eq!(config.storage_root, Some(PathBuf::from("/srv/data")));
        assert!(config.debug);
        assert_eq!(config.return_mode, ReturnMode::Structured);
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let err = FsConfig::from_toml_str(r#"access = "teleport""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_picker_requires_chooser() {
        let config = FsConfig {
            access: AccessMode::Picker,
            ..FsConfig::default()
        };
        let err = config.build_provider(None).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingChooser));
    }

    #[tokio::test]
    async fn test_local_storage_root() {
        let temp = TempDir::new().unwrap();
        let config = FsConfig {
            storage_root: Some(temp.path().to_path_buf()),
            ..FsConfig::default()
        };
        let provider = config.build_provider(None).await.unwrap();
        let root = provider.request_root().await.unwrap();
        root.get_directory_handle("x", true).await.unwrap();
        assert!(temp.path().join("x").is_dir());
    }

    #[tokio::test]
    async fn test_missing_storage_root() {
        let temp = TempDir::new().unwrap();
        let config = FsConfig {
            storage_root: Some(temp.path().join("missing")),
            ..FsConfig::default()
        };
        let err = config.build_provider(None).await.unwrap_err();
        assert!(matches!(err, ConfigError::StorageRoot { .. }));
    }
}
