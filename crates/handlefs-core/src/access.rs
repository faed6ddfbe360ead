//! Access providers: where the root directory handle comes from.
//!
//! A resolver is parameterized by an [`AccessProvider`]. Two ship here:
//!
//! - [`StorageRootAccess`]: a fixed root, always granted
//! - [`PickerAccess`]: asks a chooser each time (e.g. an interactive prompt);
//!   the user may cancel

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::handle::{DirRef, HandleError, LocalDirectory, MemoryDirectory};

/// Reasons a root handle was not granted.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("no directory was selected")]
    Cancelled,

    #[error("access denied: {reason}")]
    Denied { reason: String },

    #[error("selected directory could not be opened: {0}")]
    Open(#[from] HandleError),
}

/// Source of the root directory handle.
#[async_trait]
pub trait AccessProvider: fmt::Debug + Send + Sync {
    /// Obtain a root handle. Called on every access request.
    async fn request_root(&self) -> Result<DirRef, AccessError>;
}

/// Fixed storage root that is granted without asking.
#[derive(Debug, Clone)]
pub struct StorageRootAccess {
    root: DirRef,
}

impl StorageRootAccess {
    pub fn new(root: DirRef) -> Self {
        Self { root }
    }

    /// Ephemeral in-memory origin store.
    pub fn in_memory() -> Self {
        Self::new(MemoryDirectory::new_root().into_ref())
    }

    /// Directory on the local disk. It must already exist.
    pub async fn local(path: impl Into<PathBuf>) -> Result<Self, HandleError> {
        Ok(Self::new(LocalDirectory::open(path).await?.into_ref()))
    }

    pub fn root(&self) -> &DirRef {
        &self.root
    }
}

#[async_trait]
impl AccessProvider for StorageRootAccess {
    async fn request_root(&self) -> Result<DirRef, AccessError> {
        Ok(Arc::clone(&self.root))
    }
}

type Chooser = Arc<dyn Fn() -> Option<PathBuf> + Send + Sync>;

/// Asks a chooser for a local directory on every request.
///
/// The chooser may block (it typically waits for user input), so it runs on
/// the blocking thread pool. Returning `None` means the user cancelled.
#[derive(Clone)]
pub struct PickerAccess {
    chooser: Chooser,
}

impl fmt::Debug for PickerAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickerAccess").finish_non_exhaustive()
    }
}

impl PickerAccess {
    pub fn new<F>(chooser: F) -> Self
    where
        F: Fn() -> Option<PathBuf> + Send + Sync + 'static,
    {
        Self {
            chooser: Arc::new(chooser),
        }
    }
}

#[async_trait]
impl AccessProvider for PickerAccess {
    #[instrument(level = "debug", skip(self))]
    async fn request_root(&self) -> Result<DirRef, AccessError> {
        let chooser = Arc::clone(&self.chooser);
        let choice = tokio::task::spawn_blocking(move || chooser())
            .await
            .map_err(|e| AccessError::Denied {
                reason: e.to_string(),
            })?;

        let path = choice.ok_or(AccessError::Cancelled)?;
        debug!(path = %path.display(), "Directory selected");
        Ok(LocalDirectory::open(path).await?.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_storage_root_always_granted() {
        let access = StorageRootAccess::in_memory();
        let first = access.request_root().await.unwrap();
        let second = access.request_root().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_picker_cancel() {
        let access = PickerAccess::new(|| None);
        let err = access.request_root().await.unwrap_err();
        assert!(matches!(err, AccessError::Cancelled));
    }

    #[tokio::test]
    async fn test_picker_opens_selection() {
        let temp = TempDir::new().unwrap();
        let selected = temp.path().to_path_buf();
        let access = PickerAccess::new(move || Some(selected.clone()));

        let root = access.request_root().await.unwrap();
        root.get_directory_handle("made", true).await.unwrap();
        assert!(temp.path().join("made").is_dir());
    }

    #[tokio::test]
    async fn test_picker_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let access = PickerAccess::new(move || Some(missing.clone()));

        let err = access.request_root().await.unwrap_err();
        assert!(matches!(err, AccessError::Open(HandleError::NotFound { .. })));
    }
}
