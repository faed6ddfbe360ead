//! Native handle abstraction.
//!
//! A granted access root is a [`DirectoryHandle`]. Everything the resolver
//! does against the backing store goes through these traits:
//!
//! - [`DirectoryHandle`]: child lookup/creation, lazy enumeration, removal
//! - [`FileHandle`]: whole-content reads and scoped writable streams
//! - [`WritableFile`]: `write` then `close`; nothing is visible before `close`
//!
//! Two implementations ship with the crate: [`MemoryDirectory`] (an ephemeral
//! origin-private store, also used by tests) and [`LocalDirectory`] (a
//! directory on the local disk, accessed through `tokio::fs`).

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

pub mod local;
pub mod memory;

pub use local::{LocalDirectory, LocalFile};
pub use memory::{Fault, MemoryDirectory, MemoryFile};

/// Shared reference to a directory handle.
pub type DirRef = Arc<dyn DirectoryHandle>;

/// Shared reference to a file handle.
pub type FileRef = Arc<dyn FileHandle>;

/// Lazy sequence of `(name, handle)` pairs produced by [`DirectoryHandle::entries`].
pub type EntryStream = BoxStream<'static, Result<(String, Handle), HandleError>>;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    File,
    Directory,
}

impl HandleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleKind::File => "file",
            HandleKind::Directory => "directory",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reported by native handles.
#[derive(Error, Debug)]
pub enum HandleError {
    #[error("entry '{name}' not found")]
    NotFound { name: String },

    #[error("entry '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: HandleKind },

    #[error("directory '{name}' is not empty")]
    NotEmpty { name: String },

    #[error("invalid entry name '{name}'")]
    InvalidName { name: String },

    #[error("permission denied for '{name}'")]
    PermissionDenied { name: String },

    #[error("storage quota exceeded while writing '{name}'")]
    QuotaExceeded { name: String },

    #[error("handle for '{name}' is no longer valid")]
    Stale { name: String },

    #[error("I/O error for '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl HandleError {
    /// True when the entry is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HandleError::NotFound { .. })
    }

    /// Map an I/O error onto the handle taxonomy.
    pub fn from_io(name: impl Into<String>, source: io::Error) -> Self {
        let name = name.into();
        match source.kind() {
            io::ErrorKind::NotFound => HandleError::NotFound { name },
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                HandleError::PermissionDenied { name }
            }
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
                HandleError::QuotaExceeded { name }
            }
            io::ErrorKind::DirectoryNotEmpty => HandleError::NotEmpty { name },
            io::ErrorKind::NotADirectory => HandleError::TypeMismatch {
                name,
                expected: HandleKind::Directory,
            },
            io::ErrorKind::IsADirectory => HandleError::TypeMismatch {
                name,
                expected: HandleKind::File,
            },
            io::ErrorKind::InvalidFilename => HandleError::InvalidName { name },
            _ => HandleError::Io { name, source },
        }
    }
}

/// Check an entry name the way the host API does before touching storage.
pub fn validate_name(name: &str) -> Result<(), HandleError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(HandleError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Either kind of handle, as yielded by directory enumeration.
#[derive(Debug, Clone)]
pub enum Handle {
    File(FileRef),
    Directory(DirRef),
}

impl Handle {
    pub fn kind(&self) -> HandleKind {
        match self {
            Handle::File(_) => HandleKind::File,
            Handle::Directory(_) => HandleKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Handle::File(f) => f.name(),
            Handle::Directory(d) => d.name(),
        }
    }
}

/// A directory in the backing store.
#[async_trait]
pub trait DirectoryHandle: fmt::Debug + Send + Sync {
    /// Entry name of this directory (`""` for a granted root).
    fn name(&self) -> &str;

    /// Look up (or with `create`, make) a child directory.
    async fn get_directory_handle(&self, name: &str, create: bool) -> Result<DirRef, HandleError>;

    /// Look up (or with `create`, make an empty) child file.
    async fn get_file_handle(&self, name: &str, create: bool) -> Result<FileRef, HandleError>;

    /// Enumerate children lazily, in whatever order the store produces them.
    fn entries(&self) -> EntryStream;

    /// Remove a child entry. Directories need `recursive` unless empty.
    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), HandleError>;

    /// Remove this directory from its parent.
    async fn remove(&self, recursive: bool) -> Result<(), HandleError>;
}

/// A regular file in the backing store.
#[async_trait]
pub trait FileHandle: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Snapshot of the whole file content.
    async fn get_file(&self) -> Result<FileContents, HandleError>;

    /// Content length in bytes, without reading the content.
    async fn size(&self) -> Result<u64, HandleError>;

    /// Open a writable stream. Content written is committed on `close`.
    async fn create_writable(&self) -> Result<Box<dyn WritableFile>, HandleError>;
}

/// Scoped writer returned by [`FileHandle::create_writable`].
#[async_trait]
pub trait WritableFile: Send {
    async fn write(&mut self, data: &[u8]) -> Result<(), HandleError>;

    /// Flush and release. Writes after `close` fail with [`HandleError::Stale`].
    async fn close(&mut self) -> Result<(), HandleError>;
}

/// Whole-file snapshot returned by [`FileHandle::get_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    name: String,
    data: Vec<u8>,
}

impl FileContents {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Content decoded as UTF-8.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("docs").is_ok());
        assert!(validate_name("file with spaces.txt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }

    #[test]
    fn test_from_io_mapping() {
        let err = HandleError::from_io("x", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = HandleError::from_io("x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, HandleError::PermissionDenied { .. }));

        let err = HandleError::from_io("x", io::Error::from(io::ErrorKind::StorageFull));
        assert!(matches!(err, HandleError::QuotaExceeded { .. }));

        let err = HandleError::from_io("x", io::Error::other("boom"));
        assert!(matches!(err, HandleError::Io { .. }));
    }

    #[test]
    fn test_file_contents_text() {
        let contents = FileContents::new("a.txt", b"Hi ".to_vec());
        assert_eq!(contents.text().unwrap(), "Hi ");
        assert_eq!(contents.len(), 3);

        let binary = FileContents::new("b.bin", vec![0xff, 0xfe]);
        assert!(binary.text().is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(HandleKind::File.to_string(), "file");
        assert_eq!(HandleKind::Directory.to_string(), "directory");
    }
}
