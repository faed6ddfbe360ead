//! Error types for the handlefs crate
//!
//! - [`ErrorKind`]: closed set of failure categories, each with a fixed message
//! - [`FsError`]: what public operations return, always carrying a kind
//! - [`ErrorReport`] / [`ErrorReporter`]: structured reports fed to a sink,
//!   used by the recursive listing

mod report;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::access::AccessError;
pub use crate::config::ConfigError;
pub use crate::handle::HandleError;
pub use crate::path::PathError;
pub use report::{ErrorReport, ErrorReporter, ErrorSink, Reported, ReturnMode};

/// Failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No access granted, or the grant was denied
    Access,
    /// A path segment does not exist and creation was not requested
    NotExist,
    /// Reading a file failed
    Read,
    /// Writing a file failed
    Write,
    /// Removing a file or directory failed
    Delete,
    /// Creating a directory failed
    Mkdir,
    /// Malformed path or entry name
    InvalidPath,
    /// The store refused the operation
    Permission,
    /// Content could not be interpreted (e.g. not UTF-8)
    FileFormat,
    /// The store ran out of space
    DiskSpace,
    /// The operation collided with an existing entry
    Conflict,
}

impl ErrorKind {
    /// Stable identifier, as used in reports.
    pub fn code(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::NotExist => "notExist",
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Mkdir => "mkdir",
            Self::InvalidPath => "invalidPath",
            Self::Permission => "permission",
            Self::FileFormat => "fileFormat",
            Self::DiskSpace => "diskSpace",
            Self::Conflict => "conflict",
        }
    }

    /// Fixed human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            Self::Access => {
                "The access request was not authorized or no directory was selected."
            }
            Self::NotExist => "Path does not exist.",
            Self::Read => {
                "Error reading the file. The file might not exist, or an issue occurred while reading."
            }
            Self::Write => {
                "Error writing to the file. There might be an issue with file permissions or disk space."
            }
            Self::Delete => {
                "Error deleting the file or directory. It might be in use, protected, or not empty."
            }
            Self::Mkdir => {
                "Error creating the directory. There might be an issue with permissions or the path."
            }
            Self::InvalidPath => "The provided path is invalid or contains illegal characters.",
            Self::Permission => {
                "Insufficient permissions to perform the operation on the specified file or directory."
            }
            Self::FileFormat => "Unsupported file format or file is corrupted.",
            Self::DiskSpace => "Insufficient disk space to complete the operation.",
            Self::Conflict => {
                "Operation resulted in a conflict, such as an entry of a different kind already existing under that name."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Context for filesystem operations, for error messages.
#[derive(Debug, Clone, Default)]
pub struct FsOpContext {
    /// Operation name (e.g. `read_file`)
    pub operation: Option<&'static str>,
    /// Path being operated on
    pub path: Option<String>,
}

impl FsOpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_path(mut self, path: impl fmt::Display) -> Self {
        self.path = Some(path.to_string());
        self
    }
}

impl fmt::Display for FsOpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.operation, &self.path) {
            (Some(op), Some(path)) => write!(f, "{op} on '{path}'"),
            (Some(op), None) => write!(f, "{op}"),
            (None, Some(path)) => write!(f, "'{path}'"),
            (None, None) => write!(f, "(no context)"),
        }
    }
}

/// Errors returned by filesystem operations.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("access to the storage root was not granted: {0}")]
    AccessDenied(#[from] AccessError),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("path '{path}' has no parent directory")]
    NoParent { path: String },

    #[error("'{segment}' does not exist while resolving '{path}'")]
    NotExist { path: String, segment: String },

    #[error("directory '{path}' is not empty")]
    DirectoryNotEmpty { path: String },

    #[error("content of '{path}' is not valid UTF-8")]
    InvalidText {
        path: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("{kind} error for {context}: {source}")]
    Handle {
        kind: ErrorKind,
        context: Box<FsOpContext>,
        #[source]
        source: HandleError,
    },
}

impl FsError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::AccessDenied(_) => ErrorKind::Access,
            FsError::InvalidPath(_) | FsError::NoParent { .. } => ErrorKind::InvalidPath,
            FsError::NotExist { .. } => ErrorKind::NotExist,
            FsError::DirectoryNotEmpty { .. } => ErrorKind::Delete,
            FsError::InvalidText { .. } => ErrorKind::FileFormat,
            FsError::Handle { kind, .. } => *kind,
        }
    }

    /// Wrap a handle failure. Failures with a specific cause keep that cause;
    /// the rest fall back to `fallback` (the operation's own kind).
    pub fn from_handle(source: HandleError, fallback: ErrorKind, context: FsOpContext) -> Self {
        let kind = match &source {
            HandleError::NotFound { .. } | HandleError::Stale { .. } => ErrorKind::NotExist,
            HandleError::PermissionDenied { .. } => ErrorKind::Permission,
            HandleError::QuotaExceeded { .. } => ErrorKind::DiskSpace,
            HandleError::InvalidName { .. } => ErrorKind::InvalidPath,
            HandleError::TypeMismatch { .. } => ErrorKind::Conflict,
            HandleError::NotEmpty { .. } | HandleError::Io { .. } => fallback,
        };
        FsError::Handle {
            kind,
            context: Box::new(context),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleKind;

    #[test]
    fn test_messages_are_distinct() {
        let kinds = [
            ErrorKind::Access,
            ErrorKind::NotExist,
            ErrorKind::Read,
            ErrorKind::Write,
            ErrorKind::Delete,
            ErrorKind::Mkdir,
            ErrorKind::InvalidPath,
            ErrorKind::Permission,
            ErrorKind::FileFormat,
            ErrorKind::DiskSpace,
            ErrorKind::Conflict,
        ];
        let mut messages: Vec<_> = kinds.iter().map(|k| k.message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }

    #[test]
    fn test_disk_space_and_file_format_messages() {
        assert!(ErrorKind::DiskSpace.message().contains("disk space"));
        assert!(ErrorKind::FileFormat.message().contains("file format"));
    }

    #[test]
    fn test_handle_error_classification() {
        let ctx = || FsOpContext::new().with_operation("write_file").with_path("/a");

        let err = FsError::from_handle(
            HandleError::QuotaExceeded { name: "a".into() },
            ErrorKind::Write,
            ctx(),
        );
        assert_eq!(err.kind(), ErrorKind::DiskSpace);

        let err = FsError::from_handle(
            HandleError::TypeMismatch {
                name: "a".into(),
                expected: HandleKind::File,
            },
            ErrorKind::Write,
            ctx(),
        );
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = FsError::from_handle(
            HandleError::Io {
                name: "a".into(),
                source: std::io::Error::other("boom"),
            },
            ErrorKind::Write,
            ctx(),
        );
        assert_eq!(err.kind(), ErrorKind::Write);
        assert!(err.to_string().contains("write_file on '/a'"));
    }

    #[test]
    fn test_codes() {
        assert_eq!(ErrorKind::NotExist.code(), "notExist");
        assert_eq!(ErrorKind::InvalidPath.to_string(), "invalidPath");
    }
}
