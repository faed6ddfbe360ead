//! Absolute, slash-delimited paths.
//!
//! [`FsPath`] is the only path form the resolver accepts. Parsing is strict:
//! the path must start with `/`, and every segment must be a valid entry name
//! (no empty segments, no `.` or `..`). Segments are compared byte for byte;
//! there is no case folding or Unicode normalization.

use std::fmt;
use std::str::FromStr;

use relative_path::{RelativePath, RelativePathBuf};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::handle::validate_name;

/// Reasons a string is not a usable [`FsPath`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path '{path}' is not absolute")]
    NotAbsolute { path: String },

    #[error("path '{path}' has an invalid segment '{segment}'")]
    InvalidSegment { path: String, segment: String },
}

/// Absolute path inside a granted root.
///
/// # Examples
///
/// ```
/// use handlefs_core::path::FsPath;
///
/// let path = FsPath::parse("/docs/report.txt").unwrap();
/// assert_eq!(path.file_name(), Some("report.txt"));
/// assert_eq!(path.parent().unwrap().to_string(), "/docs");
///
/// // Relative paths are rejected
/// assert!(FsPath::parse("docs/report.txt").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsPath(RelativePathBuf);

impl FsPath {
    /// The root path `/`.
    #[inline]
    pub fn root() -> Self {
        FsPath(RelativePathBuf::new())
    }

    /// Parse an absolute path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let Some(rest) = path.strip_prefix('/') else {
            return Err(PathError::NotAbsolute {
                path: path.to_string(),
            });
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        for segment in rest.split('/') {
            if validate_name(segment).is_err() {
                return Err(PathError::InvalidSegment {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
        Ok(FsPath(RelativePathBuf::from(rest)))
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    /// Path without the leading slash (`""` for root).
    #[inline]
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Number of segments (`0` for root).
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Segments in order, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.components().map(|c| c.as_str())
    }

    /// Append one segment. The caller guarantees it is a valid entry name.
    pub fn join(&self, segment: &str) -> Self {
        FsPath(self.0.join(segment))
    }

    /// Parent path; `None` for root.
    pub fn parent(&self) -> Option<FsPath> {
        if self.is_root() {
            return None;
        }
        self.0.parent().map(|p| FsPath(p.to_relative_path_buf()))
    }

    /// Final segment; `None` for root.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Split into parent directory and final segment.
    ///
    /// Root has no distinguishable parent and yields `None`.
    pub fn split(&self) -> Option<(FsPath, &str)> {
        let parent = self.parent()?;
        let name = self.file_name()?;
        Some((parent, name))
    }

    /// True if `self` equals `other` or lies beneath it.
    pub fn starts_with(&self, other: &FsPath) -> bool {
        other.is_root() || self.0.starts_with(&other.0)
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl Serialize for FsPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for FsPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FsPath::parse(s)
    }
}
