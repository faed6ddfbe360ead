//! Path-addressable filesystem over cached directory handles.
//!
//! Storage is reached through capability handles ([`handle::DirectoryHandle`],
//! [`handle::FileHandle`]) granted by an [`access::AccessProvider`]. A
//! [`HandleFs`] turns absolute paths like `/docs/report.txt` into walks over
//! those handles, caching every directory it resolves in a
//! [`tree::HandleTree`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use handlefs_core::access::StorageRootAccess;
//! use handlefs_core::path::FsPath;
//! use handlefs_core::{HandleFs, WriteMode};
//!
//! # tokio_test_runtime();
//! # fn tokio_test_runtime() {
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let mut fs = HandleFs::new(Arc::new(StorageRootAccess::in_memory()));
//!
//! let dir = FsPath::parse("/notes").unwrap();
//! let file = FsPath::parse("/notes/today.txt").unwrap();
//! fs.mkdir(&dir, false).await.unwrap();
//! fs.write_file_text(&file, "Hi ", WriteMode::Truncate).await.unwrap();
//! fs.write_file_text(&file, "Hello", WriteMode::Append).await.unwrap();
//!
//! assert_eq!(fs.read_file_text(&file).await.unwrap(), "Hi Hello");
//! # });
//! # }
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod fs;
pub mod handle;
pub mod path;
pub mod resolver;
pub mod tree;
pub mod walk;

pub use access::{AccessProvider, PickerAccess, StorageRootAccess};
pub use config::{AccessMode, FsConfig};
pub use error::{ErrorKind, ErrorReport, FsError, Reported, ReturnMode};
pub use fs::{DirEntry, FileTarget, HandleFs, WriteMode};
pub use path::FsPath;
pub use walk::WalkEvent;
