//! Path-addressed filesystem operations.
//!
//! [`HandleFs`] owns a [`PathResolver`] and an [`ErrorReporter`]. Every
//! operation first positions the resolver (on the target directory, or on the
//! parent of a file) and then performs a single native handle call.
//!
//! # Key Methods
//!
//! - **Access**: [`request_access`](HandleFs::request_access), [`resolve`](HandleFs::resolve)
//! - **Files**: [`open_file`](HandleFs::open_file), [`read_file`](HandleFs::read_file),
//!   [`write_file`](HandleFs::write_file), [`copy_file`](HandleFs::copy_file),
//!   [`rename`](HandleFs::rename)
//! - **Directories**: [`mkdir`](HandleFs::mkdir), [`rmdir`](HandleFs::rmdir),
//!   [`read_dir`](HandleFs::read_dir), [`walk`](HandleFs::walk),
//!   [`read_dir_recursive`](HandleFs::read_dir_recursive)
//!
//! # Concurrency
//!
//! Operations take `&mut self`: the resolver cursor is shared state, so
//! callers are serialized by the borrow checker. Share an instance across
//! tasks behind a `tokio::sync::Mutex` if needed.

use std::fmt;
use std::sync::Arc;

use futures::TryStreamExt;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::access::{AccessProvider, PickerAccess};
use crate::config::{ConfigError, FsConfig};
use crate::error::{
    ErrorKind, ErrorReport, ErrorReporter, ErrorSink, FsError, FsOpContext, Reported, ReturnMode,
};
use crate::handle::{DirRef, FileRef, HandleError, HandleKind};
use crate::path::FsPath;
use crate::resolver::{CursorSnapshot, PathResolver};
use crate::tree::TreeStats;

/// How [`HandleFs::write_file`] treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace the content
    #[default]
    Truncate,
    /// Keep the content and add to its end
    Append,
}

/// A file given either by path or by an already opened handle.
#[derive(Debug, Clone)]
pub enum FileTarget<'a> {
    Path(&'a FsPath),
    Handle(FileRef),
}

impl<'a> From<&'a FsPath> for FileTarget<'a> {
    fn from(path: &'a FsPath) -> Self {
        FileTarget::Path(path)
    }
}

impl From<FileRef> for FileTarget<'_> {
    fn from(handle: FileRef) -> Self {
        FileTarget::Handle(handle)
    }
}

impl From<&FileRef> for FileTarget<'_> {
    fn from(handle: &FileRef) -> Self {
        FileTarget::Handle(Arc::clone(handle))
    }
}

impl fmt::Display for FileTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileTarget::Path(path) => write!(f, "{path}"),
            FileTarget::Handle(handle) => write!(f, "<handle {}>", handle.name()),
        }
    }
}

/// One directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HandleKind,
    /// Absolute path of the entry
    pub path: FsPath,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == HandleKind::Directory
    }
}

fn ctx(operation: &'static str, path: impl fmt::Display) -> FsOpContext {
    FsOpContext::new().with_operation(operation).with_path(path)
}

/// Path-addressable filesystem over a granted directory handle.
#[derive(Debug)]
pub struct HandleFs {
    pub(crate) resolver: PathResolver,
    pub(crate) reporter: ErrorReporter,
}

impl HandleFs {
    /// Unbound instance; access is requested on first use.
    pub fn new(provider: Arc<dyn AccessProvider>) -> Self {
        Self {
            resolver: PathResolver::new(provider),
            reporter: ErrorReporter::default(),
        }
    }

    /// Instance built from `config`. `picker` is used in picker mode.
    pub async fn from_config(
        config: &FsConfig,
        picker: Option<PickerAccess>,
    ) -> Result<Self, ConfigError> {
        let provider = config.build_provider(picker).await?;
        let mut fs = Self::new(provider);
        fs.reporter = ErrorReporter::new(config.debug, config.return_mode);
        Ok(fs)
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn set_error_sink(&mut self, sink: ErrorSink) {
        self.reporter.set_sink(sink);
    }

    pub fn set_return_mode(&mut self, mode: ReturnMode) {
        self.reporter.set_return_mode(mode);
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.reporter.set_debug(debug);
    }

    /// Send `error` through the reporter, shaped by the return mode.
    pub fn report(&self, error: &FsError, func_name: &str) -> Reported {
        self.reporter.report(ErrorReport::from_error(error, func_name))
    }

    /// Cursor path, `None` before access is granted.
    pub fn current_path(&self) -> Option<&FsPath> {
        self.resolver.current_path()
    }

    /// Handle-cache statistics, `None` before access is granted.
    pub fn tree_stats(&self) -> Option<TreeStats> {
        self.resolver.tree().map(|tree| tree.stats())
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Grant (or re-grant) the root, discarding the handle cache.
    pub async fn request_access(&mut self) -> Result<(), FsError> {
        self.resolver.request_access().await
    }

    /// Resolve a directory path, see [`PathResolver::resolve`].
    pub async fn resolve(&mut self, path: &FsPath, create: bool) -> Result<DirRef, FsError> {
        self.resolver.resolve(path, create).await
    }

    /// Handle to the file at `path`. With `create`, a missing file is created
    /// empty; its parent directory must exist either way.
    #[instrument(level = "debug", skip(self), fields(path = %path))]
    pub async fn open_file(&mut self, path: &FsPath, create: bool) -> Result<FileRef, FsError> {
        let (dir, name) = self.resolver.resolve_parent(path).await?;
        let fallback = if create { ErrorKind::Write } else { ErrorKind::Read };
        dir.get_file_handle(name, create)
            .await
            .map_err(|e| FsError::from_handle(e, fallback, ctx("open_file", path)))
    }

    async fn file_for(&mut self, target: FileTarget<'_>, create: bool) -> Result<FileRef, FsError> {
        match target {
            FileTarget::Path(path) => self.open_file(path, create).await,
            FileTarget::Handle(handle) => Ok(handle),
        }
    }

    /// Whole content of a file.
    #[instrument(level = "debug", skip_all)]
    pub async fn read_file<'t>(
        &mut self,
        target: impl Into<FileTarget<'t>>,
    ) -> Result<Vec<u8>, FsError> {
        let target = target.into();
        let label = target.to_string();
        let file = self.file_for(target, false).await?;
        let contents = file
            .get_file()
            .await
            .map_err(|e| FsError::from_handle(e, ErrorKind::Read, ctx("read_file", &label)))?;
        debug!(file = %label, bytes = contents.len(), "Read file");
        Ok(contents.into_bytes())
    }

    /// Length of a file in bytes.
    #[instrument(level = "debug", skip_all)]
    pub async fn file_size<'t>(
        &mut self,
        target: impl Into<FileTarget<'t>>,
    ) -> Result<u64, FsError> {
        let target = target.into();
        let label = target.to_string();
        let file = self.file_for(target, false).await?;
        file.size()
            .await
            .map_err(|e| FsError::from_handle(e, ErrorKind::Read, ctx("file_size", &label)))
    }

    /// Whole content of a file as UTF-8 text.
    pub async fn read_file_text<'t>(
        &mut self,
        target: impl Into<FileTarget<'t>>,
    ) -> Result<String, FsError> {
        let target = target.into();
        let label = target.to_string();
        let bytes = self.read_file(target).await?;
        String::from_utf8(bytes).map_err(|e| FsError::InvalidText {
            path: label,
            source: e.utf8_error(),
        })
    }

    /// Write `data` to a file, creating it if missing.
    ///
    /// Content is committed when the writable stream closes; a failure before
    /// that leaves the previous content in place.
    #[instrument(level = "info", skip_all, fields(bytes = data.len(), mode = ?mode))]
    pub async fn write_file<'t>(
        &mut self,
        target: impl Into<FileTarget<'t>>,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), FsError> {
        let target = target.into();
        let label = target.to_string();
        let file = self.file_for(target, true).await?;
        let fail = |e: HandleError| {
            warn!(file = %label, error = %e, "Write failed");
            FsError::from_handle(e, ErrorKind::Write, ctx("write_file", &label))
        };

        let content = match mode {
            WriteMode::Truncate => data.to_vec(),
            WriteMode::Append => {
                let existing = file.get_file().await.map_err(fail)?;
                let mut content = existing.into_bytes();
                content.extend_from_slice(data);
                content
            }
        };

        let mut writable = file.create_writable().await.map_err(fail)?;
        writable.write(&content).await.map_err(fail)?;
        writable.close().await.map_err(fail)?;
        info!(file = %label, bytes = content.len(), "Wrote file");
        Ok(())
    }

    /// [`write_file`](Self::write_file) for text.
    pub async fn write_file_text<'t>(
        &mut self,
        target: impl Into<FileTarget<'t>>,
        text: &str,
        mode: WriteMode,
    ) -> Result<(), FsError> {
        self.write_file(target, text.as_bytes(), mode).await
    }

    /// True if `path` resolves to a directory.
    pub async fn exists(&mut self, path: &FsPath) -> bool {
        self.resolver.resolve(path, false).await.is_ok()
    }

    /// Create a directory. Without `recursive` the parent must exist; an
    /// existing directory is not an error.
    #[instrument(level = "info", skip(self), fields(path = %path))]
    pub async fn mkdir(&mut self, path: &FsPath, recursive: bool) -> Result<(), FsError> {
        self.resolver.resolve(&FsPath::root(), false).await?;
        if recursive && path.depth() > 1 {
            self.resolver.resolve(path, true).await?;
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            self.resolver.resolve(&parent, false).await?;
        }
        self.resolver.resolve(path, true).await?;
        Ok(())
    }

    /// Remove a directory.
    ///
    /// Without `recursive`, the directory must have no cached children. Only
    /// the handle cache is consulted for this check.
    #[instrument(level = "info", skip(self), fields(path = %path))]
    pub async fn rmdir(&mut self, path: &FsPath, recursive: bool) -> Result<(), FsError> {
        if path.is_root() {
            return Err(FsError::NoParent {
                path: path.to_string(),
            });
        }
        let handle = self.resolver.resolve(path, false).await?;

        let has_cached_children = self
            .resolver
            .tree()
            .and_then(|tree| tree.node(path))
            .is_some_and(|node| node.has_children());
        if !recursive && has_cached_children {
            warn!("Directory has cached children");
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_string(),
            });
        }

        handle
            .remove(recursive)
            .await
            .map_err(|e| FsError::from_handle(e, ErrorKind::Delete, ctx("rmdir", path)))?;
        self.resolver.forget(path);
        info!("Removed directory");
        Ok(())
    }

    /// Remove a directory (as [`rmdir`](Self::rmdir)) or a file.
    #[instrument(level = "info", skip(self), fields(path = %path))]
    pub async fn rm(&mut self, path: &FsPath, recursive: bool) -> Result<(), FsError> {
        if self.exists(path).await {
            return self.rmdir(path, recursive).await;
        }
        let (dir, name) = self.resolver.resolve_parent(path).await?;
        dir.remove_entry(name, recursive)
            .await
            .map_err(|e| FsError::from_handle(e, ErrorKind::Delete, ctx("rm", path)))?;
        info!("Removed file");
        Ok(())
    }

    /// Copy the bytes of `src` into `dst`, creating `dst` if missing.
    #[instrument(level = "info", skip(self), fields(src = %src, dst = %dst))]
    pub async fn copy_file(&mut self, src: &FsPath, dst: &FsPath) -> Result<(), FsError> {
        let source = self.open_file(src, false).await?;
        let target = self.open_file(dst, true).await?;
        let data = self.read_file(&source).await?;
        self.write_file(&target, &data, WriteMode::Truncate).await
    }

    /// Copy `src` to `dst`, then remove `src`. Renaming a file onto itself
    /// only checks that it exists.
    #[instrument(level = "info", skip(self), fields(src = %src, dst = %dst))]
    pub async fn rename(&mut self, src: &FsPath, dst: &FsPath) -> Result<(), FsError> {
        if src == dst {
            self.open_file(src, false).await?;
            debug!("Source and destination are the same file");
            return Ok(());
        }
        self.copy_file(src, dst).await?;
        self.rm(src, false).await
    }

    /// Entries of one directory, in enumeration order.
    #[instrument(level = "debug", skip(self), fields(path = %path))]
    pub async fn read_dir(&mut self, path: &FsPath) -> Result<Vec<DirEntry>, FsError> {
        let dir = self.resolver.resolve(path, false).await?;
        let entries: Vec<DirEntry> = dir
            .entries()
            .map_ok(|(name, handle)| DirEntry {
                path: path.join(&name),
                kind: handle.kind(),
                name,
            })
            .try_collect()
            .await
            .map_err(|e| FsError::from_handle(e, ErrorKind::Read, ctx("read_dir", path)))?;
        debug!(count = entries.len(), "Listed directory");
        Ok(entries)
    }

    /// Kept for API parity; there is nothing to release.
    pub async fn close(&mut self) -> Result<(), FsError> {
        Ok(())
    }

    /// Save the resolver cursor.
    pub fn snapshot(&self) -> Option<CursorSnapshot> {
        self.resolver.snapshot()
    }

    /// Restore a cursor saved with [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, snapshot: CursorSnapshot) {
        self.resolver.restore(snapshot);
    }
}
