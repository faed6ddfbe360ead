//! Path-to-handle resolution with a cached handle tree.
//!
//! A [`PathResolver`] is either unbound (no root granted yet) or positioned:
//! it owns the [`HandleTree`] built since the last grant and a [`Cursor`]
//! naming the last successfully resolved directory.
//!
//! # Resolution
//!
//! `resolve(path, create)` walks `path` segment by segment from the root.
//! Each segment is looked up under the current handle; the result is recorded
//! in the tree (first handle wins) and the cursor advances. When a lookup
//! fails:
//!
//! - `create == false`: the cursor is restored to its value before the call
//! - `create == true`: the directory is created instead. If creation fails
//!   too, nothing is rolled back. Directories created by earlier segments stay
//!   in the store and in the tree, and the cursor stays on the last segment
//!   that resolved.
//!
//! An unbound resolver requests access before its first resolution.

use std::sync::Arc;

use tracing::{debug, info, instrument, trace, warn};

use crate::access::AccessProvider;
use crate::error::{ErrorKind, FsError, FsOpContext};
use crate::handle::{DirRef, HandleError};
use crate::path::FsPath;
use crate::tree::{HandleTree, TreeNode};

/// Current position of a resolver.
#[derive(Debug, Clone)]
pub struct Cursor {
    handle: DirRef,
    path: FsPath,
}

impl Cursor {
    fn at_root(root: DirRef) -> Self {
        Self {
            handle: root,
            path: FsPath::root(),
        }
    }

    pub fn handle(&self) -> &DirRef {
        &self.handle
    }

    pub fn path(&self) -> &FsPath {
        &self.path
    }
}

/// Saved cursor, restored with [`PathResolver::restore`].
#[derive(Debug, Clone)]
pub struct CursorSnapshot(Cursor);

impl CursorSnapshot {
    pub fn path(&self) -> &FsPath {
        &self.0.path
    }

    pub fn handle(&self) -> &DirRef {
        &self.0.handle
    }
}

#[derive(Debug)]
struct Binding {
    tree: HandleTree,
    cursor: Cursor,
}

impl Binding {
    fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot(self.cursor.clone())
    }

    fn restore(&mut self, snapshot: CursorSnapshot) {
        trace!(path = %snapshot.0.path, "Restoring cursor");
        self.cursor = snapshot.0;
    }
}

/// Resolves absolute paths to directory handles.
#[derive(Debug)]
pub struct PathResolver {
    provider: Arc<dyn AccessProvider>,
    binding: Option<Binding>,
}

impl PathResolver {
    /// Unbound resolver drawing its root from `provider`.
    pub fn new(provider: Arc<dyn AccessProvider>) -> Self {
        Self {
            provider,
            binding: None,
        }
    }

    /// True once a root has been granted.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn tree(&self) -> Option<&HandleTree> {
        self.binding.as_ref().map(|b| &b.tree)
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.binding.as_ref().map(|b| &b.cursor)
    }

    /// Path of the cursor, `None` while unbound.
    pub fn current_path(&self) -> Option<&FsPath> {
        self.cursor().map(Cursor::path)
    }

    /// Ask the provider for a root. On success the tree and cursor start
    /// over at `/`; on failure the previous state is kept.
    #[instrument(level = "info", skip(self))]
    pub async fn request_access(&mut self) -> Result<(), FsError> {
        let binding = self.grant().await?;
        self.binding = Some(binding);
        info!("Access granted");
        Ok(())
    }

    async fn grant(&self) -> Result<Binding, FsError> {
        let root = self.provider.request_root().await.map_err(|e| {
            warn!(error = %e, "Access request failed");
            FsError::from(e)
        })?;
        Ok(Binding {
            tree: HandleTree::new(Arc::clone(&root)),
            cursor: Cursor::at_root(root),
        })
    }

    async fn bind(&mut self) -> Result<&mut Binding, FsError> {
        let binding = match self.binding.take() {
            Some(binding) => binding,
            None => {
                debug!("Resolver unbound, requesting access");
                self.grant().await?
            }
        };
        Ok(self.binding.insert(binding))
    }

    /// Save the cursor. `None` while unbound.
    pub fn snapshot(&self) -> Option<CursorSnapshot> {
        self.binding.as_ref().map(Binding::snapshot)
    }

    /// Put the cursor back where `snapshot` was taken.
    pub fn restore(&mut self, snapshot: CursorSnapshot) {
        if let Some(binding) = self.binding.as_mut() {
            binding.restore(snapshot);
        }
    }

    /// Move the cursor to `/` without touching the tree.
    pub fn reset_to_root(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            let root = Arc::clone(binding.tree.root().handle());
            binding.cursor = Cursor::at_root(root);
        }
    }

    /// Resolve `path` to a directory handle, creating missing segments when
    /// `create` is set. Leaves the cursor on the result.
    #[instrument(level = "debug", skip(self), fields(path = %path))]
    pub async fn resolve(&mut self, path: &FsPath, create: bool) -> Result<DirRef, FsError> {
        let binding = self.bind().await?;
        let root = Arc::clone(binding.tree.root().handle());

        if path.is_root() {
            binding.cursor = Cursor::at_root(Arc::clone(&root));
            return Ok(root);
        }

        let snapshot = binding.snapshot();
        let mut current = FsPath::root();
        let mut handle = root;

        for segment in path.segments() {
            let found = match handle.get_directory_handle(segment, false).await {
                Ok(found) => found,
                Err(lookup) if create => {
                    trace!(segment, reason = %lookup, "Creating missing segment");
                    handle
                        .get_directory_handle(segment, true)
                        .await
                        .map_err(|e| {
                            warn!(segment, error = %e, resolved = %current, "Segment creation failed");
                            FsError::from_handle(
                                e,
                                ErrorKind::Mkdir,
                                FsOpContext::new().with_operation("resolve").with_path(path),
                            )
                        })?
                }
                Err(e) => {
                    debug!(segment, error = %e, "Resolution failed, restoring cursor");
                    binding.restore(snapshot);
                    return Err(lookup_error(e, path, segment));
                }
            };

            binding.tree.add_child(&current, segment, Arc::clone(&found));
            let next = current.join(segment);
            // The first handle recorded for a path stays authoritative
            handle = binding
                .tree
                .node(&next)
                .map(|node| Arc::clone(node.handle()))
                .unwrap_or(found);
            binding.cursor = Cursor {
                handle: Arc::clone(&handle),
                path: next.clone(),
            };
            current = next;
        }

        debug!(cached = binding.tree.cached_entries(), "Resolved");
        Ok(handle)
    }

    /// Resolve the directory containing `path` (without creating anything)
    /// and return it with the final segment.
    pub async fn resolve_parent<'p>(
        &mut self,
        path: &'p FsPath,
    ) -> Result<(DirRef, &'p str), FsError> {
        self.bind().await?;
        let (parent, name) = path.split().ok_or_else(|| FsError::NoParent {
            path: path.to_string(),
        })?;
        let dir = self.resolve(&parent, false).await?;
        Ok((dir, name))
    }

    /// Drop the cached node for a removed directory and move the cursor to
    /// its parent.
    pub(crate) fn forget(&mut self, path: &FsPath) -> Option<TreeNode> {
        let binding = self.binding.as_mut()?;
        let (parent, name) = path.split()?;
        let removed = binding.tree.remove_child(&parent, name);

        let parent_handle = binding
            .tree
            .node(&parent)
            .map(|node| Arc::clone(node.handle()));
        if let Some(handle) = parent_handle {
            binding.cursor = Cursor {
                handle,
                path: parent,
            };
        }
        removed
    }
}

fn lookup_error(error: HandleError, path: &FsPath, segment: &str) -> FsError {
    if error.is_not_found() {
        return FsError::NotExist {
            path: path.to_string(),
            segment: segment.to_string(),
        };
    }
    FsError::from_handle(
        error,
        ErrorKind::NotExist,
        FsOpContext::new().with_operation("resolve").with_path(path),
    )
}
