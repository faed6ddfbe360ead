//! Recursive directory listing.
//!
//! [`HandleFs::walk`] yields entries depth-first in pre-order: each entry is
//! emitted before the contents of the directory it names, siblings in the
//! order the store enumerates them. Subdirectories are resolved through the
//! resolver (from the root), so a walk also fills the handle cache.
//!
//! [`HandleFs::read_dir_recursive`] drives the same walk and reports it as a
//! sequence of [`WalkEvent`]s.

use std::pin::pin;

use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, instrument, trace};

use crate::error::{ErrorKind, ErrorReport, FsError, FsOpContext};
use crate::fs::{DirEntry, HandleFs};
use crate::handle::{EntryStream, Handle};
use crate::path::FsPath;

/// Event emitted by [`HandleFs::read_dir_recursive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// One entry, in pre-order
    Data(DirEntry),
    /// The walk finished
    End,
    /// A failure; the walk continues where it can
    Error(ErrorReport),
}

struct Frame {
    path: FsPath,
    entries: EntryStream,
}

struct WalkState<'a> {
    fs: &'a mut HandleFs,
    start: Option<FsPath>,
    stack: Vec<Frame>,
    pending: Option<FsError>,
}

impl HandleFs {
    /// Lazily walk the tree below `path`.
    ///
    /// Failing to resolve `path` yields one error and ends the stream. Errors
    /// further down are yielded in place and the walk moves on to the next
    /// sibling. Dropping the stream stops enumeration.
    pub fn walk(&mut self, path: FsPath) -> impl Stream<Item = Result<DirEntry, FsError>> + '_ {
        let state = WalkState {
            fs: self,
            start: Some(path),
            stack: Vec::new(),
            pending: None,
        };

        stream::unfold(state, |mut st| async move {
            if let Some(error) = st.pending.take() {
                return Some((Err(error), st));
            }

            if let Some(root) = st.start.take() {
                match st.fs.resolver.resolve(&root, false).await {
                    Ok(dir) => st.stack.push(Frame {
                        entries: dir.entries(),
                        path: root,
                    }),
                    Err(e) => return Some((Err(e), st)),
                }
            }

            loop {
                let frame = st.stack.last_mut()?;
                match frame.entries.next().await {
                    None => {
                        trace!(path = %frame.path, "Directory exhausted");
                        st.stack.pop();
                    }
                    Some(Err(e)) => {
                        let error = FsError::from_handle(
                            e,
                            ErrorKind::Read,
                            FsOpContext::new().with_operation("walk").with_path(&frame.path),
                        );
                        st.stack.pop();
                        return Some((Err(error), st));
                    }
                    Some(Ok((name, handle))) => {
                        let path = frame.path.join(&name);
                        let entry = DirEntry {
                            name,
                            kind: handle.kind(),
                            path: path.clone(),
                        };

                        st.fs.resolver.reset_to_root();
                        if let Handle::Directory(_) = handle {
                            match st.fs.resolver.resolve(&path, false).await {
                                Ok(dir) => st.stack.push(Frame {
                                    entries: dir.entries(),
                                    path,
                                }),
                                Err(e) => st.pending = Some(e),
                            }
                        }
                        return Some((Ok(entry), st));
                    }
                }
            }
        })
    }

    /// Walk `path` and feed every entry to `callback` as a [`WalkEvent`].
    ///
    /// - access cannot be granted: reported, `Err` returned, no events
    /// - `path` does not resolve: one `Error` event, reported, `Err` returned
    /// - errors during the walk: an `Error` event each, the walk continues
    ///
    /// A walk that got started always ends with [`WalkEvent::End`].
    #[instrument(level = "debug", skip(self, callback), fields(path = %path))]
    pub async fn read_dir_recursive<F>(
        &mut self,
        path: &FsPath,
        mut callback: F,
    ) -> Result<(), FsError>
    where
        F: FnMut(WalkEvent),
    {
        const FUNC: &str = "read_dir_recursive";

        if !self.resolver.is_bound()
            && let Err(e) = self.resolver.request_access().await
        {
            self.report(&e, FUNC);
            return Err(e);
        }

        if let Err(e) = self.resolver.resolve(path, false).await {
            let report = ErrorReport::from_error(&e, FUNC);
            callback(WalkEvent::Error(report.clone()));
            self.reporter.report(report);
            return Err(e);
        }

        let reporter = self.reporter.clone();
        let mut emitted = 0usize;
        let mut errors = 0usize;
        let mut entries = pin!(self.walk(path.clone()));
        while let Some(item) = entries.next().await {
            match item {
                Ok(entry) => {
                    emitted += 1;
                    callback(WalkEvent::Data(entry));
                }
                Err(e) => {
                    errors += 1;
                    let report = ErrorReport::from_error(&e, FUNC);
                    callback(WalkEvent::Error(report.clone()));
                    reporter.report(report);
                }
            }
        }

        callback(WalkEvent::End);
        debug!(entries = emitted, errors, "Recursive listing finished");
        Ok(())
    }
}
