//! In-memory handle store.
//!
//! Serves as the origin-private storage root when no directory is configured,
//! and as the backing store for tests. Faults can be injected per entry name
//! to simulate stores that refuse an operation for reasons other than
//! absence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::trace;

use super::{
    DirRef, DirectoryHandle, EntryStream, FileContents, FileHandle, FileRef, Handle,
    HandleError, HandleKind, WritableFile, validate_name,
};

/// Failure injected for a given entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every lookup, creation and write touching the entry is refused.
    PermissionDenied,
    /// Writes to the entry fail as if the store were full.
    QuotaExceeded,
}

#[derive(Debug, Default)]
struct FaultPlan {
    faults: Mutex<HashMap<String, Fault>>,
}

impl FaultPlan {
    fn get(&self, name: &str) -> Option<Fault> {
        lock(&self.faults).get(name).copied()
    }

    fn check_access(&self, name: &str) -> Result<(), HandleError> {
        match self.get(name) {
            Some(Fault::PermissionDenied) => Err(HandleError::PermissionDenied {
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_write(&self, name: &str) -> Result<(), HandleError> {
        match self.get(name) {
            Some(Fault::PermissionDenied) => Err(HandleError::PermissionDenied {
                name: name.to_string(),
            }),
            Some(Fault::QuotaExceeded) => Err(HandleError::QuotaExceeded {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

type DirState = Arc<Mutex<MemoryDirState>>;
type FileData = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Default)]
struct MemoryDirState {
    entries: Vec<(String, MemoryEntry)>,
    removed: bool,
}

impl MemoryDirState {
    fn find(&self, name: &str) -> Option<&MemoryEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Directory(DirState),
    File(FileData),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn mark_removed(state: &DirState) {
    let mut guard = lock(state);
    guard.removed = true;
    for (_, entry) in &guard.entries {
        if let MemoryEntry::Directory(child) = entry {
            mark_removed(child);
        }
    }
}

fn is_empty_dir(state: &DirState) -> bool {
    lock(state).entries.is_empty()
}

/// Directory handle into an in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    name: String,
    state: DirState,
    parent: Option<Weak<Mutex<MemoryDirState>>>,
    faults: Arc<FaultPlan>,
}

impl MemoryDirectory {
    /// Create a fresh, empty store and return its root.
    pub fn new_root() -> Self {
        Self {
            name: String::new(),
            state: Arc::default(),
            parent: None,
            faults: Arc::default(),
        }
    }

    /// Shared handle to this directory.
    pub fn into_ref(self) -> DirRef {
        Arc::new(self)
    }

    /// Make every operation on entries called `name` fail with `fault`.
    ///
    /// The plan is shared by all handles of the same store.
    pub fn fail_on(&self, name: &str, fault: Fault) {
        lock(&self.faults.faults).insert(name.to_string(), fault);
    }

    /// Remove a previously injected fault.
    pub fn clear_fault(&self, name: &str) {
        lock(&self.faults.faults).remove(name);
    }

    fn child_dir(&self, name: &str, state: DirState) -> MemoryDirectory {
        MemoryDirectory {
            name: name.to_string(),
            state,
            parent: Some(Arc::downgrade(&self.state)),
            faults: Arc::clone(&self.faults),
        }
    }

    fn child_file(&self, name: &str, data: FileData) -> MemoryFile {
        MemoryFile {
            name: name.to_string(),
            data,
            faults: Arc::clone(&self.faults),
        }
    }

    fn ensure_live(&self) -> Result<MutexGuard<'_, MemoryDirState>, HandleError> {
        let guard = lock(&self.state);
        if guard.removed {
            return Err(HandleError::Stale {
                name: self.name.clone(),
            });
        }
        Ok(guard)
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_directory_handle(&self, name: &str, create: bool) -> Result<DirRef, HandleError> {
        validate_name(name)?;
        self.faults.check_access(name)?;
        let mut guard = self.ensure_live()?;

        match guard.find(name) {
            Some(MemoryEntry::Directory(state)) => {
                let state = Arc::clone(state);
                drop(guard);
                Ok(Arc::new(self.child_dir(name, state)))
            }
            Some(MemoryEntry::File(_)) => Err(HandleError::TypeMismatch {
                name: name.to_string(),
                expected: HandleKind::Directory,
            }),
            None if create => {
                trace!(name = %name, parent = %self.name, "Creating in-memory directory");
                let state: DirState = Arc::default();
                guard
                    .entries
                    .push((name.to_string(), MemoryEntry::Directory(Arc::clone(&state))));
                drop(guard);
                Ok(Arc::new(self.child_dir(name, state)))
            }
            None => Err(HandleError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn get_file_handle(&self, name: &str, create: bool) -> Result<FileRef, HandleError> {
        validate_name(name)?;
        self.faults.check_access(name)?;
        let mut guard = self.ensure_live()?;

        match guard.find(name) {
            Some(MemoryEntry::File(data)) => {
                let data = Arc::clone(data);
                drop(guard);
                Ok(Arc::new(self.child_file(name, data)))
            }
            Some(MemoryEntry::Directory(_)) => Err(HandleError::TypeMismatch {
                name: name.to_string(),
                expected: HandleKind::File,
            }),
            None if create => {
                trace!(name = %name, parent = %self.name, "Creating in-memory file");
                let data: FileData = Arc::default();
                guard
                    .entries
                    .push((name.to_string(), MemoryEntry::File(Arc::clone(&data))));
                drop(guard);
                Ok(Arc::new(self.child_file(name, data)))
            }
            None => Err(HandleError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    fn entries(&self) -> EntryStream {
        let snapshot: Result<Vec<(String, Handle)>, HandleError> =
            self.ensure_live().map(|guard| {
                guard
                    .entries
                    .iter()
                    .map(|(name, entry)| {
                        let handle = match entry {
                            MemoryEntry::Directory(state) => Handle::Directory(Arc::new(
                                self.child_dir(name, Arc::clone(state)),
                            )),
                            MemoryEntry::File(data) => {
                                Handle::File(Arc::new(self.child_file(name, Arc::clone(data))))
                            }
                        };
                        (name.clone(), handle)
                    })
                    .collect()
            });

        match snapshot {
            Ok(entries) => stream::iter(entries.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err::<(String, Handle), _>(e) }).boxed(),
        }
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), HandleError> {
        validate_name(name)?;
        self.faults.check_access(name)?;
        let mut guard = self.ensure_live()?;

        let index = guard.position(name).ok_or_else(|| HandleError::NotFound {
            name: name.to_string(),
        })?;
        if let MemoryEntry::Directory(state) = &guard.entries[index].1 {
            if !recursive && !is_empty_dir(state) {
                return Err(HandleError::NotEmpty {
                    name: name.to_string(),
                });
            }
            mark_removed(state);
        }
        guard.entries.remove(index);
        trace!(name = %name, parent = %self.name, "Removed in-memory entry");
        Ok(())
    }

    async fn remove(&self, recursive: bool) -> Result<(), HandleError> {
        let Some(parent) = self.parent.as_ref() else {
            return Err(HandleError::PermissionDenied {
                name: self.name.clone(),
            });
        };
        let parent = parent.upgrade().ok_or_else(|| HandleError::Stale {
            name: self.name.clone(),
        })?;
        self.faults.check_access(&self.name)?;

        let mut guard = lock(&parent);
        let index = guard
            .entries
            .iter()
            .position(|(_, entry)| {
                matches!(entry, MemoryEntry::Directory(state) if Arc::ptr_eq(state, &self.state))
            })
            .ok_or_else(|| HandleError::NotFound {
                name: self.name.clone(),
            })?;

        if !recursive && !is_empty_dir(&self.state) {
            return Err(HandleError::NotEmpty {
                name: self.name.clone(),
            });
        }
        guard.entries.remove(index);
        drop(guard);
        mark_removed(&self.state);
        Ok(())
    }
}

/// File handle into an in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: FileData,
    faults: Arc<FaultPlan>,
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_file(&self) -> Result<FileContents, HandleError> {
        self.faults.check_access(&self.name)?;
        let data = lock(&self.data).clone();
        Ok(FileContents::new(self.name.clone(), data))
    }

    async fn size(&self) -> Result<u64, HandleError> {
        self.faults.check_access(&self.name)?;
        Ok(lock(&self.data).len() as u64)
    }

    async fn create_writable(&self) -> Result<Box<dyn WritableFile>, HandleError> {
        self.faults.check_write(&self.name)?;
        Ok(Box::new(MemoryWritable {
            name: self.name.clone(),
            target: Arc::clone(&self.data),
            faults: Arc::clone(&self.faults),
            buffer: Some(Vec::new()),
        }))
    }
}

/// Writer that swaps its buffer into the file on `close`.
struct MemoryWritable {
    name: String,
    target: FileData,
    faults: Arc<FaultPlan>,
    buffer: Option<Vec<u8>>,
}

#[async_trait]
impl WritableFile for MemoryWritable {
    async fn write(&mut self, data: &[u8]) -> Result<(), HandleError> {
        self.faults.check_write(&self.name)?;
        let buffer = self.buffer.as_mut().ok_or_else(|| HandleError::Stale {
            name: self.name.clone(),
        })?;
        buffer.extend_from_slice(data);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), HandleError> {
        let buffer = self.buffer.take().ok_or_else(|| HandleError::Stale {
            name: self.name.clone(),
        })?;
        *lock(&self.target) = buffer;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn names(dir: &dyn DirectoryHandle) -> Vec<(String, HandleKind)> {
        dir.entries()
            .map_ok(|(name, handle)| (name, handle.kind()))
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_directory_lookup_and_create() {
        let root = MemoryDirectory::new_root();

        let err = root.get_directory_handle("docs", false).await.unwrap_err();
        assert!(err.is_not_found());

        let docs = root.get_directory_handle("docs", true).await.unwrap();
        assert_eq!(docs.name(), "docs");

        // Second lookup finds the same directory
        docs.get_file_handle("a.txt", true).await.unwrap();
        let again = root.get_directory_handle("docs", false).await.unwrap();
        assert_eq!(names(&*again).await, vec![("a.txt".to_string(), HandleKind::File)]);
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let root = MemoryDirectory::new_root();
        root.get_file_handle("note", true).await.unwrap();

        let err = root.get_directory_handle("note", true).await.unwrap_err();
        assert!(matches!(err, HandleError::TypeMismatch { expected: HandleKind::Directory, .. }));
    }

    #[tokio::test]
    async fn test_entries_preserve_insertion_order() {
        let root = MemoryDirectory::new_root();
        root.get_file_handle("b", true).await.unwrap();
        root.get_directory_handle("a", true).await.unwrap();
        root.get_file_handle("c", true).await.unwrap();

        let listed: Vec<String> = names(&root).await.into_iter().map(|(n, _)| n).collect();
        assert_eq!(listed, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_writable_commits_on_close() {
        let root = MemoryDirectory::new_root();
        let file = root.get_file_handle("f", true).await.unwrap();

        let mut writer = file.create_writable().await.unwrap();
        writer.write(b"hello").await.unwrap();
        assert!(file.get_file().await.unwrap().is_empty());

        writer.close().await.unwrap();
        assert_eq!(file.get_file().await.unwrap().bytes(), b"hello");

        let err = writer.write(b"more").await.unwrap_err();
        assert!(matches!(err, HandleError::Stale { .. }));
    }

    #[tokio::test]
    async fn test_remove_self_requires_recursive_when_populated() {
        let root = MemoryDirectory::new_root();
        let dir = root.get_directory_handle("d", true).await.unwrap();
        dir.get_file_handle("x", true).await.unwrap();

        let err = dir.remove(false).await.unwrap_err();
        assert!(matches!(err, HandleError::NotEmpty { .. }));

        dir.remove(true).await.unwrap();
        assert!(names(&root).await.is_empty());

        // Handle to a removed directory is stale
        let err = dir.get_file_handle("x", false).await.unwrap_err();
        assert!(matches!(err, HandleError::Stale { .. }));
    }

    #[tokio::test]
    async fn test_injected_fault() {
        let root = MemoryDirectory::new_root();
        root.fail_on("locked", Fault::PermissionDenied);

        let err = root.get_directory_handle("locked", true).await.unwrap_err();
        assert!(matches!(err, HandleError::PermissionDenied { .. }));

        root.clear_fault("locked");
        assert!(root.get_directory_handle("locked", true).await.is_ok());
    }

    #[tokio::test]
    async fn test_quota_fault_on_write() {
        let root = MemoryDirectory::new_root();
        let file = root.get_file_handle("big.bin", true).await.unwrap();
        root.fail_on("big.bin", Fault::QuotaExceeded);

        let err = file.create_writable().await.err().unwrap();
        assert!(matches!(err, HandleError::QuotaExceeded { .. }));
    }
}
