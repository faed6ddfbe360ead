//! Local-disk handles on top of `tokio::fs`.
//!
//! Writable streams go to a sibling `<name>.crswap` file that is renamed over
//! the target on `close`, so readers never observe a partial write. Swap
//! files are hidden from enumeration. Symlinks are neither listed nor
//! followed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use super::{
    DirRef, DirectoryHandle, EntryStream, FileContents, FileHandle, FileRef, Handle,
    HandleError, HandleKind, WritableFile, validate_name,
};

const SWAP_SUFFIX: &str = ".crswap";

/// Directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    name: String,
    path: PathBuf,
}

impl LocalDirectory {
    /// Open an existing directory as an access root.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, HandleError> {
        let path = path.into();
        let display = path.display().to_string();
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| HandleError::from_io(&display, e))?;
        if !metadata.is_dir() {
            return Err(HandleError::TypeMismatch {
                name: display,
                expected: HandleKind::Directory,
            });
        }
        debug!(path = %path.display(), "Opened local directory root");
        Ok(Self {
            name: String::new(),
            path,
        })
    }

    /// Location of this directory on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_ref(self) -> DirRef {
        Arc::new(self)
    }

    fn child(&self, name: &str) -> LocalDirectory {
        LocalDirectory {
            name: name.to_string(),
            path: self.path.join(name),
        }
    }

    fn child_file(&self, name: &str) -> LocalFile {
        LocalFile {
            name: name.to_string(),
            path: self.path.join(name),
        }
    }
}

/// Symlinks may lead outside the granted root, so they are never followed.
fn symlink_refused(name: &str) -> HandleError {
    warn!(name, "Refusing to follow symlink");
    HandleError::PermissionDenied {
        name: name.to_string(),
    }
}

async fn remove_path(path: &Path, name: &str, recursive: bool) -> Result<(), HandleError> {
    let metadata = fs::symlink_metadata(path)
        .await
        .map_err(|e| HandleError::from_io(name, e))?;
    let result = if metadata.is_dir() {
        if recursive {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_dir(path).await
        }
    } else {
        fs::remove_file(path).await
    };
    result.map_err(|e| HandleError::from_io(name, e))
}

#[async_trait]
impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_directory_handle(&self, name: &str, create: bool) -> Result<DirRef, HandleError> {
        validate_name(name)?;
        let child = self.child(name);
        match fs::symlink_metadata(&child.path).await {
            Ok(metadata) if metadata.is_symlink() => Err(symlink_refused(name)),
            Ok(metadata) if metadata.is_dir() => Ok(Arc::new(child)),
            Ok(_) => Err(HandleError::TypeMismatch {
                name: name.to_string(),
                expected: HandleKind::Directory,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && create => {
                trace!(path = %child.path.display(), "Creating local directory");
                match fs::create_dir(&child.path).await {
                    Ok(()) => Ok(Arc::new(child)),
                    // Lost a race with another creator; the directory exists now
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(Arc::new(child)),
                    Err(e) => Err(HandleError::from_io(name, e)),
                }
            }
            Err(e) => Err(HandleError::from_io(name, e)),
        }
    }

    async fn get_file_handle(&self, name: &str, create: bool) -> Result<FileRef, HandleError> {
        validate_name(name)?;
        let file = self.child_file(name);
        match fs::symlink_metadata(&file.path).await {
            Ok(metadata) if metadata.is_symlink() => Err(symlink_refused(name)),
            Ok(metadata) if metadata.is_file() => Ok(Arc::new(file)),
            Ok(_) => Err(HandleError::TypeMismatch {
                name: name.to_string(),
                expected: HandleKind::File,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && create => {
                trace!(path = %file.path.display(), "Creating empty local file");
                fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&file.path)
                    .await
                    .map_err(|e| HandleError::from_io(name, e))?;
                Ok(Arc::new(file))
            }
            Err(e) => Err(HandleError::from_io(name, e)),
        }
    }

    fn entries(&self) -> EntryStream {
        enum State {
            Start(LocalDirectory),
            Reading(LocalDirectory, fs::ReadDir),
            Done,
        }

        stream::unfold(State::Start(self.clone()), |state| async move {
            let (dir, mut read_dir) = match state {
                State::Done => return None,
                State::Reading(dir, read_dir) => (dir, read_dir),
                State::Start(dir) => match fs::read_dir(&dir.path).await {
                    Ok(read_dir) => (dir, read_dir),
                    Err(e) => {
                        let err = HandleError::from_io(dir.name.clone(), e);
                        return Some((Err(err), State::Done));
                    }
                },
            };

            loop {
                let entry = match read_dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => return None,
                    Err(e) => {
                        let err = HandleError::from_io(dir.name.clone(), e);
                        return Some((Err(err), State::Done));
                    }
                };

                let Ok(name) = entry.file_name().into_string() else {
                    warn!(path = %entry.path().display(), "Skipping entry with non UTF-8 name");
                    continue;
                };
                if name.ends_with(SWAP_SUFFIX) {
                    continue;
                }

                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        let err = HandleError::from_io(name, e);
                        return Some((Err(err), State::Reading(dir, read_dir)));
                    }
                };
                if file_type.is_symlink() {
                    trace!(name = %name, "Skipping symlink");
                    continue;
                }
                let handle = if file_type.is_dir() {
                    Handle::Directory(Arc::new(dir.child(&name)))
                } else {
                    Handle::File(Arc::new(dir.child_file(&name)))
                };
                return Some((Ok((name, handle)), State::Reading(dir, read_dir)));
            }
        })
        .boxed()
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), HandleError> {
        validate_name(name)?;
        remove_path(&self.path.join(name), name, recursive).await
    }

    async fn remove(&self, recursive: bool) -> Result<(), HandleError> {
        if self.name.is_empty() {
            return Err(HandleError::PermissionDenied {
                name: self.path.display().to_string(),
            });
        }
        remove_path(&self.path, &self.name, recursive).await
    }
}

/// Regular file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    name: String,
    path: PathBuf,
}

impl LocalFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn swap_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}{SWAP_SUFFIX}", self.name))
    }
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_file(&self) -> Result<FileContents, HandleError> {
        let data = fs::read(&self.path)
            .await
            .map_err(|e| HandleError::from_io(&self.name, e))?;
        Ok(FileContents::new(self.name.clone(), data))
    }

    async fn size(&self) -> Result<u64, HandleError> {
        let metadata = fs::symlink_metadata(&self.path)
            .await
            .map_err(|e| HandleError::from_io(&self.name, e))?;
        Ok(metadata.len())
    }

    async fn create_writable(&self) -> Result<Box<dyn WritableFile>, HandleError> {
        let swap = self.swap_path();
        let file = fs::File::create(&swap)
            .await
            .map_err(|e| HandleError::from_io(&self.name, e))?;
        trace!(swap = %swap.display(), "Opened swap file for writing");
        Ok(Box::new(LocalWritable {
            name: self.name.clone(),
            target: self.path.clone(),
            swap,
            file: Some(file),
        }))
    }
}

struct LocalWritable {
    name: String,
    target: PathBuf,
    swap: PathBuf,
    file: Option<fs::File>,
}

impl LocalWritable {
    async fn discard_swap(&self) {
        if let Err(e) = fs::remove_file(&self.swap).await {
            warn!(swap = %self.swap.display(), error = %e, "Failed to clean up swap file");
        }
    }
}

impl Drop for LocalWritable {
    fn drop(&mut self) {
        // Dropped without close: nothing was committed
        if self.file.take().is_some() {
            let _ = std::fs::remove_file(&self.swap);
        }
    }
}

#[async_trait]
impl WritableFile for LocalWritable {
    async fn write(&mut self, data: &[u8]) -> Result<(), HandleError> {
        let file = self.file.as_mut().ok_or_else(|| HandleError::Stale {
            name: self.name.clone(),
        })?;
        file.write_all(data)
            .await
            .map_err(|e| HandleError::from_io(&self.name, e))
    }

    async fn close(&mut self) -> Result<(), HandleError> {
        let mut file = self.file.take().ok_or_else(|| HandleError::Stale {
            name: self.name.clone(),
        })?;

        let flushed = match file.flush().await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };
        drop(file);
        if let Err(e) = flushed {
            self.discard_swap().await;
            return Err(HandleError::from_io(&self.name, e));
        }

        if let Err(e) = fs::rename(&self.swap, &self.target).await {
            self.discard_swap().await;
            return Err(HandleError::from_io(&self.name, e));
        }
        trace!(target = %self.target.display(), "Committed swap file");
        Ok(())
    }
}
