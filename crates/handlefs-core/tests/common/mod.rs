//! Shared helpers for handlefs integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use handlefs_core::access::StorageRootAccess;
use handlefs_core::handle::MemoryDirectory;
use handlefs_core::{FsPath, HandleFs, WalkEvent};

/// Parse an absolute path, panicking on malformed test input.
pub fn p(path: &str) -> FsPath {
    FsPath::parse(path).expect("test path must be valid")
}

/// Instance over a fresh in-memory store. The store root is returned too so
/// tests can inspect it or inject faults.
pub fn memory_fs() -> (MemoryDirectory, HandleFs) {
    let root = MemoryDirectory::new_root();
    let access = StorageRootAccess::new(root.clone().into_ref());
    (root, HandleFs::new(Arc::new(access)))
}

/// Run `read_dir_recursive` and collect its events.
pub async fn collect_events(fs: &mut HandleFs, path: &str) -> (bool, Vec<WalkEvent>) {
    let mut events = Vec::new();
    let ok = fs
        .read_dir_recursive(&p(path), |event| events.push(event))
        .await
        .is_ok();
    (ok, events)
}

/// Install a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
