//! `HandleFs` over a real directory on disk.

mod common;

use std::sync::Arc;

use common::p;
use handlefs_core::access::StorageRootAccess;
use handlefs_core::{AccessMode, ErrorKind, FsConfig, FsPath, HandleFs, WriteMode};
use tempfile::TempDir;

async fn local_fs() -> (TempDir, HandleFs) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let access = StorageRootAccess::local(temp.path()).await.unwrap();
    (temp, HandleFs::new(Arc::new(access)))
}

#[tokio::test]
async fn test_directories_land_on_disk() {
    let (temp, mut fs) = local_fs().await;
    fs.mkdir(&p("/a/b/c"), true).await.unwrap();
    assert!(temp.path().join("a/b/c").is_dir());

    fs.rmdir(&p("/a/b/c"), false).await.unwrap();
    assert!(!temp.path().join("a/b/c").exists());
    assert!(temp.path().join("a/b").is_dir());
}

#[tokio::test]
async fn test_write_append_read() {
    let (temp, mut fs) = local_fs().await;
    let file = p("/hello.txt");
    fs.write_file_text(&file, "Hi ", WriteMode::Truncate)
        .await
        .unwrap();
    fs.write_file_text(&file, "Hello", WriteMode::Append)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(temp.path().join("hello.txt")).unwrap(),
        "Hi Hello"
    );
    assert!(!temp.path().join("hello.txt.crswap").exists());
}

#[tokio::test]
async fn test_rename_across_directories() {
    let (temp, mut fs) = local_fs().await;
    std::fs::create_dir(temp.path().join("in")).unwrap();
    std::fs::create_dir(temp.path().join("out")).unwrap();
    std::fs::write(temp.path().join("in/data.bin"), [7u8; 64]).unwrap();

    fs.rename(&p("/in/data.bin"), &p("/out/data.bin"))
        .await
        .unwrap();
    assert!(!temp.path().join("in/data.bin").exists());
    assert_eq!(
        std::fs::read(temp.path().join("out/data.bin")).unwrap(),
        vec![7u8; 64]
    );
}

#[tokio::test]
async fn test_rmdir_non_empty_on_disk() {
    let (temp, mut fs) = local_fs().await;
    std::fs::create_dir_all(temp.path().join("full")).unwrap();
    std::fs::write(temp.path().join("full/file"), b"x").unwrap();

    // Files are not cached, so the cache check passes and the store refuses
    let err = fs.rmdir(&p("/full"), false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Delete);

    fs.rmdir(&p("/full"), true).await.unwrap();
    assert!(!temp.path().join("full").exists());
}

#[tokio::test]
async fn test_listing_reflects_disk() {
    let (temp, mut fs) = local_fs().await;
    std::fs::create_dir(temp.path().join("dir")).unwrap();
    std::fs::write(temp.path().join("file.txt"), b"x").unwrap();

    let mut names: Vec<String> = fs
        .read_dir(&FsPath::root())
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["dir", "file.txt"]);
}

#[tokio::test]
async fn test_from_config_uses_storage_root() {
    let temp = TempDir::new().unwrap();
    let config = FsConfig {
        access: AccessMode::StorageRoot,
        storage_root: Some(temp.path().to_path_buf()),
        ..FsConfig::default()
    };
    let mut fs = HandleFs::from_config(&config, None).await.unwrap();
    fs.mkdir(&p("/configured"), false).await.unwrap();
    assert!(temp.path().join("configured").is_dir());
}
