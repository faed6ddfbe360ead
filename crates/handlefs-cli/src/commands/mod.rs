pub mod cat;
pub mod cp;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rm;
pub mod tree;
pub mod write;

use anyhow::{Context, Result};
use handlefs_core::FsPath;

/// Turn a user-supplied path into an absolute [`FsPath`].
///
/// A leading `/` is added when missing and trailing slashes are dropped, so
/// `docs/` and `/docs` name the same directory.
pub fn normalize_path(path: &str) -> Result<FsPath> {
    let trimmed = path.trim_end_matches('/');
    let absolute = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    FsPath::parse(&absolute).with_context(|| format!("Invalid path: {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/").unwrap(), FsPath::root());
        assert_eq!(normalize_path("").unwrap(), FsPath::root());
        assert_eq!(normalize_path("docs").unwrap().to_string(), "/docs");
        assert_eq!(normalize_path("/docs/").unwrap().to_string(), "/docs");
        assert_eq!(normalize_path("a/b.txt").unwrap().to_string(), "/a/b.txt");
        assert!(normalize_path("/a/../b").is_err());
        assert!(normalize_path("a//b").is_err());
    }
}
