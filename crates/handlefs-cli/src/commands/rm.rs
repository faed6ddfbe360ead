use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::{ErrorKind, HandleFs};

use super::normalize_path;

#[derive(ClapArgs)]
pub struct Args {
    /// Path to remove
    pub path: String,

    /// Remove directories and their contents recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Ignore nonexistent paths
    #[arg(short, long)]
    pub force: bool,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let path = normalize_path(&args.path)?;
    match fs.rm(&path, args.recursive).await {
        Err(e) if args.force && e.kind() == ErrorKind::NotExist => {
            tracing::debug!(path = %path, "Nothing to remove");
            Ok(())
        }
        result => result.with_context(|| format!("Failed to remove {path}")),
    }
}
