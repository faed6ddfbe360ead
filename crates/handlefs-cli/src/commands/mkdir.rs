use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::HandleFs;

use super::normalize_path;

#[derive(ClapArgs)]
pub struct Args {
    /// Directory to create
    pub path: String,

    /// Create parent directories as needed
    #[arg(short, long)]
    pub parents: bool,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let path = normalize_path(&args.path)?;
    fs.mkdir(&path, args.parents)
        .await
        .with_context(|| format!("Failed to create directory {path}"))?;
    Ok(())
}
