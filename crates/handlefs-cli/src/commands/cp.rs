use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::HandleFs;

use super::normalize_path;

#[derive(ClapArgs)]
pub struct Args {
    /// Source file
    pub source: String,

    /// Destination file
    pub dest: String,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let source = normalize_path(&args.source)?;
    let dest = normalize_path(&args.dest)?;
    fs.copy_file(&source, &dest)
        .await
        .with_context(|| format!("Failed to copy {source} to {dest}"))?;
    Ok(())
}
