use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::HandleFs;

use super::normalize_path;

#[derive(ClapArgs)]
pub struct Args {
    /// File to print
    pub file: String,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let path = normalize_path(&args.file)?;
    let content = fs
        .read_file(&path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;
    io::stdout().write_all(&content)?;
    Ok(())
}
