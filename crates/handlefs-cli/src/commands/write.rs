use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::{HandleFs, WriteMode};

use super::normalize_path;

#[derive(ClapArgs)]
pub struct Args {
    /// Destination file
    pub path: String,

    /// Append to file instead of overwriting
    #[arg(short, long)]
    pub append: bool,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let path = normalize_path(&args.path)?;

    let mut content = Vec::new();
    io::stdin().read_to_end(&mut content)?;

    let mode = if args.append {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    fs.write_file(&path, &content, mode)
        .await
        .with_context(|| format!("Failed to write {path}"))?;
    Ok(())
}
