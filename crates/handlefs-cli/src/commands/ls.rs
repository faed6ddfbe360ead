use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::{DirEntry, HandleFs};

use super::normalize_path;
use crate::output::{create_table, format_entry_type, format_size};

#[derive(ClapArgs)]
pub struct Args {
    /// Directory to list (default: root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Show detailed information
    #[arg(short, long)]
    pub long: bool,

    /// Print entries as JSON
    #[arg(long, conflicts_with = "long")]
    pub json: bool,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let path = normalize_path(&args.path)?;
    let mut entries = fs
        .read_dir(&path)
        .await
        .with_context(|| format!("Failed to list {path}"))?;

    // Directories first, then by name
    entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if args.long {
        print_long_format(fs, &entries).await?;
    } else {
        for entry in &entries {
            if entry.is_dir() {
                println!("{}/", entry.name);
            } else {
                println!("{}", entry.name);
            }
        }
    }
    Ok(())
}

async fn print_long_format(fs: &mut HandleFs, entries: &[DirEntry]) -> Result<()> {
    let mut table = create_table(&["Type", "Size", "Name"]);

    for entry in entries {
        let (size, name) = if entry.is_dir() {
            ("-".to_string(), format!("{}/", entry.name))
        } else {
            let bytes = fs
                .file_size(&entry.path)
                .await
                .with_context(|| format!("Failed to stat {}", entry.path))?;
            (format_size(bytes), entry.name.clone())
        };
        table.add_row(vec![
            format_entry_type(entry.is_dir()).to_string(),
            size,
            name,
        ]);
    }

    println!("{table}");
    Ok(())
}
