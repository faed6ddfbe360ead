use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use handlefs_core::{HandleFs, WalkEvent};

use super::normalize_path;

#[derive(ClapArgs)]
pub struct Args {
    /// Starting path (default: root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Maximum depth to display
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,
}

pub async fn execute(fs: &mut HandleFs, args: Args) -> Result<()> {
    let start = normalize_path(&args.path)?;
    let base_depth = start.depth();

    println!("{}", if start.is_root() { "." } else { args.path.as_str() });

    let mut errors = 0usize;
    fs.read_dir_recursive(&start, |event| match event {
        WalkEvent::Data(entry) => {
            let depth = entry.path.depth() - base_depth - 1;
            if args.max_depth.is_some_and(|max| depth >= max) {
                return;
            }
            let indent = "│   ".repeat(depth);
            let suffix = if entry.is_dir() { "/" } else { "" };
            println!("{indent}├── {}{suffix}", entry.name);
        }
        WalkEvent::Error(report) => {
            errors += 1;
            eprintln!("warning: {report}");
        }
        WalkEvent::End => {}
    })
    .await
    .with_context(|| format!("Failed to walk {start}"))?;

    if errors > 0 {
        tracing::warn!(errors, "Tree listing was incomplete");
    }
    Ok(())
}
