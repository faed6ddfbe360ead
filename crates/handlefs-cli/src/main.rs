#![forbid(unsafe_code)]

mod commands;
mod output;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use handlefs_core::{AccessMode, FsConfig, HandleFs, PickerAccess};

use crate::commands::{cat, cp, ls, mkdir, mv, rm, tree, write};

#[derive(Parser)]
#[command(name = "handlefs")]
#[command(author, version, about = "Path-addressed access to a granted storage root")]
#[command(propagate_version = true)]
struct Cli {
    /// Storage root directory (default: the platform data directory)
    #[arg(long, env = "HANDLEFS_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Ask for the root directory interactively instead of using a fixed root
    #[arg(long, global = true, conflicts_with = "root")]
    picker: bool,

    /// Configuration file (TOML)
    #[arg(long, env = "HANDLEFS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    Ls(ls::Args),

    /// Show directory tree
    Tree(tree::Args),

    /// Read and output file contents
    Cat(cat::Args),

    /// Write stdin to a file
    Write(write::Args),

    /// Create a directory
    Mkdir(mkdir::Args),

    /// Remove a file or directory
    Rm(rm::Args),

    /// Copy a file
    Cp(cp::Args),

    /// Move or rename a file
    Mv(mv::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let picker = cli.picker.then(|| PickerAccess::new(prompt_for_directory));
    let mut fs = HandleFs::from_config(&config, picker)
        .await
        .context("Failed to set up storage access")?;

    match cli.command {
        Commands::Ls(args) => ls::execute(&mut fs, args).await,
        Commands::Tree(args) => tree::execute(&mut fs, args).await,
        Commands::Cat(args) => cat::execute(&mut fs, args).await,
        Commands::Write(args) => write::execute(&mut fs, args).await,
        Commands::Mkdir(args) => mkdir::execute(&mut fs, args).await,
        Commands::Rm(args) => rm::execute(&mut fs, args).await,
        Commands::Cp(args) => cp::execute(&mut fs, args).await,
        Commands::Mv(args) => mv::execute(&mut fs, args).await,
    }
}

/// Merge the config file (if any) with command-line overrides.
fn load_config(cli: &Cli) -> Result<FsConfig> {
    let mut config = match &cli.config {
        Some(path) => FsConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => FsConfig::default(),
    };

    if cli.picker {
        config.access = AccessMode::Picker;
    }
    if let Some(root) = &cli.root {
        config.access = AccessMode::StorageRoot;
        config.storage_root = Some(root.clone());
    }

    if config.access == AccessMode::StorageRoot && config.storage_root.is_none() {
        let dir = default_storage_root()?;
        tracing::debug!(root = %dir.display(), "Using default storage root");
        config.storage_root = Some(dir);
    }
    Ok(config)
}

fn default_storage_root() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "handlefs", "handlefs")
        .context("Failed to determine data directory")?;
    let root = dirs.data_dir().join("root");
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create storage root: {}", root.display()))?;
    Ok(root)
}

/// Interactive chooser used in picker mode. An empty answer cancels.
fn prompt_for_directory() -> Option<PathBuf> {
    eprint!("Directory to grant access to (empty to cancel): ");
    io::stderr().flush().ok()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let answer = line.trim();
    if answer.is_empty() {
        None
    } else {
        Some(PathBuf::from(answer))
    }
}
