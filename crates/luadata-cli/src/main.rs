//! `luadata` CLI: compare and prettify Lua table data files.
//!
//! ## Usage
//!
//! ```sh
//! # Deep-compare two versions of a data file
//! luadata compare -f old/RoomData.lua -f new/RoomData.lua
//!
//! # Same, as a JSON report
//! luadata compare -f a/RoomData.lua -f b/RoomData.lua --json
//!
//! # Write the canonical form to <input dir>/output/RoomData.lua
//! luadata pretty -f RoomData.lua
//!
//! # Choose the output directory, show debug logs
//! luadata -v pretty -f RoomData.lua -o canonical/
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level picked by `-v`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use luadata_core::{entry_name_from_path, Comparison, LoadOptions, Prettifier};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "luadata",
    version,
    about = "Compare and canonicalize Lua table data files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Deep-compare the entries of two data files
    Compare {
        /// Data file to compare (give exactly two; extra files are ignored)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
        /// Print a JSON report instead of `equal: <bool>`
        #[arg(long)]
        json: bool,
        /// Module name declared by the data files
        #[arg(long, default_value = "Data")]
        module: String,
        /// Lines containing this text are skipped before loading
        #[arg(long, default_value = "md5sum")]
        marker: String,
    },
    /// Write the canonical form of a data file
    Pretty {
        /// Data file to canonicalize
        #[arg(short, long)]
        file: PathBuf,
        /// Output directory (defaults to `output` next to the input file)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Module name declared by the data file
        #[arg(long, default_value = "Data")]
        module: String,
        /// Entry to write (defaults to the letters of the file name)
        #[arg(long)]
        entry: Option<String>,
    },
}

/// JSON report printed by `compare --json`.
#[derive(Serialize)]
struct CompareReport {
    entry: String,
    equal: bool,
    files: Vec<FileReport>,
}

#[derive(Serialize)]
struct FileReport {
    path: String,
    checksum: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compare {
            files,
            json,
            module,
            marker,
        } => {
            let options = LoadOptions::new().module(module).marker(marker);
            compare(&files, json, &options)?;
        }
        Commands::Pretty {
            file,
            output,
            module,
            entry,
        } => {
            let mut options = LoadOptions::new().module(module);
            if let Some(entry) = entry {
                options = options.entry(entry);
            }
            pretty(&file, output.as_deref(), options)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

// ─────────────────────────────────────────────────────────────────────────────
// compare
// ─────────────────────────────────────────────────────────────────────────────

fn compare(files: &[PathBuf], json: bool, options: &LoadOptions) -> Result<()> {
    if files.len() < 2 {
        bail!("at least two files are required to compare, got {}", files.len());
    }
    if files.len() > 2 {
        log::warn!(
            "only two files can be compared at a time; ignoring {} more",
            files.len() - 2
        );
    }
    let files = &files[..2];

    let comparison =
        Comparison::load_with_options(files, options).context("Failed to load data files")?;
    for file in comparison.files() {
        log::info!("comparing {} {}", file.checksum, display_path(&file.path));
    }

    log::info!("comparing entry {} ...", comparison.entry());
    let equal = comparison
        .equal()
        .with_context(|| format!("Failed to compare entry {}", comparison.entry()))?;
    log::info!("result: {}", equal);

    if json {
        let report = CompareReport {
            entry: comparison.entry().to_string(),
            equal,
            files: comparison
                .files()
                .iter()
                .map(|f| FileReport {
                    path: display_path(&f.path),
                    checksum: f.checksum.clone(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("equal: {}", equal);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// pretty
// ─────────────────────────────────────────────────────────────────────────────

fn pretty(file: &Path, output: Option<&Path>, options: LoadOptions) -> Result<()> {
    let file = absolute(file);
    log::info!("loading {}", file.display());
    let prettifier = Prettifier::load_with_options(&file, options)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let dir = match output {
        Some(dir) => dir.to_path_buf(),
        None => file
            .parent()
            .map(|parent| parent.join("output"))
            .unwrap_or_else(|| PathBuf::from("output")),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let name = match entry_name_from_path(&file) {
        name if name.is_empty() => prettifier.entry().to_string(),
        name => name,
    };
    let target = dir.join(format!("{}.lua", name));
    log::info!("writing {} ...", prettifier.entry());
    prettifier
        .write_to_file(&target)
        .with_context(|| format!("Failed to write file: {}", target.display()))?;

    println!("{}", display_path(&target));
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn display_path(path: &Path) -> String {
    absolute(path).display().to_string()
}
