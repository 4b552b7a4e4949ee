use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kb_page_tool::{json_to_markup, load_config, markup_to_json, normalize_markup, video_embed_url};
use tracing_subscriber::EnvFilter;

/// Page markup conversions
#[derive(Parser, Debug)]
#[command(name = "kb-page")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Editor config as JSON
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite page markup in canonical form
    Normalize {
        /// Input file, `-` or nothing for stdin
        file: Option<PathBuf>,
    },

    /// Convert page markup to the JSON page value
    ToJson { file: Option<PathBuf> },

    /// Convert a JSON page value to page markup
    FromJson { file: Option<PathBuf> },

    /// Print the embed URL for a video page link
    VideoUrl { url: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            load_config(Some(&raw))
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => load_config(None)?,
    };

    let output = match cli.command {
        Command::Normalize { file } => normalize_markup(&read_input(file.as_deref())?, config),
        Command::ToJson { file } => markup_to_json(&read_input(file.as_deref())?, config)?,
        Command::FromJson { file } => json_to_markup(&read_input(file.as_deref())?, config)?,
        Command::VideoUrl { url } => video_embed_url(&url)?,
    };
    println!("{output}");
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}
