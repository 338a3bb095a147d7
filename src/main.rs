//! orca-card - command line front end for the card toolkit
//!
//! Handles CLI argument parsing, logging initialization, and dispatch to
//! the library's text and export planning operations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use orca_card::config::Config;
use orca_card::export::{needs_split, scale_factor, SlicePlan};
use orca_card::file_handler::{encode_content, read_file_sync, write_file_atomic_sync};
use orca_card::text::{self, ContentStats};

#[derive(Parser)]
#[command(name = "orca-card")]
#[command(version, about = "Markdown card toolkit", long_about = None)]
#[command(after_help = "EXAMPLES:
    orca-card format card.md            Print card.md with normalized spacing
    orca-card format card.md --write    Normalize card.md in place
    orca-card plan --height 17000       Show how a 17000px card is split
    orca-card name card.md              Suggest an export file name")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize CJK/Latin, inline code and bold spacing
    Format {
        file: PathBuf,
        /// Rewrite the file instead of printing
        #[arg(short, long)]
        write: bool,
        /// Exit with status 1 if the file is not normalized
        #[arg(long, conflicts_with = "write")]
        check: bool,
    },
    /// Remove [cite_start] and [cite: N] markers
    Clean {
        file: PathBuf,
        #[arg(short, long)]
        write: bool,
    },
    /// Show the slice plan for a rendered card
    Plan {
        /// Rendered card height in pixels
        #[arg(long)]
        height: f64,
        /// Rendered card width in pixels
        #[arg(long, default_value_t = 540.0)]
        width: f64,
    },
    /// Suggest the export file name for a card
    Name {
        file: PathBuf,
        #[arg(long, default_value = "png")]
        ext: String,
    },
    /// Print content statistics as JSON
    Stats { file: PathBuf },
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the logging system
fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,orca_card=info"),
    )
    .format_timestamp_millis()
    .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.context("loading configuration")
}

fn read_markdown(path: &Path) -> anyhow::Result<String> {
    let read = read_file_sync(path).with_context(|| format!("reading {}", path.display()))?;
    if read.lossy {
        log::warn!("{} is not valid text; some characters were replaced", path.display());
    }
    Ok(read.content)
}

/// Apply `transform` to a file in place, keeping its encoding.
///
/// Returns whether the file changed. Files that only decode lossily are
/// refused so that undecodable bytes are never replaced.
fn rewrite_markdown(path: &Path, transform: impl FnOnce(&str) -> String) -> anyhow::Result<bool> {
    let read = read_file_sync(path).with_context(|| format!("reading {}", path.display()))?;
    if read.lossy {
        anyhow::bail!(
            "{} is not valid UTF-8 or UTF-16 text; refusing to rewrite it",
            path.display()
        );
    }

    let updated = transform(&read.content);
    if updated == read.content {
        return Ok(false);
    }

    let bytes = encode_content(&updated, read.encoding)
        .with_context(|| format!("re-encoding {} as {:?}", path.display(), read.encoding))?;
    write_file_atomic_sync(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Format { file, write, check } => {
            if write {
                if rewrite_markdown(&file, text::normalize)? {
                    log::info!("Formatted {}", file.display());
                }
                return Ok(ExitCode::SUCCESS);
            }

            let source = read_markdown(&file)?;
            let formatted = text::normalize(&source);
            if check {
                if formatted != source {
                    println!("{} needs formatting", file.display());
                    return Ok(ExitCode::FAILURE);
                }
            } else {
                print!("{}", formatted);
            }
        }
        Command::Clean { file, write } => {
            if write {
                if rewrite_markdown(&file, text::clean_citations)? {
                    log::info!("Cleaned {}", file.display());
                }
            } else {
                print!("{}", text::clean_citations(&read_markdown(&file)?));
            }
        }
        Command::Plan { height, width } => {
            let export = &config.export;
            let scale = scale_factor(export.target_width, width)?;
            let plan = SlicePlan::for_measured(height, export.max_slice_height)?;

            println!(
                "card {}x{} px, output scale {:.3}, {} slice(s)",
                width,
                plan.total_height(),
                scale,
                plan.len()
            );
            for slice in plan.slices() {
                println!(
                    "  part {:>3}: offset {:>7} height {:>5}",
                    slice.part(),
                    slice.offset,
                    slice.height
                );
            }
            if needs_split(height, export.split_threshold) {
                println!("taller than {} px: offer split export", export.split_threshold);
            }
        }
        Command::Name { file, ext } => {
            let source = read_markdown(&file)?;
            println!("{}", text::title::generate_file_name_today(&source, &ext));
        }
        Command::Stats { file } => {
            let source = read_markdown(&file)?;
            println!("{}", serde_json::to_string_pretty(&ContentStats::of(&source))?);
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
