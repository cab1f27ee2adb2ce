use crate::compare_store::{StoreOptions, DEFAULT_CAPACITY};
use crate::media::MediaTiming;
use crate::print::PipelineTiming;
use crate::types::{Orientation, PageSize};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// partsx - comparison list and print tooling for the parts marketplace
///
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "partsx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Comparison list and print tooling", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite file standing in for browser localStorage
    #[arg(long, env = "PARTSX_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Directory that receives "downloaded" PDFs
    #[arg(long, env = "PARTSX_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Maximum number of items in the comparison list (1-16)
    #[arg(long, env = "COMPARE_CAPACITY")]
    pub compare_capacity: Option<usize>,

    /// Delay after the last image settles, before capture (0-5000 ms)
    #[arg(long, env = "MEDIA_SETTLE_MS")]
    pub media_settle_ms: Option<u64>,

    /// Give up on an image that neither loads nor errors (100-60000 ms)
    #[arg(long, env = "MEDIA_TIMEOUT_MS")]
    pub media_timeout_ms: Option<u64>,

    /// Delay before opening the native print dialog (0-5000 ms)
    #[arg(long, env = "PRINT_SETTLE_MS")]
    pub print_settle_ms: Option<u64>,

    /// Delay before the progress indicator resets (0-10000 ms)
    #[arg(long, env = "PROGRESS_RESET_MS")]
    pub progress_reset_ms: Option<u64>,

    /// Default page size: a4, a5 or letter
    #[arg(long, env = "PDF_PAGE_SIZE", value_parser = clap::value_parser!(PageSize))]
    pub page_size: Option<PageSize>,

    /// Default orientation: portrait or landscape
    #[arg(long, env = "PDF_ORIENTATION", value_parser = clap::value_parser!(Orientation))]
    pub orientation: Option<Orientation>,

    /// Page margin in millimeters (0-50)
    #[arg(long, env = "PDF_MARGIN_MM")]
    pub margin_mm: Option<f64>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, env = "PARTSX_LOG")]
    pub log_level: Option<log::Level>,

    /// Debug categories, e.g. "store,print" or "all"
    #[arg(long, env = "PARTSX_DEBUG")]
    pub debug: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Inspect or edit the comparison list
    Compare {
        /// Operate on the favorites list instead
        #[arg(long)]
        favorites: bool,
        #[command(subcommand)]
        action: CompareCommand,
    },
    /// Classify a device from its browser signals
    Device {
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        touch_points: Option<u32>,
        /// Pretend window.print is missing
        #[arg(long)]
        no_print: bool,
    },
    /// Show the rasterizer options for a document
    PdfOptions {
        #[arg(long, default_value = "")]
        filename: String,
    },
    /// Hand a finished PDF to the share/download step (lands in the download dir)
    Deliver {
        /// PDF file to deliver
        file: PathBuf,
        /// Name to save it under; defaults to the file's own name
        #[arg(long)]
        filename: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CompareCommand {
    /// List items in insertion order
    List,
    /// Add an item given as JSON, e.g. '{"id": 12, "title": "Brake pads"}'
    Add { json: String },
    /// Remove an item by id
    Remove { id: String },
    /// Check whether an id is in the list
    Has { id: String },
    /// Empty the list
    Clear,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub store_path: PathBuf,
    pub download_dir: PathBuf,
    pub compare_capacity: usize,
    pub media_settle_ms: u64,
    pub media_timeout_ms: u64,
    pub print_settle_ms: u64,
    pub progress_reset_ms: u64,
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin_mm: f64,
    pub log_level: log::Level,
    pub debug: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from("./partsx_store.db"),
            download_dir: PathBuf::from("."),
            compare_capacity: DEFAULT_CAPACITY,
            media_settle_ms: 500,
            media_timeout_ms: 10_000,
            print_settle_ms: 250,
            progress_reset_ms: 1000,
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 10.0,
            log_level: log::Level::Info,
            debug: None,
        }
    }
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

impl Config {
    /// Apply CLI/env overrides on top of the defaults, validating ranges.
    pub fn from_args(args: &CliArgs) -> Result<Config> {
        let d = Config::default();

        let compare_capacity = validate_in_range(
            args.compare_capacity.unwrap_or(d.compare_capacity),
            1,
            16,
            "COMPARE_CAPACITY",
        )?;
        let media_settle_ms = validate_in_range(
            args.media_settle_ms.unwrap_or(d.media_settle_ms),
            0,
            5000,
            "MEDIA_SETTLE_MS",
        )?;
        let media_timeout_ms = validate_in_range(
            args.media_timeout_ms.unwrap_or(d.media_timeout_ms),
            100,
            60_000,
            "MEDIA_TIMEOUT_MS",
        )?;
        let print_settle_ms = validate_in_range(
            args.print_settle_ms.unwrap_or(d.print_settle_ms),
            0,
            5000,
            "PRINT_SETTLE_MS",
        )?;
        let progress_reset_ms = validate_in_range(
            args.progress_reset_ms.unwrap_or(d.progress_reset_ms),
            0,
            10_000,
            "PROGRESS_RESET_MS",
        )?;
        let margin_mm = validate_in_range(
            args.margin_mm.unwrap_or(d.margin_mm),
            0.0,
            50.0,
            "PDF_MARGIN_MM",
        )?;

        let store_path = args.store_path.clone().unwrap_or(d.store_path);
        if store_path.as_os_str().is_empty() {
            return Err(anyhow!("PARTSX_STORE_PATH cannot be empty"));
        }

        Ok(Config {
            store_path,
            download_dir: args.download_dir.clone().unwrap_or(d.download_dir),
            compare_capacity,
            media_settle_ms,
            media_timeout_ms,
            print_settle_ms,
            progress_reset_ms,
            page_size: args.page_size.unwrap_or(d.page_size),
            orientation: args.orientation.unwrap_or(d.orientation),
            margin_mm,
            log_level: args.log_level.unwrap_or(d.log_level),
            debug: args.debug.clone().filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default().with_capacity(self.compare_capacity)
    }

    pub fn pipeline_timing(&self) -> PipelineTiming {
        PipelineTiming {
            media: MediaTiming {
                settle_delay: Duration::from_millis(self.media_settle_ms),
                media_timeout: Duration::from_millis(self.media_timeout_ms),
            },
            layout_settle: Duration::from_millis(self.print_settle_ms),
            progress_reset: Duration::from_millis(self.progress_reset_ms),
        }
    }

    /// Print current configuration (useful for debugging)
    pub fn print_summary(&self) {
        eprintln!("partsx configuration:");
        eprintln!("  Store: {}", self.store_path.display());
        eprintln!("  Downloads: {}", self.download_dir.display());
        eprintln!("  Compare capacity: {}", self.compare_capacity);
        eprintln!(
            "  Media: settle {}ms, timeout {}ms",
            self.media_settle_ms, self.media_timeout_ms
        );
        eprintln!("  Print settle: {}ms", self.print_settle_ms);
        eprintln!(
            "  Page: {} {} (margin {}mm)",
            self.page_size, self.orientation, self.margin_mm
        );
    }
}

/// Load configuration from CLI args and environment variables
pub fn load() -> Result<(Config, Command)> {
    let args = CliArgs::parse();
    let cfg = Config::from_args(&args)?;
    Ok((cfg, args.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_apply() {
        let args = parse(&["partsx", "compare", "list"]);
        let cfg = Config::from_args(&args).unwrap();
        assert_eq!(cfg.compare_capacity, 4);
        assert_eq!(cfg.pipeline_timing().layout_settle, Duration::from_millis(250));
        assert_eq!(
            args.command,
            Command::Compare {
                favorites: false,
                action: CompareCommand::List
            }
        );
    }

    #[test]
    fn out_of_range_is_rejected() {
        let args = parse(&["partsx", "--compare-capacity", "40", "compare", "list"]);
        let err = Config::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("COMPARE_CAPACITY"));
    }

    #[test]
    fn page_options_parse() {
        let args = parse(&[
            "partsx",
            "--page-size",
            "letter",
            "--orientation",
            "landscape",
            "pdf-options",
            "--filename",
            "quote",
        ]);
        let cfg = Config::from_args(&args).unwrap();
        assert_eq!(cfg.page_size, PageSize::Letter);
        assert_eq!(cfg.orientation, Orientation::Landscape);
        assert_eq!(
            args.command,
            Command::PdfOptions {
                filename: "quote".to_string()
            }
        );
    }

    #[test]
    fn deliver_uses_download_dir() {
        let args = parse(&[
            "partsx",
            "--download-dir",
            "/tmp/pdfs",
            "deliver",
            "quote.pdf",
            "--filename",
            "quote-7",
        ]);
        let cfg = Config::from_args(&args).unwrap();
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/pdfs"));
        assert_eq!(
            args.command,
            Command::Deliver {
                file: PathBuf::from("quote.pdf"),
                filename: Some("quote-7".to_string())
            }
        );
    }

    #[test]
    fn bad_page_size_fails_parse() {
        assert!(CliArgs::try_parse_from(["partsx", "--page-size", "a3", "compare", "list"]).is_err());
    }
}
