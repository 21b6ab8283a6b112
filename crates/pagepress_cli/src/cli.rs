use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagepress_logging::{LevelFilter, LogDestination, DEFAULT_LOG_FILE};

use crate::config::Overrides;

#[derive(Parser)]
#[command(name = "pagepress")]
#[command(about = "Convert web pages to PDF through a remote conversion service", long_about = None)]
pub struct Cli {
    /// Address of the conversion service used to start jobs
    #[arg(long, env = "PAGEPRESS_INTERNAL_URL", global = true)]
    pub internal_url: Option<String>,

    /// Externally reachable address used for progress streams and download links
    #[arg(long, env = "PAGEPRESS_EXTERNAL_URL", global = true)]
    pub external_url: Option<String>,

    /// RON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the operational log to a file instead of the terminal (`--log-file` alone: ./pagepress.log)
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,

    /// Log debug output; with --log-file the terminal gets it too
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a page and follow the job until it finishes
    Convert {
        /// Absolute http(s) URL of the page
        url: String,
    },
    /// Print the download link for a server-relative path
    Resolve {
        /// Path as returned by the service, e.g. /download-pdf/abc123
        path: String,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            internal_url: self.internal_url.clone(),
            external_url: self.external_url.clone(),
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.verbose) {
            (None, _) => LogDestination::Terminal,
            (Some(None), false) => LogDestination::default_file(),
            (Some(None), true) => LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE)),
            (Some(Some(path)), false) => LogDestination::File(path.clone()),
            (Some(Some(path)), true) => LogDestination::Both(path.clone()),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}
