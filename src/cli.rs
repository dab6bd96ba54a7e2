//! CLI argument parsing with clap

use crate::config::{ClassificationMode, RunConfig};
use clap::Parser;
use std::path::PathBuf;

/// Bamboo Sorter - copy a folder tree into a classified archive
///
/// Files are filed by date (creation, modification or embedded metadata),
/// by extension or by file type. Timestamps are preserved and files already
/// present with identical content are left alone.
#[derive(Parser, Debug)]
#[command(name = "bamboo-sorter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Origin directory to copy from
    #[arg(short = 'i', long)]
    pub origin: Option<PathBuf>,

    /// Destination root of the classified tree
    #[arg(short = 'o', long)]
    pub destination: Option<PathBuf>,

    /// Classification rule
    #[arg(short = 'c', long, value_enum)]
    pub mode: Option<ClassificationMode>,

    /// Rename copied files to their date (YYYY-MM-DD_HH-MM-SS)
    #[arg(short = 'r', long)]
    pub rename: bool,

    /// File undated files under 0_Pending/<parent folder> instead of skipping them
    #[arg(short = 'p', long)]
    pub pending: bool,

    /// Overwrite destination files even when their content is identical
    #[arg(short = 'w', long)]
    pub overwrite: bool,

    /// Number of worker threads (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Seconds to wait for running copies when the run ends
    #[arg(long)]
    pub shutdown_timeout: Option<u64>,

    /// Exception log file (default: Log/Exception.txt next to the executable)
    #[arg(long)]
    pub exception_log: Option<PathBuf>,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: RunConfig) -> RunConfig {
        if let Some(ref origin) = self.origin {
            config.origin = origin.clone();
        }
        if let Some(ref destination) = self.destination {
            config.destination = destination.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        // Flags can only switch an option on
        if self.rename {
            config.rename = true;
        }
        if self.pending {
            config.pending = true;
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(timeout) = self.shutdown_timeout {
            config.shutdown_timeout_secs = timeout;
        }

        config
    }

    /// Convert CLI arguments to RunConfig (when no config file is used)
    pub fn to_config(&self) -> RunConfig {
        self.merge_with_config(RunConfig {
            origin: PathBuf::new(),
            destination: PathBuf::new(),
            ..RunConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "bamboo-sorter",
            "-i",
            "/photos",
            "-o",
            "/archive",
            "-c",
            "metadata-date",
            "-r",
            "-p",
            "-t",
            "2",
            "--shutdown-timeout",
            "5",
        ])
        .unwrap();

        let config = cli.to_config();
        assert_eq!(config.origin, PathBuf::from("/photos"));
        assert_eq!(config.destination, PathBuf::from("/archive"));
        assert_eq!(config.mode, ClassificationMode::ByMetadataDate);
        assert!(config.rename);
        assert!(config.pending);
        assert!(!config.overwrite);
        assert_eq!(config.threads, 2);
        assert_eq!(config.shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_defaults_without_arguments() {
        let cli = Cli::try_parse_from(["bamboo-sorter"]).unwrap();
        let config = cli.to_config();

        assert!(config.origin.as_os_str().is_empty());
        assert!(config.destination.as_os_str().is_empty());
        assert_eq!(config.mode, ClassificationMode::ByCreationDate);
        assert_eq!(config.shutdown_timeout_secs, 60);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file_config = RunConfig::new("/from-file", "/file-dest", ClassificationMode::ByType)
            .with_overwrite(true)
            .with_threads(8);
        let cli = Cli::try_parse_from(["bamboo-sorter", "-o", "/cli-dest", "-c", "extension"])
            .unwrap();

        let merged = cli.merge_with_config(file_config);
        assert_eq!(merged.origin, PathBuf::from("/from-file"));
        assert_eq!(merged.destination, PathBuf::from("/cli-dest"));
        assert_eq!(merged.mode, ClassificationMode::ByExtension);
        assert!(merged.overwrite);
        assert_eq!(merged.threads, 8);
    }

    #[test]
    fn test_config_name() {
        let cli = Cli::try_parse_from(["bamboo-sorter", "-C", "/etc/bamboo/nightly.toml"]).unwrap();
        assert_eq!(cli.config_name().as_deref(), Some("nightly"));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["bamboo-sorter", "-c", "by-color"]).is_err());
    }
}
