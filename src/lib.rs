//! Bamboo Sorter - classify-and-copy for folder trees
//!
//! This library copies every file of an origin tree into a destination tree
//! organized by one classification rule:
//! - Date folders (YYYY/M) from file system or embedded metadata dates
//! - One folder per file extension
//! - One folder per file type category
//!
//! Copies keep their timestamps, can be renamed to their date, and are
//! skipped when the destination already holds identical content. Work is
//! spread over a fixed-size worker pool.

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod filetype;
pub mod hash;
pub mod os;
pub mod pool;
pub mod process;
pub mod rename;
pub mod sink;
pub mod time;

pub use classify::ClassificationStrategy;
pub use cli::Cli;
pub use config::{ClassificationMode, ConfigError, RunConfig};
pub use error::{Error, Result};
pub use filetype::FileCategory;
pub use process::{CopyOutcome, DirectoryLedger, Processor, RunSummary, copy_directory};
pub use sink::{ExceptionLogFile, ExceptionSink, LogSink, MemorySink, TracingLog};
pub use time::{ExtractedTime, TimeSource, resolve_date};
