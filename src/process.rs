//! Classify-and-copy pipeline
//!
//! Handles the core logic of:
//! - Walking the origin tree
//! - Resolving each file's date and destination directory
//! - Skipping files whose destination already holds identical content
//! - Copying bytes and reapplying timestamps
//!
//! Every regular file becomes one task on a fixed-size worker pool. The
//! origin's directory structure is not mirrored; only the classification
//! decides where a file lands.

use crate::classify::ClassificationStrategy;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::hash::files_identical;
use crate::os;
use crate::pool::{ShutdownReport, WorkerPool, panic_message};
use crate::rename::rename_with_date;
use crate::sink::{ExceptionSink, LogSink, record_error};
use crate::time::resolve_date;
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone};
use filetime::FileTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Instant, SystemTime};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Copy buffer size (256KB)
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Number of destination lock stripes
const LOCK_STRIPES: usize = 64;

/// Result of processing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// File was copied to its destination
    Copied,
    /// Destination already holds the same content
    SkippedIdentical,
    /// No destination could be determined
    SkippedUnclassifiable,
    /// Copy failed; the run continues
    Failed(String),
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_found: AtomicUsize,
    pub copied: AtomicUsize,
    pub skipped_identical: AtomicUsize,
    pub unclassifiable: AtomicUsize,
    pub failed: AtomicUsize,
    pub bytes_copied: AtomicU64,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &CopyOutcome) {
        let counter = match outcome {
            CopyOutcome::Copied => &self.copied,
            CopyOutcome::SkippedIdentical => &self.skipped_identical,
            CopyOutcome::SkippedUnclassifiable => &self.unclassifiable,
            CopyOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> String {
        format!(
            "Found: {}, Copied: {}, Identical: {}, Unclassifiable: {}, Failed: {}",
            self.files_found.load(Ordering::Relaxed),
            self.copied.load(Ordering::Relaxed),
            self.skipped_identical.load(Ordering::Relaxed),
            self.unclassifiable.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        )
    }
}

/// Final counters of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub files_found: usize,
    pub copied: usize,
    pub skipped_identical: usize,
    pub unclassifiable: usize,
    pub failed: usize,
    /// Tasks that had not completed when the shutdown timeout expired
    pub cancelled: usize,
    pub bytes_copied: u64,
    pub directories_created: usize,
    pub elapsed_secs: f64,
    pub timed_out: bool,
}

/// Destination directories known to exist during a run
#[derive(Debug, Default)]
pub struct DirectoryLedger {
    known: Mutex<HashSet<PathBuf>>,
    created: AtomicUsize,
}

impl DirectoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `dir` exists, creating it (and its parents) at most once
    ///
    /// The ledger lock is held while creating so two workers never race on
    /// the same directory.
    pub fn ensure(&self, dir: &Path) -> Result<()> {
        let mut known = self.known.lock().unwrap_or_else(|e| e.into_inner());
        if known.contains(dir) {
            return Ok(());
        }

        if !dir.is_dir() {
            fs::create_dir_all(dir).map_err(|e| Error::CreateDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
            self.created.fetch_add(1, Ordering::Relaxed);
            debug!(?dir, "Created directory");
        }
        known.insert(dir.to_path_buf());
        Ok(())
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(dir)
    }

    /// Directories this ledger had to create
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// Striped locks serializing work on the same destination path
#[derive(Debug)]
struct DestinationLocks {
    stripes: Vec<Mutex<()>>,
}

impl DestinationLocks {
    fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, dest: &Path) -> MutexGuard<'_, ()> {
        let key = xxhash_rust::xxh3::xxh3_64(dest.as_os_str().as_encoded_bytes());
        let stripe = &self.stripes[(key % self.stripes.len() as u64) as usize];
        stripe.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// State shared by every task of a run
struct RunContext {
    config: RunConfig,
    strategy: ClassificationStrategy,
    log: Arc<dyn LogSink>,
    exceptions: Arc<dyn ExceptionSink>,
    ledger: DirectoryLedger,
    stats: ProcessingStats,
    locks: DestinationLocks,
}

impl RunContext {
    fn report(&self, err: &Error) {
        record_error(self.exceptions.as_ref(), err);
    }
}

/// Copies an origin tree into a classified destination tree
pub struct Processor {
    ctx: Arc<RunContext>,
}

impl Processor {
    /// Create a processor for one run
    pub fn new(config: RunConfig, log: Arc<dyn LogSink>, exceptions: Arc<dyn ExceptionSink>) -> Self {
        let strategy = ClassificationStrategy::for_mode(config.mode);
        Self {
            ctx: Arc::new(RunContext {
                config,
                strategy,
                log,
                exceptions,
                ledger: DirectoryLedger::new(),
                stats: ProcessingStats::new(),
                locks: DestinationLocks::new(LOCK_STRIPES),
            }),
        }
    }

    /// Run the pipeline
    ///
    /// Per-file failures are counted in the summary; only failures that stop
    /// the whole run are returned as errors.
    pub fn run(&self) -> Result<RunSummary> {
        let config = &self.ctx.config;
        let _span = span!(
            Level::INFO,
            "processor_run",
            origin = ?config.origin,
            destination = ?config.destination,
            mode = ?config.mode
        )
        .entered();
        let started = Instant::now();

        config.validate()?;

        let pool = WorkerPool::new(config.worker_threads())?;
        info!(threads = pool.size(), "Scanning origin directory...");

        let submitted = self.submit_files(&pool);
        info!(count = submitted, "Queued files");

        let report = pool.shutdown(config.shutdown_timeout());
        let cancelled = match report {
            ShutdownReport::Graceful => 0,
            ShutdownReport::TimedOut { outstanding } => {
                let message = format!(
                    "Error: {} file(s) were not processed within {} seconds and were cancelled",
                    outstanding,
                    config.shutdown_timeout_secs
                );
                self.ctx.log.append_message(&message);
                self.ctx.exceptions.append_custom_message(&message);
                outstanding
            }
        };

        let stats = &self.ctx.stats;
        let summary = RunSummary {
            files_found: stats.files_found.load(Ordering::Relaxed),
            copied: stats.copied.load(Ordering::Relaxed),
            skipped_identical: stats.skipped_identical.load(Ordering::Relaxed),
            unclassifiable: stats.unclassifiable.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            cancelled,
            bytes_copied: stats.bytes_copied.load(Ordering::Relaxed),
            directories_created: self.ctx.ledger.created(),
            elapsed_secs: started.elapsed().as_secs_f64(),
            timed_out: cancelled > 0,
        };

        info!("{}", stats.summary());
        Ok(summary)
    }

    /// Run the pipeline, reporting a failed run to both sinks
    pub fn execute(&self) -> Option<RunSummary> {
        match self.run() {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!(error = %e, "Copy run failed");
                self.ctx
                    .log
                    .append_message(&format!("Error during the copy: {}", e));
                self.ctx
                    .exceptions
                    .append_custom_message(&format!("Error in copy action: {}", e));
                self.ctx.report(&e);
                None
            }
        }
    }

    /// Walk the origin and queue one task per regular file
    ///
    /// Entries are visited depth-first in file name order. Unreadable
    /// directories contribute no entries.
    fn submit_files(&self, pool: &WorkerPool) -> usize {
        let mut submitted = 0usize;

        for entry in WalkDir::new(&self.ctx.config.origin)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let ctx = Arc::clone(&self.ctx);
            ctx.stats.files_found.fetch_add(1, Ordering::Relaxed);
            pool.submit(move || run_task(&ctx, path));
            submitted += 1;
        }

        submitted
    }
}

/// Copy `config.origin` into `config.destination`
///
/// Returns `false` if the run couldn't be carried out; failures of single
/// files are logged and don't affect the result.
pub fn copy_directory(
    config: RunConfig,
    log: Arc<dyn LogSink>,
    exceptions: Arc<dyn ExceptionSink>,
) -> bool {
    Processor::new(config, log, exceptions).execute().is_some()
}

fn run_task(ctx: &RunContext, path: PathBuf) {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| process_file(ctx, &path))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let err = Error::TaskPanicked { path: path.clone() };
            error!(?path, panic = panic_message(payload.as_ref()), "Worker task panicked");
            ctx.log.append_message(&format!(
                "Error copying file: {} - {}",
                path.display(),
                err
            ));
            ctx.report(&err);
            CopyOutcome::Failed(err.to_string())
        }
    };
    ctx.stats.record(&outcome);
}

/// Process a single file
fn process_file(ctx: &RunContext, path: &Path) -> CopyOutcome {
    let _file_span = span!(Level::DEBUG, "process_file", ?path).entered();
    let config = &ctx.config;

    let resolved = resolve_date(path, config.mode);
    let date = resolved.as_ref().map(|t| &t.timestamp);

    let Some(dest_dir) = ctx
        .strategy
        .classify(path, &config.destination, date, config.pending)
    else {
        debug!(?path, "File could not be classified");
        ctx.log
            .append_message(&format!("Processing: {}", path.display()));
        ctx.log.append_message(&format!(
            "Error: The file could not be classified: {}",
            path.display()
        ));
        return CopyOutcome::SkippedUnclassifiable;
    };

    let Some(file_name) = path.file_name() else {
        let err = Error::InvalidPath(path.to_path_buf());
        ctx.report(&err);
        return CopyOutcome::Failed(err.to_string());
    };
    let mut dest = dest_dir.join(file_name);
    if config.rename {
        dest = rename_with_date(&dest, date);
    }

    ctx.log.append_message(&format!(
        "Processing: {} -> {}",
        path.display(),
        dest.display()
    ));

    match transfer(ctx, path, &dest, date) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(?path, ?dest, error = %e, "Failed to copy file");
            ctx.log.append_message(&format!(
                "Error copying file: {} - {}",
                path.display(),
                e
            ));
            ctx.report(&e);
            CopyOutcome::Failed(e.to_string())
        }
    }
}

/// Copy `source` to `dest` unless an identical copy is already there
fn transfer(
    ctx: &RunContext,
    source: &Path,
    dest: &Path,
    date: Option<&NaiveDateTime>,
) -> Result<CopyOutcome> {
    let _dest_guard = ctx.locks.lock(dest);

    // Taken before anything reads the source so its access time is the original one
    let source_meta = fs::metadata(source).map_err(|e| Error::FileRead {
        path: source.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = dest.parent() {
        ctx.ledger.ensure(parent)?;
    }

    if !ctx.config.overwrite && dest.exists() {
        match files_identical(source, dest) {
            Ok(true) => {
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(?source, ?dest, "Destination already holds identical content");
                ctx.log.append_message(&format!(
                    "{} already exists and is identical, not overwritten.",
                    name
                ));
                return Ok(CopyOutcome::SkippedIdentical);
            }
            Ok(false) => debug!(?dest, "Destination differs, overwriting"),
            Err(e) => {
                warn!(?source, ?dest, error = %e, "Content comparison failed, overwriting");
                ctx.log
                    .append_message(&format!("Error comparing files: {}", e));
                ctx.report(&e);
            }
        }
    }

    let bytes = copy_file(source, dest)?;
    ctx.stats.bytes_copied.fetch_add(bytes, Ordering::Relaxed);

    let stamped = apply_attributes(&source_meta, dest, date);
    Ok(finish_copy(ctx, source, dest, bytes, stamped))
}

/// Log a completed copy
///
/// The bytes are in place, so a failure to reapply timestamps is reported
/// but the file still counts as copied.
fn finish_copy(
    ctx: &RunContext,
    source: &Path,
    dest: &Path,
    bytes: u64,
    stamped: Result<()>,
) -> CopyOutcome {
    if let Err(e) = stamped {
        warn!(?dest, error = %e, "Failed to apply timestamps");
        ctx.log
            .append_message(&format!("Error copying file: {} - {}", source.display(), e));
        ctx.report(&e);
    }

    info!(source = ?source, destination = ?dest, bytes, "Copied file");
    ctx.log.append_message(&format!(
        "File copied from: {} to {}",
        source.display(),
        dest.display()
    ));
    CopyOutcome::Copied
}

/// Copy file with buffered I/O, replacing any existing destination
fn copy_file(source: &Path, dest: &Path) -> Result<u64> {
    let read_err = |e: std::io::Error| Error::FileRead {
        path: source.to_path_buf(),
        source: e,
    };
    let write_err = |e: std::io::Error| Error::FileWrite {
        path: dest.to_path_buf(),
        source: e,
    };

    let src_file = File::open(source).map_err(read_err)?;
    let dest_file = File::create(dest).map_err(write_err)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(read_err)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read]).map_err(write_err)?;
        total += bytes_read as u64;
    }

    writer.flush().map_err(write_err)?;
    Ok(total)
}

/// Reapply the source timestamps to a fresh copy
///
/// Access and modification times come from the source metadata. The creation time is
/// the resolved date, or now when there is none.
fn apply_attributes(
    source_meta: &fs::Metadata,
    dest: &Path,
    date: Option<&NaiveDateTime>,
) -> Result<()> {
    let attr_err = |message: String| Error::Attributes {
        path: dest.to_path_buf(),
        message,
    };

    let atime = FileTime::from_last_access_time(source_meta);
    let mtime = FileTime::from_last_modification_time(source_meta);
    filetime::set_file_times(dest, atime, mtime).map_err(|e| attr_err(e.to_string()))?;

    let created = date
        .and_then(|d| resolve_local(&Local, d))
        .map(SystemTime::from)
        .unwrap_or_else(SystemTime::now);
    os::set_creation_time(dest, created).map_err(|e| attr_err(e.to_string()))?;

    Ok(())
}

/// Map a wall-clock time to an instant in `tz`
///
/// Ambiguous times take the earlier instant. Times skipped by a DST jump are
/// shifted forward by an hour.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*naive + TimeDelta::hours(1))).earliest())
}
