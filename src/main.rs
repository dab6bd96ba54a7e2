//! Bamboo Sorter - copy a folder tree into a classified archive
//!
//! Command-line front-end: parses the run parameters, sets up logging and
//! hands the run to the library with a tracing-backed log sink and an
//! exception log file.

use anyhow::Result;
use bamboo_sorter::{Cli, ExceptionLogFile, LogSink, Processor, RunConfig, RunSummary, TracingLog};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold().stylize(),
            title.bold().stylize(),
            "╗".bold().stylize(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print one statistic line
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_path(label: &str, path: &str) {
        let _ = stdout().execute(Print(style(format!("  {}: ", label)).with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;

    // Determine log file path based on config file or timestamp
    let log_path = get_log_path(&exe_dir, &cli);

    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Bamboo Sorter starting");

    let config = load_config(&cli, &exe_dir)?;
    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let exception_path = cli
        .exception_log
        .clone()
        .unwrap_or_else(|| exe_dir.join("Log").join("Exception.txt"));

    let log: Arc<dyn LogSink> = Arc::new(TracingLog);
    let exceptions = Arc::new(ExceptionLogFile::new(&exception_path));
    let processor = Processor::new(config, Arc::clone(&log), exceptions);

    match processor.execute() {
        Some(summary) => {
            log.append_message("Finish");
            print_summary(&summary, &log_path, &exception_path);

            if let Some(ref json_path) = cli.summary_json {
                write_summary_json(&summary, json_path)?;
            }

            info!(log_file = %log_path.display(), "Processing complete. Log saved to");
            Ok(())
        }
        None => {
            log.append_message("Error");
            error!("Copy run failed");
            cli_output::print_error(&format!(
                "Copy failed, see {}",
                exception_path.display()
            ));
            std::process::exit(1);
        }
    }
}

/// Print the colored end-of-run summary
fn print_summary(summary: &RunSummary, log_path: &Path, exception_path: &Path) {
    use cli_output::*;

    print_separator();
    print_title("Copy complete");
    print_separator();

    print_blank();
    print_stat("Files found", &summary.files_found.to_string(), CliTheme::ACCENT);
    print_stat("Copied", &summary.copied.to_string(), CliTheme::SUCCESS);
    print_stat(
        "Already identical",
        &summary.skipped_identical.to_string(),
        CliTheme::WARNING,
    );
    print_stat(
        "Unclassifiable",
        &summary.unclassifiable.to_string(),
        CliTheme::WARNING,
    );
    print_stat("Failed", &summary.failed.to_string(), CliTheme::ERROR);
    print_stat(
        "Bytes copied",
        &summary.bytes_copied.to_string(),
        CliTheme::ACCENT,
    );
    print_stat(
        "Elapsed",
        &format!("{:.1}s", summary.elapsed_secs),
        CliTheme::HINT,
    );
    print_blank();

    if summary.timed_out {
        print_warning(&format!(
            "{} file(s) were cancelled when the shutdown timeout expired",
            summary.cancelled
        ));
    }
    if summary.failed > 0 {
        print_error(&format!(
            "{} file(s) failed, see {}",
            summary.failed,
            exception_path.display()
        ));
    }

    print_separator();
    print_path("Log file", &log_path.display().to_string());
}

fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Wrote run summary");
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("CopyRun_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax
///
/// `nightly` finds `nightly.toml` in the working directory or in the
/// `Config` directory next to the executable.
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<RunConfig> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = RunConfig::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.origin.as_os_str().is_empty() {
        anyhow::bail!("No origin directory given (use --origin or a config file)");
    }
    if config.destination.as_os_str().is_empty() {
        anyhow::bail!("No destination directory given (use --destination or a config file)");
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_title_accepts_titles_wider_than_the_banner() {
        cli_output::print_title("Copy complete");
        cli_output::print_title(&"x".repeat(120));
    }

    #[test]
    fn test_log_path_without_config() {
        let cli = Cli::try_parse_from(["bamboo-sorter"]).unwrap();
        let path = get_log_path(Path::new("/opt/bamboo"), &cli);
        assert_eq!(path.parent(), Some(Path::new("/opt/bamboo/Log")));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("CopyRun_") && name.ends_with(".log"));
    }

    #[test]
    fn test_log_path_with_config() {
        let cli = Cli::try_parse_from(["bamboo-sorter", "-C", "nightly.toml"]).unwrap();
        let path = get_log_path(Path::new("/opt/bamboo"), &cli);
        assert_eq!(path.parent(), Some(Path::new("/opt/bamboo/Log/nightly")));
    }
}
