//! Logging bootstrap for the library and its executables.
//!
//! # Responsibility
//! - Start one process-wide logger, writing rotated files or stderr.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Initialization is idempotent for the same level and target.
//! - Switching level or target after initialization is rejected.
//! - Initialization never panics.
//!
//! # See also
//! - `config::CoreConfig` for where level and directory come from.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "plaintask";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Rotated files under this directory.
    Dir(PathBuf),
    Stderr,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dir(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

struct LoggingState {
    level: &'static str,
    target: LogTarget,
    _logger: LoggerHandle,
}

/// Starts file logging under `log_dir`.
///
/// Relative directories resolve against the current working directory.
///
/// # Errors
/// - Unsupported `level`, or empty `log_dir`.
/// - Logging already active with another level or target.
/// - Directory creation or backend start failure.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let target = LogTarget::Dir(resolve_log_dir(log_dir)?);
    init_with_target(level, target)
}

/// Starts logging to stderr.
pub fn init_stderr_logging(level: &str) -> Result<(), String> {
    init_with_target(level, LogTarget::Stderr)
}

/// Returns `(level, target)` of the active logger, if any.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.target.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn init_with_target(level: &str, target: LogTarget) -> Result<(), String> {
    let level = normalize_level(level)?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = start_logger(level, &target)?;
        install_panic_hook_once();

        info!(
            "event=app_start module=core status=ok platform={} build_mode={} version={}",
            std::env::consts::OS,
            build_mode(),
            env!("CARGO_PKG_VERSION")
        );
        info!(
            "event=logging_init module=core status=ok level={} target={}",
            level, target
        );

        Ok(LoggingState {
            level,
            target: target.clone(),
            _logger: logger,
        })
    })?;

    if state.target != target {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            state.target, target
        ));
    }
    if state.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        ));
    }
    Ok(())
}

fn start_logger(level: &str, target: &LogTarget) -> Result<LoggerHandle, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let logger = match target {
        LogTarget::Dir(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        LogTarget::Stderr => logger.log_to_stderr().format(flexi_logger::default_format),
    };

    logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn resolve_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|err| format!("cannot resolve relative log_dir `{trimmed}`: {err}"))
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Payloads may quote file content; keep them to one short line.
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let single_line = value.replace(['\n', '\r'], " ");
    let mut truncated = single_line.chars().take(max_chars).collect::<String>();
    if single_line.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, resolve_log_dir, sanitize_message,
        LogTarget,
    };

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn relative_log_dir_resolves_against_cwd() {
        let resolved = resolve_log_dir("logs/dev").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("logs/dev"));
        assert!(resolve_log_dir("   ").is_err());
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_for_same_config_and_rejects_conflicts() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let first_dir = first.path().to_str().unwrap().to_string();
        let second_dir = second.path().to_str().unwrap().to_string();

        init_logging("info", &first_dir).unwrap();
        init_logging("info", &first_dir).unwrap();

        let level_error = init_logging("debug", &first_dir).unwrap_err();
        assert!(level_error.contains("refusing to switch"));

        let dir_error = init_logging("info", &second_dir).unwrap_err();
        assert!(dir_error.contains("refusing to switch"));

        let (level, target) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(target, LogTarget::Dir(first.path().to_path_buf()));
    }
}
