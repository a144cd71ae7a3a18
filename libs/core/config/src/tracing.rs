use crate::Environment;
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in the main() before any fallible operations to ensure
/// colored error output. Safe to call multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Size-rotated log file: `path`, `path.1`, ... `path.{backups}`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotatingLogFile {
    pub path: PathBuf,
    pub max_bytes: usize,
    pub backups: usize,
}

impl RotatingLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    fn open(&self) -> FileRotate<AppendCount> {
        FileRotate::new(
            &self.path,
            AppendCount::new(self.backups),
            ContentLimit::Bytes(self.max_bytes),
            Compression::None,
            #[cfg(unix)]
            None,
        )
    }
}

impl Default for RotatingLogFile {
    fn default() -> Self {
        Self {
            path: PathBuf::from("send_emails.log"),
            max_bytes: 5 * 1024 * 1024,
            backups: 3,
        }
    }
}

/// What [`init_tracing`] should install besides the console layer
#[derive(Clone, Debug)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
    pub file: Option<RotatingLogFile>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            file: None,
        }
    }
}

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`): JSON console output for log
///   aggregation, module targets hidden.
/// - **Development** (default): compact single-line console output with
///   timestamp and level.
///
/// When `settings.file` is set, every event is also written as a plain-text
/// line to a size-rotated log file.
///
/// Environment variables:
/// - `APP_ENV`: Set to "production" for JSON logs (default: "development")
/// - `RUST_LOG`: Override log levels (e.g., "debug", "email=trace")
///
/// Safe to call multiple times: if a global subscriber is already installed
/// (common in tests) this silently continues.
pub fn init_tracing(environment: &Environment, settings: &LogSettings) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.default_filter));

    let file_layer = settings.file.as_ref().map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file.open()))
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .compact(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!(
                environment = ?environment,
                log_file = ?settings.file.as_ref().map(|f| &f.path),
                "Tracing initialized"
            );
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}
