//! Logging configuration using tracing.
//!
//! Diagnostics go to stderr so stdout carries nothing but results.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Include target (module path)
    pub with_target: bool,
    /// Emit ANSI colors
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            with_target: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the level from the `--quiet` and `--verbose` flags. Quiet wins.
    ///
    /// Verbose output also names the module each event came from. Colors
    /// follow whether stderr supports them.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        let config = match (quiet, verbose) {
            (true, _) => Self::new().level("error"),
            (false, true) => Self::new().level("debug").with_target(),
            (false, false) => Self::new().level("info"),
        };
        config.ansi(console::colors_enabled_stderr())
    }

    /// Set the log level
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_target(mut self) -> Self {
        self.with_target = true;
        self
    }

    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Install the global tracing subscriber.
///
/// Does nothing if a subscriber is already installed.
pub fn init_logging(config: LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let fmt_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .with_ansi(config.ansi);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
