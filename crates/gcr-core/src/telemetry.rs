//! Tracing subscriber setup for binaries and test harnesses embedding the
//! engine.
//!
//! The engine itself only emits events (see [`crate::obs`]); installing a
//! subscriber is the embedding program's call. Only the first installation
//! in a process takes effect.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable selecting the log format (`json` or `text`).
pub const LOG_FORMAT_ENV: &str = "GCR_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Newline-delimited JSON, one object per event.
    Json,
}

impl LogFormat {
    /// Parse a format name; anything other than `json` is text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Format requested through [`LOG_FORMAT_ENV`], text when unset.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or(Self::Text)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_tracing(json: bool, level: Level) {
    let format = if json { LogFormat::Json } else { LogFormat::Text };
    install(format, level);
}

/// Install the global subscriber with the format taken from
/// [`LOG_FORMAT_ENV`].
pub fn init_tracing_from_env(level: Level) {
    install(LogFormat::from_env(), level);
}

fn install(format: LogFormat, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(false).json())
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
