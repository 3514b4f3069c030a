#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-driven settings for the whisker workspace.
//!
//! Every knob has a default; setting a variable to an unparseable value is an
//! error rather than a silent fallback, so a typo in a deployment manifest
//! fails loudly at startup.

use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Backend base URL used when `WHISKER_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3180";

/// Tracing directive used when `WHISKER_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

const ENV_BASE_URL: &str = "WHISKER_BASE_URL";
const ENV_LABEL: &str = "WHISKER_LABEL";
const ENV_HTTP_TIMEOUT_SECS: &str = "WHISKER_HTTP_TIMEOUT_SECS";
const ENV_BURST_THRESHOLD_SECS: &str = "WHISKER_BURST_THRESHOLD_SECS";
const ENV_BURST_INTERVAL_SECS: &str = "WHISKER_BURST_INTERVAL_SECS";
const ENV_LOG: &str = "WHISKER_LOG";
const ENV_LOG_FORMAT: &str = "WHISKER_LOG_FORMAT";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BURST_THRESHOLD_SECS: u64 = 10;
const DEFAULT_BURST_INTERVAL_SECS: u64 = 5;

/// Result alias for settings resolution.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised while resolving settings from the environment.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A URL-valued variable failed to parse.
    #[error("invalid URL in environment")]
    InvalidUrl {
        /// Name of the offending variable.
        name: &'static str,
        /// Value that failed to parse.
        value: String,
        /// Source URL parse error.
        source: url::ParseError,
    },
    /// A numeric variable failed to parse.
    #[error("invalid number in environment")]
    InvalidNumber {
        /// Name of the offending variable.
        name: &'static str,
        /// Value that failed to parse.
        value: String,
        /// Source integer parse error.
        source: ParseIntError,
    },
    /// A duration variable must be positive to be usable.
    #[error("environment duration must be positive")]
    ZeroDuration {
        /// Name of the offending variable.
        name: &'static str,
    },
}

/// Resolved settings shared by the CLI and the engine wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the status backend.
    pub base_url: Url,
    /// Initial session label; `None` selects the backend default.
    pub label: Option<String>,
    /// Timeout applied to every backend request.
    pub http_timeout: Duration,
    /// Countdown threshold below which the scheduler arms a burst.
    pub burst_threshold: Duration,
    /// Fetch cadence while a burst is running.
    pub burst_interval: Duration,
    /// Tracing filter directive (`info`, `whisker_core=debug`, ...).
    pub log_directive: String,
    /// Requested log format name (`pretty`/`json`); inferred when `None`.
    pub log_format: Option<String>,
}

impl Settings {
    /// Resolve settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] when a variable is set to a value that
    /// cannot be parsed, or when a duration that must be positive is zero.
    pub fn from_env() -> SettingsResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> SettingsResult<Self> {
        let raw_base = lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = raw_base.parse().map_err(|source| SettingsError::InvalidUrl {
            name: ENV_BASE_URL,
            value: raw_base.clone(),
            source,
        })?;

        let http_timeout = seconds_or_default(
            ENV_HTTP_TIMEOUT_SECS,
            lookup(ENV_HTTP_TIMEOUT_SECS),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        let burst_threshold = seconds_or_default(
            ENV_BURST_THRESHOLD_SECS,
            lookup(ENV_BURST_THRESHOLD_SECS),
            DEFAULT_BURST_THRESHOLD_SECS,
        )?;
        let burst_interval = seconds_or_default(
            ENV_BURST_INTERVAL_SECS,
            lookup(ENV_BURST_INTERVAL_SECS),
            DEFAULT_BURST_INTERVAL_SECS,
        )?;
        require_positive(ENV_HTTP_TIMEOUT_SECS, http_timeout)?;
        require_positive(ENV_BURST_INTERVAL_SECS, burst_interval)?;

        Ok(Self {
            base_url,
            label: lookup(ENV_LABEL).filter(|value| !value.is_empty()),
            http_timeout,
            burst_threshold,
            burst_interval,
            log_directive: lookup(ENV_LOG)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string()),
            log_format: lookup(ENV_LOG_FORMAT).filter(|value| !value.is_empty()),
        })
    }
}

fn seconds_or_default(
    name: &'static str,
    value: Option<String>,
    default_secs: u64,
) -> SettingsResult<Duration> {
    value.map_or(Ok(Duration::from_secs(default_secs)), |raw| {
        let seconds = raw
            .trim()
            .parse()
            .map_err(|source| SettingsError::InvalidNumber {
                name,
                value: raw.clone(),
                source,
            })?;
        Ok(Duration::from_secs(seconds))
    })
}

const fn require_positive(name: &'static str, duration: Duration) -> SettingsResult<()> {
    if duration.is_zero() {
        Err(SettingsError::ZeroDuration { name })
    } else {
        Ok(())
    }
}
