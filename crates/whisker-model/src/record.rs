//! Normalized session status state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical in-memory snapshot of one session's job state.
///
/// Records are replaced wholesale on every applied fetch; nothing mutates
/// them field by field. `configured` defaults to `true` because the backend
/// only sends the key when a session is incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    /// Whether the session is fully configured on the backend.
    pub configured: bool,
    /// Hard-failure description; `None` for healthy records and rate-limit
    /// soft failures.
    pub error: Option<String>,
    /// Display line describing the last check.
    pub status_message: Option<String>,
    /// When the backend last completed a check.
    pub last_check_time: Option<DateTime<Utc>>,
    /// When the backend will next evaluate the session.
    pub next_check_time: Option<DateTime<Utc>>,
    /// Seconds the tracker rate-limits further checks.
    pub rate_limit_seconds: u64,
    /// Configured check frequency in minutes.
    pub check_frequency_minutes: u64,
    /// Bonus points at the last check; cleared on hard failure.
    pub points: Option<u64>,
    /// Cheese at the last check; cleared on hard failure.
    pub cheese: Option<u64>,
    /// Session identifier (cookie value).
    pub mam_id: Option<String>,
    /// Address the session is currently bound to.
    pub current_ip: Option<String>,
    /// ASN of the current address.
    pub current_ip_asn: Option<String>,
    /// Public address detected by the backend.
    pub detected_public_ip: Option<String>,
    /// ASN of the detected public address.
    pub detected_public_ip_asn: Option<String>,
    /// AS description of the detected public address.
    pub detected_public_ip_as: Option<String>,
    /// Public address observed through the proxy.
    pub proxied_public_ip: Option<String>,
    /// ASN of the proxied address.
    pub proxied_public_ip_asn: Option<String>,
    /// AS description of the proxied address.
    pub proxied_public_ip_as: Option<String>,
    /// Whether the session cookie is present on the backend.
    pub mam_cookie_exists: Option<bool>,
    /// AS description recorded for the session.
    pub mam_session_as: Option<String>,
    /// ASN recorded for the session.
    pub asn: Option<String>,
    /// Raw per-check details from the backend.
    pub details: Option<Map<String, Value>>,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            configured: true,
            error: None,
            status_message: None,
            last_check_time: None,
            next_check_time: None,
            rate_limit_seconds: 0,
            check_frequency_minutes: 0,
            points: None,
            cheese: None,
            mam_id: None,
            current_ip: None,
            current_ip_asn: None,
            detected_public_ip: None,
            detected_public_ip_asn: None,
            detected_public_ip_as: None,
            proxied_public_ip: None,
            proxied_public_ip_asn: None,
            proxied_public_ip_as: None,
            mam_cookie_exists: None,
            mam_session_as: None,
            asn: None,
            details: None,
        }
    }
}

impl StatusRecord {
    #[must_use]
    /// Build a hard-failure record carrying only the error description.
    ///
    /// Counters are cleared so stale numbers are never displayed next to an
    /// error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    /// The deadline the poll scheduler may act on.
    ///
    /// An unconfigured record or one carrying an error has no usable
    /// deadline, whatever its `next_check_time` says.
    pub const fn scheduling_deadline(&self) -> Option<DateTime<Utc>> {
        if !self.configured || self.error.is_some() {
            return None;
        }
        self.next_check_time
    }

    #[must_use]
    /// Outcome of the most recent tracker check as reported in `details`.
    pub fn check_verdict(&self) -> CheckVerdict {
        let Some(details) = &self.details else {
            return CheckVerdict::Unknown;
        };
        let error_present = details
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(|text| !text.is_empty());
        if error_present {
            return CheckVerdict::Failed;
        }
        match details.get("success").and_then(Value::as_bool) {
            Some(true) => CheckVerdict::Passed,
            Some(false) => CheckVerdict::Failed,
            None => CheckVerdict::Unknown,
        }
    }
}

/// Outcome of the most recent tracker check, derived from record details.
///
/// Presentation metadata only; scheduling never branches on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckVerdict {
    /// The last tracker check succeeded.
    Passed,
    /// The last tracker check failed.
    Failed,
    /// The details carry no verdict.
    Unknown,
}

impl CheckVerdict {
    #[must_use]
    /// Short lowercase label for rendering.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Severity attached to operator-facing notices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The operation completed as requested.
    Success,
    /// Advisory message with no action required.
    Info,
    /// The operation completed with a caveat.
    Warning,
    /// The operation failed.
    Error,
}

impl Severity {
    #[must_use]
    /// Short lowercase label for rendering.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}
