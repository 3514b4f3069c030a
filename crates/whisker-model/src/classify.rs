//! Payload classification and normalization.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::payload::StatusPayload;
use crate::record::StatusRecord;

/// Substituted when a failed check carries no error text.
const UNKNOWN_BACKEND_ERROR: &str = "Unknown error from backend.";

static RATE_LIMIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate limit: last change too recent").expect("rate limit pattern is valid")
});

/// Classification of a decoded status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// The check succeeded; the record carries the full session state.
    Healthy,
    /// The tracker rate-limited the check. The record stays informational:
    /// the message lands in `status_message` and counters are preserved.
    SoftFailure,
    /// The check failed outright; the record carries only the error.
    HardFailure,
}

impl RecordKind {
    #[must_use]
    /// Notice severity matching the classification.
    pub const fn severity(self) -> crate::Severity {
        match self {
            Self::Healthy => crate::Severity::Success,
            Self::SoftFailure => crate::Severity::Warning,
            Self::HardFailure => crate::Severity::Error,
        }
    }
}

/// Turn a wire payload into the canonical record.
///
/// A payload with `success == false` or a non-empty `error` is a failed
/// check. Failures matching the tracker's rate-limit message stay soft:
/// every field is mapped as usual, `error` is cleared, and the message is
/// surfaced through `status_message`. Any other failure collapses to a
/// hard-failure record via [`StatusRecord::failure`].
#[must_use]
pub fn normalize(payload: StatusPayload) -> (StatusRecord, RecordKind) {
    match failure_message(&payload) {
        Some(message) if RATE_LIMIT_PATTERN.is_match(&message) => {
            let mut record = map_fields(payload);
            record.error = None;
            record.status_message = Some(message);
            (record, RecordKind::SoftFailure)
        }
        Some(message) => (StatusRecord::failure(message), RecordKind::HardFailure),
        None => (map_fields(payload), RecordKind::Healthy),
    }
}

fn failure_message(payload: &StatusPayload) -> Option<String> {
    let error_text = payload.error.as_deref().filter(|text| !text.is_empty());
    if payload.success == Some(false) || error_text.is_some() {
        Some(error_text.unwrap_or(UNKNOWN_BACKEND_ERROR).to_string())
    } else {
        None
    }
}

fn map_fields(payload: StatusPayload) -> StatusRecord {
    StatusRecord {
        configured: payload.configured.unwrap_or(true),
        error: None,
        status_message: first_non_empty(payload.status_message, payload.message),
        last_check_time: payload.last_check_time.as_deref().and_then(parse_timestamp),
        next_check_time: payload.next_check_time.as_deref().and_then(parse_timestamp),
        rate_limit_seconds: payload.ratelimit.unwrap_or(0),
        check_frequency_minutes: payload.check_freq.unwrap_or(5),
        points: payload.points,
        cheese: payload.cheese,
        mam_id: payload.mam_id,
        current_ip: payload.current_ip,
        current_ip_asn: payload.current_ip_asn,
        detected_public_ip: payload.detected_public_ip,
        detected_public_ip_asn: payload.detected_public_ip_asn,
        detected_public_ip_as: payload.detected_public_ip_as,
        proxied_public_ip: payload.proxied_public_ip,
        proxied_public_ip_asn: payload.proxied_public_ip_asn,
        proxied_public_ip_as: payload.proxied_public_ip_as,
        mam_cookie_exists: payload.mam_cookie_exists,
        mam_session_as: payload.mam_session_as,
        asn: payload.asn,
        details: payload.details,
    }
}

fn first_non_empty(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|text| !text.is_empty())
        .or_else(|| fallback.filter(|text| !text.is_empty()))
}

/// Timestamps arrive as RFC 3339 or as a space-separated UTC date-time;
/// anything else is treated as absent.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use chrono::TimeZone;

    fn healthy_payload() -> StatusPayload {
        StatusPayload {
            success: Some(true),
            mam_id: Some("abc123".to_string()),
            message: Some("No check needed yet".to_string()),
            next_check_time: Some("2026-08-22T10:30:00Z".to_string()),
            last_check_time: Some("2026-08-22 10:25:00".to_string()),
            points: Some(55_100),
            cheese: Some(7),
            ..StatusPayload::default()
        }
    }

    #[test]
    fn healthy_payload_maps_fields_and_defaults() {
        let (record, kind) = normalize(healthy_payload());
        assert_eq!(kind, RecordKind::Healthy);
        assert!(record.configured);
        assert!(record.error.is_none());
        assert_eq!(record.status_message.as_deref(), Some("No check needed yet"));
        assert_eq!(record.rate_limit_seconds, 0);
        assert_eq!(record.check_frequency_minutes, 5);
        assert_eq!(record.points, Some(55_100));
        assert_eq!(
            record.next_check_time,
            Some(Utc.with_ymd_and_hms(2026, 8, 22, 10, 30, 0).unwrap())
        );
        assert_eq!(
            record.last_check_time,
            Some(Utc.with_ymd_and_hms(2026, 8, 22, 10, 25, 0).unwrap())
        );
    }

    #[test]
    fn explicit_numeric_fields_are_kept() {
        let payload = StatusPayload {
            ratelimit: Some(0),
            check_freq: Some(30),
            ..healthy_payload()
        };
        let (record, _) = normalize(payload);
        assert_eq!(record.rate_limit_seconds, 0);
        assert_eq!(record.check_frequency_minutes, 30);
    }

    #[test]
    fn status_message_prefers_the_dedicated_field() {
        let payload = StatusPayload {
            status_message: Some("Check complete".to_string()),
            ..healthy_payload()
        };
        let (record, _) = normalize(payload);
        assert_eq!(record.status_message.as_deref(), Some("Check complete"));
    }

    #[test]
    fn rate_limited_check_stays_soft() {
        let payload = StatusPayload {
            success: Some(false),
            error: Some("Rate limit: last change too recent".to_string()),
            ..healthy_payload()
        };
        let (record, kind) = normalize(payload);
        assert_eq!(kind, RecordKind::SoftFailure);
        assert_eq!(kind.severity(), Severity::Warning);
        assert!(record.error.is_none());
        assert_eq!(
            record.status_message.as_deref(),
            Some("Rate limit: last change too recent")
        );
        assert_eq!(record.points, Some(55_100));
        assert!(record.next_check_time.is_some());
    }

    #[test]
    fn backend_failure_collapses_to_error_record() {
        let payload = StatusPayload {
            success: Some(false),
            error: Some("MaM session cookie invalid".to_string()),
            ..healthy_payload()
        };
        let (record, kind) = normalize(payload);
        assert_eq!(kind, RecordKind::HardFailure);
        assert_eq!(record.error.as_deref(), Some("MaM session cookie invalid"));
        assert!(record.configured);
        assert!(record.points.is_none());
        assert!(record.cheese.is_none());
        assert!(record.next_check_time.is_none());
    }

    #[test]
    fn failure_without_text_uses_fallback_message() {
        let payload = StatusPayload {
            success: Some(false),
            error: Some(String::new()),
            ..StatusPayload::default()
        };
        let (record, kind) = normalize(payload);
        assert_eq!(kind, RecordKind::HardFailure);
        assert_eq!(record.error.as_deref(), Some("Unknown error from backend."));
    }

    #[test]
    fn error_field_alone_marks_a_failure() {
        let payload = StatusPayload {
            error: Some("tracker unreachable".to_string()),
            ..StatusPayload::default()
        };
        let (_, kind) = normalize(payload);
        assert_eq!(kind, RecordKind::HardFailure);
    }

    #[test]
    fn unconfigured_payload_stays_healthy_but_unconfigured() {
        let payload = StatusPayload {
            configured: Some(false),
            ..StatusPayload::default()
        };
        let (record, kind) = normalize(payload);
        assert_eq!(kind, RecordKind::Healthy);
        assert!(!record.configured);
        assert!(record.scheduling_deadline().is_none());
    }

    #[test]
    fn unparseable_timestamp_is_treated_as_absent() {
        let payload = StatusPayload {
            next_check_time: Some("soon".to_string()),
            ..healthy_payload()
        };
        let (record, _) = normalize(payload);
        assert!(record.next_check_time.is_none());
    }
}
