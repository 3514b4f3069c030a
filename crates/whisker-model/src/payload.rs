//! Wire DTOs mirroring the backend's JSON contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw response body for `GET /api/status`.
///
/// Every field is optional on the wire; absent keys and explicit `null` are
/// equivalent after decoding. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// `false` marks a failed check; absent means the check succeeded.
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Backend error description accompanying a failed check.
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Session identifier (cookie value) tracked by the backend.
    pub mam_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Seconds the tracker rate-limits further checks.
    pub ratelimit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Configured check frequency in minutes.
    pub check_freq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Human-readable status line.
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Alternate status line used by some backend versions.
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Public address detected by the backend.
    pub detected_public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Address the session is currently bound to.
    pub current_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// ASN of the current address.
    pub current_ip_asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// ASN of the detected public address.
    pub detected_public_ip_asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// AS description of the detected public address.
    pub detected_public_ip_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Public address observed through the proxy, when one is configured.
    pub proxied_public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// ASN of the proxied address.
    pub proxied_public_ip_asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// AS description of the proxied address.
    pub proxied_public_ip_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Whether the session cookie is present on the backend.
    pub mam_cookie_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// AS description recorded for the session.
    pub mam_session_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// ASN recorded for the session.
    pub asn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Timestamp of the last completed check.
    pub last_check_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Timestamp of the next scheduled check.
    pub next_check_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Bonus points at the last check.
    pub points: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Cheese at the last check.
    pub cheese: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Whether the session is fully configured; absent means configured.
    pub configured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Free-form per-check details; `success` and `error` keys describe the
    /// most recent tracker check outcome.
    pub details: Option<Map<String, Value>>,
}

/// Raw response body for `POST /api/session/update_seedbox`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedboxResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Whether the seedbox-side update was applied.
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Confirmation message on success.
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Failure description when the update was not applied.
    pub error: Option<String>,
}

/// Settled result of a seedbox update, with the message resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedboxOutcome {
    /// Whether the backend reported the update as applied.
    pub success: bool,
    /// Message to surface to the operator.
    pub message: String,
}

impl From<SeedboxResponse> for SeedboxOutcome {
    fn from(response: SeedboxResponse) -> Self {
        let success = response.success.unwrap_or(false);
        let message = if success {
            non_empty(response.msg).unwrap_or_else(|| "Seedbox updated!".to_string())
        } else {
            non_empty(response.error)
                .or_else(|| non_empty(response.msg))
                .unwrap_or_else(|| "Update failed".to_string())
        };
        Self { success, message }
    }
}

/// Response body for `GET /api/sessions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionsResponse {
    /// Labels of every configured session.
    #[serde(default)]
    pub sessions: Vec<String>,
}

/// Request body carrying a session label, shared by the seedbox update and
/// last-session endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionLabelRequest {
    /// Session the request applies to.
    pub label: String,
}

impl SessionLabelRequest {
    #[must_use]
    /// Build a request body for the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_payload_ignores_unknown_keys() {
        let payload: StatusPayload = serde_json::from_str(
            r#"{"success": true, "points": 1234, "brand_new_field": "ignored"}"#,
        )
        .expect("payload should decode");
        assert_eq!(payload.success, Some(true));
        assert_eq!(payload.points, Some(1234));
    }

    #[test]
    fn status_payload_treats_null_as_absent() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"error": null, "next_check_time": null}"#)
                .expect("payload should decode");
        assert_eq!(payload, StatusPayload::default());
    }

    #[test]
    fn status_payload_omits_absent_fields_on_encode() {
        let payload = StatusPayload {
            success: Some(true),
            ..StatusPayload::default()
        };
        let text = serde_json::to_string(&payload).expect("payload should encode");
        assert_eq!(text, r#"{"success":true}"#);
    }

    #[test]
    fn seedbox_outcome_prefers_msg_on_success() {
        let outcome = SeedboxOutcome::from(SeedboxResponse {
            success: Some(true),
            msg: Some("Updated ip".to_string()),
            error: None,
        });
        assert!(outcome.success);
        assert_eq!(outcome.message, "Updated ip");
    }

    #[test]
    fn seedbox_outcome_falls_back_to_defaults() {
        let success = SeedboxOutcome::from(SeedboxResponse {
            success: Some(true),
            msg: Some(String::new()),
            error: None,
        });
        assert_eq!(success.message, "Seedbox updated!");

        let failure = SeedboxOutcome::from(SeedboxResponse::default());
        assert!(!failure.success);
        assert_eq!(failure.message, "Update failed");
    }

    #[test]
    fn seedbox_outcome_reports_error_text_on_failure() {
        let outcome = SeedboxOutcome::from(SeedboxResponse {
            success: Some(false),
            msg: Some("ignored".to_string()),
            error: Some("no update needed".to_string()),
        });
        assert!(!outcome.success);
        assert_eq!(outcome.message, "no update needed");
    }

    #[test]
    fn session_label_request_encodes_label_only() {
        let body = SessionLabelRequest::new("main");
        let text = serde_json::to_string(&body).expect("request should encode");
        assert_eq!(text, r#"{"label":"main"}"#);
    }
}
