//! Shared backend context and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use url::Url;
use whisker_client::{ClientError, StatusClient};

/// Separates bad invocations from operations that failed downstream; the
/// distinction drives the process exit code.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation { message: String },
    Failure { source: anyhow::Error },
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure {
            source: error.into(),
        }
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => 2,
            Self::Failure { .. } => 3,
        }
    }

    /// Text printed to stderr; failures flatten their context chain.
    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::Failure { source } => format!("{source:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: StatusClient,
    pub(crate) label: Option<String>,
}

impl AppContext {
    /// Build the shared backend client from the global CLI flags.
    pub(crate) fn new(base_url: Url, timeout: Duration, label: Option<String>) -> CliResult<Self> {
        let client = StatusClient::new(base_url, timeout).map_err(classify_client)?;
        Ok(Self { client, label })
    }
}

/// Map a backend client failure onto the CLI error surface.
///
/// Rejections for malformed requests count as validation; everything else is
/// an operational failure carrying its source chain.
pub(crate) fn classify_client(error: ClientError) -> CliError {
    match &error {
        ClientError::Backend { status, .. } if matches!(status.as_u16(), 400 | 409 | 422) => {
            CliError::validation(error.display_message())
        }
        ClientError::Backend { .. } => CliError::failure(anyhow!(error.display_message())),
        _ => CliError::failure(error),
    }
}

/// Parse the base URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("'{input}' is not a valid base URL: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_validation_from_failure() {
        assert_eq!(CliError::validation("bad flag").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn failure_messages_chain_their_sources() {
        let error = CliError::failure(anyhow!("connection refused").context("request failed"));
        assert_eq!(error.display_message(), "request failed: connection refused");
        assert_eq!(error.to_string(), error.display_message());
    }

    #[test]
    fn client_failures_map_to_operational_errors() {
        let source = "http://[invalid".parse::<Url>().unwrap_err();
        let error = classify_client(ClientError::InvalidUrl {
            operation: "fetch_status",
            source,
        });
        assert_eq!(error.exit_code(), 3);
        assert!(error.display_message().starts_with("invalid request URL"));
    }

    #[test]
    fn parse_url_rejects_garbage() {
        assert!(parse_url("http://127.0.0.1:3180").is_ok());
        assert!(parse_url("not a url").is_err());
    }
}
