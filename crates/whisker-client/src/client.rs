//! Request plumbing for the status backend API.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use whisker_model::{
    SeedboxOutcome, SeedboxResponse, SessionLabelRequest, SessionsResponse, StatusPayload,
};

use crate::error::{ClientError, ClientResult};

/// Typed client for the seedbox status backend.
///
/// One instance is shared across the engine and the CLI; every call issues a
/// single request with the configured timeout and maps the response into
/// domain types. Retrying and interpretation are left to callers.
#[derive(Debug, Clone)]
pub struct StatusClient {
    http: Client,
    base_url: Url,
}

impl StatusClient {
    /// Build a client against `base_url` with one shared request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when the underlying HTTP client cannot
    /// be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Build { source })?;
        Ok(Self { http, base_url })
    }

    /// Base URL this client talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the status document for `label` (backend default when `None`).
    ///
    /// Forcing appends `force=1`, instructing the backend to run a fresh
    /// tracker check instead of serving the cached record; the parameter is
    /// omitted entirely otherwise.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend cannot be reached, a
    /// backend error for non-success statuses, and an invalid-body error
    /// when the document cannot be decoded.
    pub async fn fetch_status(
        &self,
        label: Option<&str>,
        force: bool,
    ) -> ClientResult<StatusPayload> {
        const OPERATION: &str = "fetch_status";
        let mut url = self.endpoint(OPERATION, "/api/status")?;
        if label.is_some() || force {
            let mut pairs = url.query_pairs_mut();
            if let Some(label) = label {
                pairs.append_pair("label", label);
            }
            if force {
                pairs.append_pair("force", "1");
            }
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::transport(OPERATION, source))?;
        decode(OPERATION, response).await
    }

    /// Ask the backend to push the session's current IP to the seedbox.
    ///
    /// A success status always decodes into a [`SeedboxOutcome`];
    /// `success: false` inside a 2xx response is a reported outcome, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend cannot be reached, a
    /// backend error for non-success statuses, and an invalid-body error
    /// when the acknowledgement cannot be decoded.
    pub async fn update_seedbox(&self, label: &str) -> ClientResult<SeedboxOutcome> {
        const OPERATION: &str = "update_seedbox";
        let url = self.endpoint(OPERATION, "/api/session/update_seedbox")?;
        let response = self
            .http
            .post(url)
            .json(&SessionLabelRequest::new(label))
            .send()
            .await
            .map_err(|source| ClientError::transport(OPERATION, source))?;
        let acknowledgement: SeedboxResponse = decode(OPERATION, response).await?;
        Ok(SeedboxOutcome::from(acknowledgement))
    }

    /// List the session labels the backend is configured with.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend cannot be reached, a
    /// backend error for non-success statuses, and an invalid-body error
    /// when the list cannot be decoded.
    pub async fn list_sessions(&self) -> ClientResult<Vec<String>> {
        const OPERATION: &str = "list_sessions";
        let url = self.endpoint(OPERATION, "/api/sessions")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::transport(OPERATION, source))?;
        let listing: SessionsResponse = decode(OPERATION, response).await?;
        Ok(listing.sessions)
    }

    /// Persist `label` as the backend's remembered selection.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend cannot be reached and a
    /// backend error for non-success statuses.
    pub async fn set_last_session(&self, label: &str) -> ClientResult<()> {
        const OPERATION: &str = "set_last_session";
        let url = self.endpoint(OPERATION, "/api/last_session")?;
        let response = self
            .http
            .post(url)
            .json(&SessionLabelRequest::new(label))
            .send()
            .await
            .map_err(|source| ClientError::transport(OPERATION, source))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(OPERATION, response).await)
        }
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::invalid_url(operation, source))
    }
}

async fn decode<T>(operation: &'static str, response: Response) -> ClientResult<T>
where
    T: DeserializeOwned + Send,
{
    if !response.status().is_success() {
        return Err(rejection(operation, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::invalid_body(operation, source))
}

/// Read a failed response into a backend error, preferring the body's own
/// `error`/`msg` text over the bare status line.
async fn rejection(operation: &'static str, response: Response) -> ClientError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .and_then(|body| {
            body.error
                .filter(|text| !text.is_empty())
                .or_else(|| body.msg.filter(|text| !text.is_empty()))
        })
        .unwrap_or_else(|| format!("request failed with status {status}"));
    ClientError::backend(operation, status, message)
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
    msg: Option<String>,
}
