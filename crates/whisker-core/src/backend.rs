//! Backend abstraction over the status HTTP surface.

use async_trait::async_trait;
use whisker_client::{ClientResult, StatusClient};
use whisker_model::{SeedboxOutcome, StatusPayload};

/// The operations the engine needs from the status backend.
///
/// The engine only ever talks to the backend through this trait, so tests
/// can substitute a scripted implementation without a listening server.
#[async_trait]
pub trait StatusBackend: Send + Sync {
    /// Fetch the status document, optionally forcing a fresh check.
    ///
    /// # Errors
    ///
    /// Returns the client error when the request cannot complete or the
    /// backend rejects it.
    async fn fetch_status(&self, label: Option<&str>, force: bool) -> ClientResult<StatusPayload>;

    /// Run the seedbox-side session update for `label`.
    ///
    /// # Errors
    ///
    /// Returns the client error when the request cannot complete or the
    /// backend rejects it.
    async fn update_seedbox(&self, label: &str) -> ClientResult<SeedboxOutcome>;

    /// Record `label` as the last selected session.
    ///
    /// # Errors
    ///
    /// Returns the client error when the request cannot complete or the
    /// backend rejects it.
    async fn persist_last_session(&self, label: &str) -> ClientResult<()>;
}

/// [`StatusBackend`] backed by the real HTTP client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: StatusClient,
}

impl HttpBackend {
    /// Wrap a configured [`StatusClient`].
    #[must_use]
    pub const fn new(client: StatusClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusBackend for HttpBackend {
    async fn fetch_status(&self, label: Option<&str>, force: bool) -> ClientResult<StatusPayload> {
        self.client.fetch_status(label, force).await
    }

    async fn update_seedbox(&self, label: &str) -> ClientResult<SeedboxOutcome> {
        self.client.update_seedbox(label).await
    }

    async fn persist_last_session(&self, label: &str) -> ClientResult<()> {
        self.client.set_last_session(label).await
    }
}
