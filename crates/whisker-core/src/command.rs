//! Commands accepted by the engine task.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineCommand {
    /// Make a different session the active one and refetch from scratch.
    SwitchSession {
        /// New session label; `None` selects the backend default.
        label: Option<String>,
    },
    /// Forced fetch: the backend re-evaluates the session instead of
    /// serving cached status.
    CheckNow,
    /// Run the seedbox-side session update for the active session.
    UpdateSeedbox,
    /// Non-forced fetch for the active session.
    Refresh,
    /// Stop the engine task.
    Shutdown,
}
