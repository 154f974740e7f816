//! Server state definitions.

/// Server operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Server is starting up.
    Starting,
    /// Server is running and accepting requests.
    Running,
    /// Server is shutting down, not accepting new mutations.
    ShuttingDown,
    /// Server is stopped.
    Stopped,
}

impl ServerState {
    /// Check if the server is operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, ServerState::Running)
    }

    /// Check if the server is accepting new mutations.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, ServerState::Running)
    }

    /// Check if the server is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::Stopped)
    }

    /// Label used in health responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Stopped => "stopped",
        }
    }
}
