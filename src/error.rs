//! Supervisor error taxonomy. Every fatal lifecycle outcome maps to one
//! variant so callers can branch on what actually went wrong.

/// Errors produced while supervising a Selenium server instance.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Selenium server failed to start")]
    FailedToStart,

    #[error("Exception thrown by Selenium server: {trace}")]
    Exception { trace: String },

    #[error("Selenium server reported a fatal error")]
    FatalErrorReported,

    #[error("{}", .trace.as_deref().unwrap_or("Selenium terminated unexpectedly"))]
    TerminatedUnexpectedly { trace: Option<String> },

    #[error("Selenium server at {endpoint} refused the shutdown request")]
    ShutdownRefused { endpoint: String },

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}
