use thiserror::Error;

/// Failure taxonomy for one publish/send run.
///
/// Everything here is terminal for the run. "Submission clicked but no
/// confirmation observed" is deliberately not in this enum - it is the
/// `ready_to_confirm` outcome, not an error, because the engine cannot see
/// the service's server-side acknowledgment.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("surface '{identifier}' never became usable after {attempts} attempts; make sure the application is open and visible (not hidden in the tray)")]
    SurfaceNotFound { identifier: String, attempts: u32 },

    #[error("login was not completed within the polling window")]
    LoginTimeout,

    #[error("no candidate locator resolved for '{role}'")]
    ElementNotFound { role: &'static str },

    #[error("none of the first {rows} search results matched the target keywords")]
    DisambiguationFailed { rows: u32 },

    #[error("invalid content source: {0}")]
    Content(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
