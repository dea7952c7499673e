use std::path::PathBuf;

use serde::Serialize;

/// Terminal status of one run, printed as the `status` field of the JSON
/// outcome. Everything except `Error` exits with code 0.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Submitted and a success marker was observed.
    Published,
    /// Submitted, but no success marker appeared within the bound; the
    /// post is likely live and a human should confirm in the UI.
    ReadyToConfirm,
    /// Everything filled in, but the submit control was never found;
    /// the human finishes with one click.
    Ready,
    /// Status-probe result: a session already exists.
    LoggedIn,
    NotLoggedIn,
    Error,
}

/// Structured result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_path: Option<PathBuf>,
}

impl RunOutcome {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            title: None,
            message: None,
            capture_path: None,
        }
    }

    pub fn with_title(status: RunStatus, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::new(status)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(RunStatus::Error)
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Error => 1,
            _ => 0,
        }
    }
}

/// Per-step outcome inside a flow. Failures short-circuit the remaining
/// steps unless the step is optional, in which case it reports `Skipped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Skipped(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        let out = RunOutcome::with_title(RunStatus::ReadyToConfirm, "标题");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["status"], "ready_to_confirm");
        assert_eq!(json["title"], "标题");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn only_error_is_nonzero() {
        assert_eq!(RunOutcome::new(RunStatus::Published).exit_code(), 0);
        assert_eq!(RunOutcome::new(RunStatus::Ready).exit_code(), 0);
        assert_eq!(RunOutcome::new(RunStatus::NotLoggedIn).exit_code(), 0);
        assert_eq!(RunOutcome::error("boom").exit_code(), 1);
    }
}
