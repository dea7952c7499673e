//! Flow orchestration: each pipeline is a linear sequence of named steps
//! over one acquired surface, tracked through a shared state machine and
//! wrapped in best-effort failure capture.

pub mod message;
pub mod publish;

use std::path::{Path, PathBuf};

use crate::desktop::ScreenCapture;

/// States of one publish/send run. `Done` and `Failed` are terminal; any
/// state may jump to `Failed` on an unrecoverable step error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Init,
    SurfaceReady,
    Authenticated,
    TargetSelected,
    ContentInjected,
    SubmissionTriggered,
    Confirmed,
    NeedsManualConfirmation,
    Done,
    Failed,
}

/// Transition bookkeeping for one run; exists so every pipeline logs the
/// same way and tests can assert on the path taken.
#[derive(Debug)]
pub struct FlowTrace {
    pipeline: &'static str,
    state: FlowState,
    path: Vec<FlowState>,
}

impl FlowTrace {
    pub fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            state: FlowState::Init,
            path: vec![FlowState::Init],
        }
    }

    pub fn advance(&mut self, next: FlowState) {
        tracing::info!(pipeline = self.pipeline, from = ?self.state, to = ?next, "flow transition");
        self.state = next;
        self.path.push(next);
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn path(&self) -> &[FlowState] {
        &self.path
    }
}

/// Best-effort diagnostic capture on a fatal error. Capture failures are
/// swallowed; they must never mask the error being reported.
pub fn capture_failure(dir: Option<&Path>) -> Option<PathBuf> {
    let dir = dir?;
    match ScreenCapture::save_to_dir(dir) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "failure capture written");
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failure capture skipped: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_records_the_path() {
        let mut trace = FlowTrace::new("publish");
        trace.advance(FlowState::SurfaceReady);
        trace.advance(FlowState::Authenticated);
        trace.advance(FlowState::Failed);
        assert_eq!(trace.state(), FlowState::Failed);
        assert_eq!(
            trace.path(),
            &[
                FlowState::Init,
                FlowState::SurfaceReady,
                FlowState::Authenticated,
                FlowState::Failed
            ]
        );
    }

    #[test]
    fn capture_without_a_dir_is_none() {
        assert!(capture_failure(None).is_none());
    }
}
