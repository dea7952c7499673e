use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::wait::RetryBudget;

/// Every timeout, retry budget and offset the engine uses, built once per
/// run and threaded through immutably. Defaults mirror the behavior the
/// target UIs were measured against; all of them are CLI-overridable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// General pause after fire-and-forget interactions.
    pub settle: Duration,
    /// Pause after typing a search query before reading results.
    pub search_delay: Duration,
    /// Window acquisition: attempts x inter-attempt delay.
    pub acquire: RetryBudget,
    /// Login polling: polls x interval (default 100 x 3s, ~5 minutes).
    pub login: RetryBudget,
    /// Per-candidate timeout when resolving a locator chain.
    pub candidate_timeout: Duration,
    /// Upper bound on the upload-completion wait.
    pub upload_timeout: Duration,
    /// Poll interval for wait conditions.
    pub poll_interval: Duration,
    /// Fixed delay standing in for image generation, which exposes no
    /// completion marker at all.
    pub generation_settle: Duration,
    /// Bounded wait for a success toast after submitting.
    pub confirm_timeout: Duration,

    /// Hard ceiling on title length, in characters.
    pub title_max_chars: usize,
    /// Ceiling on the generated image-text excerpt, in characters.
    pub excerpt_max_chars: usize,

    /// Click target for the message input box, relative to the window
    /// origin. Ignored when `use_center_ratio` is set.
    pub input_offset: (i32, i32),
    /// Click target as a fraction of window width/height.
    pub input_ratio: (f32, f32),
    pub use_center_ratio: bool,
    /// Screen region (x, y, width, height) the search dropdown renders
    /// into, for the OCR peek.
    pub search_region: (u32, u32, u32, u32),

    /// Where failure captures (and post-send screenshots) land.
    pub capture_dir: Option<PathBuf>,
    /// Persistent browser profile directory.
    pub profile_dir: PathBuf,
    pub headless: bool,
}

impl EngineConfig {
    /// Default profile directory under the platform data dir, overridable
    /// with `PAGEPILOT_PROFILE_DIR`.
    pub fn default_profile_dir() -> PathBuf {
        if let Ok(dir) = env::var("PAGEPILOT_PROFILE_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .unwrap_or_else(env::temp_dir)
            .join("pagepilot")
            .join("browser-profile")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(800),
            search_delay: Duration::from_secs(1),
            acquire: RetryBudget::new(3, Duration::from_secs(3)),
            login: RetryBudget::new(100, Duration::from_secs(3)),
            candidate_timeout: Duration::from_secs(3),
            upload_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            generation_settle: Duration::from_secs(10),
            confirm_timeout: Duration::from_secs(5),
            title_max_chars: 20,
            excerpt_max_chars: 500,
            input_offset: (200, 550),
            input_ratio: (0.5, 0.85),
            use_center_ratio: false,
            search_region: (200, 100, 400, 300),
            capture_dir: None,
            profile_dir: Self::default_profile_dir(),
            headless: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.acquire.max_attempts, 3);
        assert_eq!(cfg.login.max_attempts, 100);
        assert_eq!(cfg.title_max_chars, 20);
        // The whole login window stays around five minutes.
        assert_eq!(cfg.login.delay * cfg.login.max_attempts, Duration::from_secs(300));
    }
}
