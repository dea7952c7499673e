//! Session Guard: decide whether the profile is signed in, and if not,
//! surface the login page and wait for a human to finish.
//!
//! Session state is never stored - it is recomputed from the only signal
//! the engine can see, the presence of named session cookies. Persistence
//! lives entirely in the browser profile.

use crate::browser::BrowserSurface;
use crate::error::EngineError;
use crate::wait::RetryBudget;
use crate::Result;

/// Cookies the target service sets once a session exists. Any one of them
/// counts; the exact set shifts between releases.
const SESSION_COOKIES: [&str; 4] = ["a1", "web_session", "webId", "gid"];

/// Entry point shown to the human when a login is needed.
pub const LOGIN_URL: &str = "https://www.xiaohongshu.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
}

/// Derive the current session state from observable cookie markers.
pub async fn session_state(surface: &BrowserSurface) -> SessionState {
    match surface.cookie_names().await {
        Ok(names) => {
            let found: Vec<&str> = SESSION_COOKIES
                .iter()
                .copied()
                .filter(|c| names.contains(*c))
                .collect();
            if found.is_empty() {
                SessionState::Unauthenticated
            } else {
                tracing::debug!(?found, "session cookies present");
                SessionState::Authenticated
            }
        }
        Err(e) => {
            tracing::warn!("cookie read failed, treating as unauthenticated: {}", e);
            SessionState::Unauthenticated
        }
    }
}

/// Make sure the surface is signed in before any content action.
///
/// Navigates to the service origin first - cookie visibility is scoped to
/// the current page, so the probe is meaningless on a blank page. If no
/// session exists, poll the cookie markers at `budget.delay` intervals for
/// up to `budget.max_attempts` polls (about five minutes by default). This
/// is the one step that deliberately blocks on a human; exceeding the
/// ceiling is [`EngineError::LoginTimeout`].
pub async fn ensure_authenticated(surface: &BrowserSurface, budget: &RetryBudget) -> Result<()> {
    surface.goto(LOGIN_URL).await?;
    if session_state(surface).await == SessionState::Authenticated {
        tracing::info!("already logged in");
        return Ok(());
    }

    tracing::info!(
        "not logged in - complete the login in the browser window; \
         the run continues automatically once a session appears"
    );
    eprintln!("Please log in to the service in the opened browser window...");

    for poll in 1..=budget.max_attempts {
        tokio::time::sleep(budget.delay).await;
        if session_state(surface).await == SessionState::Authenticated {
            tracing::info!(poll, "login completed");
            return Ok(());
        }
    }
    Err(EngineError::LoginTimeout)
}
