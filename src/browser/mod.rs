//! Browser surface: a Chromium page driven over CDP with a persistent
//! profile, so a one-time interactive login survives across runs.

pub mod session;
pub mod surface;

pub use session::{ensure_authenticated, session_state, SessionState};
pub use surface::BrowserSurface;
