//! UI-driving publisher for services that offer no API.
//!
//! pagepilot automates two kinds of "surfaces": a browser page (driven over
//! CDP with a persistent profile) and a native desktop window (driven with
//! synthesized input). Both pipelines share the same engine pieces:
//!
//! - [`desktop::window`] / [`browser::surface`] - acquiring a usable surface,
//!   with launch/restore retries
//! - [`browser::session`] - deriving and establishing a signed-in session
//!   from observable markers only
//! - [`selector`] - ordered candidate locators for elements whose markup is
//!   not stable across releases
//! - [`wait`] - polling primitives that turn invisible completion events
//!   into checkpoints
//! - [`flow`] - the per-pipeline step sequences and terminal outcomes
//!
//! One invocation owns the acquired surface and the system clipboard for its
//! whole duration. Concurrent invocations against the same target contend
//! for the window, profile and clipboard; callers must serialize them. The
//! engine holds no state between invocations.

pub mod browser;
pub mod cli;
pub mod config;
pub mod content;
pub mod desktop;
pub mod error;
pub mod flow;
pub mod outcome;
pub mod selector;
pub mod wait;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use outcome::{RunOutcome, RunStatus};
