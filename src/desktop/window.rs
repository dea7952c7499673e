//! Surface Acquirer for desktop windows.
//!
//! The target window may be minimized, hidden in the tray, or not running
//! at all. Acquisition retries a fixed number of times, and on each attempt
//! fixes what it can: restore hotkeys for a present-but-unusable window, a
//! prioritized-path launch when the process is missing. Restore steps are
//! independent best-effort actions; their failures never propagate.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::anyhow;

use super::input::Input;
use crate::error::EngineError;
use crate::wait::RetryBudget;
use crate::Result;

/// Pause after a restore hotkey before re-checking the window.
const RESTORE_SETTLE: Duration = Duration::from_secs(1);
/// Windows below this size are treated as tray stubs, not usable surfaces.
const MIN_USABLE_DIM: u32 = 100;

/// Snapshot of one OS window. Geometry is read at enumeration time; a
/// liveness re-check is just another lookup by title.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub id: u32,
    pub title: String,
    pub app_name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_minimized: bool,
}

impl WindowInfo {
    pub fn is_usable(&self) -> bool {
        !self.is_minimized && self.width > MIN_USABLE_DIM && self.height > MIN_USABLE_DIM
    }
}

/// How to start the owning application when no window exists: known install
/// locations in priority order, then a shell-level launch by name.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Process image name to probe for (e.g. `WeChat.exe` / `wechat`).
    pub process_name: String,
    pub install_paths: Vec<PathBuf>,
    /// Name handed to the shell as a last resort.
    pub shell_name: String,
}

/// All visible, titled windows.
pub fn list_windows() -> anyhow::Result<Vec<WindowInfo>> {
    let windows = xcap::Window::all().map_err(|e| anyhow!("failed to enumerate windows: {}", e))?;
    Ok(windows
        .into_iter()
        .filter(|w| !w.title().is_empty())
        .map(|w| WindowInfo {
            id: w.id(),
            title: w.title().to_string(),
            app_name: w.app_name().to_string(),
            x: w.x(),
            y: w.y(),
            width: w.width(),
            height: w.height(),
            is_minimized: w.is_minimized(),
        })
        .collect())
}

/// First window whose title contains `title` (case-insensitive).
pub fn find_window(title: &str) -> Option<WindowInfo> {
    let needle = title.to_lowercase();
    list_windows()
        .ok()?
        .into_iter()
        .find(|w| w.title.to_lowercase().contains(&needle))
}

/// Full title of the first window matching `title`, if any.
pub fn find_window_title(title: &str) -> Option<String> {
    find_window(title).map(|w| w.title)
}

/// Whether a process with the given image name is running.
pub fn is_process_running(name: &str) -> bool {
    #[cfg(target_os = "windows")]
    let output = Command::new("tasklist")
        .args(["/FI", &format!("IMAGENAME eq {}", name)])
        .output();

    #[cfg(not(target_os = "windows"))]
    let output = Command::new("pgrep").args(["-f", name]).output();

    match output {
        #[cfg(target_os = "windows")]
        Ok(out) => String::from_utf8_lossy(&out.stdout).contains(name),
        #[cfg(not(target_os = "windows"))]
        Ok(out) => out.status.success(),
        Err(_) => false,
    }
}

/// Launch the application, detached so the child never holds our stdio.
/// Returns whether any launch was dispatched (not whether it succeeded in
/// producing a window - that is what the retry loop observes).
pub fn launch_app(spec: &LaunchSpec) -> bool {
    for path in &spec.install_paths {
        if !path.exists() {
            continue;
        }
        let spawned = Command::new(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(_) => {
                tracing::info!(path = %path.display(), "launched application");
                return true;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "launch failed: {}", e);
                continue;
            }
        }
    }

    // Shell-level fallback by name.
    #[cfg(target_os = "windows")]
    let spawned = Command::new("cmd")
        .args(["/C", "start", "", &spec.shell_name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    #[cfg(target_os = "macos")]
    let spawned = Command::new("open")
        .args(["-a", &spec.shell_name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    let spawned = Command::new(&spec.shell_name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(_) => {
            tracing::info!(name = %spec.shell_name, "launched application via shell");
            true
        }
        Err(e) => {
            tracing::warn!("shell launch failed: {}", e);
            false
        }
    }
}

/// Hotkeys that can drag a hidden or minimized window back on screen,
/// tried in a fixed order. Each is independent; any failure moves on.
const RESTORE_CHORDS: [&str; 4] = ["Win+D", "Win+M", "Win+Up", "Alt+Tab"];

/// Core of acquisition, with the OS actions injected so the retry contract
/// is testable without a windowing system. Exactly `budget.max_attempts`
/// attempts: look the window up; if present but unusable, walk the restore
/// ladder; if absent and the process is not running, launch it. Idempotent
/// when the window is already usable - returns after a settle with no side
/// effects.
pub async fn acquire_with<L, P, A, K>(
    identifier: &str,
    budget: &RetryBudget,
    settle: Duration,
    mut lookup: L,
    mut process_running: P,
    mut launch: A,
    mut send_chord: K,
) -> Result<WindowInfo>
where
    L: FnMut() -> Option<WindowInfo>,
    P: FnMut() -> bool,
    A: FnMut() -> bool,
    K: FnMut(&'static str) -> anyhow::Result<()>,
{
    for attempt in 1..=budget.max_attempts {
        match lookup() {
            Some(win) if win.is_usable() => {
                tokio::time::sleep(settle).await;
                return Ok(win);
            }
            Some(_) => {
                tracing::info!(attempt, "window present but not usable, trying restore ladder");
                for chord in RESTORE_CHORDS {
                    if let Err(e) = send_chord(chord) {
                        tracing::debug!(chord, "restore hotkey failed: {}", e);
                    }
                    tokio::time::sleep(RESTORE_SETTLE).await;
                    if let Some(restored) = lookup() {
                        if restored.is_usable() {
                            return Ok(restored);
                        }
                    }
                }
            }
            None if !process_running() => {
                tracing::info!(attempt, "process not running, launching");
                launch();
            }
            None => {
                tracing::info!(attempt, "process running but no window; restoring from tray");
                for chord in RESTORE_CHORDS {
                    let _ = send_chord(chord);
                    tokio::time::sleep(RESTORE_SETTLE).await;
                    if lookup().map(|w| w.is_usable()).unwrap_or(false) {
                        break;
                    }
                }
            }
        }

        if attempt < budget.max_attempts {
            tracing::info!(attempt, max = budget.max_attempts, "window not acquired, retrying");
            tokio::time::sleep(budget.delay).await;
        }
    }

    Err(EngineError::SurfaceNotFound {
        identifier: identifier.to_string(),
        attempts: budget.max_attempts,
    })
}

/// Acquire a usable window matching `title`, wiring [`acquire_with`] to the
/// real OS: xcap enumeration, process probe, prioritized-path launch, and
/// restore hotkeys through `input`.
pub async fn acquire(
    title: &str,
    launch: &LaunchSpec,
    budget: &RetryBudget,
    input: &mut Input,
    settle: Duration,
) -> Result<WindowInfo> {
    acquire_with(
        title,
        budget,
        settle,
        || find_window(title),
        || is_process_running(&launch.process_name),
        || launch_app(launch),
        |chord| input.send_keys(chord),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(minimized: bool) -> WindowInfo {
        WindowInfo {
            id: 1,
            title: "微信".into(),
            app_name: "WeChat".into(),
            x: 0,
            y: 0,
            width: 800,
            height: 600,
            is_minimized: minimized,
        }
    }

    #[test]
    fn usability_requires_size_and_visibility() {
        let mut w = window(false);
        assert!(w.is_usable());
        w.is_minimized = true;
        assert!(!w.is_usable());
        w.is_minimized = false;
        w.width = 80;
        assert!(!w.is_usable());
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_consumes_exactly_the_budget() {
        let budget = RetryBudget::new(3, Duration::from_secs(3));
        let mut lookups = 0u32;
        let mut launches = 0u32;
        let err = acquire_with(
            "微信",
            &budget,
            Duration::ZERO,
            || {
                lookups += 1;
                None
            },
            || false,
            || {
                launches += 1;
                false
            },
            |_| Ok(()),
        )
        .await
        .unwrap_err();
        match err {
            EngineError::SurfaceNotFound { identifier, attempts } => {
                assert_eq!(identifier, "微信");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        // One lookup and one launch dispatch per attempt, no extras after
        // the last attempt.
        assert_eq!(lookups, 3);
        assert_eq!(launches, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn usable_window_returns_without_side_effects() {
        let budget = RetryBudget::new(3, Duration::from_secs(3));
        let mut lookups = 0u32;
        let win = acquire_with(
            "微信",
            &budget,
            Duration::from_millis(500),
            || {
                lookups += 1;
                Some(window(false))
            },
            || panic!("process check must not run for a visible window"),
            || panic!("launch must not run for a visible window"),
            |_| panic!("no hotkeys for an already-usable window"),
        )
        .await
        .unwrap();
        assert!(win.is_usable());
        assert_eq!(lookups, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_ladder_recovers_a_minimized_window() {
        let budget = RetryBudget::new(3, Duration::from_secs(3));
        let mut lookups = 0u32;
        let mut chords = Vec::new();
        let win = acquire_with(
            "微信",
            &budget,
            Duration::ZERO,
            || {
                lookups += 1;
                // Minimized on first sight, restored after one hotkey.
                Some(window(lookups == 1))
            },
            || true,
            || panic!("launch must not run while a window exists"),
            |chord| {
                chords.push(chord);
                Ok(())
            },
        )
        .await
        .unwrap();
        assert!(win.is_usable());
        // The ladder stopped at the first chord that brought it back.
        assert_eq!(chords, vec!["Win+D"]);
    }
}
