//! Message pipeline: send a body of text to a contact or group in a native
//! chat application by driving its search box and input field.
//!
//! The fragile part is disambiguation: the search dropdown mixes contacts,
//! groups and a web-search placeholder row, and the engine cannot read the
//! dropdown's widgets. Three mutually exclusive strategies deal with that:
//! manual confirmation, an OCR peek at the first row, or walking rows until
//! the resulting window title matches a query keyword.

use std::env;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::EngineConfig;
use crate::desktop::{acquire, find_window_title, Input, LaunchSpec, ScreenCapture, TextRecognizer};
use crate::error::EngineError;
use crate::flow::{FlowState, FlowTrace};
use crate::outcome::{RunOutcome, RunStatus, StepOutcome};
use crate::Result;

/// Default window title of the target chat application.
pub const DEFAULT_WINDOW_TITLE: &str = "微信";

/// First-row texts that mean "this is the web-search placeholder, not a
/// contact".
const WEB_SEARCH_MARKERS: [&str; 2] = ["网络搜索", "Web Search"];

/// How the engine decides which search result is the intended target.
/// Exactly one mode is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disambiguation {
    /// Pause and let the human pick the row, then continue on their say-so.
    Manual,
    /// OCR the first row and skip it when it is the web-search placeholder.
    AutoDetect,
    /// Accept successive rows until the window title matches a keyword of
    /// the query, giving up after `rows` rows.
    AutoRetry { rows: u32 },
    /// Accept the Nth row blindly (0 = first).
    Index(u32),
}

pub struct MessageRequest {
    /// Search keyword for the contact/group.
    pub target: String,
    pub body: String,
    pub mode: Disambiguation,
    pub window_title: String,
    pub launch: LaunchSpec,
}

/// Known install locations for the chat client, most specific first.
pub fn default_launch_spec() -> LaunchSpec {
    let mut install_paths = Vec::new();
    for (var, tail) in [
        ("ProgramFiles", r"Tencent\WeChat\WeChat.exe"),
        ("ProgramFiles(x86)", r"Tencent\WeChat\WeChat.exe"),
        ("LocalAppData", r"Programs\WeChat\WeChat.exe"),
    ] {
        if let Ok(base) = env::var(var) {
            install_paths.push(PathBuf::from(base).join(tail));
        }
    }
    install_paths.push(PathBuf::from(r"C:\Program Files\Tencent\WeChat\WeChat.exe"));
    install_paths.push(PathBuf::from(r"C:\Program Files (x86)\Tencent\WeChat\WeChat.exe"));
    install_paths.push(PathBuf::from(r"D:\Program Files\Tencent\WeChat\WeChat.exe"));
    LaunchSpec {
        process_name: "WeChat.exe".into(),
        install_paths,
        shell_name: "wechat".into(),
    }
}

/// Lowercased whitespace tokens of the query usable for title matching.
/// Single characters are too common to mean anything.
pub fn keywords_of(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| t.chars().count() >= 2)
        .collect()
}

pub fn title_matches(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(k.as_str()))
}

/// Core of auto-retry: accept up to `rows` rows, checking after each.
/// `advance` performs the key actions (Down first when not on row 0, then
/// Enter); `accepted` reports whether the current selection reached the
/// intended target. Returns the matched row index.
pub async fn walk_rows<A, C>(
    rows: u32,
    settle: std::time::Duration,
    mut advance: A,
    mut accepted: C,
) -> Result<u32>
where
    A: FnMut(bool) -> anyhow::Result<()>,
    C: FnMut() -> bool,
{
    for row in 0..rows {
        advance(row > 0)?;
        tokio::time::sleep(settle).await;
        if accepted() {
            tracing::info!(row, "search result matched");
            return Ok(row);
        }
        tracing::info!(row, "search result did not match, advancing");
    }
    Err(EngineError::DisambiguationFailed { rows })
}

/// Run the whole send flow.
pub async fn run(
    cfg: &EngineConfig,
    req: MessageRequest,
    ocr: &dyn TextRecognizer,
) -> Result<RunOutcome> {
    let mut trace = FlowTrace::new("message");
    let mut input = Input::new()?;

    let window = acquire(&req.window_title, &req.launch, &cfg.acquire, &mut input, cfg.settle).await?;
    tracing::info!(title = %window.title, "window acquired");
    trace.advance(FlowState::SurfaceReady);
    // A running chat client is a signed-in one; there is no separate login
    // affordance to guard here.
    trace.advance(FlowState::Authenticated);

    // Search for the target and leave the dropdown open.
    input.send_keys("Ctrl+F")?;
    tokio::time::sleep(cfg.settle).await;
    input.paste_text(&req.target)?;
    tokio::time::sleep(cfg.search_delay).await;

    match &req.mode {
        Disambiguation::Manual => {
            eprintln!("Search results are up. Pick the right contact/group with Up/Down,");
            eprintln!("then press Enter here to continue...");
            let mut line = String::new();
            BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
            input.send_keys("Enter")?;
            tokio::time::sleep(cfg.settle).await;
        }
        Disambiguation::AutoDetect => {
            // Optional step: an unavailable OCR backend means "no skip",
            // never a failed run.
            let skip = match first_row_is_web_search(ocr, cfg.search_region) {
                Ok(true) => StepOutcome::Success,
                Ok(false) => StepOutcome::Skipped("first row is not the web-search placeholder"),
                Err(e) => {
                    tracing::debug!("OCR unavailable, not skipping first row: {}", e);
                    StepOutcome::Skipped("text recognition unavailable")
                }
            };
            tracing::debug!(step = ?skip, "web-search probe");
            if skip == StepOutcome::Success {
                tracing::info!("web-search placeholder detected, skipping first row");
                input.send_keys("Down")?;
                tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            }
            input.send_keys("Enter")?;
            tokio::time::sleep(cfg.settle).await;
        }
        Disambiguation::AutoRetry { rows } => {
            let keywords = keywords_of(&req.target);
            let window_title = req.window_title.clone();
            let target = req.target.clone();
            let mut row_no = 0u32;
            walk_rows(
                *rows,
                cfg.settle,
                |skip| {
                    if skip {
                        // Enter closed the dropdown; reopen the search and
                        // step down to the next row.
                        row_no += 1;
                        input.send_keys("Ctrl+F")?;
                        std::thread::sleep(cfg.search_delay);
                        input.paste_text(&target)?;
                        std::thread::sleep(cfg.search_delay);
                        for _ in 0..row_no {
                            input.send_keys("Down")?;
                            std::thread::sleep(std::time::Duration::from_millis(200));
                        }
                    }
                    input.send_keys("Enter")
                },
                || {
                    find_window_title(&window_title)
                        .map(|t| title_matches(&t, &keywords))
                        .unwrap_or(false)
                },
            )
            .await?;
        }
        Disambiguation::Index(n) => {
            for _ in 0..*n {
                input.send_keys("Down")?;
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
            input.send_keys("Enter")?;
            tokio::time::sleep(cfg.settle).await;
        }
    }
    trace.advance(FlowState::TargetSelected);

    // The chat window may have moved or resized after selection.
    let window = acquire(&req.window_title, &req.launch, &cfg.acquire, &mut input, cfg.settle).await?;
    if cfg.use_center_ratio {
        input.click_ratio(&window, cfg.input_ratio.0, cfg.input_ratio.1)?;
    } else {
        input.click_offset(&window, cfg.input_offset.0, cfg.input_offset.1)?;
    }
    tokio::time::sleep(cfg.settle).await;

    input.paste_text(&req.body)?;
    tokio::time::sleep(cfg.settle).await;
    trace.advance(FlowState::ContentInjected);

    input.send_keys("Enter")?;
    trace.advance(FlowState::SubmissionTriggered);
    // Sending has no observable acknowledgment at all; dispatched is as
    // confirmed as it gets.
    trace.advance(FlowState::Done);

    let mut outcome = RunOutcome::new(RunStatus::Published);
    outcome.message = Some(format!("message sent to '{}'", req.target));
    if let Some(dir) = &cfg.capture_dir {
        outcome.capture_path = ScreenCapture::save_to_dir(dir).ok();
    }
    Ok(outcome)
}

/// OCR the dropdown region and look for the web-search placeholder.
fn first_row_is_web_search(
    ocr: &dyn TextRecognizer,
    region: (u32, u32, u32, u32),
) -> anyhow::Result<bool> {
    let screen = ScreenCapture::capture_primary()?;
    let (x, y, w, h) = region;
    let region = ScreenCapture::crop(&screen, x, y, w, h);
    let text = ocr.recognize(&region)?;
    let squashed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(WEB_SEARCH_MARKERS
        .iter()
        .any(|m| text.contains(m) || squashed.contains(m)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn keywords_drop_short_tokens_and_lowercase() {
        assert_eq!(keywords_of(".NET AI/Agents"), vec![".net", "ai/agents"]);
        assert_eq!(keywords_of("a b team"), vec!["team"]);
        assert!(keywords_of("x y").is_empty());
    }

    #[test]
    fn title_match_is_substring_and_case_insensitive() {
        let kw = keywords_of("Rust Weekly");
        assert!(title_matches("微信 - rust weekly digest", &kw));
        assert!(title_matches("WEEKLY sync", &kw));
        assert!(!title_matches("微信", &kw));
    }

    #[tokio::test]
    async fn walk_rows_accepts_matching_row_with_exact_advances() {
        // Row 2 of 3 (index 1) matches: expect exactly two advance calls,
        // the second with a skip.
        let mut advances = Vec::new();
        let mut checks = 0u32;
        let row = walk_rows(
            3,
            Duration::ZERO,
            |skip| {
                advances.push(skip);
                Ok(())
            },
            || {
                checks += 1;
                checks == 2
            },
        )
        .await
        .unwrap();
        assert_eq!(row, 1);
        assert_eq!(advances, vec![false, true]);
    }

    #[tokio::test]
    async fn walk_rows_exhaustion_is_disambiguation_failure() {
        let err = walk_rows(3, Duration::ZERO, |_| Ok(()), || false)
            .await
            .unwrap_err();
        match err {
            EngineError::DisambiguationFailed { rows } => assert_eq!(rows, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
