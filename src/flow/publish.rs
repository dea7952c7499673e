//! Publish pipeline: drive the creator studio's image-note composer in a
//! browser, from login through submission.
//!
//! The composer's markup churns constantly, so every element is located
//! through a locator chain; the step order and timing mirror what the UI
//! actually tolerates.

use crate::browser::{ensure_authenticated, BrowserSurface};
use crate::config::EngineConfig;
use crate::content::{image_excerpt, truncate_title};
use crate::error::EngineError;
use crate::flow::{FlowState, FlowTrace};
use crate::outcome::{RunOutcome, RunStatus};
use crate::selector::{Locator, LocatorChain, Query};
use crate::wait::wait_until_async;
use crate::Result;

/// Direct entry into the image-note composer.
const COMPOSER_URL: &str =
    "https://creator.xiaohongshu.com/publish/publish?from=menu&target=image";

pub struct PublishRequest {
    pub title: String,
    pub body: String,
}

fn mode_button_chain() -> LocatorChain {
    LocatorChain::new(
        "text_to_image_mode",
        vec![
            Locator::text("文字配图"),
            Locator::text_in("div", "文字配图"),
            Locator::text_in("span", "文字配图"),
            Locator::text_in("button", "文字配图"),
            Locator::AttrContains("class", "text-image".into()),
            Locator::AttrContains("class", "textImage".into()),
        ],
    )
}

fn editor_chain(role: &'static str) -> LocatorChain {
    LocatorChain::new(
        role,
        vec![
            Locator::css("div[contenteditable='true']"),
            Locator::css("textarea"),
            Locator::css(".editor-content"),
            Locator::css("div[class*='editor']"),
        ],
    )
}

fn generate_button_chain() -> LocatorChain {
    LocatorChain::new(
        "generate_button",
        vec![
            Locator::text("生成图片"),
            Locator::text_in("button", "生成图片"),
            Locator::text_in("div", "生成图片"),
            Locator::text_in("span", "生成图片"),
            Locator::AttrContains("class", "generate".into()),
        ],
    )
}

fn next_button_chain() -> LocatorChain {
    LocatorChain::new(
        "next_button",
        vec![
            Locator::text("下一步"),
            Locator::text_in("button", "下一步"),
            Locator::text_in("div", "下一步"),
            Locator::text_in("span", "下一步"),
        ],
    )
}

fn title_input_chain() -> LocatorChain {
    LocatorChain::new(
        "title_input",
        vec![
            Locator::Placeholder("标题".into()),
            Locator::Placeholder("title".into()),
            Locator::css(".title-input input"),
            Locator::css("input[class*='title']"),
        ],
    )
}

/// Alternative spellings of "an upload is still in progress", ORed.
fn upload_markers() -> Vec<Query> {
    [
        "[class*='upload'][class*='loading']",
        "[class*='uploading']",
        "[class*='progress']",
        ".upload-loading",
        "[class*='spinner']",
    ]
    .into_iter()
    .map(|s| Query::Css(s.into()))
    .collect()
}

fn success_markers() -> Vec<Query> {
    vec![
        Locator::text("发布成功").to_query(),
        Query::Css(".success-toast".into()),
    ]
}

/// XPath for every submit button; the composer renders several and the
/// live one is last in document order.
const PUBLISH_BUTTONS_XPATH: &str = r#"//button[contains(., "发布")]"#;

/// Run the whole publish flow. Fatal failures come back as errors; the
/// degraded-but-successful endings (`ready`, `ready_to_confirm`,
/// `not_logged_in`) are ordinary outcomes.
pub async fn run(cfg: &EngineConfig, req: PublishRequest) -> Result<RunOutcome> {
    let surface = BrowserSurface::launch(&cfg.profile_dir, cfg.headless).await?;
    let result = drive(&surface, cfg, &req).await;
    surface.close().await;
    result
}

async fn drive(
    surface: &BrowserSurface,
    cfg: &EngineConfig,
    req: &PublishRequest,
) -> Result<RunOutcome> {
    let mut trace = FlowTrace::new("publish");
    let title = truncate_title(&req.title, cfg.title_max_chars);
    let excerpt = image_excerpt(&req.body, cfg.excerpt_max_chars);
    trace.advance(FlowState::SurfaceReady);

    match ensure_authenticated(surface, &cfg.login).await {
        Ok(()) => trace.advance(FlowState::Authenticated),
        Err(EngineError::LoginTimeout) => {
            trace.advance(FlowState::Failed);
            return Ok(RunOutcome::new(RunStatus::NotLoggedIn));
        }
        Err(e) => return Err(e),
    }

    tracing::info!("opening composer");
    surface.goto(COMPOSER_URL).await?;
    tokio::time::sleep(cfg.settle).await;

    // Enter text-to-image mode. Required: without it every later locator
    // matches the wrong pane.
    let mode_button = surface.resolve(&mode_button_chain(), cfg.candidate_timeout).await?;
    surface.click(&mode_button).await?;
    tokio::time::sleep(cfg.settle).await;
    trace.advance(FlowState::TargetSelected);

    // Short excerpt into the image-text editor; this text only feeds the
    // generated cover image, not the note body.
    tracing::info!("filling image text");
    let editor = surface.resolve(&editor_chain("image_text_editor"), cfg.candidate_timeout).await?;
    surface.replace_text(&editor, &excerpt).await?;

    tracing::info!("generating cover image");
    let generate = surface.resolve(&generate_button_chain(), cfg.candidate_timeout).await?;
    surface.click(&generate).await?;
    // Generation exposes no completion marker at all; a fixed settle is the
    // only option.
    tokio::time::sleep(cfg.generation_settle).await;

    let next = surface.resolve(&next_button_chain(), cfg.candidate_timeout).await?;
    surface.click(&next).await?;
    tokio::time::sleep(cfg.settle).await;

    tracing::info!(title = %title, "filling title");
    let title_input = surface.resolve(&title_input_chain(), cfg.candidate_timeout).await?;
    surface.replace_text(&title_input, &title).await?;

    tracing::info!("filling body");
    let body_editor = surface.resolve(&editor_chain("body_editor"), cfg.candidate_timeout).await?;
    surface.replace_text(&body_editor, &req.body).await?;
    trace.advance(FlowState::ContentInjected);

    // Submission is gated on the cover upload: poll for the absence of any
    // in-progress marker before touching the publish button.
    tracing::info!("waiting for upload to finish");
    let markers = upload_markers();
    let uploaded = wait_until_async(
        || async { !surface.any_exists(&markers).await },
        cfg.poll_interval,
        cfg.upload_timeout,
    )
    .await;
    if !uploaded {
        tracing::warn!("upload markers still present at timeout, proceeding anyway");
    }
    tokio::time::sleep(cfg.settle).await;

    let buttons = surface.find_all_xpath(PUBLISH_BUTTONS_XPATH).await;
    let Some(publish_button) = buttons.last() else {
        // Everything is filled in; a human finishes with one click.
        tracing::warn!("publish button not found, leaving the note ready");
        trace.advance(FlowState::NeedsManualConfirmation);
        return Ok(RunOutcome::with_title(RunStatus::Ready, title));
    };

    tracing::info!("submitting");
    surface.click(publish_button).await?;
    trace.advance(FlowState::SubmissionTriggered);
    tokio::time::sleep(cfg.settle).await;

    let success = success_markers();
    let confirmed = wait_until_async(
        || async { surface.any_exists(&success).await },
        cfg.poll_interval,
        cfg.confirm_timeout,
    )
    .await;

    if confirmed {
        tracing::info!("publish confirmed");
        trace.advance(FlowState::Confirmed);
        trace.advance(FlowState::Done);
        Ok(RunOutcome::with_title(RunStatus::Published, title))
    } else {
        // Clicked, nothing observed: the engine cannot see the server-side
        // acknowledgment, so it does not claim success.
        tracing::info!("no success marker observed, confirm in the browser");
        trace.advance(FlowState::NeedsManualConfirmation);
        Ok(RunOutcome::with_title(RunStatus::ReadyToConfirm, title))
    }
}

/// Login probe: report the session state, waiting for an interactive login
/// if there is none yet.
pub async fn check_login(cfg: &EngineConfig) -> Result<RunOutcome> {
    let surface = BrowserSurface::launch(&cfg.profile_dir, cfg.headless).await?;
    let result = match ensure_authenticated(&surface, &cfg.login).await {
        Ok(()) => Ok(RunOutcome::new(RunStatus::LoggedIn)),
        Err(EngineError::LoginTimeout) => Ok(RunOutcome::new(RunStatus::NotLoggedIn)),
        Err(e) => Err(e),
    };
    surface.close().await;
    result
}
