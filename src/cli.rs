//! Thin CLI over the engine: argument parsing, config assembly, JSON
//! outcome printing and exit codes. All real behavior lives in the library.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::content::{read_body_file, resolve_arg};
use crate::desktop::{find_window, is_process_running, TesseractCli};
use crate::flow::{capture_failure, message, publish};
use crate::outcome::{RunOutcome, RunStatus};
use crate::wait::RetryBudget;
use crate::EngineConfig;

#[derive(Parser)]
#[command(name = "pagepilot", version, about = "Publish content by driving third-party UIs")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Timeout and retry overrides shared by every subcommand; defaults mirror
/// [`EngineConfig::default`].
#[derive(Args)]
struct TimingArgs {
    /// General pause between actions, in seconds.
    #[arg(long, default_value_t = 0.8)]
    pause: f64,
    /// Login polls before giving up.
    #[arg(long, default_value_t = 100)]
    login_polls: u32,
    /// Seconds between login polls.
    #[arg(long, default_value_t = 3.0)]
    login_interval: f64,
    /// Per-candidate locator timeout, in seconds.
    #[arg(long, default_value_t = 3.0)]
    candidate_timeout: f64,
    /// Upper bound on the upload-completion wait, in seconds.
    #[arg(long, default_value_t = 30.0)]
    upload_timeout: f64,
    /// Fixed wait for cover-image generation, in seconds.
    #[arg(long, default_value_t = 10.0)]
    generation_settle: f64,
    /// Bounded wait for the success toast after submitting, in seconds.
    #[arg(long, default_value_t = 5.0)]
    confirm_timeout: f64,
    /// Poll interval for wait conditions, in seconds.
    #[arg(long, default_value_t = 1.0)]
    poll_interval: f64,
}

impl TimingArgs {
    fn apply(&self, cfg: &mut EngineConfig) {
        cfg.settle = Duration::from_secs_f64(self.pause);
        cfg.login = RetryBudget::new(
            self.login_polls,
            Duration::from_secs_f64(self.login_interval),
        );
        cfg.candidate_timeout = Duration::from_secs_f64(self.candidate_timeout);
        cfg.upload_timeout = Duration::from_secs_f64(self.upload_timeout);
        cfg.generation_settle = Duration::from_secs_f64(self.generation_settle);
        cfg.confirm_timeout = Duration::from_secs_f64(self.confirm_timeout);
        cfg.poll_interval = Duration::from_secs_f64(self.poll_interval);
    }
}

#[derive(Subcommand)]
enum Command {
    /// Publish an image note through the creator studio in a browser.
    Publish {
        /// Note title, or @path to read it from a file.
        title: String,
        /// Note body, or @path to read it from a file.
        content: String,
        #[arg(long)]
        headless: bool,
        /// Persistent browser profile directory.
        #[arg(long)]
        profile_dir: Option<PathBuf>,
        /// Seconds to wait before starting (delayed publish).
        #[arg(long, default_value_t = 0)]
        delay: u64,
        /// Hard ceiling on title length, in characters.
        #[arg(long, default_value_t = 20)]
        title_max: usize,
        /// Ceiling on the generated image-text excerpt, in characters.
        #[arg(long, default_value_t = 500)]
        excerpt_max: usize,
        /// Directory for diagnostic captures on failure.
        #[arg(long)]
        capture_dir: Option<PathBuf>,
        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Check whether the browser profile holds a signed-in session.
    Status {
        #[arg(long)]
        headless: bool,
        #[arg(long)]
        profile_dir: Option<PathBuf>,
        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Send a message to a contact/group through the desktop chat client.
    Send {
        /// Display name or search keyword for the contact/group.
        target: String,
        /// Markdown/text file with the message body.
        #[arg(long)]
        file: PathBuf,
        /// Window title to match.
        #[arg(long, default_value = message::DEFAULT_WINDOW_TITLE)]
        window_title: String,
        /// Pause for manual result selection before sending.
        #[arg(long, conflicts_with_all = ["auto_detect_web_search", "auto_retry"])]
        confirm: bool,
        /// OCR the first search result and skip a web-search placeholder.
        #[arg(long, conflicts_with = "auto_retry")]
        auto_detect_web_search: bool,
        /// Try successive search results until the window title matches a
        /// keyword of the target.
        #[arg(long)]
        auto_retry: bool,
        /// Rows to try with --auto-retry.
        #[arg(long, default_value_t = 3)]
        auto_retry_count: u32,
        /// Search result row to accept when no mode flag is given (0 = first).
        #[arg(long, default_value_t = 0)]
        result_index: u32,
        /// Attempts to find/activate the window.
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
        /// Seconds between window acquisition attempts.
        #[arg(long, default_value_t = 3.0)]
        retry_delay: f64,
        /// Seconds to wait after typing the search query.
        #[arg(long, default_value_t = 1.0)]
        search_delay: f64,
        /// X offset from the window origin for the input-box click.
        #[arg(long, default_value_t = 200)]
        input_offset_x: i32,
        /// Y offset from the window origin for the input-box click.
        #[arg(long, default_value_t = 550)]
        input_offset_y: i32,
        /// Click the input box by width/height ratio instead of offsets.
        #[arg(long)]
        use_center: bool,
        #[arg(long, default_value_t = 0.5)]
        input_x_ratio: f32,
        #[arg(long, default_value_t = 0.85)]
        input_y_ratio: f32,
        /// Directory for a screenshot after sending and captures on failure.
        #[arg(long)]
        screenshot_dir: Option<PathBuf>,
        /// Tesseract language packs for --auto-detect-web-search.
        #[arg(long, default_value = "chi_sim+eng")]
        ocr_langs: String,
        /// Left edge of the OCR'd search-dropdown region, in screen pixels.
        #[arg(long, default_value_t = 200)]
        ocr_region_x: u32,
        /// Top edge of the OCR'd search-dropdown region.
        #[arg(long, default_value_t = 100)]
        ocr_region_y: u32,
        #[arg(long, default_value_t = 400)]
        ocr_region_width: u32,
        #[arg(long, default_value_t = 300)]
        ocr_region_height: u32,
        /// Only report whether the client is running; send nothing.
        #[arg(long)]
        check_only: bool,
        #[command(flatten)]
        timing: TimingArgs,
    },
}

pub async fn run(cli: Cli) -> RunOutcome {
    match cli.command {
        Command::Publish {
            title,
            content,
            headless,
            profile_dir,
            delay,
            title_max,
            excerpt_max,
            capture_dir,
            timing,
        } => {
            let mut cfg = EngineConfig {
                headless,
                title_max_chars: title_max,
                excerpt_max_chars: excerpt_max,
                capture_dir,
                ..EngineConfig::default()
            };
            timing.apply(&mut cfg);
            if let Some(dir) = profile_dir {
                cfg.profile_dir = dir;
            }
            if delay > 0 {
                tracing::info!(delay, "delayed publish, waiting");
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
            let request = match (resolve_arg(&title), resolve_arg(&content)) {
                (Ok(title), Ok(body)) => publish::PublishRequest { title, body },
                (Err(e), _) | (_, Err(e)) => return RunOutcome::error(e.to_string()),
            };
            finish(publish::run(&cfg, request).await, &cfg)
        }

        Command::Status { headless, profile_dir, timing } => {
            let mut cfg = EngineConfig {
                headless,
                ..EngineConfig::default()
            };
            timing.apply(&mut cfg);
            if let Some(dir) = profile_dir {
                cfg.profile_dir = dir;
            }
            finish(publish::check_login(&cfg).await, &cfg)
        }

        Command::Send {
            target,
            file,
            window_title,
            confirm,
            auto_detect_web_search,
            auto_retry,
            auto_retry_count,
            result_index,
            max_retries,
            retry_delay,
            search_delay,
            input_offset_x,
            input_offset_y,
            use_center,
            input_x_ratio,
            input_y_ratio,
            screenshot_dir,
            ocr_langs,
            ocr_region_x,
            ocr_region_y,
            ocr_region_width,
            ocr_region_height,
            check_only,
            timing,
        } => {
            let launch = message::default_launch_spec();

            if check_only {
                let running = is_process_running(&launch.process_name);
                let visible = running && find_window(&window_title).is_some();
                tracing::info!(running, visible, "check-only probe");
                if running {
                    let mut out = RunOutcome::new(RunStatus::Ready);
                    out.message =
                        Some(format!("process running: {running}, window visible: {visible}"));
                    return out;
                }
                return RunOutcome::error("application process is not running");
            }

            let mut cfg = EngineConfig {
                search_delay: Duration::from_secs_f64(search_delay),
                acquire: RetryBudget::new(max_retries, Duration::from_secs_f64(retry_delay)),
                input_offset: (input_offset_x, input_offset_y),
                input_ratio: (input_x_ratio, input_y_ratio),
                use_center_ratio: use_center,
                search_region: (ocr_region_x, ocr_region_y, ocr_region_width, ocr_region_height),
                capture_dir: screenshot_dir,
                ..EngineConfig::default()
            };
            timing.apply(&mut cfg);

            let body = match read_body_file(&file) {
                Ok(body) => body,
                Err(e) => return RunOutcome::error(e.to_string()),
            };
            tracing::info!(chars = body.chars().count(), "loaded message body");

            let mode = if confirm {
                message::Disambiguation::Manual
            } else if auto_detect_web_search {
                message::Disambiguation::AutoDetect
            } else if auto_retry {
                message::Disambiguation::AutoRetry { rows: auto_retry_count }
            } else {
                message::Disambiguation::Index(result_index)
            };

            let request = message::MessageRequest {
                target,
                body,
                mode,
                window_title,
                launch,
            };
            let ocr = TesseractCli::new(ocr_langs);
            finish(message::run(&cfg, request, &ocr).await, &cfg)
        }
    }
}

/// Convert a flow result into the final outcome, writing the diagnostic
/// capture on fatal errors. Capture problems never mask the error.
fn finish(result: crate::Result<RunOutcome>, cfg: &EngineConfig) -> RunOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("run failed: {e}");
            let mut outcome = RunOutcome::error(e.to_string());
            outcome.capture_path = capture_failure(cfg.capture_dir.as_deref());
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_timing_overrides_reach_the_config() {
        let cli = Cli::try_parse_from([
            "pagepilot",
            "publish",
            "title",
            "body",
            "--login-polls",
            "5",
            "--login-interval",
            "0.5",
            "--candidate-timeout",
            "2",
            "--upload-timeout",
            "45",
            "--generation-settle",
            "1",
            "--confirm-timeout",
            "9",
            "--poll-interval",
            "0.25",
            "--pause",
            "0.1",
            "--excerpt-max",
            "120",
        ])
        .unwrap();
        let Command::Publish { timing, excerpt_max, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        let mut cfg = EngineConfig::default();
        cfg.excerpt_max_chars = excerpt_max;
        timing.apply(&mut cfg);
        assert_eq!(cfg.login, RetryBudget::new(5, Duration::from_millis(500)));
        assert_eq!(cfg.candidate_timeout, Duration::from_secs(2));
        assert_eq!(cfg.upload_timeout, Duration::from_secs(45));
        assert_eq!(cfg.generation_settle, Duration::from_secs(1));
        assert_eq!(cfg.confirm_timeout, Duration::from_secs(9));
        assert_eq!(cfg.poll_interval, Duration::from_secs_f64(0.25));
        assert_eq!(cfg.settle, Duration::from_secs_f64(0.1));
        assert_eq!(cfg.excerpt_max_chars, 120);
    }

    #[test]
    fn timing_defaults_match_the_engine_defaults() {
        let cli = Cli::try_parse_from(["pagepilot", "status"]).unwrap();
        let Command::Status { timing, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        let mut cfg = EngineConfig::default();
        timing.apply(&mut cfg);
        let defaults = EngineConfig::default();
        assert_eq!(cfg.login, defaults.login);
        assert_eq!(cfg.upload_timeout, defaults.upload_timeout);
        assert_eq!(cfg.poll_interval, defaults.poll_interval);
        assert_eq!(cfg.settle, defaults.settle);
    }

    #[test]
    fn send_exposes_the_ocr_region() {
        let cli = Cli::try_parse_from([
            "pagepilot",
            "send",
            "team",
            "--file",
            "notes.md",
            "--ocr-region-x",
            "10",
            "--ocr-region-y",
            "20",
            "--ocr-region-width",
            "30",
            "--ocr-region-height",
            "40",
        ])
        .unwrap();
        let Command::Send {
            ocr_region_x,
            ocr_region_y,
            ocr_region_width,
            ocr_region_height,
            ..
        } = cli.command
        else {
            panic!("wrong subcommand");
        };
        assert_eq!(
            (ocr_region_x, ocr_region_y, ocr_region_width, ocr_region_height),
            (10, 20, 30, 40)
        );
    }
}
