use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::{Element, Page};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

use crate::selector::{resolve_with, LocatorChain, Query};
use crate::Result;

/// How long we give Chrome to come up before declaring it absent.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Poll interval while waiting for a locator candidate to appear.
const FIND_POLL: Duration = Duration::from_millis(100);
/// Pause between focusing an element and mutating its content.
const FOCUS_SETTLE: Duration = Duration::from_millis(300);

/// A live Chromium page plus the browser owning it. One run owns the
/// surface exclusively; it is closed (not reused) at the end of the run.
pub struct BrowserSurface {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSurface {
    /// Launch Chromium against a persistent profile directory. The profile
    /// keeps cookies between runs, which is the only login persistence this
    /// tool has.
    pub async fn launch(profile_dir: &Path, headless: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(profile_dir)
            .with_context(|| format!("creating profile dir {}", profile_dir.display()))?;

        let mut config = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .window_size(1280, 720);
        if !headless {
            config = config.with_head();
        }
        config = config
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-default-apps")
            .arg("--disable-extensions");
        let config = config
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {}", e))?;

        let (browser, mut events) = timeout(LAUNCH_TIMEOUT, Browser::launch(config))
            .await
            .map_err(|_| {
                anyhow!(
                    "browser launch timed out after {}s - Chrome may not be installed, \
                     or another instance holds the profile lock",
                    LAUNCH_TIMEOUT.as_secs()
                )
            })?
            .map_err(|e| anyhow!("failed to launch browser: {}", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                tracing::trace!("browser event: {:?}", event);
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("failed to create page: {}", e))?;

        tracing::info!(profile = %profile_dir.display(), headless, "browser launched");
        Ok(Self { browser, page, handler })
    }

    /// Navigate and wait for the load to settle.
    pub async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("failed to navigate to {}: {}", url, e))?;
        self.page.wait_for_navigation().await.ok();
        Ok(())
    }

    /// Single-shot lookup of a compiled query. `None` means "not there
    /// right now", which during a render is not an error.
    pub async fn try_find(&self, query: &Query) -> Option<Element> {
        match query {
            Query::Css(sel) => self.page.find_element(sel.as_str()).await.ok(),
            Query::Xpath(xp) => self.page.find_xpath(xp.as_str()).await.ok(),
        }
    }

    pub async fn exists(&self, query: &Query) -> bool {
        self.try_find(query).await.is_some()
    }

    /// Whether any of the queries currently matches (an OR over alternative
    /// markers, e.g. the several spellings of an upload spinner).
    pub async fn any_exists(&self, queries: &[Query]) -> bool {
        for query in queries {
            if self.exists(query).await {
                return true;
            }
        }
        false
    }

    /// Resolve a locator chain strictly in declared order, polling each
    /// candidate for up to `per_candidate` before moving on.
    ///
    /// The returned element carries no interactability guarantee; a page
    /// re-render between resolution and use surfaces as a normal failure
    /// from the interaction itself.
    pub async fn resolve(
        &self,
        chain: &LocatorChain,
        per_candidate: Duration,
    ) -> Result<Element> {
        resolve_with(chain, |locator| {
            let query = locator.to_query();
            async move {
                let deadline = Instant::now() + per_candidate;
                loop {
                    if let Some(el) = self.try_find(&query).await {
                        return Some(el);
                    }
                    if Instant::now() >= deadline {
                        return None;
                    }
                    tokio::time::sleep(FIND_POLL).await;
                }
            }
        })
        .await
    }

    /// All matches for an XPath, in document order.
    pub async fn find_all_xpath(&self, xpath: &str) -> Vec<Element> {
        self.page.find_xpaths(xpath).await.unwrap_or_default()
    }

    pub async fn click(&self, element: &Element) -> anyhow::Result<()> {
        element
            .click()
            .await
            .map_err(|e| anyhow!("click failed: {}", e))?;
        Ok(())
    }

    /// Replace an element's content with `text` in one atomic insertion:
    /// focus, select-all, then CDP `Input.insertText`. One insertion instead
    /// of per-character key events keeps multi-byte text intact and never
    /// triggers the page's search-as-you-type handlers.
    pub async fn replace_text(&self, element: &Element, text: &str) -> anyhow::Result<()> {
        element
            .click()
            .await
            .map_err(|e| anyhow!("failed to focus element: {}", e))?;
        tokio::time::sleep(FOCUS_SETTLE).await;
        self.page
            .evaluate("document.execCommand('selectAll', false, null)")
            .await
            .map_err(|e| anyhow!("select-all failed: {}", e))?;
        let params = InsertTextParams::builder()
            .text(text)
            .build()
            .map_err(|e| anyhow!("failed to build insertText params: {}", e))?;
        self.page
            .execute(params)
            .await
            .map_err(|e| anyhow!("text insertion failed: {}", e))?;
        Ok(())
    }

    /// Names of all cookies visible to the current page.
    pub async fn cookie_names(&self) -> anyhow::Result<HashSet<String>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| anyhow!("failed to read cookies: {}", e))?;
        Ok(cookies.into_iter().map(|c| c.name).collect())
    }

    /// Close page and browser; failures on teardown are not interesting.
    pub async fn close(mut self) {
        let _ = self.page.close().await;
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        tracing::info!("browser closed");
    }
}
