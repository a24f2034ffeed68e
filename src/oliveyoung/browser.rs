//! Headless Chrome rendering for when the plain HTTP page is missing cards.
//!
//! The bestseller list is partly filled in by script and lazy loading, so
//! this source loads the page in a real browser, clears cookie banners,
//! scrolls to the bottom a few times and hands back the rendered DOM. The
//! HTML then goes through the same [`Parser`](super::Parser) as the HTTP
//! response.

use crate::config::Config;
use crate::oliveyoung::client::BestsellerSource;
use crate::oliveyoung::selectors::CONSENT_BUTTONS;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use std::ffi::OsStr;
use std::time::Duration;
use tracing::{debug, info, trace};

const SCROLL_PASSES: usize = 8;
const SCROLL_STEP_PX: u32 = 2200;
const SCROLL_PAUSE: Duration = Duration::from_millis(900);
const SETTLE_PAUSE: Duration = Duration::from_millis(1500);

/// Renders the bestseller page in headless Chrome.
pub struct BrowserRenderer {
    page_url: String,
    base_url: String,
    timeout: Duration,
}

impl BrowserRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            page_url: config.bestseller_url.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs.max(60)),
        }
    }

    fn render(page_url: &str, timeout: Duration) -> Result<String> {
        let options = LaunchOptionsBuilder::default()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1366, 900)))
            .args(vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--lang=en-US"),
            ])
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid browser launch options: {}", e))?;

        let browser = Browser::new(options).context("Failed to launch headless Chrome")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;
        tab.set_default_timeout(timeout);

        debug!("Navigating to {}", page_url);
        tab.navigate_to(page_url)
            .context("Failed to navigate")?
            .wait_until_navigated()
            .context("Page did not finish loading")?;

        dismiss_banners(&tab);
        std::thread::sleep(SETTLE_PAUSE);

        for pass in 0..SCROLL_PASSES {
            trace!("Scroll pass {}/{}", pass + 1, SCROLL_PASSES);
            tab.evaluate(&format!("window.scrollBy(0, {});", SCROLL_STEP_PX), false)
                .context("Failed to scroll page")?;
            std::thread::sleep(SCROLL_PAUSE);
        }

        tab.get_content().context("Failed to read rendered HTML")
    }
}

/// Clicks the first consent or close button present; absence is fine.
fn dismiss_banners(tab: &Tab) {
    for selector in CONSENT_BUTTONS {
        if let Ok(element) = tab.find_element(selector) {
            if element.click().is_ok() {
                debug!("Dismissed banner via {}", selector);
                std::thread::sleep(Duration::from_millis(500));
                return;
            }
        }
    }
}

#[async_trait]
impl BestsellerSource for BrowserRenderer {
    async fn fetch_page(&self) -> Result<String> {
        info!("Rendering bestseller page in headless Chrome");
        let page_url = self.page_url.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || Self::render(&page_url, timeout))
            .await
            .context("Browser task panicked")?
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
