//! Scrape command and the HTTP-then-browser fetch used by the daily job.

use crate::config::Config;
use crate::error::ScrapeError;
use crate::format::Formatter;
use crate::oliveyoung::parser::rerank;
use crate::oliveyoung::{BestsellerSource, OliveYoungClient, Parser, Product};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Fetches and parses the ranking from `primary`, switching to `fallback`
/// when the first attempt errors or yields fewer than `min_products`.
pub async fn fetch_products(
    primary: &dyn BestsellerSource,
    fallback: Option<&dyn BestsellerSource>,
    parser: &Parser,
    min_products: usize,
) -> Result<Vec<Product>> {
    let first_error = match primary.fetch_page().await.and_then(|html| parser.parse_bestseller(&html)) {
        Ok(products) if products.len() >= min_products => {
            info!("Collected {} products via {}", products.len(), primary.name());
            return Ok(rerank(products));
        }
        Ok(products) => {
            warn!(
                "{} returned only {} products (need {})",
                primary.name(),
                products.len(),
                min_products
            );
            anyhow::Error::from(ScrapeError::TooFewProducts {
                found: products.len(),
                required: min_products,
            })
        }
        Err(e) => {
            warn!("{} scrape failed: {:#}", primary.name(), e);
            e
        }
    };

    let Some(fallback) = fallback else {
        return Err(first_error);
    };

    info!("Retrying with {} source", fallback.name());
    let html = fallback.fetch_page().await?;
    let products = parser.parse_bestseller(&html)?;

    if products.len() < min_products {
        return Err(ScrapeError::TooFewProducts { found: products.len(), required: min_products }.into());
    }

    info!("Collected {} products via {}", products.len(), fallback.name());
    Ok(rerank(products))
}

/// The browser fallback if it is enabled and compiled in.
pub fn browser_fallback(config: &Config, enabled: bool) -> Option<Box<dyn BestsellerSource>> {
    if !enabled || !config.browser_fallback {
        return None;
    }

    #[cfg(feature = "browser")]
    {
        Some(Box::new(crate::oliveyoung::BrowserRenderer::new(config)))
    }

    #[cfg(not(feature = "browser"))]
    {
        debug!("Built without the browser feature, no rendering fallback");
        None
    }
}

/// Prints the current ranking.
pub struct ScrapeCommand {
    config: Config,
    max: Option<usize>,
    use_browser: bool,
}

impl ScrapeCommand {
    pub fn new(config: Config) -> Self {
        Self { config, max: None, use_browser: true }
    }

    /// Limits the number of printed products.
    pub fn max(mut self, max: Option<usize>) -> Self {
        self.max = max;
        self
    }

    /// Disables the headless-browser fallback.
    pub fn no_browser(mut self, no_browser: bool) -> Self {
        self.use_browser = !no_browser;
        self
    }

    /// Executes the scrape and returns formatted output.
    pub async fn execute(&self) -> Result<String> {
        let client =
            OliveYoungClient::new(&self.config).await.context("Failed to create HTTP client")?;
        let fallback = browser_fallback(&self.config, self.use_browser);

        self.execute_with_sources(&client, fallback.as_deref()).await
    }

    /// Executes with provided sources (for testing).
    pub async fn execute_with_sources(
        &self,
        primary: &dyn BestsellerSource,
        fallback: Option<&dyn BestsellerSource>,
    ) -> Result<String> {
        let parser = Parser::new(primary.base_url()).with_min_cards(self.config.min_products);
        let mut products =
            fetch_products(primary, fallback, &parser, self.config.min_products).await?;

        if let Some(max) = self.max {
            products.truncate(max);
        }

        debug!("Formatting {} products as {}", products.len(), self.config.format);
        Ok(Formatter::new(self.config.format).format_products(&products))
    }
}
