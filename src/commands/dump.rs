//! Saves the raw bestseller page for selector debugging.

use crate::config::Config;
use crate::oliveyoung::{BestsellerSource, OliveYoungClient};
use crate::snapshot::now_kst;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::info;

pub struct DumpCommand {
    config: Config,
    browser: bool,
}

impl DumpCommand {
    /// With `browser`, the page is rendered in headless Chrome first.
    pub fn new(config: Config, browser: bool) -> Self {
        Self { config, browser }
    }

    /// Returns the path of the written file.
    pub async fn execute(&self) -> Result<PathBuf> {
        if self.browser {
            #[cfg(feature = "browser")]
            {
                let renderer = crate::oliveyoung::BrowserRenderer::new(&self.config);
                return self.execute_with(&renderer, now_kst()).await;
            }
            #[cfg(not(feature = "browser"))]
            return Err(crate::error::ScrapeError::BrowserUnavailable.into());
        }

        let client =
            OliveYoungClient::new(&self.config).await.context("Failed to create HTTP client")?;
        self.execute_with(&client, now_kst()).await
    }

    /// Dumps from a provided source at a fixed time (for testing).
    pub async fn execute_with(&self, source: &dyn BestsellerSource, at: NaiveDateTime) -> Result<PathBuf> {
        let html = source.fetch_page().await?;

        let dir = self.config.data_dir.join("debug");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join(format!("oy_best_snapshot_{}.html", at.format("%Y%m%d_%H%M%S")));
        std::fs::write(&path, html.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved {} bytes from {} to {}", html.len(), source.name(), path.display());
        Ok(path)
    }
}
