//! Posts the top-10 price listing for a snapshot CSV.

use crate::config::Config;
use crate::format::slack::top10_price_message;
use crate::notify::{Notifier, SlackNotifier};
use crate::snapshot::Snapshot;
use anyhow::Result;
use std::path::PathBuf;

pub struct NotifyCommand {
    config: Config,
    csv: PathBuf,
}

impl NotifyCommand {
    pub fn new(config: Config, csv: PathBuf) -> Self {
        Self { config, csv }
    }

    pub async fn execute(&self) -> Result<String> {
        let notifier = SlackNotifier::new(self.config.slack_webhook_url.clone())?;
        self.execute_with(&notifier).await
    }

    /// Posts through a provided notifier (for testing).
    pub async fn execute_with(&self, notifier: &dyn Notifier) -> Result<String> {
        let snapshot = Snapshot::read_from(&self.csv)?;
        if snapshot.rows.is_empty() {
            anyhow::bail!("CSV is empty: {}", self.csv.display());
        }

        let message = top10_price_message(&snapshot);
        notifier.post(&message).await?;
        Ok(message)
    }
}
