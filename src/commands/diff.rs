//! Builds the ranking message from two local snapshots.

use crate::config::Config;
use crate::diff::{DiffOptions, RankDiff};
use crate::format::slack::ranking_message;
use crate::notify::{Notifier, SlackNotifier};
use crate::snapshot::{self, previous_day, Snapshot};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Compares a snapshot against the previous day's.
pub struct DiffCommand {
    config: Config,
    today: PathBuf,
    previous: Option<PathBuf>,
}

impl DiffCommand {
    /// Without an explicit `previous`, the previous-day file next to `today`
    /// is used when present.
    pub fn new(config: Config, today: PathBuf, previous: Option<PathBuf>) -> Self {
        Self { config, today, previous }
    }

    /// Returns the message text.
    pub fn execute(&self) -> Result<String> {
        let today = Snapshot::read_from(&self.today)?;
        let previous = self.load_previous(&today)?;

        let diff = RankDiff::compute(&today, previous.as_ref(), DiffOptions::from(&self.config));
        Ok(ranking_message(today.date, &diff))
    }

    /// Builds the message and posts it to the configured webhook.
    pub async fn execute_and_post(&self) -> Result<String> {
        let notifier = SlackNotifier::new(self.config.slack_webhook_url.clone())?;
        self.execute_and_post_with(&notifier).await
    }

    /// Posts through a provided notifier (for testing).
    pub async fn execute_and_post_with(&self, notifier: &dyn Notifier) -> Result<String> {
        let message = self.execute()?;
        notifier.post(&message).await?;
        Ok(message)
    }

    fn load_previous(&self, today: &Snapshot) -> Result<Option<Snapshot>> {
        if let Some(path) = &self.previous {
            return Snapshot::read_from(path).map(Some);
        }

        let dir = self.today.parent().unwrap_or(Path::new("."));
        let yesterday = previous_day(today.date);
        let found = Snapshot::read_local(dir, yesterday)?;
        if found.is_none() {
            info!("No {} next to {}", snapshot::file_name(yesterday), self.today.display());
        }
        Ok(found)
    }
}
