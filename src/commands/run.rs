//! The daily job: scrape, snapshot, sync with Drive, diff, and post to Slack.

use crate::commands::scrape::{browser_fallback, fetch_products};
use crate::config::Config;
use crate::diff::{DiffOptions, RankDiff};
use crate::drive::{DriveClient, SnapshotStore};
use crate::format::slack::{failure_message, ranking_message};
use crate::notify::{post_or_print, Notifier, SlackNotifier};
use crate::oliveyoung::{BestsellerSource, OliveYoungClient, Parser};
use crate::snapshot::{self, previous_day, today_kst, Snapshot};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub product_count: usize,
    pub csv_path: PathBuf,
    pub had_previous: bool,
    pub message: String,
}

/// One execution of the daily ranking job.
pub struct DailyRun {
    config: Config,
    date: Option<NaiveDate>,
    use_browser: bool,
}

impl DailyRun {
    pub fn new(config: Config) -> Self {
        Self { config, date: None, use_browser: true }
    }

    /// Runs as if it were `date` (KST) instead of today.
    pub fn date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn no_browser(mut self, no_browser: bool) -> Self {
        self.use_browser = !no_browser;
        self
    }

    /// Runs against the live site, Slack, and Drive. Any failure is also
    /// reported to Slack before being returned.
    pub async fn execute(&self) -> Result<RunSummary> {
        let notifier = SlackNotifier::new(self.config.slack_webhook_url.clone())
            .context("Failed to create Slack client")?;

        let result = self.execute_live(&notifier).await;
        if let Err(e) = &result {
            report_failure(&notifier, e).await;
        }
        result
    }

    async fn execute_live(&self, notifier: &dyn Notifier) -> Result<RunSummary> {
        let client =
            OliveYoungClient::new(&self.config).await.context("Failed to create HTTP client")?;
        let fallback = browser_fallback(&self.config, self.use_browser);

        let drive = if self.config.drive.folder_id.is_some() {
            match DriveClient::new(&self.config) {
                Ok(drive) => Some(drive),
                Err(e) => {
                    error!("Google Drive unavailable: {:#}", e);
                    None
                }
            }
        } else {
            warn!("GDRIVE_FOLDER_ID not set, skipping Drive upload and previous-day download");
            None
        };

        self.run(&client, fallback.as_deref(), drive.as_ref().map(|d| d as &dyn SnapshotStore), notifier)
            .await
    }

    /// Runs with provided collaborators (for testing). Failures are reported
    /// through `notifier` as well.
    pub async fn execute_with(
        &self,
        primary: &dyn BestsellerSource,
        fallback: Option<&dyn BestsellerSource>,
        store: Option<&dyn SnapshotStore>,
        notifier: &dyn Notifier,
    ) -> Result<RunSummary> {
        let result = self.run(primary, fallback, store, notifier).await;
        if let Err(e) = &result {
            report_failure(notifier, e).await;
        }
        result
    }

    async fn run(
        &self,
        primary: &dyn BestsellerSource,
        fallback: Option<&dyn BestsellerSource>,
        store: Option<&dyn SnapshotStore>,
        notifier: &dyn Notifier,
    ) -> Result<RunSummary> {
        let date = self.date.unwrap_or_else(today_kst);
        let yesterday = previous_day(date);
        info!("Collecting ranking for {}", date);

        let parser = Parser::new(primary.base_url()).with_min_cards(self.config.min_products);
        let products = fetch_products(primary, fallback, &parser, self.config.min_products).await?;
        info!("Collected {} products", products.len());

        let today = Snapshot::from_products(date, &products);
        let csv_path = today.write_to(&self.config.data_dir)?;

        let mut previous = None;
        if let Some(store) = store {
            match sync_with_store(store, &today, yesterday).await {
                Ok(prev) => previous = prev,
                Err(e) => error!("Google Drive sync failed: {:#}", e),
            }
        }

        if previous.is_none() {
            previous = match Snapshot::read_local(&self.config.data_dir, yesterday) {
                Ok(Some(snapshot)) => {
                    info!("Using local snapshot for {}", yesterday);
                    Some(snapshot)
                }
                Ok(None) => {
                    info!("No snapshot for {}, every product counts as new", yesterday);
                    None
                }
                Err(e) => {
                    warn!("Ignoring unreadable local snapshot: {:#}", e);
                    None
                }
            };
        }

        let diff = RankDiff::compute(&today, previous.as_ref(), DiffOptions::from(&self.config));
        let message = ranking_message(date, &diff);
        post_or_print(notifier, &message).await;

        Ok(RunSummary {
            date,
            product_count: products.len(),
            csv_path,
            had_previous: previous.is_some(),
            message,
        })
    }
}

/// Uploads today's snapshot and fetches yesterday's.
async fn sync_with_store(
    store: &dyn SnapshotStore,
    today: &Snapshot,
    yesterday: NaiveDate,
) -> Result<Option<Snapshot>> {
    store.upload(&today.file_name(), &today.to_csv_bytes()?).await?;

    let name = snapshot::file_name(yesterday);
    match store.download(&name).await? {
        Some(bytes) => {
            info!("Downloaded previous snapshot {}", name);
            Ok(Some(Snapshot::from_csv_bytes(yesterday, &bytes)?))
        }
        None => {
            info!("Previous snapshot {} not found in Drive", name);
            Ok(None)
        }
    }
}

async fn report_failure(notifier: &dyn Notifier, error: &anyhow::Error) {
    if let Err(post_err) = notifier.post(&failure_message(format!("{:#}", error))).await {
        error!("Failed to post failure notice: {:#}", post_err);
    }
}
