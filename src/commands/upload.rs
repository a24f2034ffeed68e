//! Uploads a snapshot CSV to the Drive folder.

use crate::config::Config;
use crate::drive::{DriveClient, SnapshotStore};
use anyhow::{Context, Result};
use std::path::PathBuf;

pub struct UploadCommand {
    config: Config,
    csv: PathBuf,
}

impl UploadCommand {
    pub fn new(config: Config, csv: PathBuf) -> Self {
        Self { config, csv }
    }

    /// Returns the Drive file id.
    pub async fn execute(&self) -> Result<String> {
        if !self.csv.exists() {
            anyhow::bail!("File not found: {}", self.csv.display());
        }
        let drive = DriveClient::new(&self.config)?;
        self.execute_with(&drive).await
    }

    /// Uploads through a provided store (for testing).
    pub async fn execute_with(&self, store: &dyn SnapshotStore) -> Result<String> {
        let name = self
            .csv
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", self.csv.display()))?;

        let bytes = std::fs::read(&self.csv)
            .with_context(|| format!("Failed to read {}", self.csv.display()))?;

        store.upload(name, &bytes).await
    }
}
