//! Google Drive storage for daily snapshots (REST v3, shared drives supported).

pub mod auth;

pub use auth::Credentials;

use crate::config::Config;
use crate::error::DriveError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use wreq::{Client, Response};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const BOUNDARY: &str = "oy_bestseller_boundary";

/// Named-file storage for snapshots - enables mocking.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Creates or replaces `name`, returning the file id.
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String>;

    /// Returns the content of `name`, or `None` when it does not exist.
    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct FileEntry {
    id: String,
}

/// Drive client scoped to one folder.
pub struct DriveClient {
    client: Client,
    credentials: Credentials,
    folder_id: String,
    api_base: String,
    upload_base: String,
    token_url: String,
    token: OnceCell<String>,
}

impl DriveClient {
    /// Builds a client from config; fails without a folder or credentials.
    pub fn new(config: &Config) -> Result<Self> {
        let folder_id = config.drive.folder_id.clone().context("GDRIVE_FOLDER_ID is not set")?;
        let credentials = Credentials::from_config(&config.drive)?;
        Self::with_base_urls(
            credentials,
            folder_id,
            DEFAULT_API_BASE,
            DEFAULT_UPLOAD_BASE,
            auth::DEFAULT_TOKEN_URL,
        )
    }

    /// Creates a client against custom endpoints (for testing).
    pub fn with_base_urls(
        credentials: Credentials,
        folder_id: impl Into<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            credentials,
            folder_id: folder_id.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            token: OnceCell::new(),
        })
    }

    async fn bearer(&self) -> Result<String> {
        let token = self
            .token
            .get_or_try_init(|| self.credentials.access_token(&self.client, &self.token_url))
            .await?;
        Ok(format!("Bearer {}", token))
    }

    /// Drive query matching a live file by exact name in the folder.
    fn name_query(&self, name: &str) -> String {
        format!(
            "name = '{}' and '{}' in parents and trashed = false",
            escape_query(name),
            escape_query(&self.folder_id)
        )
    }

    /// Id of the first file called `name` in the folder.
    pub async fn find_file(&self, name: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/files?q={}&fields={}&pageSize=1&supportsAllDrives=true&includeItemsFromAllDrives=true",
            self.api_base,
            urlencoding::encode(&self.name_query(name)),
            urlencoding::encode("files(id,name)")
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .context("Drive files.list request failed")?;

        let text = check(response).await?;
        let list: FileList = serde_json::from_str(&text).context("Unexpected files.list response")?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn update(&self, file_id: &str, bytes: &[u8]) -> Result<String> {
        let url = format!(
            "{}/files/{}?uploadType=media&supportsAllDrives=true&fields=id",
            self.upload_base,
            urlencoding::encode(file_id)
        );

        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.bearer().await?)
            .header("Content-Type", "text/csv")
            .body(bytes.to_vec())
            .send()
            .await
            .context("Drive files.update request failed")?;

        check(response).await?;
        Ok(file_id.to_string())
    }

    async fn create(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let url = format!("{}/files?uploadType=multipart&supportsAllDrives=true&fields=id", self.upload_base);

        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.folder_id],
            "mimeType": "text/csv",
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .header("Content-Type", format!("multipart/related; boundary={}", BOUNDARY))
            .body(multipart_related(&metadata.to_string(), bytes))
            .send()
            .await
            .context("Drive files.create request failed")?;

        let text = check(response).await?;
        let file: FileEntry = serde_json::from_str(&text).context("Unexpected files.create response")?;
        Ok(file.id)
    }
}

#[async_trait]
impl SnapshotStore for DriveClient {
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let id = match self.find_file(name).await? {
            Some(id) => {
                debug!("Replacing existing Drive file {}", id);
                self.update(&id, bytes).await?
            }
            None => self.create(name, bytes).await?,
        };
        info!("Uploaded {} to Drive ({})", name, id);
        Ok(id)
    }

    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(id) = self.find_file(name).await? else {
            debug!("{} not found in Drive folder", name);
            return Ok(None);
        };

        let url = format!(
            "{}/files/{}?alt=media&supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(&id)
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .context("Drive download request failed")?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Api { status, body }.into());
        }

        let bytes = response.bytes().await.context("Failed to read Drive file")?;
        info!("Downloaded {} from Drive ({} bytes)", name, bytes.len());
        Ok(Some(bytes.to_vec()))
    }
}

/// Returns the body on 2xx, a `DriveError::Api` otherwise.
async fn check(response: Response) -> Result<String> {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(DriveError::Api { status, body }.into())
    }
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related(metadata_json: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
