//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bestseller ranking page
    #[serde(default = "default_bestseller_url")]
    pub bestseller_url: String,

    /// Site root used to absolutize product links
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay before the page request in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Directory for daily CSV snapshots and debug dumps
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Fewer scraped products than this is treated as a failed scrape
    #[serde(default = "default_min_products")]
    pub min_products: usize,

    /// Only ranks up to this value take part in the diff
    #[serde(default = "default_diff_window")]
    pub diff_window: u32,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_rising_limit")]
    pub rising_limit: usize,

    #[serde(default = "default_newcomer_limit")]
    pub newcomer_limit: usize,

    #[serde(default = "default_falling_limit")]
    pub falling_limit: usize,

    /// Render the page in headless Chrome when plain HTTP falls short
    #[serde(default = "default_true")]
    pub browser_fallback: bool,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Incoming webhook; messages are printed when unset
    #[serde(default)]
    pub slack_webhook_url: Option<String>,

    #[serde(default)]
    pub drive: DriveConfig,
}

/// Google Drive settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Target folder (shared drives supported)
    #[serde(default)]
    pub folder_id: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Raw service-account key JSON
    #[serde(default)]
    pub service_account_json: Option<String>,
}

impl DriveConfig {
    /// True when all three OAuth refresh-token fields are present.
    pub fn has_oauth(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }
}

fn default_bestseller_url() -> String {
    "https://global.oliveyoung.com/display/page/best-seller?target=pillsTab1Nav1".to_string()
}

fn default_base_url() -> String {
    "https://global.oliveyoung.com".to_string()
}

fn default_delay_ms() -> u64 {
    500
}

fn default_delay_jitter_ms() -> u64 {
    1500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_min_products() -> usize {
    10
}

fn default_diff_window() -> u32 {
    30
}

fn default_top_n() -> usize {
    10
}

fn default_rising_limit() -> usize {
    3
}

fn default_newcomer_limit() -> usize {
    3
}

fn default_falling_limit() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bestseller_url: default_bestseller_url(),
            base_url: default_base_url(),
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            accept_language: default_accept_language(),
            data_dir: default_data_dir(),
            min_products: default_min_products(),
            diff_window: default_diff_window(),
            top_n: default_top_n(),
            rising_limit: default_rising_limit(),
            newcomer_limit: default_newcomer_limit(),
            falling_limit: default_falling_limit(),
            browser_fallback: true,
            format: OutputFormat::Table,
            slack_webhook_url: None,
            drive: DriveConfig::default(),
        }
    }
}

/// Reads an environment variable, treating blank values as unset.
fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("oy-bestseller").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Some(url) = env_non_empty("SLACK_WEBHOOK_URL") {
            self.slack_webhook_url = Some(url);
        }

        if let Some(proxy) = env_non_empty("OY_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Some(delay) = env_non_empty("OY_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Some(dir) = env_non_empty("OY_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(folder) = env_non_empty("GDRIVE_FOLDER_ID") {
            self.drive.folder_id = Some(folder);
        }
        if let Some(id) = env_non_empty("GOOGLE_CLIENT_ID") {
            self.drive.client_id = Some(id);
        }
        if let Some(secret) = env_non_empty("GOOGLE_CLIENT_SECRET") {
            self.drive.client_secret = Some(secret);
        }
        if let Some(token) = env_non_empty("GOOGLE_REFRESH_TOKEN") {
            self.drive.refresh_token = Some(token);
        }

        // The base64 form wins over the raw JSON when both are set.
        let decoded = env_non_empty("GDRIVE_SA_JSON_B64").and_then(|b64| {
            let json = decode_b64_json(&b64);
            if json.is_none() {
                warn!("GDRIVE_SA_JSON_B64 is not valid base64 UTF-8, ignoring");
            }
            json
        });
        if let Some(json) = decoded.or_else(|| env_non_empty("GDRIVE_SERVICE_ACCOUNT_JSON")) {
            self.drive.service_account_json = Some(json);
        }

        self
    }
}

fn decode_b64_json(b64: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(b64).ok()?;
    String::from_utf8(bytes).ok()
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Tests that touch process-wide env vars must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();
            for (k, v) in vars {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (k, v) in &self.saved {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.bestseller_url.contains("best-seller"));
        assert_eq!(config.base_url, "https://global.oliveyoung.com");
        assert_eq!(config.delay_ms, 500);
        assert_eq!(config.delay_jitter_ms, 1500);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.min_products, 10);
        assert_eq!(config.diff_window, 30);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.rising_limit, 3);
        assert_eq!(config.newcomer_limit, 3);
        assert_eq!(config.falling_limit, 5);
        assert!(config.browser_fallback);
        assert_eq!(config.format, OutputFormat::Table);
        assert!(config.proxy.is_none());
        assert!(config.slack_webhook_url.is_none());
        assert!(config.drive.folder_id.is_none());
        assert!(!config.drive.has_oauth());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "invalid".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            delay_ms = 3000
            min_products = 20
            browser_fallback = false
            slack_webhook_url = "https://hooks.slack.com/services/T/B/X"

            [drive]
            folder_id = "folder123"
            client_id = "cid"
            client_secret = "secret"
            refresh_token = "rt"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.delay_ms, 3000);
        assert_eq!(config.min_products, 20);
        assert!(!config.browser_fallback);
        assert_eq!(config.diff_window, 30);
        assert_eq!(
            config.slack_webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
        assert_eq!(config.drive.folder_id.as_deref(), Some("folder123"));
        assert!(config.drive.has_oauth());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            data_dir = "/tmp/oy"
            top_n = 5
            format = "json"
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/oy"));
        assert_eq!(config.top_n, 5);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let err = Config::from_file("/nonexistent/path/config.toml").unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let err = Config::from_file(file.path()).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "falling_limit = 7").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.falling_limit, 7);
    }

    #[test]
    fn test_config_with_env() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvGuard::set(&[
            ("SLACK_WEBHOOK_URL", Some("https://hooks.example/abc")),
            ("OY_PROXY", Some("http://proxy:8080")),
            ("OY_DELAY", Some("5000")),
            ("OY_DATA_DIR", Some("/var/lib/oy")),
            ("GDRIVE_FOLDER_ID", Some("fid")),
            ("GOOGLE_CLIENT_ID", Some("cid")),
            ("GOOGLE_CLIENT_SECRET", Some("cs")),
            ("GOOGLE_REFRESH_TOKEN", Some("rt")),
            ("GDRIVE_SERVICE_ACCOUNT_JSON", None),
            ("GDRIVE_SA_JSON_B64", None),
        ]);

        let config = Config::new().with_env();
        assert_eq!(config.slack_webhook_url.as_deref(), Some("https://hooks.example/abc"));
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:8080"));
        assert_eq!(config.delay_ms, 5000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/oy"));
        assert_eq!(config.drive.folder_id.as_deref(), Some("fid"));
        assert!(config.drive.has_oauth());
        assert!(config.drive.service_account_json.is_none());
    }

    #[test]
    fn test_config_with_env_blank_and_invalid_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvGuard::set(&[
            ("SLACK_WEBHOOK_URL", Some("   ")),
            ("OY_PROXY", Some("")),
            ("OY_DELAY", Some("not_a_number")),
            ("OY_DATA_DIR", None),
            ("GDRIVE_FOLDER_ID", Some("")),
            ("GDRIVE_SERVICE_ACCOUNT_JSON", None),
            ("GDRIVE_SA_JSON_B64", Some("%%%not-base64%%%")),
        ]);

        let config = Config::new().with_env();
        assert!(config.slack_webhook_url.is_none());
        assert!(config.proxy.is_none());
        assert_eq!(config.delay_ms, 500);
        assert!(config.drive.folder_id.is_none());
        assert!(config.drive.service_account_json.is_none());
    }

    #[test]
    fn test_config_with_env_service_account_b64() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let json = r#"{"client_email":"bot@example.iam.gserviceaccount.com"}"#;
        let b64 = base64::engine::general_purpose::STANDARD.encode(json);
        let _guard = EnvGuard::set(&[
            ("GDRIVE_SERVICE_ACCOUNT_JSON", None),
            ("GDRIVE_SA_JSON_B64", Some(b64.as_str())),
        ]);

        let config = Config::new().with_env();
        assert_eq!(config.drive.service_account_json.as_deref(), Some(json));
    }

    #[test]
    fn test_config_with_env_b64_wins_over_raw_json() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let json = r#"{"client_email":"b64@example.iam.gserviceaccount.com"}"#;
        let b64 = base64::engine::general_purpose::STANDARD.encode(json);
        let _guard = EnvGuard::set(&[
            ("GDRIVE_SERVICE_ACCOUNT_JSON", Some(r#"{"client_email":"raw@example.com"}"#)),
            ("GDRIVE_SA_JSON_B64", Some(b64.as_str())),
        ]);

        let config = Config::new().with_env();
        assert_eq!(config.drive.service_account_json.as_deref(), Some(json));
    }

    #[test]
    fn test_config_with_env_invalid_b64_falls_back_to_raw_json() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let raw = r#"{"client_email":"raw@example.com"}"#;
        let _guard = EnvGuard::set(&[
            ("GDRIVE_SERVICE_ACCOUNT_JSON", Some(raw)),
            ("GDRIVE_SA_JSON_B64", Some("%%%not-base64%%%")),
        ]);

        let config = Config::new().with_env();
        assert_eq!(config.drive.service_account_json.as_deref(), Some(raw));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.proxy = Some("socks5://localhost:1080".to_string());
        config.drive.folder_id = Some("abc".to_string());

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.proxy, config.proxy);
        assert_eq!(parsed.drive.folder_id, config.drive.folder_id);
        assert_eq!(parsed.min_products, config.min_products);
    }
}
