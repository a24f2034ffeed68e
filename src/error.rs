//! Typed failures that callers match on; everything else flows through `anyhow`.

use thiserror::Error;

/// Failures while collecting the bestseller ranking.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The site answered with a bot-protection or captcha page.
    #[error("Bot protection page detected. Try a proxy, a longer --delay, or the browser fallback.")]
    Blocked,

    /// Fewer product cards than the job considers a valid ranking.
    #[error("Only {found} product cards collected (need at least {required}). Check selectors or rendering.")]
    TooFewProducts { found: usize, required: usize },

    /// Browser rendering was requested but the binary was built without it.
    #[error("Browser fallback is not available. Rebuild with `--features browser`.")]
    BrowserUnavailable,
}

/// Failures talking to Google Drive.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error(
        "No Google Drive credentials. Set GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET / \
         GOOGLE_REFRESH_TOKEN, or GDRIVE_SA_JSON_B64 / GDRIVE_SERVICE_ACCOUNT_JSON."
    )]
    MissingCredentials,

    #[error("Token request failed with status {status}: {body}")]
    Token { status: u16, body: String },

    #[error("Drive API request failed with status {status}: {body}")]
    Api { status: u16, body: String },
}
