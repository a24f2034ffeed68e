//! Google OAuth access tokens from a refresh token or a service-account key.

use crate::config::DriveConfig;
use crate::error::DriveError;
use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wreq::Client;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The fields of a service-account key file that matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
}

/// How to obtain an access token.
#[derive(Debug, Clone)]
pub enum Credentials {
    OAuth { client_id: String, client_secret: String, refresh_token: String },
    ServiceAccount(ServiceAccountKey),
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Credentials {
    /// Refresh-token credentials win when all three fields are set; a
    /// service-account key is used otherwise.
    pub fn from_config(drive: &DriveConfig) -> Result<Self> {
        if let (Some(client_id), Some(client_secret), Some(refresh_token)) =
            (&drive.client_id, &drive.client_secret, &drive.refresh_token)
        {
            debug!("Using OAuth refresh-token credentials");
            return Ok(Self::OAuth {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: refresh_token.clone(),
            });
        }

        if let Some(json) = &drive.service_account_json {
            let key: ServiceAccountKey =
                serde_json::from_str(json).context("Invalid service-account JSON")?;
            debug!("Using service account {}", key.client_email);
            return Ok(Self::ServiceAccount(key));
        }

        Err(DriveError::MissingCredentials.into())
    }

    /// Form body for the token endpoint.
    fn token_request_body(&self, token_url: &str) -> Result<String> {
        let pairs: Vec<(&str, String)> = match self {
            Self::OAuth { client_id, client_secret, refresh_token } => vec![
                ("grant_type", "refresh_token".to_string()),
                ("client_id", client_id.clone()),
                ("client_secret", client_secret.clone()),
                ("refresh_token", refresh_token.clone()),
            ],
            Self::ServiceAccount(key) => vec![
                ("grant_type", JWT_BEARER_GRANT.to_string()),
                ("assertion", sign_assertion(key, token_url)?),
            ],
        };

        Ok(pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&"))
    }

    /// Exchanges the credentials for a bearer token.
    pub async fn access_token(&self, client: &Client, token_url: &str) -> Result<String> {
        let body = self.token_request_body(token_url)?;

        let response = client
            .post(token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .context("Failed to reach token endpoint")?;

        let status = response.status().as_u16();
        let text = response.text().await.context("Failed to read token response")?;
        if !(200..300).contains(&status) {
            return Err(DriveError::Token { status, body: text }.into());
        }

        let token: TokenResponse =
            serde_json::from_str(&text).context("Token response has no access_token")?;
        Ok(token.access_token)
    }
}

/// RS256 JWT for the service-account bearer grant, valid for one hour.
fn sign_assertion(key: &ServiceAccountKey, audience: &str) -> Result<String> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims { iss: &key.client_email, scope: DRIVE_SCOPE, aud: audience, iat, exp: iat + 3600 };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Service-account private_key is not a valid RSA PEM")?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .context("Failed to sign service-account assertion")
}
