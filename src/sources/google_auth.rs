//! Bearer tokens for the Sheets API.
//!
//! A service account signs an RS256 JWT assertion and trades it at the OAuth token endpoint
//! for a short-lived access token, which is reused until shortly before it expires.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::SourceError;
use crate::config::SheetsConfig;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed
const REFRESH_MARGIN_SECS: i64 = 60;

/// Where Sheets requests get their bearer token.
#[derive(Clone)]
pub enum Credentials {
    Static(String),
    ServiceAccount(Arc<ServiceAccount>),
}

impl Credentials {
    /// A static token wins over a service account. An unusable service-account key is
    /// logged and leaves requests unauthenticated.
    pub fn from_config(http: &reqwest::Client, config: &SheetsConfig) -> Option<Self> {
        if let Some(token) = &config.access_token {
            return Some(Credentials::Static(token.clone()));
        }

        let (email, key) = config.client_email.as_ref().zip(config.private_key.as_ref())?;
        match ServiceAccount::new(http.clone(), email, key, &config.token_uri) {
            Ok(account) => Some(Credentials::ServiceAccount(Arc::new(account))),
            Err(e) => {
                tracing::error!("Ignoring service account {}: {}", email, e);
                None
            }
        }
    }

    pub async fn access_token(&self) -> Result<String, SourceError> {
        match self {
            Credentials::Static(token) => Ok(token.clone()),
            Credentials::ServiceAccount(account) => account.access_token(Utc::now()).await,
        }
    }
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
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Google service account identity with a cached access token.
pub struct ServiceAccount {
    http: reqwest::Client,
    client_email: String,
    key: EncodingKey,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(
        http: reqwest::Client,
        client_email: &str,
        private_key_pem: &str,
        token_uri: &str,
    ) -> Result<Self, SourceError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| SourceError::Malformed(format!("invalid private key: {}", e)))?;

        Ok(Self {
            http,
            client_email: client_email.to_string(),
            key,
            token_uri: token_uri.to_string(),
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, SourceError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| SourceError::Malformed(format!("could not sign assertion: {}", e)))
    }

    /// Current access token, exchanging a fresh assertion when the cached one is stale.
    ///
    /// The lock is held through the exchange so concurrent callers share one fetch.
    pub async fn access_token(&self, now: DateTime<Utc>) -> Result<String, SourceError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached
            .as_ref()
            .filter(|t| t.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now)
        {
            return Ok(token.value.clone());
        }

        let assertion = self.assertion(now)?;
        let response: TokenResponse = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(
            "Fetched access token for {} (expires in {}s)",
            self.client_email,
            response.expires_in
        );

        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: now + Duration::seconds(response.expires_in),
        });
        Ok(response.access_token)
    }
}
