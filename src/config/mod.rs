//! Configuration module for the request tracker backend.
//!
//! All configuration is loaded from environment variables with sensible defaults and handed
//! to each adapter at construction, so several independent instances can coexist in tests.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::models::OptionSet;

pub const DEFAULT_STORAGE_KEY: &str = "patreon_request_tracker_v1";
pub const DEFAULT_ACCOUNTS_KEY: &str = "colab-accounts";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google Sheets connection settings.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet to read and write; `None` disables the Sheets adapter
    pub spreadsheet_id: Option<String>,
    /// Fixed OAuth bearer token; takes precedence over the service account
    pub access_token: Option<String>,
    /// Service account email, the JWT issuer
    pub client_email: Option<String>,
    /// Service account RSA private key (PEM)
    pub private_key: Option<String>,
    /// OAuth endpoint that exchanges the signed assertion for an access token
    pub token_uri: String,
    /// Base URL of the Sheets v4 REST API
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            access_token: None,
            client_email: None,
            private_key: None,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
        }
    }
}

/// Suggested values for the open enumerations.
#[derive(Debug, Clone)]
pub struct OptionsConfig {
    pub statuses: OptionSet,
    pub tiers: OptionSet,
    pub request_types: OptionSet,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            statuses: OptionSet::new([
                "Not Started",
                "In Progress",
                "Not Doing",
                "Waiting Feedback",
                "Done",
            ]),
            tiers: OptionSet::new(["Tier 1", "Tier 2", "Tier 3", "Tier 4"]),
            request_types: OptionSet::new(["Not Poll", "Poll"]),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication; `None` leaves the API open
    pub api_psk: Option<String>,
    /// Path to the SQLite file backing the key-value store
    pub db_path: PathBuf,
    /// Key holding the cached request list
    pub storage_key: String,
    /// Key holding the saved Colab accounts
    pub accounts_key: String,
    /// Target workbook for `POST /api/sync`
    pub export_path: PathBuf,
    /// Published CSV export of the sheet; `None` disables the CSV adapter
    pub csv_url: Option<String>,
    pub sheets: SheetsConfig,
    pub options: OptionsConfig,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("TRACKER_DB_PATH")
            .unwrap_or_else(|_| "./data/tracker.sqlite".to_string())
            .into();

        let export_path = env::var("TRACKER_EXPORT_PATH")
            .unwrap_or_else(|_| "./Character Request Tracker - redesigned.xlsx".to_string())
            .into();

        let bind_addr = env::var("TRACKER_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid TRACKER_BIND_ADDR format");

        let defaults = OptionsConfig::default();
        let options = OptionsConfig {
            statuses: option_set_var("TRACKER_STATUS_OPTIONS").unwrap_or(defaults.statuses),
            tiers: option_set_var("TRACKER_TIER_OPTIONS").unwrap_or(defaults.tiers),
            request_types: option_set_var("TRACKER_TYPE_OPTIONS")
                .unwrap_or(defaults.request_types),
        };

        Self {
            api_psk: non_empty_var("TRACKER_API_PSK"),
            db_path,
            storage_key: non_empty_var("TRACKER_STORAGE_KEY")
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            accounts_key: non_empty_var("TRACKER_ACCOUNTS_KEY")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_KEY.to_string()),
            export_path,
            csv_url: non_empty_var("GOOGLE_SHEETS_CSV_URL"),
            sheets: SheetsConfig {
                spreadsheet_id: non_empty_var("GOOGLE_SPREADSHEET_ID"),
                access_token: non_empty_var("GOOGLE_SHEETS_ACCESS_TOKEN"),
                client_email: non_empty_var("GOOGLE_CLIENT_EMAIL"),
                private_key: non_empty_var("GOOGLE_PRIVATE_KEY")
                    .map(|key| unescape_newlines(&key)),
                token_uri: non_empty_var("GOOGLE_TOKEN_URI")
                    .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
                api_base: non_empty_var("GOOGLE_SHEETS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            },
            options,
            bind_addr,
            log_level: env::var("TRACKER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

/// Unset and blank variables both count as "not configured".
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keys pasted into a single-line env var carry literal `\n` sequences.
fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}

fn option_set_var(name: &str) -> Option<OptionSet> {
    non_empty_var(name).map(|raw| OptionSet::new(raw.split(',')))
}
