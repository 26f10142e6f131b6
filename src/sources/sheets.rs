//! Google Sheets adapter.
//!
//! The worksheet has no id column. Rows are identified by position: a row read from sheet
//! row `N` gets the id `req-N`, and writes decode that id back to the same row.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    columns_from_raw, raw_from_columns, Commit, Credentials, RequestSource, SourceError,
};
use crate::config::SheetsConfig;
use crate::models::{DataSource, RawRequest, RequestItem, RequestPatch};

/// Used when the spreadsheet metadata cannot be fetched.
pub const DEFAULT_SHEET_TITLE: &str = "Character Request Tracker";

/// Black-box access to one spreadsheet.
#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Title of the first worksheet.
    async fn sheet_title(&self) -> Result<String, SourceError>;

    /// Cell values of `range` (A1 notation), row-major.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError>;

    /// Overwrite `range` with one row.
    async fn update_values(&self, range: &str, row: Vec<String>) -> Result<(), SourceError>;

    /// Append one row after the last non-empty row of `range`.
    async fn append_values(&self, range: &str, row: Vec<String>) -> Result<(), SourceError>;
}

/// Sheets v4 REST client authenticated with a bearer token.
pub struct HttpSheetsClient {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    credentials: Option<Credentials>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

impl HttpSheetsClient {
    pub fn new(http: reqwest::Client, config: &SheetsConfig, spreadsheet_id: String) -> Self {
        Self {
            credentials: Credentials::from_config(&http, config),
            http,
            api_base: config.api_base.clone(),
            spreadsheet_id,
        }
    }

    /// `{base}/spreadsheets/{id}/{segments...}` with every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| SourceError::Transport(format!("invalid Sheets API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Transport("Sheets API base cannot be a base URL".into()))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, SourceError> {
        Ok(match &self.credentials {
            Some(credentials) => request.bearer_auth(credentials.access_token().await?),
            None => request,
        })
    }
}

#[async_trait]
impl SheetsClient for HttpSheetsClient {
    async fn sheet_title(&self) -> Result<String, SourceError> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let meta: SpreadsheetMeta = self
            .authorize(self.http.get(url))
            .await?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        meta.sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| SourceError::Malformed("spreadsheet has no worksheets".into()))
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        let url = self.url(&["values", range])?;

        let body: ValueRange = self
            .authorize(self.http.get(url))
            .await?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_values(&self, range: &str, row: Vec<String>) -> Result<(), SourceError> {
        let mut url = self.url(&["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        self.authorize(self.http.put(url))
            .await?
            .json(&serde_json::json!({ "range": range, "values": [row] }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn append_values(&self, range: &str, row: Vec<String>) -> Result<(), SourceError> {
        let append = format!("{}:append", range);
        let mut url = self.url(&["values", &append])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        self.authorize(self.http.post(url))
            .await?
            .json(&serde_json::json!({ "values": [row] }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Adapter over a [`SheetsClient`]; unconfigured when no spreadsheet id is set.
#[derive(Clone, Default)]
pub struct SheetsAdapter {
    client: Option<Arc<dyn SheetsClient>>,
}

impl SheetsAdapter {
    pub fn new(client: Arc<dyn SheetsClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    /// Build the HTTP-backed adapter from configuration.
    pub fn from_config(http: reqwest::Client, config: &SheetsConfig) -> Self {
        match &config.spreadsheet_id {
            Some(id) => Self::new(Arc::new(HttpSheetsClient::new(http, config, id.clone()))),
            None => Self::unconfigured(),
        }
    }

    fn client(&self) -> Result<&dyn SheetsClient, SourceError> {
        self.client.as_deref().ok_or(SourceError::NotConfigured)
    }

    async fn title(&self, client: &dyn SheetsClient) -> String {
        client.sheet_title().await.unwrap_or_else(|e| {
            tracing::warn!(
                "Could not read sheet title, falling back to {:?}: {}",
                DEFAULT_SHEET_TITLE,
                e
            );
            DEFAULT_SHEET_TITLE.to_string()
        })
    }
}

/// Columns fetched on read; the adapter only manages A-H.
fn data_range(title: &str) -> String {
    format!("'{}'!A:K", title)
}

fn row_range(title: &str, sheet_row: usize) -> String {
    format!("'{}'!A{row}:H{row}", title, row = sheet_row)
}

/// 1 when the first row is a header (its first cell mentions "patreon"), else 0.
pub fn header_offset(rows: &[Vec<String>]) -> usize {
    let is_header = rows
        .first()
        .and_then(|row| row.first())
        .is_some_and(|cell| cell.to_lowercase().contains("patreon"));
    usize::from(is_header)
}

/// Decode `req-<N>` into the 1-based sheet row `N`.
pub fn decode_row_id(id: &str) -> Option<usize> {
    id.strip_prefix("req-")?
        .parse::<usize>()
        .ok()
        .filter(|row| *row >= 1)
}

/// Resolve `id` to an index into `rows` (which still includes any header row).
///
/// An explicit id in column A of any row but the first wins; otherwise a `req-<N>` id maps
/// to index `N - 1`. Ids that land on the header row or past the end resolve to nothing.
pub fn resolve_row(rows: &[Vec<String>], id: &str) -> Option<usize> {
    let offset = header_offset(rows);

    let explicit = rows
        .iter()
        .enumerate()
        .skip(offset.max(1))
        .find(|(_, row)| row.first().is_some_and(|cell| cell == id))
        .map(|(index, _)| index);

    let index = explicit.or_else(|| decode_row_id(id).map(|row| row - 1))?;
    (index >= offset && index < rows.len()).then_some(index)
}

#[async_trait]
impl RequestSource for SheetsAdapter {
    fn kind(&self) -> DataSource {
        DataSource::Sheets
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn read(&self) -> Result<Vec<RawRequest>, SourceError> {
        let client = self.client()?;
        let title = self.title(client).await;
        let rows = client.get_values(&data_range(&title)).await?;
        let offset = header_offset(&rows);

        let requests: Vec<RawRequest> = rows
            .iter()
            .enumerate()
            .skip(offset)
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|(index, row)| RawRequest {
                id: Some(format!("req-{}", index + 1)),
                ..raw_from_columns(row)
            })
            .collect();

        tracing::debug!(
            "Read {} requests from sheet {:?} (header offset {})",
            requests.len(),
            title,
            offset
        );
        Ok(requests)
    }

    async fn write(&self, id: &str, patch: &RequestPatch) -> Result<Commit, SourceError> {
        let client = self.client()?;
        let title = self.title(client).await;
        let rows = client.get_values(&data_range(&title)).await?;

        let (index, existing) = resolve_row(&rows, id)
            .and_then(|index| rows.get(index).map(|row| (index, row)))
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;

        let mut merged = raw_from_columns(existing);
        merged.merge(patch);

        let sheet_row = index + 1;
        client
            .update_values(&row_range(&title, sheet_row), columns_from_raw(&merged))
            .await?;

        tracing::info!("Updated {} in sheet row {}", id, sheet_row);
        Ok(Commit::Persisted)
    }

    async fn append(&self, record: &RequestItem) -> Result<Commit, SourceError> {
        let client = self.client()?;
        let title = self.title(client).await;
        let row = columns_from_raw(&RawRequest::from(record.clone()));
        client.append_values(&data_range(&title), row).await?;
        Ok(Commit::Persisted)
    }
}
