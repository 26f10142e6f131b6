//! Published-CSV adapter. Read-only: mutations are acknowledged and dropped.

use async_trait::async_trait;

use super::{raw_from_columns, Commit, RequestSource, SourceError};
use crate::models::{DataSource, RawRequest, RequestItem, RequestPatch};

/// Rows with fewer columns than this are malformed.
pub const MIN_COLUMNS: usize = 7;

#[derive(Clone)]
pub struct CsvAdapter {
    http: reqwest::Client,
    url: Option<String>,
}

impl CsvAdapter {
    pub fn new(http: reqwest::Client, url: Option<String>) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl RequestSource for CsvAdapter {
    fn kind(&self) -> DataSource {
        DataSource::Csv
    }

    fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn read(&self) -> Result<Vec<RawRequest>, SourceError> {
        let url = self.url.as_deref().ok_or(SourceError::NotConfigured)?;

        let response = self
            .http
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::Transport(format!(
                "CSV export returned HTTP {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        Ok(parse_csv(&text))
    }

    async fn write(&self, id: &str, _patch: &RequestPatch) -> Result<Commit, SourceError> {
        tracing::info!("CSV source is read-only, update of {} not persisted", id);
        Ok(Commit::Acknowledged)
    }

    async fn append(&self, record: &RequestItem) -> Result<Commit, SourceError> {
        tracing::info!("CSV source is read-only, new request {} not persisted", record.id);
        Ok(Commit::Acknowledged)
    }
}

/// Parse a whole CSV export. The first line is a header and is skipped.
///
/// Blank lines, lines starting with a comma, rows with fewer than [`MIN_COLUMNS`] columns
/// and rows with an empty first column are dropped individually.
pub fn parse_csv(text: &str) -> Vec<RawRequest> {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty() && !line.starts_with(','))
        .filter_map(|line| {
            let cells = parse_csv_line(line);
            if cells.len() < MIN_COLUMNS || cells[0].is_empty() {
                tracing::debug!("Skipping malformed CSV row: {:?}", cells);
                return None;
            }
            Some(raw_from_columns(&cells))
        })
        .collect()
}

/// Split one CSV line into trimmed fields.
///
/// Commas inside double quotes do not split, and `""` inside quotes is a literal quote.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(finish_field(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(finish_field(&mut current));

    fields
}

fn finish_field(current: &mut String) -> String {
    let field = std::mem::take(current);
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Patreon Name,Tier,Request Date,Character Name,Anime / Origin,Type,Status,Notes";

    #[test]
    fn test_quoted_comma() {
        assert_eq!(
            parse_csv_line(r#"A,"B, with comma",C"#),
            ["A", "B, with comma", "C"]
        );
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(
            parse_csv_line(r#"A,"He said ""hi""",C"#),
            ["A", r#"He said "hi""#, "C"]
        );
    }

    #[test]
    fn test_fields_are_trimmed_and_empty_fields_kept() {
        assert_eq!(parse_csv_line(" a , ,b,"), ["a", "", "b", ""]);
    }

    #[test]
    fn test_drops_malformed_rows() {
        let text = [
            HEADER,
            "naopHASAMI,Tier 4,2025-12-30,Chisaki Hiradaira,Nagi no Asu kara,Not Poll,In Progress,",
            "joe su,Tier 4,2026-01-02,Latticenail,\"Ansatsusha de Aru, Ore no Status\",Not Poll,In Progress,",
            "too,short,row",
            "SinnamonSymon66,Tier 4,2026-01-04,Sadayo Kawakami,Persona 5,Not Poll,Not Started,",
            ",Tier 4,2026-01-05,Nobody,Unknown,Poll,Done,",
            "Tim Hu,Tier 4,2026-01-11,Nijika Ijichi,Bocchi the Rock!,Not Poll,Not Started,",
            "",
            "SuperFan99,Tier 4,2026-01-15,Eldric the Mage,Original Character,Portrait,In Progress,\"High detail, please\"",
        ]
        .join("\n");

        let requests = parse_csv(&text);

        assert_eq!(requests.len(), 5);
        assert_eq!(requests[1].origin.as_deref(), Some("Ansatsusha de Aru, Ore no Status"));
        assert_eq!(requests[4].notes.as_deref(), Some("High detail, please"));
        assert!(requests.iter().all(|r| r.id.is_none()));
    }

    #[test]
    fn test_empty_first_column_with_leading_space_is_dropped() {
        let text = format!("{}\n \"\",Tier 1,2026-01-01,X,Y,Poll,Done,", HEADER);
        assert!(parse_csv(&text).is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = format!(
            "{}\r\nTim Hu,Tier 4,2026-01-11,Nijika Ijichi,Bocchi the Rock!,Not Poll,Not Started,note\r\n",
            HEADER
        );
        let requests = parse_csv(&text);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].notes.as_deref(), Some("note"));
    }

    #[test]
    fn test_maps_columns() {
        let text = format!(
            "{}\nTim Hu,Tier 4,2026-01-11,Nijika Ijichi,Bocchi the Rock!,Not Poll,Not Started",
            HEADER
        );
        let request = &parse_csv(&text)[0];
        assert_eq!(request.patreon_name.as_deref(), Some("Tim Hu"));
        assert_eq!(request.tier.as_deref(), Some("Tier 4"));
        assert_eq!(request.date_requested.as_deref(), Some("2026-01-11"));
        assert_eq!(request.character_name.as_deref(), Some("Nijika Ijichi"));
        assert_eq!(request.origin.as_deref(), Some("Bocchi the Rock!"));
        assert_eq!(request.request_type.as_deref(), Some("Not Poll"));
        assert_eq!(request.status.as_deref(), Some("Not Started"));
        assert_eq!(request.notes, None);
    }

    #[tokio::test]
    async fn test_mutations_are_acknowledged_without_persisting() {
        let adapter = CsvAdapter::new(reqwest::Client::new(), None);
        assert!(!adapter.is_configured());
        assert_eq!(
            adapter.write("req-1", &RequestPatch::default()).await,
            Ok(Commit::Acknowledged)
        );
        assert_eq!(adapter.read().await, Err(SourceError::NotConfigured));
    }
}
