//! Write-only Excel export of the full request list.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::models::RequestItem;
use crate::normalize::{days_since, parse_date};
use crate::stats::{is_overdue, sla_days};

pub const SHEET_NAME: &str = "Requests";

pub const COLUMNS: [&str; 15] = [
    "Request ID",
    "Patreon Name",
    "Tier",
    "Character Name",
    "Request Type",
    "Status",
    "Priority",
    "Date Requested",
    "Days Waiting",
    "Date Started",
    "Date Completed",
    "SLA (Days)",
    "Overdue?",
    "Revision Count",
    "Notes",
];

/// Export failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// The target file is open in another program
    Locked(String),
    Failed(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Locked(msg) => write!(f, "export target is locked: {}", msg),
            ExportError::Failed(msg) => write!(f, "export failed: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<XlsxError> for ExportError {
    fn from(err: XlsxError) -> Self {
        match err {
            XlsxError::IoError(io_err) => classify_io(&io_err),
            other => ExportError::Failed(other.to_string()),
        }
    }
}

/// OS error codes meaning "another process holds the file".
#[cfg(windows)]
const LOCKED_OS_ERRORS: &[i32] = &[32, 33];
#[cfg(not(windows))]
const LOCKED_OS_ERRORS: &[i32] = &[16, 26];

pub fn classify_io(err: &io::Error) -> ExportError {
    let locked = err.kind() == io::ErrorKind::PermissionDenied
        || err
            .raw_os_error()
            .is_some_and(|code| LOCKED_OS_ERRORS.contains(&code));
    if locked {
        ExportError::Locked(err.to_string())
    } else {
        ExportError::Failed(err.to_string())
    }
}

/// Writes the workbook to a fixed path on the server.
#[derive(Debug, Clone)]
pub struct ExcelExporter {
    path: PathBuf,
}

impl ExcelExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Serialize `items` and overwrite the target file. Returns the number of rows written.
    pub async fn export(
        &self,
        items: &[RequestItem],
        now: DateTime<Utc>,
    ) -> Result<usize, ExportError> {
        let buffer = build_workbook(items, now)?;
        tokio::fs::write(&self.path, buffer)
            .await
            .map_err(|e| classify_io(&e))?;
        tracing::info!("Exported {} requests to {}", items.len(), self.path.display());
        Ok(items.len())
    }
}

fn write_date(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&str>,
    format: &Format,
) -> Result<(), XlsxError> {
    let Some(raw) = value else {
        return Ok(());
    };
    match parse_date(raw) {
        Some(at) => worksheet.write_datetime_with_format(row, col, &at.naive_utc(), format)?,
        None => worksheet.write_string(row, col, raw)?,
    };
    Ok(())
}

/// Build the `.xlsx` bytes for `items`.
pub fn build_workbook(items: &[RequestItem], now: DateTime<Utc>) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    let date = Format::new().set_num_format("yyyy-mm-dd");

    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (index, item) in items.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, item.id.as_str())?;
        worksheet.write_string(row, 1, item.patreon_name.as_str())?;
        worksheet.write_string(row, 2, item.tier.as_str())?;
        worksheet.write_string(row, 3, item.character_name.as_str())?;
        worksheet.write_string(row, 4, item.request_type.as_str())?;
        worksheet.write_string(row, 5, item.status.as_str())?;
        worksheet.write_string(row, 6, item.priority.as_str())?;
        write_date(&mut worksheet, row, 7, Some(item.date_requested.as_str()), &date)?;
        worksheet.write_number(row, 8, days_since(&item.date_requested, now) as f64)?;
        write_date(&mut worksheet, row, 9, item.date_started.as_deref(), &date)?;
        write_date(&mut worksheet, row, 10, item.date_completed.as_deref(), &date)?;
        worksheet.write_number(row, 11, sla_days(&item.tier) as f64)?;
        worksheet.write_string(row, 12, if is_overdue(item, now) { "Yes" } else { "No" })?;
        worksheet.write_number(row, 13, f64::from(item.revision_count))?;
        worksheet.write_string(row, 14, item.notes.as_str())?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer()
}
