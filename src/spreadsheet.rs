//! Spreadsheet import and export.
//!
//! Import reads the first worksheet, drops the header row and maps the
//! remaining columns onto the caller's field keys purely by position. Export
//! writes a header of column labels and one row per record in the same
//! order. Booleans become the literal text `TRUE` / `FALSE`, so a re-import
//! hands back text rather than flags.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveTime};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::SpreadsheetError;
use crate::models::{CellValue, Column, FieldKey, FieldValues, Publication};

const SHEET_NAME: &str = "Search Results";
const ACCEPTED_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Anything that can hand out cell values by field key.
pub trait SheetRecord {
    fn cell(&self, key: FieldKey) -> CellValue<'_>;
}

impl SheetRecord for Publication {
    fn cell(&self, key: FieldKey) -> CellValue<'_> {
        Publication::cell(self, key)
    }
}

/// Whether the path carries one of the spreadsheet extensions we accept.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

/// Load an `.xlsx` / `.xls` file into preview rows.
pub fn read_preview_file(path: &Path, keys: &[FieldKey]) -> Result<Vec<FieldValues>, SpreadsheetError> {
    if !has_supported_extension(path) {
        return Err(SpreadsheetError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path)?;
    let rows = read_preview(bytes, keys)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "read spreadsheet preview");
    Ok(rows)
}

/// Decode spreadsheet bytes into one key/value row per data row.
///
/// Column N of the sheet feeds `keys[N]`; labels in the header row are never
/// inspected. Missing or empty cells become empty strings. Rows that are
/// blank across every mapped column are skipped.
pub fn read_preview(bytes: Vec<u8>, keys: &[FieldKey]) -> Result<Vec<FieldValues>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;

    let Some((last_row, _)) = range.end() else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for row in 1..=last_row {
        let values: FieldValues = keys
            .iter()
            .enumerate()
            .map(|(col, key)| {
                let text = range
                    .get_value((row, col as u32))
                    .map(cell_text)
                    .unwrap_or_default();
                (*key, text)
            })
            .collect();

        if values.values().all(|value| value.trim().is_empty()) {
            continue;
        }
        rows.push(values);
    }
    Ok(rows)
}

/// Cell text as the sheet displays it. Date cells become `YYYY-MM-DD`
/// (with the time appended when it is not midnight) rather than the Excel
/// serial number.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) if value.is_datetime() => {
                if datetime.time() == NaiveTime::MIN {
                    datetime.format("%Y-%m-%d").to_string()
                } else {
                    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            _ => value.as_f64().to_string(),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        Data::Float(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
            format!("{}", *number as i64)
        }
        other => other.to_string(),
    }
}

/// Encode records as an `.xlsx` workbook held in memory.
pub fn write_workbook<R: SheetRecord>(
    columns: &[Column],
    records: &[R],
) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, column.label, &header_format)?;
        sheet.set_column_width(col, column.width)?;
    }

    for (row, record) in records.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, column) in columns.iter().enumerate() {
            let text = record.cell(column.key).export_text();
            if !text.is_empty() {
                sheet.write_string(row, col as u16, text)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// `"{prefix}_{YYYY-MM-DD}.xlsx"`
pub fn export_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.xlsx", prefix, date.format("%Y-%m-%d"))
}

/// Write records to `dir`, returning the path of the new file.
pub fn export_to_dir<R: SheetRecord>(
    dir: &Path,
    prefix: &str,
    date: NaiveDate,
    columns: &[Column],
    records: &[R],
) -> Result<PathBuf, SpreadsheetError> {
    let bytes = write_workbook(columns, records)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(prefix, date));
    fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), rows = records.len(), "exported spreadsheet");
    Ok(path)
}
