//! Complaint log import from CSV files and spreadsheets
//!
//! Header names vary between exports, so each canonical column is looked up
//! through a list of accepted spellings (see [`Column::alternatives`]).
//! Missing columns are reported with close-match suggestions rather than
//! failing the import; downstream code treats an absent column as
//! "no data".
//!
//! CSV fields that are not valid UTF-8 are decoded as Windows-1252, which is
//! what Excel writes on Windows. Workbooks (`.xlsx`, `.xls`, `.xlsb`, `.ods`)
//! are read from their first sheet; typed cells are turned into text and date
//! cells into `YYYY-MM-DD` before the shared cleaning steps run.
//!
//! Cleaning applied to every row:
//! - text trimmed; `nan`, `None`, `NaN`, `NaT` and empty cells become absent
//! - provider spellings from the registry alias table are canonicalised
//! - rows without a valid complaint date are dropped (when the column exists)
//! - rows resolved as `FLS` (first-level support) are excluded

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{Column, ComplaintDataset, ComplaintRecord};
use crate::registry::Registry;

/// Minimum similarity for a header to be suggested for a missing column
const SUGGESTION_THRESHOLD: f64 = 0.6;
const MAX_SUGGESTIONS: usize = 3;

/// Cell values treated as empty
const NULL_MARKERS: &[&str] = &["nan", "None", "NaN", "NaT"];

/// File extensions read as spreadsheets instead of CSV
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Largest serial Excel can display (9999-12-31)
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// A required column that no header resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingColumn {
    pub column: Column,
    /// Closest headers present in the file, best first
    pub suggestions: Vec<String>,
}

/// Row counts from one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub empty_rows: usize,
    pub invalid_dates: usize,
    pub excluded_fls: usize,
    pub aliased_providers: usize,
    /// CSV fields decoded as Windows-1252
    pub reencoded_fields: usize,
}

/// Cleaned dataset plus what happened on the way
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub dataset: ComplaintDataset,
    /// Canonical column and the source header it was read from
    pub mapping: Vec<(Column, String)>,
    pub missing: Vec<MissingColumn>,
    pub stats: ImportStats,
    pub warnings: Vec<String>,
}

/// Import a complaint log, picking the reader from the file extension
pub fn import_file(path: &Path, registry: &Registry) -> Result<ImportResult> {
    let result = if is_workbook(path) {
        import_workbook(path, registry)?
    } else {
        let file = File::open(path)
            .map_err(|e| Error::Import(format!("Cannot open {}: {}", path.display(), e)))?;
        parse_csv(file, registry)?
    };
    info!(
        "Imported {} of {} rows from {}",
        result.stats.rows_kept,
        result.stats.rows_read,
        path.display()
    );
    Ok(result)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Parse and clean a CSV complaint log
pub fn parse_csv<R: Read>(reader: R, registry: &Registry) -> Result<ImportResult> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut reencoded = 0;
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|field| decode_field(field, &mut reencoded))
        .collect();

    let rows = rdr.byte_records().map(|record| -> Result<Vec<String>> {
        let record = record?;
        Ok(record
            .iter()
            .map(|field| decode_field(field, &mut reencoded))
            .collect())
    });
    let mut result = clean_rows(&headers, rows, registry)?;

    if reencoded > 0 {
        warn!("Decoded {} non-UTF-8 fields as Windows-1252", reencoded);
        result.warnings.push(format!(
            "Decoded {} non-UTF-8 fields as Windows-1252",
            reencoded
        ));
    }
    result.stats.reencoded_fields = reencoded;
    Ok(result)
}

/// UTF-8 when valid, Windows-1252 otherwise
fn decode_field(bytes: &[u8], reencoded: &mut usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            *reencoded += 1;
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Import the first sheet of a spreadsheet workbook
pub fn import_workbook(path: &Path, registry: &Registry) -> Result<ImportResult> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Import(format!("Cannot open {}: {}", path.display(), e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::Import(format!("{} contains no sheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Import(format!("Cannot read sheet '{}': {}", sheet_name, e)))?;
    debug!("Reading sheet '{}' from {}", sheet_name, path.display());

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .map(|row| row.iter().map(|cell| cell_text(cell, false)).collect())
        .unwrap_or_default();

    // Plain numbers under the date header are date serials without a date format
    let date_idx = column_index(&headers, Column::DateReceived);
    let rows = sheet_rows.map(|row| -> Result<Vec<String>> {
        Ok(row
            .iter()
            .enumerate()
            .map(|(idx, cell)| cell_text(cell, Some(idx) == date_idx))
            .collect())
    });

    clean_rows(&headers, rows, registry)
}

/// Render a spreadsheet cell as the text a CSV export would hold
fn cell_text(cell: &Data, date_column: bool) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => match date_column.then(|| serial_to_date(*n)).flatten() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            None => format!("{}", n),
        },
        Data::Int(n) => match date_column.then(|| serial_to_date(*n as f64)).flatten() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => n.to_string(),
        },
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match serial_to_date(serial) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => serial.to_string(),
            }
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Date part of an Excel serial in the 1900 date system
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    // Day 0 is 1899-12-30 once Excel's phantom 1900-02-29 is accounted for
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Shared cleaning for decoded rows from any source
fn clean_rows<I>(headers: &[String], rows: I, registry: &Registry) -> Result<ImportResult>
where
    I: Iterator<Item = Result<Vec<String>>>,
{
    let (positions, missing) = resolve_headers(headers);

    let mut mapping: Vec<(Column, String)> = positions
        .iter()
        .map(|(&column, &idx)| (column, headers[idx].trim().to_string()))
        .collect();
    mapping.sort_by_key(|(column, _)| *column);

    let mut warnings = Vec::new();
    for m in &missing {
        let hint = if m.suggestions.is_empty() {
            String::new()
        } else {
            format!(" (did you mean: {}?)", m.suggestions.join(", "))
        };
        warn!("Missing column '{}'{}", m.column.header(), hint);
        warnings.push(format!("Missing column '{}'{}", m.column.header(), hint));
    }

    let has_date = positions.contains_key(&Column::DateReceived);
    let mut stats = ImportStats::default();
    let mut records = Vec::new();

    for row in rows {
        let row = row?;
        stats.rows_read += 1;

        if row.iter().all(|cell| clean_text(cell).is_none()) {
            stats.empty_rows += 1;
            continue;
        }

        let cell = |column: Column| -> Option<String> {
            positions
                .get(&column)
                .and_then(|&idx| row.get(idx))
                .and_then(|raw| clean_text(raw))
        };

        let date_received = cell(Column::DateReceived).and_then(|d| parse_date(&d));
        if has_date && date_received.is_none() {
            stats.invalid_dates += 1;
            continue;
        }

        let resolution = cell(Column::Resolution);
        if resolution
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("fls"))
        {
            stats.excluded_fls += 1;
            continue;
        }

        let provider = cell(Column::Provider).map(|p| match registry.canonical_alias(&p) {
            Some(canonical) => {
                stats.aliased_providers += 1;
                canonical.to_string()
            }
            None => p,
        });

        records.push(ComplaintRecord {
            date_received,
            category: cell(Column::Category),
            nature: cell(Column::Nature),
            provider,
            agency: cell(Column::Agency),
            unit: cell(Column::Unit),
            resolution,
        });
    }

    stats.rows_kept = records.len();
    if stats.invalid_dates > 0 {
        warnings.push(format!(
            "Dropped {} rows without a valid complaint date",
            stats.invalid_dates
        ));
    }
    if stats.excluded_fls > 0 {
        warnings.push(format!(
            "Excluded {} rows resolved as FLS",
            stats.excluded_fls
        ));
    }
    debug!("Import stats: {:?}", stats);

    Ok(ImportResult {
        dataset: ComplaintDataset::new(records, positions.keys().copied()),
        mapping,
        missing,
        stats,
        warnings,
    })
}

/// Position of the first header matching one of the column's spellings
fn column_index(headers: &[String], column: Column) -> Option<usize> {
    column.alternatives().iter().find_map(|alt| {
        headers
            .iter()
            .position(|name| name.trim().eq_ignore_ascii_case(alt))
    })
}

/// Find the source column for each canonical column
fn resolve_headers(headers: &[String]) -> (HashMap<Column, usize>, Vec<MissingColumn>) {
    let mut positions = HashMap::new();
    for &column in Column::all() {
        if let Some(idx) = column_index(headers, column) {
            positions.insert(column, idx);
        }
    }

    let names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    let missing = Column::required()
        .iter()
        .filter(|c| !positions.contains_key(*c))
        .map(|&column| MissingColumn {
            column,
            suggestions: suggest_headers(column.header(), &names),
        })
        .collect();

    (positions, missing)
}

/// Headers similar to a wanted column name, most similar first
fn suggest_headers(wanted: &str, headers: &[String]) -> Vec<String> {
    let wanted = wanted.to_lowercase();
    let mut scored: Vec<(f64, &String)> = headers
        .iter()
        .map(|h| (strsim::normalized_levenshtein(&wanted, &h.to_lowercase()), h))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, h)| h.clone())
        .collect()
}

/// Trim a cell and map null markers to `None`
pub fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || NULL_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a complaint date from the accepted formats
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%Y/%m/%d", // 2024/01/15
        "%m-%d-%Y", // 01-15-2024
        "%B %d, %Y", // January 15, 2024
        "%b %d, %Y", // Jan 15, 2024
        "%d-%b-%Y", // 15-Jan-2024
    ];
    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // Spreadsheet exports often carry a time component
    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}
