//! CSV import of maintenance history
//!
//! Spreadsheets exported from other tools are messy: headers vary, dates
//! come in a dozen shapes, mileage is written as `45.5k` and costs carry
//! currency symbols. Each row is parsed leniently and problems are recorded
//! as notes. Only database failures abort the import, and the whole file
//! runs in one transaction so an abort leaves nothing behind.

use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use vmt_common::db::maintenance::{self, MAX_DESCRIPTION_LEN};
use vmt_common::db::models::NewMaintenanceRecord;
use vmt_common::db::vehicles;
use vmt_common::parse::{parse_cost_flexible, parse_date_flexible, parse_mileage_flexible};
use vmt_common::{Error, Result};

/// What to do with a row that matches an existing record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Skip,
    Replace,
}

impl DuplicatePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "skip" => Some(Self::Skip),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    Skipped,
    Replaced,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateDetail {
    /// Line number in the file (the header is line 1)
    pub row: usize,
    pub date: Option<NaiveDate>,
    pub mileage: i64,
    pub description: String,
    pub existing_ids: Vec<i64>,
    pub action: DuplicateAction,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub imported_rows: usize,
    pub duplicate_rows: usize,
    pub replaced_rows: usize,
    pub skipped_rows: usize,
    pub notes: Vec<String>,
    pub duplicate_details: Vec<DuplicateDetail>,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty() || self.imported_rows > 0
    }
}

const DATE_HEADERS: [&str; 2] = ["date", "service date"];
const MILEAGE_HEADERS: [&str; 3] = ["mileage", "miles", "odometer"];
const COST_HEADERS: [&str; 3] = ["cost", "price", "amount"];
const DESCRIPTION_HEADERS: [&str; 3] = ["description", "service", "work performed"];

#[derive(Debug, PartialEq, Eq)]
struct ColumnMap {
    date: Option<usize>,
    mileage: Option<usize>,
    cost: Option<usize>,
    description: usize,
}

fn find_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
}

fn map_columns(headers: &StringRecord) -> std::result::Result<ColumnMap, String> {
    let description = find_column(headers, &DESCRIPTION_HEADERS).ok_or_else(|| {
        "Missing description column (expected one of: Description, Service, Work Performed)"
            .to_string()
    })?;
    let date = find_column(headers, &DATE_HEADERS);
    let mileage = find_column(headers, &MILEAGE_HEADERS);
    if date.is_none() && mileage.is_none() {
        return Err(
            "The file needs a date column (Date, Service Date) or a mileage column (Mileage, Miles, Odometer)"
                .to_string(),
        );
    }

    Ok(ColumnMap {
        date,
        mileage,
        cost: find_column(headers, &COST_HEADERS),
        description,
    })
}

/// A row that survived parsing and is ready for duplicate checks
#[derive(Debug, Clone, PartialEq)]
struct ParsedRow {
    line: usize,
    /// `None` stores the placeholder date
    date: Option<NaiveDate>,
    mileage: i64,
    description: String,
    cost: Option<f64>,
}

fn field<'r>(record: &'r StringRecord, column: Option<usize>) -> &'r str {
    column
        .and_then(|c| record.get(c))
        .map(str::trim)
        .unwrap_or("")
}

/// Parse one data row; `None` means the row is skipped
fn parse_row(
    record: &StringRecord,
    line: usize,
    columns: &ColumnMap,
    notes: &mut Vec<String>,
) -> Option<ParsedRow> {
    let description = field(record, Some(columns.description));
    if description.is_empty() {
        notes.push(format!("Row {line}: no description, row skipped"));
        return None;
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        notes.push(format!(
            "Row {line}: description longer than {MAX_DESCRIPTION_LEN} characters, row skipped"
        ));
        return None;
    }

    let raw_date = field(record, columns.date);
    let date = parse_date_flexible(raw_date);
    if date.is_none() && !raw_date.is_empty() {
        notes.push(format!(
            "Row {line}: unrecognized date '{raw_date}', stored as estimated"
        ));
    }

    let mileage = if columns.mileage.is_some() {
        let raw = field(record, columns.mileage);
        match parse_mileage_flexible(raw) {
            Some(mileage) => mileage,
            None => {
                if raw.is_empty() {
                    notes.push(format!("Row {line}: no mileage, using 0"));
                } else {
                    notes.push(format!("Row {line}: invalid mileage '{raw}', using 0"));
                }
                0
            }
        }
    } else {
        0
    };

    let raw_cost = field(record, columns.cost);
    let cost = if raw_cost.is_empty() {
        None
    } else {
        let cost = parse_cost_flexible(raw_cost);
        if cost.is_none() {
            notes.push(format!("Row {line}: invalid cost '{raw_cost}', left blank"));
        }
        cost
    };

    Some(ParsedRow {
        line,
        date,
        mileage,
        description: description.to_string(),
        cost,
    })
}

/// Import maintenance records for one vehicle from CSV bytes
pub async fn import_csv(
    pool: &SqlitePool,
    vehicle_id: i64,
    bytes: &[u8],
    policy: DuplicatePolicy,
) -> Result<ImportReport> {
    vehicles::get_vehicle(pool, vehicle_id).await?;

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::invalid("The file is not valid UTF-8 text"))?;

    let mut report = ImportReport::default();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = match map_columns(&headers) {
        Ok(columns) => columns,
        Err(message) => {
            report.errors.push(message);
            return Ok(report);
        }
    };
    if columns.mileage.is_none() {
        report
            .notes
            .push("No mileage column; every record is stored with mileage 0".to_string());
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        // Quoted fields may span lines, so take the line from the reader
        let fallback = index + 2;
        report.total_rows += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(fallback, |p| p.line() as usize);
                report.errors.push(format!("Row {line}: {e}"));
                report.skipped_rows += 1;
                continue;
            }
        };
        let line = record.position().map_or(fallback, |p| p.line() as usize);
        if record.iter().all(|f| f.trim().is_empty()) {
            report.total_rows -= 1;
            continue;
        }
        match parse_row(&record, line, &columns, &mut report.notes) {
            Some(row) => rows.push(row),
            None => report.skipped_rows += 1,
        }
    }

    let mut tx = pool.begin().await?;
    for row in rows {
        let existing = maintenance::find_duplicates(
            &mut *tx,
            vehicle_id,
            row.date,
            row.mileage,
            &row.description,
        )
        .await?;

        if !existing.is_empty() {
            let action = match policy {
                DuplicatePolicy::Skip => DuplicateAction::Skipped,
                DuplicatePolicy::Replace => DuplicateAction::Replaced,
            };
            debug!(line = row.line, ?existing, ?action, "Duplicate import row");
            report.duplicate_details.push(DuplicateDetail {
                row: row.line,
                date: row.date,
                mileage: row.mileage,
                description: row.description.clone(),
                existing_ids: existing.clone(),
                action: action.clone(),
            });

            if action == DuplicateAction::Skipped {
                report.duplicate_rows += 1;
                continue;
            }
            for id in &existing {
                maintenance::delete_by_id(&mut *tx, *id).await?;
            }
            report.replaced_rows += 1;
        }

        let record = NewMaintenanceRecord {
            vehicle_id,
            date: row.date,
            date_estimated: row.date.is_none(),
            mileage: row.mileage,
            description: row.description,
            cost: row.cost,
            ..Default::default()
        };
        maintenance::insert_record(&mut *tx, &record).await?;
        report.imported_rows += 1;
    }
    tx.commit().await?;

    info!(
        vehicle_id,
        total = report.total_rows,
        imported = report.imported_rows,
        duplicates = report.duplicate_rows,
        replaced = report.replaced_rows,
        skipped = report.skipped_rows,
        "CSV import finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn header_aliases_are_case_insensitive() {
        let columns = map_columns(&headers(&[" Service Date ", "ODOMETER", "Price", "Work Performed"]))
            .unwrap();
        assert_eq!(
            columns,
            ColumnMap {
                date: Some(0),
                mileage: Some(1),
                cost: Some(2),
                description: 3,
            }
        );
    }

    #[test]
    fn description_and_date_or_mileage_required() {
        assert!(map_columns(&headers(&["date", "mileage", "cost"])).is_err());
        assert!(map_columns(&headers(&["cost", "description"])).is_err());
        assert!(map_columns(&headers(&["miles", "service"])).is_ok());
    }

    #[test]
    fn row_parsing_records_notes() {
        let columns = map_columns(&headers(&["date", "mileage", "cost", "description"])).unwrap();
        let mut notes = Vec::new();

        let row = parse_row(
            &StringRecord::from(vec!["someday", "45.5k", "$1,2x", "Oil change"]),
            2,
            &columns,
            &mut notes,
        )
        .unwrap();
        assert_eq!(row.date, None);
        assert_eq!(row.mileage, 45_500);
        assert_eq!(row.cost, None);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("unrecognized date 'someday'"));
        assert!(notes[1].contains("invalid cost"));

        notes.clear();
        let row = parse_row(
            &StringRecord::from(vec!["", "abc", "", "Wipers"]),
            3,
            &columns,
            &mut notes,
        )
        .unwrap();
        assert_eq!(row.date, None);
        assert_eq!(row.mileage, 0);
        assert_eq!(notes, vec!["Row 3: invalid mileage 'abc', using 0".to_string()]);

        assert!(parse_row(
            &StringRecord::from(vec!["2024-01-01", "100", "5", "  "]),
            4,
            &columns,
            &mut notes,
        )
        .is_none());
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(DuplicatePolicy::parse("Replace"), Some(DuplicatePolicy::Replace));
        assert_eq!(DuplicatePolicy::parse(""), Some(DuplicatePolicy::Skip));
        assert_eq!(DuplicatePolicy::parse("merge"), None);
    }
}
