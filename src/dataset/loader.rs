//! CSV and Excel loading with storage-type inference.
//!
//! CSV cells arrive as text, so each column's storage type is inferred once
//! over the whole column: integers, floats, booleans, or plain objects.
//! Excel cells are already typed by the workbook; numeric-looking strings
//! stay strings there.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use tracing::debug;

use super::{CellValue, Column, Dataset, StorageType};
use crate::types::{AppError, AppResult};

const UNSUPPORTED_MESSAGE: &str = "Only CSV and Excel files are supported";
const EMPTY_MESSAGE: &str = "The uploaded file is empty";

const EXCEL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Cell contents read as missing values in CSV input.
const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.trim().to_lowercase();
        if lower.ends_with(".csv") {
            Some(FileKind::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Some(FileKind::Excel)
        } else {
            None
        }
    }
}

/// Parse an uploaded file, picking the format from its name.
pub fn load_upload(filename: &str, content: &[u8]) -> AppResult<Dataset> {
    let kind = FileKind::from_filename(filename)
        .ok_or_else(|| AppError::UnsupportedFile(UNSUPPORTED_MESSAGE.to_string()))?;

    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(AppError::EmptyDataset(EMPTY_MESSAGE.to_string()));
    }

    let dataset = match kind {
        FileKind::Csv => parse_csv(content)?,
        FileKind::Excel => parse_excel(content.to_vec())?,
    };

    debug!(
        filename,
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "Parsed upload"
    );
    Ok(dataset)
}

pub fn load_path(path: &Path) -> AppResult<Dataset> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    if FileKind::from_filename(&filename).is_none() {
        return Err(AppError::UnsupportedFile(UNSUPPORTED_MESSAGE.to_string()));
    }
    let content = std::fs::read(path)?;
    load_upload(&filename, &content)
}

pub fn parse_csv(content: &[u8]) -> AppResult<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let raw = String::from_utf8_lossy(h);
            let name = if idx == 0 { raw.trim_start_matches('\u{feff}') } else { &*raw };
            name.trim().to_string()
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::EmptyDataset(EMPTY_MESSAGE.to_string()));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (line, record) in reader.byte_records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(AppError::Parse(format!(
                "Expected {} fields in line {}, saw {}",
                headers.len(),
                line + 2,
                record.len()
            )));
        }
        for (idx, column) in cells.iter_mut().enumerate() {
            let cell = record
                .get(idx)
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .filter(|field| !is_missing(field));
            column.push(cell);
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, column)| infer_csv_column(name, column))
        .collect();

    non_empty(Dataset::new(columns)?)
}

pub fn parse_excel(content: Vec<u8>) -> AppResult<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::EmptyDataset(EMPTY_MESSAGE.to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell {
                Data::Empty => format!("Unnamed: {}", idx),
                other => excel_header(other),
            })
            .collect(),
        None => return Err(AppError::EmptyDataset(EMPTY_MESSAGE.to_string())),
    };

    let empty = Data::Empty;
    let mut cells: Vec<Vec<&Data>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).unwrap_or(&empty));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, column)| infer_excel_column(name, &column))
        .collect();

    non_empty(Dataset::new(columns)?)
}

fn non_empty(dataset: Dataset) -> AppResult<Dataset> {
    if dataset.row_count() == 0 || dataset.column_count() == 0 {
        return Err(AppError::EmptyDataset(EMPTY_MESSAGE.to_string()));
    }
    Ok(dataset)
}

fn is_missing(field: &str) -> bool {
    MISSING_MARKERS.contains(&field.trim())
}

fn parse_bool(field: &str) -> Option<bool> {
    match field.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn infer_csv_column(name: String, cells: Vec<Option<String>>) -> Column {
    let present: Vec<&str> = cells.iter().flatten().map(|c| c.trim()).collect();
    let has_nulls = present.len() < cells.len();

    if present.is_empty() {
        return Column::new(name, StorageType::Float64, vec![CellValue::Null; cells.len()]);
    }

    if !has_nulls && present.iter().all(|c| c.parse::<i64>().is_ok()) {
        let values = present
            .iter()
            .map(|c| c.parse::<i64>().map(CellValue::Int).unwrap_or(CellValue::Null))
            .collect();
        return Column::new(name, StorageType::Int64, values);
    }

    if present.iter().all(|c| c.parse::<f64>().is_ok()) {
        let values = cells
            .iter()
            .map(|c| match c.as_deref().map(|v| v.trim().parse::<f64>()) {
                Some(Ok(v)) => CellValue::Float(v),
                _ => CellValue::Null,
            })
            .collect();
        return Column::new(name, StorageType::Float64, values);
    }

    if !has_nulls && present.iter().all(|c| parse_bool(c).is_some()) {
        let values = present
            .iter()
            .map(|c| parse_bool(c).map(CellValue::Bool).unwrap_or(CellValue::Null))
            .collect();
        return Column::new(name, StorageType::Bool, values);
    }

    let values = cells
        .into_iter()
        .map(|c| c.map(CellValue::Text).unwrap_or(CellValue::Null))
        .collect();
    Column::new(name, StorageType::Object, values)
}

fn excel_header(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        other => excel_cell(other).to_string(),
    }
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(
            dt.as_datetime()
                .map(|ts| ts.format(EXCEL_TIMESTAMP_FORMAT).to_string())
                .unwrap_or_else(|| dt.to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::DateTime(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn integral(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Some(*f as i64)
        }
        _ => None,
    }
}

fn infer_excel_column(name: String, cells: &[&Data]) -> Column {
    let present: Vec<&Data> = cells.iter().copied().filter(|c| !matches!(c, Data::Empty)).collect();
    let has_nulls = present.len() < cells.len();

    if present.is_empty() {
        return Column::new(name, StorageType::Float64, vec![CellValue::Null; cells.len()]);
    }

    let all_numeric = present.iter().all(|c| matches!(c, Data::Int(_) | Data::Float(_)));
    if all_numeric {
        if !has_nulls && present.iter().all(|c| integral(c).is_some()) {
            let values = present
                .iter()
                .map(|c| integral(c).map(CellValue::Int).unwrap_or(CellValue::Null))
                .collect();
            return Column::new(name, StorageType::Int64, values);
        }
        let values = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => CellValue::Float(*i as f64),
                Data::Float(f) => CellValue::Float(*f),
                _ => CellValue::Null,
            })
            .collect();
        return Column::new(name, StorageType::Float64, values);
    }

    if !has_nulls && present.iter().all(|c| matches!(c, Data::Bool(_))) {
        let values = cells.iter().map(|c| excel_cell(c)).collect();
        return Column::new(name, StorageType::Bool, values);
    }

    let all_dates = present
        .iter()
        .all(|c| matches!(c, Data::DateTime(_) | Data::DateTimeIso(_)));
    let storage = if all_dates {
        StorageType::DateTime
    } else {
        StorageType::Object
    };
    Column::new(name, storage, cells.iter().map(|c| excel_cell(c)).collect())
}
