//! In-memory tabular datasets
//!
//! A [`Dataset`] is the column-oriented result of parsing an upload. Every
//! column carries the physical storage type the loader settled on, which is
//! what the profiler uses to tell numeric columns from categorical ones.

pub mod loader;

pub use loader::{load_path, load_upload, parse_csv, parse_excel, FileKind};

use serde::Serialize;

use crate::models::Record;
use crate::types::{AppError, AppResult};

/// Physical storage type of a column, named after the dtype strings the
/// front end already knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageType {
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float64")]
    Float64,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "datetime64[ns]")]
    DateTime,
    #[serde(rename = "object")]
    Object,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Int64 => "int64",
            StorageType::Float64 => "float64",
            StorageType::Bool => "bool",
            StorageType::DateTime => "datetime64[ns]",
            StorageType::Object => "object",
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell. Serializes to plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// ISO formatted timestamp
    DateTime(String),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Int(i) => serde_json::Value::from(*i),
            // non-finite floats become null
            CellValue::Float(f) => serde_json::Value::from(*f),
            CellValue::DateTime(s) | CellValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => f.write_str("nan"),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{:?}", v),
            CellValue::DateTime(s) | CellValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub storage: StorageType,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, storage: StorageType, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            storage,
            values,
        }
    }

    /// Object column of strings
    pub fn text<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| CellValue::Text(v.into())).collect();
        Self::new(name, StorageType::Object, values)
    }

    pub fn int(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        let values = values.into_iter().map(CellValue::Int).collect();
        Self::new(name, StorageType::Int64, values)
    }

    pub fn float(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let values = values.into_iter().map(CellValue::Float).collect();
        Self::new(name, StorageType::Float64, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset from equally long columns.
    pub fn new(columns: Vec<Column>) -> AppResult<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(ragged) = columns.iter().find(|c| c.len() != row_count) {
            return Err(AppError::InvalidRequest(format!(
                "column '{}' has {} values, expected {}",
                ragged.name,
                ragged.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row as a key/value record. With duplicate column names the rightmost
    /// column wins.
    pub fn record(&self, row: usize) -> Option<Record> {
        if row >= self.row_count {
            return None;
        }
        let mut record = Record::new();
        for column in &self.columns {
            record.insert(column.name.clone(), column.values[row].to_json());
        }
        Some(record)
    }

    pub fn rows(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.row_count).filter_map(move |row| self.record(row))
    }
}
