//! Schema profiling.
//!
//! A profile is the structural summary both recommendation paths work from.
//! It borrows the dataset so the fallback can aggregate the columns it
//! actually picks without the profiler computing anything up front.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::{Dataset, StorageType};
use crate::models::{DataInfo, Record};
use crate::types::{AppError, AppResult};

/// Rows kept in the profile sample.
pub const SAMPLE_ROWS: usize = 5;

/// Coarse column classification used for chart selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Other,
}

impl ColumnKind {
    pub fn from_storage(storage: StorageType) -> Self {
        match storage {
            StorageType::Int64 | StorageType::Float64 => ColumnKind::Numeric,
            StorageType::Object => ColumnKind::Categorical,
            StorageType::Bool | StorageType::DateTime => ColumnKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    /// Position in the dataset; names may repeat, positions never do.
    pub index: usize,
    pub name: String,
    pub kind: ColumnKind,
    pub storage: StorageType,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile<'a> {
    #[serde(skip)]
    dataset: &'a Dataset,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub column_types: Vec<ColumnProfile>,
    pub sample: Vec<Record>,
}

impl<'a> DatasetProfile<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnProfile> + '_ {
        self.columns_of(ColumnKind::Numeric)
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = &ColumnProfile> + '_ {
        self.columns_of(ColumnKind::Categorical)
    }

    fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &ColumnProfile> + '_ {
        self.column_types.iter().filter(move |c| c.kind == kind)
    }

    /// Summary returned to API callers, dtypes keyed by column name.
    pub fn data_info(&self) -> DataInfo {
        let column_types: BTreeMap<String, String> = self
            .column_types
            .iter()
            .map(|c| (c.name.clone(), c.storage.to_string()))
            .collect();

        DataInfo {
            columns: self.columns.clone(),
            row_count: self.row_count,
            column_count: self.column_count,
            sample_data: self.sample.clone(),
            column_types,
        }
    }
}

/// Profile a loaded dataset. Zero rows or zero columns violate the caller's
/// contract and are the only failure.
pub fn profile(dataset: &Dataset) -> AppResult<DatasetProfile<'_>> {
    if dataset.column_count() == 0 {
        return Err(AppError::EmptyDataset("No columns found in the file".to_string()));
    }
    if dataset.row_count() == 0 {
        return Err(AppError::EmptyDataset("The uploaded file is empty".to_string()));
    }

    let column_types: Vec<ColumnProfile> = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| ColumnProfile {
            index,
            name: column.name.clone(),
            kind: ColumnKind::from_storage(column.storage),
            storage: column.storage,
        })
        .collect();

    Ok(DatasetProfile {
        dataset,
        columns: dataset.column_names().map(str::to_string).collect(),
        row_count: dataset.row_count(),
        column_count: dataset.column_count(),
        column_types,
        sample: dataset.rows().take(SAMPLE_ROWS).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CellValue, Column};

    fn mixed_dataset() -> Dataset {
        Dataset::new(vec![
            Column::text("region", ["north", "south", "east", "west", "north", "south"]),
            Column::int("units", [1, 2, 3, 4, 5, 6]),
            Column::new("active", StorageType::Bool, vec![CellValue::Bool(true); 6]),
            Column::float("price", [1.5, 2.5, 3.5, 4.5, 5.5, 6.5]),
            Column::text("region", ["a", "b", "c", "d", "e", "f"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_profile_counts_and_partitions() {
        let dataset = mixed_dataset();
        let profile = profile(&dataset).unwrap();

        assert_eq!(profile.row_count, 6);
        assert_eq!(profile.column_count, 5);
        assert_eq!(profile.columns.len(), profile.column_count);
        assert_eq!(profile.column_types.len(), profile.column_count);

        let numeric: Vec<&str> = profile.numeric_columns().map(|c| c.name.as_str()).collect();
        let categorical: Vec<usize> = profile.categorical_columns().map(|c| c.index).collect();
        assert_eq!(numeric, vec!["units", "price"]);
        assert_eq!(categorical, vec![0, 4]);
        assert_eq!(profile.column_types[2].kind, ColumnKind::Other);
    }

    #[test]
    fn test_sample_is_bounded() {
        let dataset = mixed_dataset();
        let profile = profile(&dataset).unwrap();
        assert_eq!(profile.sample.len(), SAMPLE_ROWS);
        assert_eq!(profile.sample[0]["units"], 1);
    }

    #[test]
    fn test_numeric_looking_strings_are_categorical() {
        let dataset = Dataset::new(vec![Column::text("zip", ["02139", "10001"])]).unwrap();
        let profile = profile(&dataset).unwrap();
        assert_eq!(profile.column_types[0].kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let no_rows = Dataset::new(vec![Column::int("x", Vec::<i64>::new())]).unwrap();
        assert!(matches!(profile(&no_rows), Err(AppError::EmptyDataset(_))));

        let no_columns = Dataset::new(vec![]).unwrap();
        assert!(matches!(profile(&no_columns), Err(AppError::EmptyDataset(_))));
    }

    #[test]
    fn test_data_info_reports_dtypes() {
        let dataset = mixed_dataset();
        let info = profile(&dataset).unwrap().data_info();
        assert_eq!(info.column_types["units"], "int64");
        assert_eq!(info.column_types["price"], "float64");
        assert_eq!(info.column_types["active"], "bool");
        assert_eq!(info.column_types["region"], "object");
        assert_eq!(info.sample_data.len(), SAMPLE_ROWS);
    }
}
