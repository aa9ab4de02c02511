//! Deterministic chart selection used whenever AI suggestions are missing
//! or unusable.
//!
//! Rules run in order and each contributes at most one chart:
//! bar (first categorical × first numeric, summed per group), line (first
//! two numeric columns, raw rows) and pie (value counts of the first
//! categorical column). Column choice follows column order only.

use std::collections::{BTreeMap, HashMap};

use crate::analysis::profile::{ColumnProfile, DatasetProfile};
use crate::dataset::{CellValue, Column, Dataset, StorageType};
use crate::models::{ChartSpec, ChartType, Record, MAX_CHART_POINTS};

/// Slices kept in the pie chart
pub const PIE_SLICES: usize = 5;

pub fn fallback(profile: &DatasetProfile<'_>) -> Vec<ChartSpec> {
    let dataset = profile.dataset();
    let numeric: Vec<&ColumnProfile> = profile.numeric_columns().collect();
    let categorical: Vec<&ColumnProfile> = profile.categorical_columns().collect();

    let mut charts = Vec::new();

    if let (Some(cat), Some(num)) = (categorical.first(), numeric.first()) {
        charts.extend(bar_chart(dataset, cat, num));
    }

    if let [first, second, ..] = numeric.as_slice() {
        charts.extend(line_chart(dataset, first, second));
    }

    if let Some(cat) = categorical.first() {
        charts.extend(pie_chart(dataset, cat));
    }

    charts.into_iter().map(ChartSpec::capped).collect()
}

/// Running group total; integer columns stay integers.
#[derive(Debug, Clone, Copy)]
enum Total {
    Int(i64),
    Float(f64),
}

impl Total {
    fn zero(storage: StorageType) -> Self {
        match storage {
            StorageType::Int64 => Total::Int(0),
            _ => Total::Float(0.0),
        }
    }

    fn add(&mut self, value: &CellValue) {
        match (self, value) {
            (Total::Int(total), CellValue::Int(v)) => *total = total.saturating_add(*v),
            (Total::Float(total), value) => {
                if let Some(v) = value.as_f64() {
                    *total += v;
                }
            }
            _ => {}
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            Total::Int(v) => serde_json::Value::from(v),
            Total::Float(v) => serde_json::Value::from(v),
        }
    }
}

fn column<'d>(dataset: &'d Dataset, profile: &ColumnProfile) -> Option<&'d Column> {
    dataset.column(profile.index)
}

fn bar_chart(dataset: &Dataset, cat: &ColumnProfile, num: &ColumnProfile) -> Option<ChartSpec> {
    let keys = column(dataset, cat)?;
    let values = column(dataset, num)?;

    // keyed by display form so groups come out in ascending key order
    let mut groups: BTreeMap<String, (&CellValue, Total)> = BTreeMap::new();
    for (key, value) in keys.values.iter().zip(&values.values) {
        if key.is_null() {
            continue;
        }
        groups
            .entry(key.to_string())
            .or_insert_with(|| (key, Total::zero(values.storage)))
            .1
            .add(value);
    }

    let data = groups
        .into_values()
        .take(MAX_CHART_POINTS)
        .map(|(key, total)| {
            let mut record = Record::new();
            record.insert(cat.name.clone(), key.to_json());
            record.insert(num.name.clone(), total.to_json());
            record
        })
        .collect();

    Some(ChartSpec {
        chart_type: ChartType::Bar,
        title: format!("{} by {}", num.name, cat.name),
        x_axis: Some(cat.name.clone()),
        y_axis: Some(num.name.clone()),
        explanation: format!(
            "Bar chart showing {} values across different {} categories",
            num.name, cat.name
        ),
        data,
    })
}

fn line_chart(dataset: &Dataset, first: &ColumnProfile, second: &ColumnProfile) -> Option<ChartSpec> {
    let y = column(dataset, first)?;
    let x = column(dataset, second)?;

    let data = x
        .values
        .iter()
        .zip(&y.values)
        .take(MAX_CHART_POINTS)
        .map(|(x_value, y_value)| {
            let mut record = Record::new();
            record.insert(second.name.clone(), x_value.to_json());
            record.insert(first.name.clone(), y_value.to_json());
            record
        })
        .collect();

    Some(ChartSpec {
        chart_type: ChartType::Line,
        title: format!("{} vs {}", first.name, second.name),
        x_axis: Some(second.name.clone()),
        y_axis: Some(first.name.clone()),
        explanation: format!(
            "Line chart showing the relationship between {} and {}",
            first.name, second.name
        ),
        data,
    })
}

fn pie_chart(dataset: &Dataset, cat: &ColumnProfile) -> Option<ChartSpec> {
    let values = column(dataset, cat)?;

    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for value in values.values.iter().filter(|v| !v.is_null()) {
        let name = value.to_string();
        match positions.get(&name) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(name.clone(), counts.len());
                counts.push((name, 1));
            }
        }
    }

    // stable sort: equal counts keep first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let data = counts
        .into_iter()
        .take(PIE_SLICES)
        .map(|(name, count)| {
            let mut record = Record::new();
            record.insert("name".to_string(), serde_json::Value::String(name));
            record.insert("value".to_string(), serde_json::Value::from(count));
            record
        })
        .collect();

    Some(ChartSpec {
        chart_type: ChartType::Pie,
        title: format!("Distribution of {}", cat.name),
        x_axis: None,
        y_axis: None,
        explanation: format!(
            "Pie chart showing the distribution of different {} categories",
            cat.name
        ),
        data,
    })
}
