use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{ChartSource, Recommender};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub recommender: Arc<Recommender>,
}

/// Plain key/value row used for chart payloads and samples
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Upper bound on the records carried inline by one chart
pub const MAX_CHART_POINTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
}

impl ChartType {
    pub const ALL: [ChartType; 5] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Pie,
        ChartType::Scatter,
        ChartType::Area,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
            ChartType::Area => "area",
        }
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ChartType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown chart type '{}'", s))
    }
}

/// One recommended chart, ready for the front end to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    #[serde(default, alias = "xAxis", skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, alias = "yAxis", skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    pub explanation: String,
    pub data: Vec<Record>,
}

impl ChartSpec {
    /// Enforce the inline data cap.
    pub fn capped(mut self) -> Self {
        self.data.truncate(MAX_CHART_POINTS);
        self
    }
}

/// Dataset summary returned next to the suggestions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataInfo {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub sample_data: Vec<Record>,
    pub column_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub data_info: DataInfo,
    pub chart_suggestions: Vec<ChartSpec>,
    pub suggestion_source: ChartSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub ai_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
