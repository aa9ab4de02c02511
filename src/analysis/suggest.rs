//! AI chart suggestions.
//!
//! The model's answer is untrusted text. It only becomes `ChartSpec`s after
//! passing [`validate_suggestions`], which accepts or rejects the whole array.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::analysis::profile::DatasetProfile;
use crate::config::LLMConfig;
use crate::llm::LLMAdapter;
use crate::models::{ChartSpec, ChartType, Record};
use crate::types::{LLMMessage, LLMRequest};

/// Sample rows included in the prompt
pub const PROMPT_SAMPLE_ROWS: usize = 3;

const SYSTEM_INSTRUCTION: &str =
    "You are a data visualization expert. Reply with a JSON array only, no prose.";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterFailure {
    #[error("text generation failed: {0}")]
    Transport(String),

    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("suggestions rejected: {0}")]
    Rejected(String),
}

pub struct ChartSuggester {
    client: Arc<dyn LLMAdapter>,
    provider: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl ChartSuggester {
    pub fn new(client: Arc<dyn LLMAdapter>, config: &LLMConfig) -> Self {
        Self {
            client,
            provider: config.provider.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the model for charts. Every expected failure comes back as an
    /// `AdapterFailure`; nothing here panics on model output.
    pub async fn suggest(&self, profile: &DatasetProfile<'_>) -> Result<Vec<ChartSpec>, AdapterFailure> {
        let request = LLMRequest {
            provider: self.provider.clone(),
            model: self.model.clone(),
            messages: vec![LLMMessage::user(build_prompt(profile))],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        };

        debug!(model = %self.model, timeout = ?self.timeout, "Requesting chart suggestions");

        let response = match tokio::time::timeout(self.timeout, self.client.create_chat_completion(&request)).await {
            Err(_) => return Err(AdapterFailure::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(AdapterFailure::Transport(e.to_string())),
            Ok(Ok(response)) => response,
        };

        info!(
            response_len = response.content.len(),
            finish_reason = %response.finish_reason,
            total_tokens = response.usage.total_tokens,
            "Received chart suggestions"
        );

        parse_suggestions(&response.content)
    }
}

/// Natural-language instruction describing the dataset.
pub fn build_prompt(profile: &DatasetProfile<'_>) -> String {
    let numeric: Vec<&str> = profile.numeric_columns().map(|c| c.name.as_str()).collect();
    let categorical: Vec<&str> = profile
        .categorical_columns()
        .map(|c| c.name.as_str())
        .collect();

    let column_types = profile
        .column_types
        .iter()
        .map(|c| format!("{}: {} ({})", c.name, c.storage, c.kind.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let sample: Vec<&Record> = profile.sample.iter().take(PROMPT_SAMPLE_ROWS).collect();
    let sample = serde_json::to_string(&sample).unwrap_or_else(|_| "[]".to_string());
    let chart_types = ChartType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Based on the following dataset information, suggest the 3 most appropriate chart types \
and provide the data structure needed for each chart.\n\
\n\
Dataset Info:\n\
- Columns: {columns:?}\n\
- Row count: {rows}\n\
- Column types: {column_types}\n\
- Numeric columns: {numeric:?}\n\
- Categorical columns: {categorical:?}\n\
- Sample data: {sample}\n\
\n\
For each chart suggestion, provide:\n\
1. \"type\": one of {chart_types}\n\
2. \"title\"\n\
3. \"x_axis\": the X-axis column\n\
4. \"y_axis\": the Y-axis column (if applicable)\n\
5. \"explanation\": why this chart is suitable\n\
6. \"data\": the chart data as a list of objects (limit to 10 data points)\n\
\n\
Respond in valid JSON format with an array of chart suggestions.",
        columns = profile.columns,
        rows = profile.row_count,
    )
}

/// Pull the JSON payload out of a response, unwrapping a markdown code
/// fence when the model added one.
pub fn extract_json(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    }
}

pub fn parse_suggestions(response: &str) -> Result<Vec<ChartSpec>, AdapterFailure> {
    let value: Value = serde_json::from_str(extract_json(response))
        .map_err(|e| AdapterFailure::MalformedResponse(e.to_string()))?;
    validate_suggestions(value)
}

/// All-or-nothing structural check. One bad element rejects the array.
pub fn validate_suggestions(value: Value) -> Result<Vec<ChartSpec>, AdapterFailure> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(AdapterFailure::Rejected(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            validate_chart(item)
                .map(ChartSpec::capped)
                .map_err(|reason| AdapterFailure::Rejected(format!("suggestion {}: {}", idx, reason)))
        })
        .collect()
}

fn validate_chart(item: &Value) -> Result<ChartSpec, String> {
    let fields = item
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", json_kind(item)))?;

    let chart_type = required_text(fields, "type")?
        .parse::<ChartType>()?;
    let title = required_text(fields, "title")?.to_string();
    let explanation = required_text(fields, "explanation")?.to_string();
    let x_axis = optional_text(fields, &["x_axis", "xAxis"])?;
    let y_axis = optional_text(fields, &["y_axis", "yAxis"])?;

    let data = match fields.get("data") {
        Some(Value::Array(points)) => points
            .iter()
            .map(|point| {
                point
                    .as_object()
                    .cloned()
                    .ok_or_else(|| format!("data points must be objects, got {}", json_kind(point)))
            })
            .collect::<Result<Vec<Record>, String>>()?,
        Some(other) => return Err(format!("'data' must be a list, got {}", json_kind(other))),
        None => return Err("missing 'data'".to_string()),
    };

    Ok(ChartSpec {
        chart_type,
        title,
        x_axis,
        y_axis,
        explanation,
        data,
    })
}

fn required_text<'v>(fields: &'v Record, key: &str) -> Result<&'v str, String> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(format!("'{}' is empty", key)),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, json_kind(other))),
        None => Err(format!("missing '{}'", key)),
    }
}

fn optional_text(fields: &Record, keys: &[&str]) -> Result<Option<String>, String> {
    for key in keys {
        match fields.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Ok(Some(s.clone())),
            Some(Value::String(_)) | Some(Value::Null) | None => continue,
            Some(other) => return Err(format!("'{}' must be a string, got {}", key, json_kind(other))),
        }
    }
    Ok(None)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::profile::profile;
    use crate::dataset::{Column, Dataset};
    use crate::models::MAX_CHART_POINTS;
    use serde_json::json;

    fn valid_chart() -> Value {
        json!({
            "type": "bar",
            "title": "Sample Bar Chart",
            "x_axis": "category",
            "y_axis": "value",
            "explanation": "This is a test bar chart",
            "data": [
                {"category": "A", "value": 10},
                {"category": "B", "value": 20},
                {"category": "C", "value": 15}
            ]
        })
    }

    #[test]
    fn test_valid_array_accepted() {
        let charts = validate_suggestions(json!([valid_chart()])).unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].chart_type, ChartType::Bar);
        assert_eq!(charts[0].x_axis.as_deref(), Some("category"));
        assert_eq!(charts[0].data.len(), 3);
    }

    #[test]
    fn test_one_invalid_element_rejects_all() {
        let mut broken = valid_chart();
        broken["type"] = json!("histogram");
        let err = validate_suggestions(json!([valid_chart(), broken])).unwrap_err();
        assert!(matches!(err, AdapterFailure::Rejected(ref reason) if reason.starts_with("suggestion 1")));
    }

    #[test]
    fn test_required_fields_enforced() {
        for field in ["type", "title", "explanation", "data"] {
            let mut chart = valid_chart();
            chart.as_object_mut().unwrap().remove(field);
            assert!(
                validate_suggestions(json!([chart])).is_err(),
                "missing {field} should be rejected"
            );
        }

        let mut blank_title = valid_chart();
        blank_title["title"] = json!("   ");
        assert!(validate_suggestions(json!([blank_title])).is_err());

        let mut data_not_list = valid_chart();
        data_not_list["data"] = json!({"A": 10});
        assert!(validate_suggestions(json!([data_not_list])).is_err());

        let mut bad_axis = valid_chart();
        bad_axis["x_axis"] = json!(["category"]);
        assert!(validate_suggestions(json!([bad_axis])).is_err());
    }

    #[test]
    fn test_non_array_rejected() {
        assert!(matches!(
            validate_suggestions(valid_chart()),
            Err(AdapterFailure::Rejected(_))
        ));
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert_eq!(validate_suggestions(json!([])).unwrap(), Vec::<ChartSpec>::new());
    }

    #[test]
    fn test_camel_case_axes_and_case_insensitive_type() {
        let chart = json!({
            "type": "Scatter",
            "title": "Price vs Rating",
            "xAxis": "price",
            "yAxis": null,
            "explanation": "Shows correlation",
            "data": []
        });
        let charts = validate_suggestions(json!([chart])).unwrap();
        assert_eq!(charts[0].chart_type, ChartType::Scatter);
        assert_eq!(charts[0].x_axis.as_deref(), Some("price"));
        assert!(charts[0].y_axis.is_none());
    }

    #[test]
    fn test_accepted_data_is_capped() {
        let mut chart = valid_chart();
        chart["data"] = Value::Array((0..50).map(|i| json!({"x": i, "y": i * 2})).collect());
        let charts = validate_suggestions(json!([chart])).unwrap();
        assert_eq!(charts[0].data.len(), MAX_CHART_POINTS);
    }

    #[test]
    fn test_extract_json_from_code_fence() {
        let fenced = "Here you go:\n```json\n[{\"a\": 1}]\n```\nEnjoy";
        assert_eq!(extract_json(fenced), "[{\"a\": 1}]");
        assert_eq!(extract_json("```\n[]\n```"), "[]");
        assert_eq!(extract_json("  [] "), "[]");
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_suggestions("This is not valid JSON response").unwrap_err();
        assert!(matches!(err, AdapterFailure::MalformedResponse(_)));
    }

    #[test]
    fn test_prompt_describes_dataset() {
        let dataset = Dataset::new(vec![
            Column::text("category", ["A", "B", "C", "D"]),
            Column::int("value", [10, 20, 15, 25]),
            Column::text("description", ["First", "Second", "Third", "Fourth"]),
        ])
        .unwrap();
        let profile = profile(&dataset).unwrap();
        let prompt = build_prompt(&profile);

        assert!(prompt.contains(r#"- Columns: ["category", "value", "description"]"#));
        assert!(prompt.contains("- Row count: 4"));
        assert!(prompt.contains("value: int64 (numeric)"));
        assert!(prompt.contains(r#"- Numeric columns: ["value"]"#));
        assert!(prompt.contains(r#"- Categorical columns: ["category", "description"]"#));
        assert!(prompt.contains("Third"));
        // only the first three sample rows are sent
        assert!(!prompt.contains("Fourth"));
        assert!(prompt.contains("bar, line, pie, scatter, area"));
    }
}
