// Chart recommendation: profiling, deterministic rules and AI suggestions

pub mod fallback;
pub mod profile;
pub mod suggest;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::dataset::Dataset;
use crate::llm::client_from_config;
use crate::models::ChartSpec;

pub use fallback::fallback;
pub use profile::{profile, ColumnKind, ColumnProfile, DatasetProfile};
pub use suggest::{AdapterFailure, ChartSuggester};

/// Which path produced a set of charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub charts: Vec<ChartSpec>,
    pub source: ChartSource,
}

/// Picks between AI suggestions and the rule-based charts.
pub struct Recommender {
    suggester: Option<ChartSuggester>,
}

impl Recommender {
    pub fn new(suggester: Option<ChartSuggester>) -> Self {
        Self { suggester }
    }

    pub fn fallback_only() -> Self {
        Self { suggester: None }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        let suggester = client_from_config(config).map(|client| ChartSuggester::new(client, config));
        Self::new(suggester)
    }

    pub fn ai_enabled(&self) -> bool {
        self.suggester.is_some()
    }

    /// Profile the dataset and recommend charts for it. A dataset without
    /// rows or columns has nothing to chart and yields an empty list.
    pub async fn recommend(&self, dataset: &Dataset) -> Vec<ChartSpec> {
        match profile(dataset) {
            Ok(profile) => self.recommend_for(&profile).await.charts,
            Err(e) => {
                warn!(error = %e, "Nothing to recommend");
                Vec::new()
            }
        }
    }

    /// Never fails: AI trouble and empty AI answers both yield the fallback.
    pub async fn recommend_for(&self, profile: &DatasetProfile<'_>) -> Recommendation {
        let Some(suggester) = &self.suggester else {
            warn!("No LLM API key configured, using rule-based chart suggestions");
            return Self::from_rules(profile);
        };

        match suggester.suggest(profile).await {
            Ok(charts) if !charts.is_empty() => {
                info!(count = charts.len(), "Using AI chart suggestions");
                Recommendation {
                    charts,
                    source: ChartSource::Ai,
                }
            }
            Ok(_) => {
                warn!("AI returned no chart suggestions, using rule-based charts");
                Self::from_rules(profile)
            }
            Err(failure) => {
                warn!(error = %failure, "AI chart suggestion failed, using rule-based charts");
                Self::from_rules(profile)
            }
        }
    }

    fn from_rules(profile: &DatasetProfile<'_>) -> Recommendation {
        Recommendation {
            charts: fallback(profile),
            source: ChartSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::Config;
    use crate::dataset::Column;
    use crate::llm::LLMAdapter;
    use crate::models::ChartType;
    use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

    enum Reply {
        Text(&'static str),
        Error,
        Hang,
    }

    struct MockAdapter {
        reply: Reply,
        calls: AtomicUsize,
        last_request: Mutex<Option<LLMRequest>>,
    }

    impl MockAdapter {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LLMAdapter for MockAdapter {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match self.reply {
                Reply::Text(text) => Ok(LLMResponse {
                    content: text.to_string(),
                    finish_reason: "stop".to_string(),
                    usage: TokenUsage::default(),
                }),
                Reply::Error => Err(AppError::LLMApi("API Error".to_string())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(AppError::LLMApi("unreachable".to_string()))
                }
            }
        }
    }

    const AI_REPLY: &str = r#"```json
[
  {
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
  }
]
```"#;

    fn sample_dataset() -> Dataset {
        Dataset::new(vec![
            Column::text("category", ["A", "B", "C", "A", "B"]),
            Column::int("value", [10, 20, 15, 25, 30]),
            Column::text("description", ["First", "Second", "Third", "Fourth", "Fifth"]),
        ])
        .unwrap()
    }

    fn recommender_with(adapter: Arc<MockAdapter>) -> Recommender {
        let config = Config::from_lookup(|_| None).unwrap();
        Recommender::new(Some(ChartSuggester::new(adapter, &config.llm)))
    }

    #[tokio::test]
    async fn test_ai_suggestions_used_when_valid() {
        let adapter = MockAdapter::new(Reply::Text(AI_REPLY));
        let recommender = recommender_with(adapter.clone());
        let dataset = sample_dataset();

        let result = recommender.recommend_for(&profile(&dataset).unwrap()).await;
        assert_eq!(result.source, ChartSource::Ai);
        assert_eq!(result.charts.len(), 1);
        assert_eq!(result.charts[0].title, "Sample Bar Chart");
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_request_with_generation_params() {
        let adapter = MockAdapter::new(Reply::Text("[]"));
        let recommender = recommender_with(adapter.clone());
        let dataset = sample_dataset();

        recommender.recommend(&dataset).await;

        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
        let request = adapter.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, Some(2000));
        assert!(request.temperature.unwrap() > 0.0);
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.contains("category"));
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let recommender = recommender_with(MockAdapter::new(Reply::Error));
        let dataset = sample_dataset();

        let result = recommender.recommend_for(&profile(&dataset).unwrap()).await;
        assert_eq!(result.source, ChartSource::Fallback);
        assert_eq!(result.charts, fallback(&profile(&dataset).unwrap()));
        assert!(!result.charts.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_falls_back() {
        let recommender = recommender_with(MockAdapter::new(Reply::Text("This is not valid JSON response")));
        let dataset = sample_dataset();

        let profile = profile(&dataset).unwrap();

        let result = recommender.recommend_for(&profile).await;
        assert_eq!(result.source, ChartSource::Fallback);
        assert_eq!(result.charts, fallback(&profile));

        let transport_failure = recommender_with(MockAdapter::new(Reply::Error))
            .recommend_for(&profile)
            .await;
        assert_eq!(result, transport_failure);
    }

    #[tokio::test]
    async fn test_partially_invalid_reply_falls_back() {
        let reply = r#"[
            {"type": "bar", "title": "ok", "explanation": "fine", "data": []},
            {"type": "bar", "title": "broken", "explanation": "no data"}
        ]"#;
        let recommender = recommender_with(MockAdapter::new(Reply::Text(reply)));
        let dataset = sample_dataset();

        let profile = profile(&dataset).unwrap();

        let result = recommender.recommend_for(&profile).await;
        assert_eq!(result.source, ChartSource::Fallback);
        assert_eq!(result.charts, fallback(&profile));
        assert!(result.charts.iter().all(|c| c.title != "ok"));
    }

    #[tokio::test]
    async fn test_empty_ai_reply_falls_back() {
        let recommender = recommender_with(MockAdapter::new(Reply::Text("[]")));
        let dataset = sample_dataset();

        let result = recommender.recommend_for(&profile(&dataset).unwrap()).await;
        assert_eq!(result.source, ChartSource::Fallback);
        assert!(!result.charts.is_empty());
    }

    #[tokio::test]
    async fn test_slow_adapter_times_out() {
        let config = Config::from_lookup(|_| None).unwrap();
        let suggester = ChartSuggester::new(MockAdapter::new(Reply::Hang), &config.llm)
            .with_timeout(Duration::from_millis(50));
        let dataset = sample_dataset();
        let profile = profile(&dataset).unwrap();

        assert_eq!(
            suggester.suggest(&profile).await,
            Err(AdapterFailure::Timeout(Duration::from_millis(50)))
        );

        let result = Recommender::new(Some(suggester)).recommend_for(&profile).await;
        assert_eq!(result.source, ChartSource::Fallback);
    }

    #[tokio::test]
    async fn test_without_client_uses_fallback() {
        let recommender = Recommender::fallback_only();
        assert!(!recommender.ai_enabled());

        let dataset = sample_dataset();
        let charts = recommender.recommend(&dataset).await;
        let types: Vec<ChartType> = charts.iter().map(|c| c.chart_type).collect();
        assert_eq!(types, vec![ChartType::Bar, ChartType::Pie]);
    }

    #[test]
    fn test_fallback_recommendation_is_idempotent() {
        let recommender = Recommender::fallback_only();
        let dataset = sample_dataset();

        let first = tokio_test::block_on(recommender.recommend(&dataset));
        let second = tokio_test::block_on(recommender.recommend(&dataset));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_ai_recommendation_is_idempotent() {
        let adapter = MockAdapter::new(Reply::Text(AI_REPLY));
        let recommender = recommender_with(adapter.clone());
        let dataset = sample_dataset();

        let first = recommender.recommend(&dataset).await;
        let second = recommender.recommend(&dataset).await;
        assert_eq!(first, second);
        assert_eq!(first[0].title, "Sample Bar Chart");
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_dataset_yields_no_charts() {
        let dataset = Dataset::new(vec![Column::text("a", Vec::<String>::new())]).unwrap();
        assert!(Recommender::fallback_only().recommend(&dataset).await.is_empty());
    }

    #[test]
    fn test_from_config_without_key_disables_ai() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(!Recommender::from_config(&config.llm).ai_enabled());

        let config = Config::from_lookup(|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())).unwrap();
        assert!(Recommender::from_config(&config.llm).ai_enabled());
    }
}
