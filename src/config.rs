use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{AppError, AppResult, LLMProvider};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub api_key: Option<String>,
    pub base_url_override: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl LLMConfig {
    pub fn active_api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.trim().is_empty())
    }

    pub fn base_url(&self) -> String {
        self.base_url_override
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (environment, map, ...).
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let provider_id = var("LLM_PROVIDER", "openai");
        let provider = LLMProvider::from_id(&provider_id)
            .ok_or_else(|| AppError::Config(format!("Unsupported LLM_PROVIDER '{}'", provider_id)))?;

        Ok(Self {
            server: ServerConfig {
                port: parse("PORT", &var("PORT", "8000"))?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: parse("MAX_UPLOAD_BYTES", &var("MAX_UPLOAD_BYTES", "10485760"))?,
            },
            llm: LLMConfig {
                provider,
                api_key: lookup(provider.api_key_var()),
                base_url_override: lookup("LLM_BASE_URL").filter(|u| !u.trim().is_empty()),
                model: var("LLM_MODEL", "gpt-4o-mini"),
                max_tokens: parse("LLM_MAX_TOKENS", &var("LLM_MAX_TOKENS", "2000"))?,
                temperature: parse("LLM_TEMPERATURE", &var("LLM_TEMPERATURE", "0.7"))?,
                timeout_secs: parse("LLM_TIMEOUT_SECS", &var("LLM_TIMEOUT_SECS", "30"))?,
            },
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, raw, e)))
}
