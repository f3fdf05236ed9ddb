//! Configuration management for Knowledge Nexus.
//!
//! Configuration can be set via environment variables (a `.env` file is read first):
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `OPENROUTER_API_KEY` - Optional. Without it, synthesis is simulated and reports are not model-formatted.
//! - `DEFAULT_MODEL` - Optional. OpenRouter model id. Defaults to `openai/gpt-4o-mini`.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.2`.
//! - `TAVILY_API_KEY` - Optional. Without it, a simulated search provider is used.
//! - `SEARCH_NUM_RESULTS` - Optional. Hits requested per search. Defaults to `10`.
//! - `HITL_REVIEW_THRESHOLD` - Optional. Records scoring below this go to human review.
//! - `CORS_ORIGINS` - Optional. Comma-separated allowed origins.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_CORS_ORIGINS: &str = "http://localhost,http://localhost:3000,http://localhost:3001";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// OpenRouter API key; `None` disables the language model
    pub openrouter_api_key: Option<String>,

    /// Model identifier (OpenRouter format)
    pub default_model: String,

    pub llm_temperature: f32,

    /// Tavily API key; `None` selects simulated search
    pub tavily_api_key: Option<String>,

    pub search_num_results: usize,

    /// Score below which a verified record is sent for human review
    pub review_threshold: Option<f64>,

    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_var(&non_empty, "PORT")?.unwrap_or(8000);

        let default_model =
            non_empty("DEFAULT_MODEL").unwrap_or_else(|| "openai/gpt-4o-mini".to_string());

        let llm_temperature = parse_var(&non_empty, "LLM_TEMPERATURE")?.unwrap_or(0.2);

        let search_num_results = parse_var(&non_empty, "SEARCH_NUM_RESULTS")?.unwrap_or(10);
        if search_num_results == 0 {
            return Err(ConfigError::InvalidValue(
                "SEARCH_NUM_RESULTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let review_threshold: Option<f64> = parse_var(&non_empty, "HITL_REVIEW_THRESHOLD")?;
        if let Some(threshold) = review_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue(
                    "HITL_REVIEW_THRESHOLD".to_string(),
                    format!("{} is outside [0, 1]", threshold),
                ));
            }
        }

        let cors_origins = non_empty("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            openrouter_api_key: non_empty("OPENROUTER_API_KEY"),
            default_model,
            llm_temperature,
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            search_num_results,
            review_threshold,
            cors_origins,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.search_num_results, 10);
        assert!(config.openrouter_api_key.is_none());
        assert!(config.tavily_api_key.is_none());
        assert!(config.review_threshold.is_none());
        assert_eq!(config.cors_origins.len(), 3);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("OPENROUTER_API_KEY", "sk-test"),
            ("HITL_REVIEW_THRESHOLD", "0.6"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.openrouter_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.review_threshold, Some(0.6));
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_blank_key_treated_as_missing() {
        let config = config_from(&[("TAVILY_API_KEY", "  ")]).unwrap();
        assert!(config.tavily_api_key.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "PORT"));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let err = config_from(&[("HITL_REVIEW_THRESHOLD", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "HITL_REVIEW_THRESHOLD"));
    }
}
