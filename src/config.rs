//! Engine Configuration Module
//!
//! TOML configuration for retrieval, reranking, weighting, generation and the
//! pipeline itself.
//!
//! # Configuration File Location
//!
//! The config file is loaded from (in order of priority):
//! 1. `LONGEVITY_RAG_CONFIG` environment variable
//! 2. `./longevity-rag.toml` (current working directory)
//! 3. `~/.longevity-rag/config.toml` (user config)
//! 4. Built-in defaults
//!
//! # Example Configuration
//!
//! ```toml
//! [retrieval]
//! strategy = "auto"
//! k1 = 1.5
//! b = 0.75
//! candidate_multiplier = 5
//!
//! [rerank]
//! enabled = true
//! base_url = "http://localhost:8001/v1"
//! model = "castorini/monot5-base-msmarco"
//!
//! [generation]
//! provider = "openai_compatible"
//! base_url = "http://localhost:8000/v1"
//! model = "kimi-k2"
//! api_key_env = "LONGEVITY_RAG_API_KEY"
//!
//! [pipeline]
//! top_k = 20
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retrieval::{Bm25Params, RetrievalStrategy};
use crate::weighting::RECENCY_COEFFICIENT;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LONGEVITY_RAG_CONFIG";

/// Upper bound accepted for `[pipeline] top_k`.
pub const MAX_TOP_K: usize = 1_000;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseError(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::error::AdvisoryError {
    fn from(e: ConfigError) -> Self {
        crate::error::AdvisoryError::ConfigError(e.to_string())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[retrieval]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Which lexical scorer to use.
    pub strategy: RetrievalStrategy,
    /// BM25 term-frequency saturation.
    pub k1: f64,
    /// BM25 length normalization.
    pub b: f64,
    /// Floor factor for negative IDF values.
    pub epsilon: f64,
    /// Lexical candidates fetched per final slot.
    pub candidate_multiplier: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let params = Bm25Params::default();
        Self {
            strategy: RetrievalStrategy::Auto,
            k1: params.k1,
            b: params.b,
            epsilon: params.epsilon,
            candidate_multiplier: 5,
        }
    }
}

impl RetrievalConfig {
    /// BM25 parameters from this section.
    pub fn bm25_params(&self) -> Bm25Params {
        Bm25Params::new(self.k1, self.b, self.epsilon)
    }
}

/// `[rerank]` section.
///
/// Reranking runs only when `enabled` is set and `base_url` names a
/// relevance endpoint; otherwise the pipeline reranks in pass-through mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Whether to use a relevance model at all.
    pub enabled: bool,
    /// Score added to a candidate judged relevant.
    pub relevance_bonus: f64,
    /// Document budget per judgment, in characters.
    pub max_document_chars: usize,
    /// Judgments in flight at once.
    pub concurrency: usize,
    /// OpenAI-compatible endpoint serving the relevance model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Relevance model name.
    pub model: String,
    /// Environment variable holding the endpoint's API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            relevance_bonus: 1.0,
            max_document_chars: crate::rerank::DEFAULT_MAX_DOCUMENT_CHARS,
            concurrency: 4,
            base_url: None,
            model: "castorini/monot5-base-msmarco".to_string(),
            api_key_env: None,
        }
    }
}

/// `[weighting]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Fixed "current year"; the clock is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_year: Option<i32>,
    /// Recency coefficient.
    pub recency_coefficient: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            current_year: None,
            recency_coefficient: RECENCY_COEFFICIENT,
        }
    }
}

/// Generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    /// In-process mock; no network.
    #[default]
    Mock,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(rename = "openai_compatible")]
    OpenAICompatible,
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::Mock => write!(f, "mock"),
            GenerationProvider::OpenAICompatible => write!(f, "openai_compatible"),
        }
    }
}

/// `[generation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend to use.
    pub provider: GenerationProvider,
    /// Endpoint base URL, e.g. `http://localhost:8000/v1`.
    pub base_url: String,
    /// Model name sent to the endpoint.
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Output token budget.
    pub max_tokens: usize,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry transient failures.
    pub retry_transient: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Mock,
            base_url: "http://localhost:8000/v1".to_string(),
            model: "kimi-k2".to_string(),
            api_key_env: Some("LONGEVITY_RAG_API_KEY".to_string()),
            max_tokens: 512,
            temperature: Some(0.2),
            timeout_secs: 120,
            retry_transient: true,
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Evidence fragments kept after weighting, at most [`MAX_TOP_K`].
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { top_k: 20 }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Lexical retrieval.
    pub retrieval: RetrievalConfig,
    /// Reranking.
    pub rerank: RerankConfig,
    /// Evidence weighting.
    pub weighting: WeightingConfig,
    /// Text generation.
    pub generation: GenerationConfig,
    /// Pipeline limits.
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    /// Load configuration from the default location.
    ///
    /// Searches in order:
    /// 1. `LONGEVITY_RAG_CONFIG` environment variable
    /// 2. `./longevity-rag.toml`
    /// 3. `~/.longevity-rag/config.toml`
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if Path::new(&path).exists() {
                return Self::from_file(&path);
            }
            tracing::warn!("{} points to missing file {}", CONFIG_ENV_VAR, path);
        }

        let local_path = Path::new("longevity-rag.toml");
        if local_path.exists() {
            return Self::from_file(local_path);
        }

        if let Some(home) = dirs::home_dir() {
            let user_path = home.join(".longevity-rag").join("config.toml");
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loading config from {}", path.as_ref().display());
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_toml()?)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.candidate_multiplier == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.candidate_multiplier must be positive".to_string(),
            ));
        }
        non_negative("retrieval.k1", self.retrieval.k1)?;
        if !(0.0..=1.0).contains(&self.retrieval.b) {
            return Err(ConfigError::ValidationError(format!(
                "retrieval.b must be within [0, 1], got {}",
                self.retrieval.b
            )));
        }
        non_negative("retrieval.epsilon", self.retrieval.epsilon)?;
        non_negative("rerank.relevance_bonus", self.rerank.relevance_bonus)?;
        if self.rerank.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "rerank.concurrency must be positive".to_string(),
            ));
        }
        non_negative(
            "weighting.recency_coefficient",
            self.weighting.recency_coefficient,
        )?;
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_tokens must be positive".to_string(),
            ));
        }
        if self.pipeline.top_k > MAX_TOP_K {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.top_k must be at most {}, got {}",
                MAX_TOP_K, self.pipeline.top_k
            )));
        }
        Ok(())
    }
}

/// Reject NaN, infinities and negative values.
fn non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be finite and non-negative, got {}",
            key, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Auto);
        assert_eq!(config.retrieval.k1, 1.5);
        assert_eq!(config.retrieval.b, 0.75);
        assert_eq!(config.retrieval.candidate_multiplier, 5);
        assert!(config.rerank.enabled);
        assert_eq!(config.rerank.relevance_bonus, 1.0);
        assert_eq!(config.generation.provider, GenerationProvider::Mock);
        assert_eq!(config.generation.max_tokens, 512);
        assert_eq!(config.pipeline.top_k, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = EngineConfig::from_toml(
            r#"
            [retrieval]
            strategy = "term_frequency"

            [generation]
            provider = "openai_compatible"
            model = "llama3"

            [pipeline]
            top_k = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.strategy, RetrievalStrategy::TermFrequency);
        assert_eq!(config.retrieval.k1, 1.5);
        assert_eq!(
            config.generation.provider,
            GenerationProvider::OpenAICompatible
        );
        assert_eq!(config.generation.model, "llama3");
        assert_eq!(config.generation.base_url, "http://localhost:8000/v1");
        assert_eq!(config.pipeline.top_k, 5);
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = EngineConfig::default();
        config.weighting.current_year = Some(2024);
        config.rerank.base_url = Some("http://localhost:8001/v1".to_string());

        let toml_str = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml("[retrieval\nk1 = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = EngineConfig::from_toml("[retrieval]\nstrategy = \"dense\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            "[retrieval]\ncandidate_multiplier = 0",
            "[retrieval]\nk1 = -1.0",
            "[retrieval]\nb = 1.5",
            "[rerank]\nconcurrency = 0",
            "[generation]\nmax_tokens = 0",
            "[retrieval]\nk1 = inf",
            "[retrieval]\nepsilon = -1.0",
            "[retrieval]\nepsilon = nan",
            "[rerank]\nrelevance_bonus = nan",
            "[rerank]\nrelevance_bonus = -2.0",
            "[weighting]\nrecency_coefficient = inf",
            "[weighting]\nrecency_coefficient = -0.1",
            "[pipeline]\ntop_k = 1000000",
        ];
        for case in cases {
            let err = EngineConfig::from_toml(case).unwrap_err();
            assert!(
                matches!(err, ConfigError::ValidationError(_)),
                "expected validation error for {:?}",
                case
            );
        }
    }

    #[test]
    fn test_top_k_bound_inclusive() {
        let config = EngineConfig::from_toml(&format!("[pipeline]\ntop_k = {}", MAX_TOP_K)).unwrap();
        assert_eq!(config.pipeline.top_k, MAX_TOP_K);

        let mut config = EngineConfig::default();
        config.rerank.relevance_bonus = 0.0;
        config.retrieval.epsilon = 0.0;
        config.weighting.recency_coefficient = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ntop_k = 7").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pipeline.top_k, 7);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = EngineConfig::default();
        config.pipeline.top_k = 3;
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_load_from_env_var() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ntop_k = 11").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, file.path());
        let config = EngineConfig::load();
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.unwrap().pipeline.top_k, 11);
    }

    #[test]
    fn test_config_error_converts() {
        let err: crate::error::AdvisoryError =
            ConfigError::ValidationError("bad".to_string()).into();
        assert!(matches!(err, crate::error::AdvisoryError::ConfigError(_)));
    }
}
