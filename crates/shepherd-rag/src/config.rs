use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub corpora: Vec<CorpusConfig>,
    pub retrieval: RetrievalConfig,
    pub routing: RoutingConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub budget: BudgetConfig,
    pub remote: Option<RemoteConfig>,
    /// Full normalizer strips stopwords and plural suffixes; basic only folds
    /// case and punctuation. Chosen once at startup, never on the hot path.
    pub full_normalizer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub id: String,
    pub file: PathBuf,
    /// Importance weight for blending; entries without one use
    /// `retrieval.default_weight`.
    #[serde(default)]
    pub weight: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Global blended top-K returned to the caller.
    pub top_k: usize,
    /// Per-corpus candidate count queried before weighting; raised to top_k
    /// when configured lower.
    pub per_corpus_k: usize,
    /// Minimum weighted score a hit needs to survive context filtering.
    pub min_context_score: f32,
    /// Maximum context snippets passed to generation.
    pub context_cap: usize,
    /// Weight applied to corpora without an explicit entry.
    pub default_weight: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Below this top score, advice/general turns prefer the remote model.
    pub weak_context_threshold: f32,
    /// Confidence floor for routing teachings/destiny turns to the local model.
    pub teaching_floor: f32,
    /// Confidence floor for routing general turns to the local model.
    pub general_floor: f32,
    pub max_tokens: usize,
    pub generation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_hits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Daily spend ceiling in approximate cost units (USD).
    pub daily_ceiling: f64,
    pub cost_per_1k_tokens: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl EngineConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.into()));
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be > 0");
        }
        if self.retrieval.per_corpus_k == 0 {
            return invalid("retrieval.per_corpus_k must be > 0");
        }
        if self.retrieval.context_cap == 0 {
            return invalid("retrieval.context_cap must be > 0");
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_context_score) {
            return invalid("retrieval.min_context_score must be in [0.0, 1.0]");
        }
        for threshold in [
            self.routing.weak_context_threshold,
            self.routing.teaching_floor,
            self.routing.general_floor,
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return invalid("routing thresholds must be in [0.0, 1.0]");
            }
        }
        if self.cache.max_entries == 0 {
            return invalid("cache.max_entries must be > 0");
        }
        if self.rate_limit.window_secs == 0 || self.rate_limit.max_hits == 0 {
            return invalid("rate_limit window and max_hits must be > 0");
        }
        if self.budget.daily_ceiling < 0.0 || self.budget.cost_per_1k_tokens < 0.0 {
            return invalid("budget values must be non-negative");
        }
        if self.retrieval.default_weight < 0.0 {
            return invalid("retrieval.default_weight must be non-negative");
        }
        for corpus in &self.corpora {
            if corpus.id.is_empty() {
                return invalid("corpus id must be non-empty");
            }
            if corpus.weight.is_some_and(|w| w < 0.0) {
                return invalid("corpus weight must be non-negative");
            }
        }
        Ok(())
    }

    /// Load config from a JSON file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHEPHERD_*` environment overrides for every tunable.
    /// Unset or unparseable variables leave the current value alone.
    pub fn apply_env(&mut self) {
        env_parse("SHEPHERD_TOP_K", &mut self.retrieval.top_k);
        env_parse("SHEPHERD_PER_CORPUS_K", &mut self.retrieval.per_corpus_k);
        env_parse("SHEPHERD_MIN_CONTEXT_SCORE", &mut self.retrieval.min_context_score);
        env_parse("SHEPHERD_CONTEXT_CAP", &mut self.retrieval.context_cap);
        env_parse("SHEPHERD_DEFAULT_WEIGHT", &mut self.retrieval.default_weight);
        env_parse("SHEPHERD_WEAK_CONTEXT", &mut self.routing.weak_context_threshold);
        env_parse("SHEPHERD_TEACHING_FLOOR", &mut self.routing.teaching_floor);
        env_parse("SHEPHERD_GENERAL_FLOOR", &mut self.routing.general_floor);
        env_parse("SHEPHERD_MAX_TOKENS", &mut self.routing.max_tokens);
        env_parse("SHEPHERD_GEN_TIMEOUT_SECS", &mut self.routing.generation_timeout_secs);
        env_parse("SHEPHERD_CACHE_TTL_SECS", &mut self.cache.ttl_secs);
        env_parse("SHEPHERD_CACHE_MAX_ENTRIES", &mut self.cache.max_entries);
        env_parse("SHEPHERD_RATE_WINDOW_SECS", &mut self.rate_limit.window_secs);
        env_parse("SHEPHERD_RATE_MAX_HITS", &mut self.rate_limit.max_hits);
        env_parse("SHEPHERD_DAILY_BUDGET", &mut self.budget.daily_ceiling);
        env_parse("SHEPHERD_COST_PER_1K", &mut self.budget.cost_per_1k_tokens);

        for corpus in &mut self.corpora {
            let var = format!("SHEPHERD_WEIGHT_{}", corpus.id.to_uppercase());
            if let Ok(raw) = std::env::var(&var) {
                if let Ok(weight) = raw.trim().parse::<f32>() {
                    corpus.weight = Some(weight);
                }
            }
        }

        // A remote backend can be configured entirely from the environment.
        if self.remote.is_none() {
            if let (Ok(endpoint), Ok(api_key)) = (
                std::env::var("SHEPHERD_REMOTE_ENDPOINT"),
                std::env::var("SHEPHERD_REMOTE_API_KEY"),
            ) {
                self.remote = Some(RemoteConfig {
                    endpoint,
                    api_key,
                    model: std::env::var("SHEPHERD_REMOTE_MODEL")
                        .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                    temperature: 0.7,
                    timeout_secs: 20,
                });
            }
        }
    }

    /// Weight for a corpus id: explicit entry, or the configured default.
    pub fn corpus_weight(&self, corpus_id: &str) -> f32 {
        self.corpora
            .iter()
            .find(|c| c.id == corpus_id)
            .and_then(|c| c.weight)
            .unwrap_or(self.retrieval.default_weight)
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        if let Ok(value) = raw.trim().parse::<T>() {
            *slot = value;
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shepherd-rag");

        let corpus = |id: &str, file: &str, weight: f32| CorpusConfig {
            id: id.to_string(),
            file: data_dir.join(file),
            weight: Some(weight),
        };

        Self {
            corpora: vec![
                corpus("primary_qa", "primary_qa.json", 1.0),
                corpus("thematic_qa", "thematic_qa.json", 0.9),
                corpus("session_notes", "session_notes.json", 0.75),
                corpus("numbered_themes", "numbered_themes.json", 0.6),
            ],
            data_dir,
            retrieval: RetrievalConfig {
                top_k: 6,
                per_corpus_k: 5,
                min_context_score: 0.22,
                context_cap: 3,
                default_weight: 1.0,
            },
            routing: RoutingConfig {
                weak_context_threshold: 0.35,
                teaching_floor: 0.30,
                general_floor: 0.15,
                max_tokens: 256,
                generation_timeout_secs: 30,
            },
            cache: CacheConfig {
                ttl_secs: 15 * 60,
                max_entries: 512,
            },
            rate_limit: RateLimitConfig {
                window_secs: 10,
                max_hits: 12,
            },
            budget: BudgetConfig {
                daily_ceiling: 1.50,
                cost_per_1k_tokens: 0.002,
            },
            remote: None,
            full_normalizer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = EngineConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = EngineConfig::default();
        config.routing.weak_context_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn corpus_weight_falls_back_to_default() {
        let config = EngineConfig::default();
        assert_eq!(config.corpus_weight("primary_qa"), 1.0);
        assert_eq!(
            config.corpus_weight("unknown"),
            config.retrieval.default_weight
        );
    }

    #[test]
    fn unweighted_corpus_entry_uses_default() {
        let mut config = EngineConfig::default();
        config.corpora[0].weight = None;
        config.retrieval.default_weight = 0.8;
        assert_eq!(config.corpus_weight(&config.corpora[0].id), 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn corpus_entry_parses_without_weight_field() {
        let corpus: CorpusConfig =
            serde_json::from_str(r#"{"id": "extra_qa", "file": "extra_qa.json"}"#).unwrap();
        assert!(corpus.weight.is_none());
    }

    #[test]
    fn from_file_round_trip() {
        let config = EngineConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, config.retrieval.top_k);
        assert_eq!(loaded.corpora.len(), config.corpora.len());
    }

    #[test]
    fn from_file_missing_is_error() {
        assert!(EngineConfig::from_file(Path::new("/nonexistent/config.json")).is_err());
    }
}
