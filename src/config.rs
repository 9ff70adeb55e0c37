use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub document: DocumentConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    1000
}
fn default_overlap_size() -> usize {
    200
}

/// Model identifiers for the remote backends. Leaving `embedding` unset
/// disables semantic search; leaving `chat` or `guard` unset disables chat.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat: Option<String>,
    #[serde(default = "default_guard_model")]
    pub guard: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: default_embedding_model(),
            chat: default_chat_model(),
            guard: default_guard_model(),
        }
    }
}

fn default_embedding_model() -> Option<String> {
    Some("text-embedding-3-small".to_string())
}
fn default_chat_model() -> Option<String> {
    Some("gpt-4o".to_string())
}
fn default_guard_model() -> Option<String> {
    Some("gpt-4o-mini".to_string())
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// `memory` (ephemeral) or `sqlite` (persistent, requires `path`).
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            collection: default_collection(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}
fn default_collection() -> String {
    "docchat".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::InvalidConfig(format!("failed to parse config file: {}", e)))?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let chunking = &config.chunking;
    if chunking.max_chunk_size == 0 {
        return Err(Error::InvalidConfig(
            "chunking.max_chunk_size must be > 0".to_string(),
        ));
    }
    if chunking.overlap_size == 0 || chunking.overlap_size >= chunking.max_chunk_size {
        return Err(Error::InvalidConfig(format!(
            "chunking.overlap_size must be > 0 and < max_chunk_size ({} given, max {})",
            chunking.overlap_size, chunking.max_chunk_size
        )));
    }

    if config.retrieval.top_k < 1 {
        return Err(Error::InvalidConfig(
            "retrieval.top_k must be >= 1".to_string(),
        ));
    }

    if config.api.batch_size < 1 {
        return Err(Error::InvalidConfig(
            "api.batch_size must be >= 1".to_string(),
        ));
    }

    match config.store.backend.as_str() {
        "memory" => {}
        "sqlite" => {
            if config.store.path.is_none() {
                return Err(Error::InvalidConfig(
                    "store.path is required for the sqlite backend".to_string(),
                ));
            }
        }
        other => {
            return Err(Error::InvalidConfig(format!(
                "unknown store backend: '{}'. Must be memory or sqlite.",
                other
            )));
        }
    }

    // The guard gates everything that reaches the generator; chat without a
    // guard model would fail open by construction.
    if config.models.chat.is_some() {
        if config.models.guard.is_none() {
            return Err(Error::InvalidConfig(
                "models.chat requires models.guard to be set".to_string(),
            ));
        }
        if config.models.embedding.is_none() {
            return Err(Error::InvalidConfig(
                "models.chat requires models.embedding for retrieval".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            document: DocumentConfig {
                path: PathBuf::from("data/handbook.pdf"),
            },
            chunking: ChunkingConfig::default(),
            models: ModelsConfig::default(),
            api: ApiConfig::default(),
            store: StoreConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }

    #[test]
    fn defaults_validate() {
        validate(&base_config()).unwrap();
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = base_config();
        config.chunking.overlap_size = config.chunking.max_chunk_size;
        assert!(matches!(
            validate(&config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn sqlite_backend_requires_path() {
        let mut config = base_config();
        config.store.backend = "sqlite".to_string();
        config.store.path = None;
        assert!(matches!(validate(&config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn chat_without_guard_rejected() {
        let mut config = base_config();
        config.models.guard = None;
        assert!(matches!(validate(&config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn parses_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            [document]
            path = "data/handbook.pdf"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.max_chunk_size, 1000);
        assert_eq!(config.chunking.overlap_size, 200);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.store.backend, "memory");
        validate(&config).unwrap();
    }
}
