//! Configuration for embedding providers.
//!
//! All provider selection happens through an explicit [`EmbedConfig`] passed
//! to construction; there is no environment-driven or process-wide implicit
//! state. The same config that built an index must be used to query it,
//! since the embedding dimension is fixed for the life of an index.

use serde::{Deserialize, Serialize};

/// Default dimension for the deterministic hash provider.
pub const DEFAULT_HASH_DIMENSION: usize = 64;

/// Default local embedding model (fastembed's port of all-MiniLM-L6-v2).
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";

/// Default timeout for remote embedding requests, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Selects which embedding backend a provider instance uses.
///
/// The variant is fixed at construction; every text embedded through the
/// resulting provider shares one configuration and one output dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Deterministic feature-hashing embeddings. No model, no network.
    /// Identical input yields bit-identical output across runs.
    Hash { dimension: usize },
    /// Local ONNX model run through fastembed.
    Local { model_name: String },
    /// OpenAI-style remote embeddings endpoint, one request per item.
    Remote {
        api_base: String,
        api_key: String,
        model: String,
        dimension: usize,
        timeout_secs: u64,
    },
}

/// Configuration for embedding generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Which backend to use
    pub provider: ProviderConfig,
    /// Maximum batch size handed to a local model in one inference call
    pub batch_size: usize,
    /// Whether to L2-normalize output vectors
    pub normalize: bool,
}

impl EmbedConfig {
    /// Deterministic hash-provider configuration with the given dimension.
    pub fn hash(dimension: usize) -> Self {
        Self {
            provider: ProviderConfig::Hash { dimension },
            batch_size: 16,
            normalize: true,
        }
    }

    /// Local-model configuration for a named fastembed model.
    pub fn local(model_name: impl Into<String>) -> Self {
        Self {
            provider: ProviderConfig::Local {
                model_name: model_name.into(),
            },
            batch_size: 16,
            normalize: true,
        }
    }

    /// Remote-endpoint configuration with the default request timeout.
    pub fn remote(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            provider: ProviderConfig::Remote {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                dimension,
                timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            },
            batch_size: 16,
            normalize: true,
        }
    }

    /// Set the local-model batch size (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// A short label for the configured backend.
    pub fn provider_label(&self) -> &'static str {
        match self.provider {
            ProviderConfig::Hash { .. } => "hash",
            ProviderConfig::Local { .. } => "local",
            ProviderConfig::Remote { .. } => "remote",
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self::local(DEFAULT_LOCAL_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = EmbedConfig::hash(DEFAULT_HASH_DIMENSION);
        assert_eq!(config.provider_label(), "hash");
        assert_eq!(config.batch_size, 16);
        assert!(config.normalize);

        let config = EmbedConfig::default();
        assert_eq!(config.provider_label(), "local");
        assert_eq!(
            config.provider,
            ProviderConfig::Local {
                model_name: DEFAULT_LOCAL_MODEL.to_string()
            }
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = EmbedConfig::hash(8).with_batch_size(4).with_normalize(false);
        assert_eq!(config.batch_size, 4);
        assert!(!config.normalize);
    }

    #[test]
    fn test_remote_defaults() {
        let config = EmbedConfig::remote("https://api.example.com/v1", "key", "embed-3", 1536);
        match config.provider {
            ProviderConfig::Remote { timeout_secs, dimension, .. } => {
                assert_eq!(timeout_secs, DEFAULT_REMOTE_TIMEOUT_SECS);
                assert_eq!(dimension, 1536);
            }
            other => panic!("expected remote provider, got {other:?}"),
        }
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = EmbedConfig::hash(32);
        let json = serde_json::to_string(&config).unwrap();
        let back: EmbedConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
