//! Embedding provider implementations

use crate::config::{EmbedConfig, ProviderConfig};
use crate::error::{EmbedError, Result};
use crate::remote::RemoteApiProvider;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use fnv::FnvHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result; the dimension is inferred from the
    /// first vector (0 for an empty result).
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// Every vector produced by one provider instance has the same dimension;
/// that dimension is fixed for the life of any index the provider writes to.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, preserving input order
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// L2-normalize a vector in place, leaving all-zero vectors untouched.
pub(crate) fn normalize_in_place(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Deterministic feature-hashing embedding provider.
///
/// Each alphanumeric token in the input is hashed with FNV-1a; the hash
/// selects a bucket and a sign, and the accumulated vector is L2-normalized.
/// Identical input text produces bit-identical vectors across runs and
/// platforms (FNV has no per-process seeding), and texts that share tokens
/// land measurably closer in L2 distance than unrelated texts: enough
/// semantic signal for reproducible tests without a model or network.
#[derive(Debug, Clone)]
pub struct HashEmbedProvider {
    dimension: usize,
}

impl HashEmbedProvider {
    /// Create a provider emitting vectors of the given dimension.
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is zero.
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be non-zero");
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut accumulator = vec![0.0f32; self.dimension];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty());
        for token in tokens {
            let mut hasher = FnvHasher::default();
            hasher.write(token.as_bytes());
            let hash = hasher.finish();
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            accumulator[bucket] += sign;
        }
        normalize_in_place(&mut accumulator);
        accumulator
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let embeddings = texts.iter().map(|t| self.embed_one(t)).collect();
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn get_model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// FastEmbed-based embedding provider using local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider; call [`initialize`](Self::initialize)
    /// before embedding, or use [`create`](Self::create).
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 384, // all-MiniLM-L6-v2 dimension until initialization
        }
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    /// Loads the embedding model, reusing a process-wide cache when another
    /// provider with the same configuration already loaded it.
    pub async fn initialize(&mut self) -> Result<()> {
        let model_name = self.model_name()?.to_string();
        tracing::info!("Initializing fastembed provider for model: {model_name}");

        let cache_key = self.create_cache_key();
        let cached = {
            let cache = get_model_cache().lock().unwrap();
            cache
                .get(&cache_key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };
        if let Some((model, dimension)) = cached {
            tracing::debug!("Using cached model for: {model_name}");
            self.model = Some(model);
            self.dimension = dimension;
            return Ok(());
        }

        let embedding_model = resolve_model(&model_name)?;
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Loading embedding model: {model_name}");

                let init_options =
                    InitOptions::new(embedding_model).with_show_download_progress(true);
                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                // Probe with one embedding to learn the output dimension
                let probe = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = probe.first().map(|emb| emb.len()).unwrap_or(384);

                tracing::info!("Model loaded successfully. Dimension: {dimension}");
                Ok((model, dimension))
            })
            .await??;

        let model_arc = Arc::new(Mutex::new(model));
        {
            let mut cache = get_model_cache().lock().unwrap();
            cache.insert(cache_key, (Arc::clone(&model_arc), dimension));
        }
        self.model = Some(model_arc);
        self.dimension = dimension;
        Ok(())
    }

    fn model_name(&self) -> Result<&str> {
        match &self.config.provider {
            ProviderConfig::Local { model_name } => Ok(model_name),
            other => Err(EmbedError::invalid_config(format!(
                "FastEmbedProvider requires a local provider config, got {other:?}"
            ))),
        }
    }

    /// Create a cache key from the full serialized configuration.
    fn create_cache_key(&self) -> String {
        let config_json =
            serde_json::to_string(&self.config).expect("Config should always serialize");

        let mut hasher = FnvHasher::default();
        hasher.write(b"v1:");
        hasher.write(config_json.as_bytes());

        format!("v1:{:x}", hasher.finish())
    }

    /// Clears the process-wide model cache.
    pub fn clear_cache() {
        get_model_cache().lock().unwrap().clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        get_model_cache().lock().unwrap().len()
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbedError::invalid_config(format!(
            "unsupported embedding model: {other}"
        ))),
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let chunk = chunk.to_vec();
            let model_clone = Arc::clone(model);

            let mut batch = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                tracing::debug!("Processing batch of {} texts", chunk.len());
                let mut model_guard = model_clone.lock().unwrap();
                model_guard
                    .embed(chunk, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            if self.config.normalize {
                for embedding in &mut batch {
                    normalize_in_place(embedding);
                }
            }
            all_embeddings.extend(batch);
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

/// Embedding provider selected from an [`EmbedConfig`] at index-open time.
///
/// The tagged variant fixes the backend and dimension for the life of the
/// instance; an index built with one variant must be queried with a provider
/// of the same dimension.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Hash(HashEmbedProvider),
    Local(FastEmbedProvider),
    Remote(RemoteApiProvider),
}

impl AnyProvider {
    /// Construct and initialize the provider named by `config`.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        match &config.provider {
            ProviderConfig::Hash { dimension } => {
                if *dimension == 0 {
                    return Err(EmbedError::invalid_config(
                        "hash provider dimension must be non-zero",
                    ));
                }
                Ok(Self::Hash(HashEmbedProvider::new(*dimension)))
            }
            ProviderConfig::Local { .. } => {
                Ok(Self::Local(FastEmbedProvider::create(config.clone()).await?))
            }
            ProviderConfig::Remote {
                api_base,
                api_key,
                model,
                dimension,
                timeout_secs,
            } => Ok(Self::Remote(RemoteApiProvider::new(
                api_base.clone(),
                api_key.clone(),
                model.clone(),
                *dimension,
                Duration::from_secs(*timeout_secs),
            )?)),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for AnyProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            Self::Hash(p) => p.embed_text(text).await,
            Self::Local(p) => p.embed_text(text).await,
            Self::Remote(p) => p.embed_text(text).await,
        }
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        match self {
            Self::Hash(p) => p.embed_texts(texts).await,
            Self::Local(p) => p.embed_texts(texts).await,
            Self::Remote(p) => p.embed_texts(texts).await,
        }
    }

    fn embedding_dimension(&self) -> usize {
        match self {
            Self::Hash(p) => p.embedding_dimension(),
            Self::Local(p) => p.embedding_dimension(),
            Self::Remote(p) => p.embedding_dimension(),
        }
    }

    fn provider_name(&self) -> &str {
        match self {
            Self::Hash(p) => p.provider_name(),
            Self::Local(p) => p.provider_name(),
            Self::Remote(p) => p.provider_name(),
        }
    }
}
