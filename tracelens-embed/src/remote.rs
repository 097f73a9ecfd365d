//! Remote embedding endpoint client.
//!
//! Speaks the OpenAI-style `POST {api_base}/embeddings` protocol, one
//! request per input text. There is no batching guarantee on the remote
//! side, so alignment between inputs and outputs is enforced here: a failure
//! on any single item fails the whole `embed_texts` call rather than
//! returning a short or misaligned batch. Requests carry a bounded timeout
//! and are not retried; retry policy belongs to the caller above the
//! retrieval boundary.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, normalize_in_place};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote OpenAI-style endpoint.
#[derive(Debug, Clone)]
pub struct RemoteApiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dimension: usize,
    normalize: bool,
}

impl RemoteApiProvider {
    /// Create a provider for the given endpoint and model.
    ///
    /// `dimension` must match what the remote model actually emits; each
    /// response is checked against it so a misconfigured dimension fails
    /// loudly instead of corrupting an index.
    pub fn new(
        api_base: String,
        api_key: String,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "remote provider dimension must be non-zero",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbedError::model_init)?;
        Ok(Self {
            client,
            api_base,
            api_key,
            model,
            dimension,
            normalize: true,
        })
    }

    /// Set whether to L2-normalize response vectors (builder style)
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    async fn embed_one(&self, index: usize, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.api_base.trim_end_matches('/'));
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedError::request(index, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedError::request(
                index,
                format!("{url} returned {status}"),
            ));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::request(index, format!("malformed response: {e}")))?;

        let item = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::request(index, "response contained no embeddings"))?;

        if item.embedding.len() != self.dimension {
            return Err(EmbedError::invalid_config(format!(
                "remote model returned dimension {}, expected {}",
                item.embedding.len(),
                self.dimension
            )));
        }

        let mut embedding = item.embedding;
        if self.normalize {
            normalize_in_place(&mut embedding);
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteApiProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(0, text).await
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            // Sequential on purpose: one in-flight request, whole-call
            // failure on the first error.
            let embedding = self.embed_one(index, text).await?;
            embeddings.push(embedding);
        }
        tracing::debug!("Fetched {} remote embeddings", embeddings.len());
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "remote"
    }
}
