/*!
 * MT model seams and the model cache.
 *
 * Models come from a `ModelLoader` and are kept by `ModelCache` for the
 * lifetime of the translator. A model is loaded at most once even when
 * several segments ask for it at the same moment. A failed load is
 * remembered too, so later segments fail fast instead of loading again.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::errors::ModelError;

/// One model invocation
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub text: &'a str,
    /// Source code in the model's namespace, for multilingual models
    pub source_code: Option<&'a str>,
    /// Target code in the model's namespace, for multilingual models
    pub target_code: Option<&'a str>,
}

/// A loaded translation model. Immutable and shared across segments.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    fn model_id(&self) -> &str;

    async fn translate(&self, request: ModelRequest<'_>) -> Result<String, ModelError>;
}

/// Loads models by id
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn TranslationModel>, ModelError>;
}

type LoadResult = Result<Arc<dyn TranslationModel>, ModelError>;
type ModelSlot = Arc<OnceCell<LoadResult>>;

/// Model cache keyed by model id
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,

    /// One slot per model id, holding the outcome of its single load
    models: RwLock<HashMap<String, ModelSlot>>,

    /// Cache hit counter
    hits: AtomicUsize,

    /// Cache miss counter
    misses: AtomicUsize,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn slot(&self, model_id: &str) -> ModelSlot {
        if let Some(slot) = self.models.read().get(model_id) {
            return Arc::clone(slot);
        }
        let mut models = self.models.write();
        Arc::clone(models.entry(model_id.to_string()).or_default())
    }

    /// Get a model, loading it on first use.
    ///
    /// The first load outcome is final: a model that failed to load keeps
    /// returning the same error without calling the loader again.
    pub async fn get(&self, model_id: &str) -> Result<Arc<dyn TranslationModel>, ModelError> {
        let slot = self.slot(model_id);

        if let Some(loaded) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Model cache hit for {}", model_id);
            return loaded.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        slot.get_or_init(|| async {
            info!("Loading model {}", model_id);
            let loaded = self.loader.load(model_id).await;
            if let Err(e) = &loaded {
                warn!("Model {} is unavailable for this run: {}", model_id, e);
            }
            loaded
        })
        .await
        .clone()
    }

    /// Whether a model is loaded
    pub fn contains(&self, model_id: &str) -> bool {
        self.models
            .read()
            .get(model_id)
            .is_some_and(|slot| matches!(slot.get(), Some(Ok(_))))
    }

    /// Whether loading this model was tried and failed
    pub fn is_failed(&self, model_id: &str) -> bool {
        self.models
            .read()
            .get(model_id)
            .is_some_and(|slot| matches!(slot.get(), Some(Err(_))))
    }

    /// Number of loaded models
    pub fn len(&self) -> usize {
        self.models
            .read()
            .values()
            .filter(|slot| matches!(slot.get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
    device: &'a str,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    src_lang: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tgt_lang: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation: String,
}

/// Loader talking to a local inference server
pub struct HttpModelLoader {
    client: reqwest::Client,
    endpoint: String,
    device: String,
}

impl HttpModelLoader {
    pub fn new(endpoint: impl Into<String>, device: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Load {
                model_id: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            device: device.into(),
        })
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn TranslationModel>, ModelError> {
        let load_error = |message: String| ModelError::Load {
            model_id: model_id.to_string(),
            message,
        };

        let response = self
            .client
            .post(format!("{}/models/load", self.endpoint))
            .json(&LoadRequest {
                model: model_id,
                device: &self.device,
            })
            .send()
            .await
            .map_err(|e| load_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(load_error(format!("{} - {}", status.as_u16(), body)));
        }

        Ok(Arc::new(HttpModel {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model_id: model_id.to_string(),
        }))
    }
}

/// Model served by the inference server
pub struct HttpModel {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
}

#[async_trait]
impl TranslationModel for HttpModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn translate(&self, request: ModelRequest<'_>) -> Result<String, ModelError> {
        let invocation_error = |message: String| ModelError::Invocation {
            model_id: self.model_id.clone(),
            message,
        };

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&TranslateRequest {
                model: &self.model_id,
                text: request.text,
                src_lang: request.source_code,
                tgt_lang: request.target_code,
            })
            .send()
            .await
            .map_err(|e| invocation_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(invocation_error(format!("{} - {}", status.as_u16(), body)));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| invocation_error(format!("invalid response: {}", e)))?;
        Ok(body.translation)
    }
}
