/*!
 * Machine translation of marker-substituted text.
 */

use log::debug;
use std::sync::Arc;

use crate::errors::{ModelError, PivotLeg, TranslationError};
use crate::translation::models::{ModelCache, ModelLoader, ModelRequest};
use crate::translation::registry::TranslationStrategy;

/// Runs a translation strategy against cached models
pub struct MtTranslator {
    cache: ModelCache,
}

impl MtTranslator {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            cache: ModelCache::new(loader),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Load every model the strategy needs so load failures surface early
    pub async fn prefetch(&self, strategy: &TranslationStrategy) -> Result<(), TranslationError> {
        for model_id in strategy.model_ids() {
            self.cache.get(model_id).await?;
        }
        Ok(())
    }

    /// Translate `text` with the given strategy.
    ///
    /// Pivot runs both legs in sequence and only checks that the intermediate
    /// text is not empty; a failing leg is reported as `PivotTranslation`.
    pub async fn translate(&self, strategy: &TranslationStrategy, text: &str) -> Result<String, TranslationError> {
        match strategy {
            TranslationStrategy::Direct { model_id } => self.invoke(model_id, text, None, None).await,
            TranslationStrategy::Pivot {
                first_model_id,
                second_model_id,
                pivot_language,
            } => {
                let intermediate = self
                    .invoke(first_model_id, text, None, None)
                    .await
                    .map_err(|e| pivot_error(PivotLeg::First, first_model_id, e))?;
                debug!("Pivot leg 1 done via {} ({} chars)", pivot_language, intermediate.len());
                self.invoke(second_model_id, &intermediate, None, None)
                    .await
                    .map_err(|e| pivot_error(PivotLeg::Second, second_model_id, e))
            }
            TranslationStrategy::Fallback {
                model_id,
                source_code,
                target_code,
            } => {
                self.invoke(model_id, text, Some(source_code), Some(target_code))
                    .await
            }
        }
    }

    async fn invoke(
        &self,
        model_id: &str,
        text: &str,
        source_code: Option<&str>,
        target_code: Option<&str>,
    ) -> Result<String, TranslationError> {
        let model = self.cache.get(model_id).await?;
        let output = model
            .translate(ModelRequest {
                text,
                source_code,
                target_code,
            })
            .await?;

        if output.trim().is_empty() {
            return Err(TranslationError::EmptyOutput {
                model_id: model_id.to_string(),
            });
        }
        Ok(output)
    }
}

fn pivot_error(leg: PivotLeg, model_id: &str, error: TranslationError) -> TranslationError {
    let message = match error {
        TranslationError::Model(ModelError::Load { message, .. })
        | TranslationError::Model(ModelError::Invocation { message, .. }) => message,
        other => other.to_string(),
    };
    TranslationError::PivotTranslation {
        leg,
        model_id: model_id.to_string(),
        message,
    }
}
