//! Recipe generation and saving against the dish endpoints

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::ImageCache;
use crate::error::{ClientError, PipelineError};
use crate::pipeline::{ApiRequest, MultipartPart, RequestPipeline};
use crate::types::{ImageFile, RecipeId};

const NOT_FOOD_MESSAGE: &str = "Not food";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub dish_name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Free text, one step per line
    pub recipe: String,
}

/// What the analysis endpoint made of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOutcome {
    Recipe(Recipe),
    NotFood { description: String },
}

/// A generation run from the cached photo, with the photo that was uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedGeneration {
    pub file: ImageFile,
    pub outcome: RecipeOutcome,
}

impl RecipeOutcome {
    /// Classify a raw `analysis` payload
    pub fn from_analysis(analysis: Value) -> Result<Self, ClientError> {
        if analysis.get("message").and_then(Value::as_str) == Some(NOT_FOOD_MESSAGE) {
            let description = analysis
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(RecipeOutcome::NotFood { description });
        }

        let recipe: Recipe = serde_json::from_value(analysis)
            .map_err(|e| ClientError::InvalidResponse(format!("Malformed recipe: {}", e)))?;
        if recipe.dish_name.trim().is_empty() || recipe.recipe.trim().is_empty() {
            return Err(ClientError::InvalidResponse(
                "Recipe is missing a dish name or instructions".to_string(),
            ));
        }
        Ok(RecipeOutcome::Recipe(recipe))
    }

    pub fn is_food(&self) -> bool {
        matches!(self, RecipeOutcome::Recipe(_))
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    analysis: Value,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    recipe_id: RecipeId,
}

pub struct RecipeClient {
    pipeline: Arc<RequestPipeline>,
}

impl RecipeClient {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Ask the backend to analyze a dish photo
    pub async fn generate(
        &self,
        image: &ImageFile,
        location: Option<&str>,
    ) -> Result<RecipeOutcome, ClientError> {
        let mut parts = vec![MultipartPart::File {
            name: "file".to_string(),
            file: image.clone(),
        }];
        if let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) {
            parts.push(MultipartPart::Text {
                name: "location".to_string(),
                value: location.to_string(),
            });
        }

        let response: AnalyzeResponse = self
            .pipeline
            .send_json(ApiRequest::post("/dish/").multipart(parts))
            .await?;
        let outcome = RecipeOutcome::from_analysis(response.analysis)?;
        match &outcome {
            RecipeOutcome::Recipe(recipe) => {
                info!(dish = %recipe.dish_name, "Recipe generated")
            }
            RecipeOutcome::NotFood { .. } => info!("Image was not recognized as food"),
        }
        Ok(outcome)
    }

    /// Generate from the image waiting in the cache.
    ///
    /// The cache is read once and the uploaded file is handed back, so a
    /// recipe can still be saved after the cache is cleared. The cache is
    /// cleared once a recipe comes back; a not-food outcome or a failed call
    /// leaves it in place.
    pub async fn generate_from_cache(
        &self,
        cache: &ImageCache,
        location: Option<&str>,
    ) -> Result<CachedGeneration, ClientError> {
        let loaded = cache.load().ok_or(ClientError::NothingCached)?;
        let result = self.generate(&loaded.file, location).await;
        cache.release_preview(loaded.preview);

        let outcome = result?;
        if outcome.is_food() {
            cache.clear();
        }
        Ok(CachedGeneration {
            file: loaded.file,
            outcome,
        })
    }

    /// Persist a generated recipe together with its photo
    pub async fn save(&self, image: &ImageFile, recipe: &Recipe) -> Result<RecipeId, ClientError> {
        let encoded = serde_json::to_string(recipe)
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        let parts = vec![
            MultipartPart::File {
                name: "file".to_string(),
                file: image.clone(),
            },
            MultipartPart::Text {
                name: "recipe".to_string(),
                value: encoded,
            },
        ];

        let response: SaveResponse = self
            .pipeline
            .send_json(ApiRequest::post("/dish/save/").multipart(parts))
            .await
            .map_err(|e| {
                if let Some(detail) = e.detail() {
                    warn!(%detail, "Recipe save rejected");
                }
                e
            })?;
        info!(recipe_id = response.recipe_id, "Recipe saved");
        Ok(response.recipe_id)
    }
}
