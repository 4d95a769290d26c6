//! Recipe lookups.

use std::sync::Arc;

use tracing::{debug, info, warn};

use snapchef_semantic_cache::{Recipe, SemanticCache};

use crate::backend::RecipeBackend;
use crate::parse::parse_recipe;

/// Ingredients offered to the generator when none were detected.
pub const DEFAULT_PANTRY: [&str; 5] = ["salt", "pepper", "oil", "onion", "garlic"];

/// Serves recipes from the cache, generating and caching them on a miss.
pub struct RecipeService {
    cache: Arc<SemanticCache>,
    backend: Arc<dyn RecipeBackend>,
}

impl RecipeService {
    pub fn new(cache: Arc<SemanticCache>, backend: Arc<dyn RecipeBackend>) -> Self {
        Self { cache, backend }
    }

    /// Recipe for `food_name`, or `None` if generation or parsing fails.
    pub async fn recipe_for(
        &self,
        food_name: &str,
        quantity_g: u32,
        detected_ingredients: &[String],
    ) -> Option<Recipe> {
        let cached = self
            .cache
            .find_recipe(food_name)
            .await
            .and_then(|doc| doc.recipe);
        if let Some(recipe) = cached {
            info!("Serving cached recipe for '{food_name}'");
            return Some(recipe);
        }

        let ingredients: Vec<String> = if detected_ingredients.is_empty() {
            DEFAULT_PANTRY.iter().map(ToString::to_string).collect()
        } else {
            detected_ingredients.to_vec()
        };

        let Some(text) = self.backend.generate_recipe(food_name, &ingredients).await else {
            debug!("Generator returned nothing for '{food_name}'");
            return None;
        };
        let Some(recipe) = parse_recipe(&text, food_name, quantity_g) else {
            warn!("Could not parse generated recipe for '{food_name}'");
            return None;
        };

        // Merging keeps any nutrition already cached for this food.
        match self.cache.upsert(food_name, Some(recipe.clone()), None).await {
            Ok(outcome) => debug!("Cached recipe for '{food_name}': {outcome:?}"),
            Err(e) => warn!("Could not cache recipe for '{food_name}': {e}"),
        }
        Some(recipe)
    }
}
