//! Nutrition lookups scaled to a serving.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use snapchef_semantic_cache::{Nutrition, SemanticCache};

use crate::backend::RecipeBackend;

/// Nutrition facts for a serving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    /// Whole kilocalories.
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Scale per-100g values to `grams`.
///
/// Calories round to whole numbers and macros to one decimal, half to even.
pub fn scale_nutrition(per_100g: &Nutrition, grams: u32) -> NutritionFacts {
    let multiplier = f64::from(grams) / 100.0;
    NutritionFacts {
        calories: (per_100g.calories * multiplier).round_ties_even() as i64,
        protein: round_tenth(per_100g.protein * multiplier),
        carbs: round_tenth(per_100g.carbs * multiplier),
        fat: round_tenth(per_100g.fat * multiplier),
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Serves nutrition facts from the cache, falling back to the backend.
pub struct NutritionService {
    cache: Arc<SemanticCache>,
    backend: Arc<dyn RecipeBackend>,
}

impl NutritionService {
    pub fn new(cache: Arc<SemanticCache>, backend: Arc<dyn RecipeBackend>) -> Self {
        Self { cache, backend }
    }

    /// Nutrition for `grams` of `food_name`, or `None` when nothing knows it.
    pub async fn nutrition_for(&self, food_name: &str, grams: u32) -> Option<NutritionFacts> {
        let cached = self
            .cache
            .find_nutrition(food_name)
            .await
            .and_then(|doc| doc.nutrition);
        if let Some(per_100g) = cached {
            info!("Serving cached nutrition for '{food_name}'");
            return Some(scale_nutrition(&per_100g, grams));
        }

        let Some(per_100g) = self.backend.nutrition_facts(food_name).await else {
            debug!("No nutrition available for '{food_name}'");
            return None;
        };

        match self.cache.upsert(food_name, None, Some(per_100g)).await {
            Ok(outcome) => debug!("Cached nutrition for '{food_name}': {outcome:?}"),
            Err(e) => warn!("Could not cache nutrition for '{food_name}': {e}"),
        }
        Some(scale_nutrition(&per_100g, grams))
    }
}
