//! Generation back-ends the services fall back to on a cache miss.

use async_trait::async_trait;

use snapchef_semantic_cache::Nutrition;

/// Source of freshly generated recipes and nutrition facts.
///
/// Implementations own their transport, prompts and retry policy. A `None`
/// means "nothing usable"; the services treat it as a miss.
#[async_trait]
pub trait RecipeBackend: Send + Sync {
    /// Free-text recipe for `food_name` using `ingredients`.
    async fn generate_recipe(&self, food_name: &str, ingredients: &[String]) -> Option<String>;

    /// Per-100g nutrition facts for `food_name`.
    async fn nutrition_facts(&self, food_name: &str) -> Option<Nutrition>;
}
