//! # Kitchen
//!
//! Recipe and nutrition services for SnapChef. Each consults the shared
//! [`SemanticCache`](snapchef_semantic_cache::SemanticCache) first and only
//! calls the generation back-end on a miss, writing the result back so the
//! next near-duplicate query is served from the cache.
//!
//! ```text
//! recipe_for / nutrition_for
//!        │
//!        ▼
//!  find_recipe / find_nutrition ──hit──► result
//!        │ miss
//!        ▼
//!  RecipeBackend ──► parse ──► upsert ──► result
//! ```

pub mod backend;
pub mod nutrition;
pub mod parse;
pub mod recipe;

pub use backend::RecipeBackend;
pub use nutrition::{NutritionFacts, NutritionService, scale_nutrition};
pub use parse::{parse_nutrition, parse_recipe};
pub use recipe::{DEFAULT_PANTRY, RecipeService};
