//! The unified cache document and its lookup key.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Key prefix of nutrition documents written by the legacy two-document layout.
pub const LEGACY_NUTRITION_PREFIX: &str = "nutrition_";

/// Normalized lookup key for a food name: trimmed and lowercased.
pub fn normalize_key(food_name: &str) -> String {
    food_name.trim().to_lowercase()
}

/// Whether `key` belongs to the legacy nutrition layout.
pub fn is_legacy_key(key: &str) -> bool {
    key.starts_with(LEGACY_NUTRITION_PREFIX)
}

/// A structured recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Display name, e.g. "Garlic Bread Recipe".
    pub name: String,

    /// Ingredient lines in order.
    #[serde(default)]
    pub ingredients: Vec<String>,

    /// Instruction steps in order.
    #[serde(default)]
    pub instructions: Vec<String>,

    /// Serving-size label, e.g. "200g".
    #[serde(default)]
    pub quantity: String,
}

/// Macronutrients per 100 g.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// One cache record combining the recipe and nutrition halves for a food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDocument {
    /// Food name as first written; the slot embedding was computed from it.
    pub food_name: String,

    #[serde(default)]
    pub recipe: Option<Recipe>,

    #[serde(default)]
    pub nutrition: Option<Nutrition>,

    /// Last write time. Advisory only.
    #[serde(default)]
    pub timestamp: String,

    /// Slot of this document's embedding in the vector index.
    pub index_id: usize,
}

impl UnifiedDocument {
    /// Create a document. At least one half must be present.
    pub fn new(
        food_name: impl Into<String>,
        recipe: Option<Recipe>,
        nutrition: Option<Nutrition>,
        index_id: usize,
    ) -> Result<Self> {
        let food_name = food_name.into();
        if recipe.is_none() && nutrition.is_none() {
            return Err(CacheError::InvalidDocument(format!(
                "'{food_name}' has neither recipe nor nutrition"
            )));
        }

        Ok(Self {
            food_name,
            recipe,
            nutrition,
            timestamp: now(),
            index_id,
        })
    }

    /// Normalized key derived from `food_name`.
    pub fn key(&self) -> String {
        normalize_key(&self.food_name)
    }

    /// Replace the supplied halves, keep the others, refresh the timestamp.
    pub fn merge(&mut self, recipe: Option<Recipe>, nutrition: Option<Nutrition>) {
        if recipe.is_some() {
            self.recipe = recipe;
        }
        if nutrition.is_some() {
            self.nutrition = nutrition;
        }
        self.timestamp = now();
    }

    /// Whether neither half is present.
    pub fn is_empty(&self) -> bool {
        self.recipe.is_none() && self.nutrition.is_none()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
