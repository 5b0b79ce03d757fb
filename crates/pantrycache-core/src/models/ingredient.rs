//! Ingredient and recipe-ingredient association models.

use serde::{Deserialize, Serialize};

/// Canonical form for ingredient names: trimmed and lowercased.
///
/// Names are singular by convention ("tomato", not "tomatoes") but that is
/// not enforced anywhere.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// An ingredient in the user's pantry vocabulary.
///
/// Names are not required to be unique; lookups resolve the first match in
/// the store's name index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

/// Payload for creating an ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewIngredient {
    pub name: String,
}

impl NewIngredient {
    /// Build a payload with the name already normalized.
    pub fn normalized(raw: &str) -> Self {
        Self {
            name: normalize_name(raw),
        }
    }
}

/// Association of an ingredient to a recipe, with per-association
/// quantity, unit, and free-form detail ("finely chopped").
///
/// A quantity of zero is a legitimate amount, not a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecipeIngredient {
    pub id: i64,
    #[serde(rename = "recipeId")]
    pub recipe_id: i64,
    #[serde(rename = "ingredientId")]
    pub ingredient_id: i64,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// Payload for associating an ingredient with a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewRecipeIngredient {
    #[serde(rename = "recipeId")]
    pub recipe_id: i64,
    #[serde(rename = "ingredientId")]
    pub ingredient_id: i64,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl NewRecipeIngredient {
    /// Optimistic row for the pending list while the create is in flight.
    pub fn preview(&self, placeholder_id: i64) -> RecipeIngredient {
        RecipeIngredient {
            id: placeholder_id,
            recipe_id: self.recipe_id,
            ingredient_id: self.ingredient_id,
            quantity: self.quantity,
            unit: self.unit.clone(),
            details: self.details.clone(),
        }
    }
}

/// Partial update for a recipe-ingredient association.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecipeIngredientPatch {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl RecipeIngredientPatch {
    /// Merge this patch over an existing association.
    pub fn apply(&self, association: &mut RecipeIngredient) {
        if let Some(quantity) = self.quantity {
            association.quantity = quantity;
        }
        if let Some(ref unit) = self.unit {
            association.unit = unit.clone();
        }
        if let Some(ref details) = self.details {
            let trimmed = details.trim();
            association.details = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
    }
}
