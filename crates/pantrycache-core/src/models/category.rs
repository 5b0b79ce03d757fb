//! Category and recipe-category association models.

use serde::{Deserialize, Serialize};

/// A recipe category ("soup", "weeknight", "dessert").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: i64,
    #[serde(rename = "categoryName")]
    pub category_name: String,
}

/// Payload for creating a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewCategory {
    #[serde(rename = "categoryName")]
    pub category_name: String,
}

/// Membership of a recipe in a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecipeCategory {
    pub id: i64,
    #[serde(rename = "recipeId")]
    pub recipe_id: i64,
    #[serde(rename = "categoryId")]
    pub category_id: i64,
}

/// Payload for adding a recipe to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewRecipeCategory {
    #[serde(rename = "recipeId")]
    pub recipe_id: i64,
    #[serde(rename = "categoryId")]
    pub category_id: i64,
}

impl NewRecipeCategory {
    /// Optimistic row for the pending list while the create is in flight.
    pub fn preview(&self, placeholder_id: i64) -> RecipeCategory {
        RecipeCategory {
            id: placeholder_id,
            recipe_id: self.recipe_id,
            category_id: self.category_id,
        }
    }
}
