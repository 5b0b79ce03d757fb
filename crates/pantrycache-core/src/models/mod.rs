//! Data models for recipe manager entities.
//!
//! This module contains all the data structures the cache engine holds:
//!
//! - `Recipe`: the owner's recipes with timing and serving info
//! - `Ingredient`, `RecipeIngredient`: pantry vocabulary and per-recipe
//!   quantities
//! - `Category`, `RecipeCategory`: recipe categorization
//! - `EntityKind`, `EntityRecord`: kind-erased view used by the pending
//!   write machinery and the invalidation graph
//!
//! Wire names are camelCase to match the JSON REST backend.

pub mod category;
pub mod ingredient;
pub mod record;
pub mod recipe;

pub use category::{Category, NewCategory, NewRecipeCategory, RecipeCategory};
pub use ingredient::{
    normalize_name, Ingredient, NewIngredient, NewRecipeIngredient, RecipeIngredient,
    RecipeIngredientPatch,
};
pub use record::{EntityKind, EntityRecord};
pub use recipe::{NewRecipe, Recipe, RecipePatch};
