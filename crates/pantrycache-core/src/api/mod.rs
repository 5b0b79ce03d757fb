//! Remote store collaborator boundary.
//!
//! The cache core talks to the authoritative backend exclusively through
//! the `RemoteStore` trait: per entity kind, list/get/create/update/remove
//! operations against an already-authenticated transport. `ApiClient` is
//! the production implementation over the JSON REST API; tests substitute
//! an in-memory remote.
//!
//! Payloads are expected to be validated before they reach this boundary;
//! the core only maps failure statuses onto the `ApiError` taxonomy.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

use async_trait::async_trait;

use crate::models::{
    Category, Ingredient, NewCategory, NewIngredient, NewRecipe, NewRecipeCategory,
    NewRecipeIngredient, Recipe, RecipeCategory, RecipeIngredient, RecipeIngredientPatch,
    RecipePatch,
};

/// Authoritative persistence operations, one set per entity kind.
///
/// Implementations own their timeout policy; the cache core imposes none.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ===== Recipes =====

    async fn list_recipes(&self) -> Result<Vec<Recipe>, ApiError>;
    async fn get_recipe(&self, id: i64) -> Result<Recipe, ApiError>;
    async fn create_recipe(&self, draft: &NewRecipe) -> Result<Recipe, ApiError>;
    async fn update_recipe(&self, id: i64, patch: &RecipePatch) -> Result<Recipe, ApiError>;
    async fn delete_recipe(&self, id: i64) -> Result<(), ApiError>;

    /// Recipes belonging to a category. Membership is resolved by a
    /// server-side join; the client cache never holds the full association
    /// table.
    async fn list_recipes_by_category(&self, category_id: i64) -> Result<Vec<Recipe>, ApiError>;

    /// Recipes containing an ingredient with a matching name. A simple
    /// membership query, no ranking.
    async fn search_recipes_by_ingredient(&self, name: &str) -> Result<Vec<Recipe>, ApiError>;

    // ===== Ingredients =====

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, ApiError>;
    async fn create_ingredient(&self, draft: &NewIngredient) -> Result<Ingredient, ApiError>;
    async fn delete_ingredient(&self, id: i64) -> Result<(), ApiError>;

    // ===== Recipe ingredients =====

    async fn list_recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeIngredient>, ApiError>;
    async fn create_recipe_ingredient(
        &self,
        draft: &NewRecipeIngredient,
    ) -> Result<RecipeIngredient, ApiError>;
    async fn update_recipe_ingredient(
        &self,
        id: i64,
        patch: &RecipeIngredientPatch,
    ) -> Result<RecipeIngredient, ApiError>;
    async fn delete_recipe_ingredient(&self, id: i64) -> Result<(), ApiError>;

    // ===== Categories =====

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn create_category(&self, draft: &NewCategory) -> Result<Category, ApiError>;
    async fn delete_category(&self, id: i64) -> Result<(), ApiError>;

    // ===== Recipe categories =====

    async fn list_recipe_categories(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeCategory>, ApiError>;
    async fn create_recipe_category(
        &self,
        draft: &NewRecipeCategory,
    ) -> Result<RecipeCategory, ApiError>;
    async fn delete_recipe_category(&self, id: i64) -> Result<(), ApiError>;
}
