//! HTTP client for the recipe manager REST API.
//!
//! This module provides the `ApiClient` struct implementing `RemoteStore`
//! against the JSON backend. Requests carry a bearer token obtained by the
//! host application; token issuance is not handled here.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::models::{
    Category, Ingredient, NewCategory, NewIngredient, NewRecipe, NewRecipeCategory,
    NewRecipeIngredient, Recipe, RecipeCategory, RecipeIngredient, RecipeIngredientPatch,
    RecipePatch,
};

use super::{ApiError, RemoteStore};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the recipe manager backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a client from application config.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.api_base_url.clone())
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::TransportFailure(format!("invalid token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        debug!(url = %url, "GET ok");
        Ok(response.json().await?)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        debug!(url = %url, "POST ok");
        Ok(response.json().await?)
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .put(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        debug!(url = %url, "PUT ok");
        Ok(response.json().await?)
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %url, "DELETE ok");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    // ===== Recipes =====

    async fn list_recipes(&self) -> Result<Vec<Recipe>, ApiError> {
        self.get("/recipes").await
    }

    async fn get_recipe(&self, id: i64) -> Result<Recipe, ApiError> {
        self.get(&format!("/recipes/{}", id)).await
    }

    async fn create_recipe(&self, draft: &NewRecipe) -> Result<Recipe, ApiError> {
        self.post("/recipes", draft).await
    }

    async fn update_recipe(&self, id: i64, patch: &RecipePatch) -> Result<Recipe, ApiError> {
        self.put(&format!("/recipes/{}", id), patch).await
    }

    async fn delete_recipe(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/recipes/{}", id)).await
    }

    async fn list_recipes_by_category(&self, category_id: i64) -> Result<Vec<Recipe>, ApiError> {
        self.get(&format!("/categories/{}/recipes", category_id))
            .await
    }

    async fn search_recipes_by_ingredient(&self, name: &str) -> Result<Vec<Recipe>, ApiError> {
        let url = self.url("/recipes/search");
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&[("ingredient", name)])
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        debug!(url = %url, ingredient = name, "search ok");
        Ok(response.json().await?)
    }

    // ===== Ingredients =====

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, ApiError> {
        self.get("/ingredients").await
    }

    async fn create_ingredient(&self, draft: &NewIngredient) -> Result<Ingredient, ApiError> {
        self.post("/ingredients", draft).await
    }

    async fn delete_ingredient(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/ingredients/{}", id)).await
    }

    // ===== Recipe ingredients =====

    async fn list_recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeIngredient>, ApiError> {
        self.get(&format!("/recipes/{}/ingredients", recipe_id)).await
    }

    async fn create_recipe_ingredient(
        &self,
        draft: &NewRecipeIngredient,
    ) -> Result<RecipeIngredient, ApiError> {
        self.post("/recipe-ingredients", draft).await
    }

    async fn update_recipe_ingredient(
        &self,
        id: i64,
        patch: &RecipeIngredientPatch,
    ) -> Result<RecipeIngredient, ApiError> {
        self.put(&format!("/recipe-ingredients/{}", id), patch).await
    }

    async fn delete_recipe_ingredient(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/recipe-ingredients/{}", id)).await
    }

    // ===== Categories =====

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get("/categories").await
    }

    async fn create_category(&self, draft: &NewCategory) -> Result<Category, ApiError> {
        self.post("/categories", draft).await
    }

    async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/categories/{}", id)).await
    }

    // ===== Recipe categories =====

    async fn list_recipe_categories(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeCategory>, ApiError> {
        self.get(&format!("/recipes/{}/categories", recipe_id)).await
    }

    async fn create_recipe_category(
        &self,
        draft: &NewRecipeCategory,
    ) -> Result<RecipeCategory, ApiError> {
        self.post("/recipe-categories", draft).await
    }

    async fn delete_recipe_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/recipe-categories/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:8000/api/").expect("client");
        assert_eq!(client.url("/recipes"), "http://localhost:8000/api/recipes");
    }
}
