//! Session facade tying the cache components together.
//!
//! A `CacheSession` owns the entity store, the fetch coordinator, and the
//! mutation pipeline for one signed-in user. Construct it at session start
//! and drop it at session end; there is deliberately no process-wide
//! singleton. View code calls the typed `ensure_*` methods when it mounts,
//! subscribes for change notifications, and issues mutations through
//! `mutations()`.

use std::sync::Arc;

use tracing::warn;

use crate::api::{ApiError, RemoteStore};
use crate::config::Config;
use crate::models::{
    normalize_name, Category, Ingredient, NewCategory, NewIngredient, Recipe, RecipeCategory,
    RecipeIngredient,
};

use super::fetch::FetchCoordinator;
use super::invalidation;
use super::key::CacheKey;
use super::mutation::MutationPipeline;
use super::store::{CachedValue, EntityStore, Subscription};

/// Owned cache state for one user session.
pub struct CacheSession {
    store: Arc<EntityStore>,
    fetches: FetchCoordinator,
    mutations: MutationPipeline,
    remote: Arc<dyn RemoteStore>,
}

impl CacheSession {
    pub fn new(remote: Arc<dyn RemoteStore>, config: &Config) -> Self {
        let store = Arc::new(EntityStore::new());
        let fetches = FetchCoordinator::new(Arc::clone(&store), config.stale_minutes);
        let mutations = MutationPipeline::new(Arc::clone(&store), Arc::clone(&remote));
        Self {
            store,
            fetches,
            mutations,
            remote,
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn fetches(&self) -> &FetchCoordinator {
        &self.fetches
    }

    pub fn mutations(&self) -> &MutationPipeline {
        &self.mutations
    }

    /// Observe a cache key. Sugar for `store().subscribe`.
    pub fn subscribe(&self, key: &CacheKey) -> Subscription {
        self.store.subscribe(key)
    }

    // =========================================================================
    // Typed ensure wrappers
    // =========================================================================

    pub async fn ensure_recipes(&self) -> Result<Vec<Recipe>, ApiError> {
        let remote = Arc::clone(&self.remote);
        let value = self
            .fetches
            .ensure(CacheKey::Recipes, async move {
                remote.list_recipes().await.map(CachedValue::Recipes)
            })
            .await?;
        expect_shape(&CacheKey::Recipes, value.into_recipes())
    }

    /// Fetch one recipe. A 404 means the recipe is gone; its dependent
    /// association keys are purged before the error is surfaced, so no
    /// view can render an orphaned association.
    pub async fn ensure_recipe(&self, id: i64) -> Result<Recipe, ApiError> {
        let remote = Arc::clone(&self.remote);
        let result = self
            .fetches
            .ensure(CacheKey::Recipe(id), async move {
                remote.get_recipe(id).await.map(CachedValue::Recipe)
            })
            .await;

        match result {
            Ok(value) => expect_shape(&CacheKey::Recipe(id), value.into_recipe()),
            Err(err) => {
                if matches!(err, ApiError::NotFound(_)) {
                    self.purge_recipe(id);
                }
                Err(err)
            }
        }
    }

    pub async fn ensure_ingredients(&self) -> Result<Vec<Ingredient>, ApiError> {
        let remote = Arc::clone(&self.remote);
        let value = self
            .fetches
            .ensure(CacheKey::Ingredients, async move {
                remote.list_ingredients().await.map(CachedValue::Ingredients)
            })
            .await?;
        expect_shape(&CacheKey::Ingredients, value.into_ingredients())
    }

    pub async fn ensure_categories(&self) -> Result<Vec<Category>, ApiError> {
        let remote = Arc::clone(&self.remote);
        let value = self
            .fetches
            .ensure(CacheKey::Categories, async move {
                remote.list_categories().await.map(CachedValue::Categories)
            })
            .await?;
        expect_shape(&CacheKey::Categories, value.into_categories())
    }

    pub async fn ensure_recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeIngredient>, ApiError> {
        let key = CacheKey::RecipeIngredients { recipe_id };
        let remote = Arc::clone(&self.remote);
        let value = self
            .fetches
            .ensure(key.clone(), async move {
                remote
                    .list_recipe_ingredients(recipe_id)
                    .await
                    .map(CachedValue::RecipeIngredients)
            })
            .await?;
        expect_shape(&key, value.into_recipe_ingredients())
    }

    pub async fn ensure_recipe_categories(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeCategory>, ApiError> {
        let key = CacheKey::RecipeCategories { recipe_id };
        let remote = Arc::clone(&self.remote);
        let value = self
            .fetches
            .ensure(key.clone(), async move {
                remote
                    .list_recipe_categories(recipe_id)
                    .await
                    .map(CachedValue::RecipeCategories)
            })
            .await?;
        expect_shape(&key, value.into_recipe_categories())
    }

    /// Recipes in one category. Membership comes from a server-side join,
    /// so this list is only ever refreshed remotely, never patched.
    pub async fn ensure_recipes_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Recipe>, ApiError> {
        let key = CacheKey::RecipesByCategory { category_id };
        let remote = Arc::clone(&self.remote);
        let value = self
            .fetches
            .ensure(key.clone(), async move {
                remote
                    .list_recipes_by_category(category_id)
                    .await
                    .map(CachedValue::Recipes)
            })
            .await?;
        expect_shape(&key, value.into_recipes())
    }

    /// Membership search: recipes containing an ingredient with a matching
    /// name. Uncached pass-through.
    pub async fn search_recipes_by_ingredient(&self, name: &str) -> Result<Vec<Recipe>, ApiError> {
        self.remote
            .search_recipes_by_ingredient(&normalize_name(name))
            .await
    }

    // =========================================================================
    // Name resolution
    // =========================================================================

    /// Resolve an ingredient by name, creating it if unknown. The lookup is
    /// a point query against the store's name index, not a scan.
    pub async fn resolve_or_create_ingredient(&self, name: &str) -> Result<i64, ApiError> {
        let normalized = normalize_name(name);
        if let Some(id) = self.store.ingredient_id_by_name(&normalized) {
            return Ok(id);
        }
        // The name may simply not be loaded yet.
        self.ensure_ingredients().await?;
        if let Some(id) = self.store.ingredient_id_by_name(&normalized) {
            return Ok(id);
        }
        let created = self
            .mutations
            .create_ingredient(NewIngredient { name: normalized })
            .await?;
        Ok(created.id)
    }

    /// Resolve a category by name, creating it if unknown.
    pub async fn resolve_or_create_category(&self, name: &str) -> Result<i64, ApiError> {
        if let Some(id) = self.store.category_id_by_name(name) {
            return Ok(id);
        }
        self.ensure_categories().await?;
        if let Some(id) = self.store.category_id_by_name(name) {
            return Ok(id);
        }
        let created = self
            .mutations
            .create_category(NewCategory {
                category_name: name.trim().to_string(),
            })
            .await?;
        Ok(created.id)
    }

    fn purge_recipe(&self, id: i64) {
        warn!(recipe_id = id, "recipe no longer exists; purging dependent keys");
        self.store.remove(&CacheKey::Recipe(id));
        for key in invalidation::recipe_delete_cascade(id) {
            self.store.remove(&key);
        }
    }
}

fn expect_shape<T>(key: &CacheKey, taken: Option<T>) -> Result<T, ApiError> {
    taken.ok_or_else(|| {
        ApiError::TransportFailure(format!("cache entry for {} has an unexpected shape", key))
    })
}
