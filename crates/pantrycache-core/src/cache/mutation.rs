//! Optimistic mutation pipeline.
//!
//! Every create/update/delete follows the same shape:
//!
//! 1. Snapshot the canonical keys the invalidation graph says this kind
//!    affects (read for rollback verification).
//! 2. Stage an optimistic row under the kind's `pending:` key - never the
//!    canonical key - so the UI can render a skeleton row without
//!    polluting the authoritative list. Creates get a negative placeholder
//!    id that never reaches the server.
//! 3. Issue the remote call. On success, patch the server-confirmed record
//!    into the canonical keys (version-guarded), clear the pending row,
//!    and fan out cross-kind invalidation.
//! 4. On failure, clear the pending row and surface the error to the
//!    caller. Nothing was written to the canonical keys, so there is
//!    nothing else to roll back; the snapshot from step 1 verifies that in
//!    debug builds. No silent retry.
//!
//! Concurrent mutations of the same row are serialized upstream (the UI
//! disables re-submission until settlement); different rows proceed fully
//! in parallel.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiError, RemoteStore};
use crate::models::{
    Category, EntityKind, EntityRecord, Ingredient, NewCategory, NewIngredient, NewRecipe,
    NewRecipeCategory, NewRecipeIngredient, Recipe, RecipeCategory, RecipeIngredient,
    RecipeIngredientPatch, RecipePatch,
};

use super::invalidation;
use super::key::CacheKey;
use super::store::{CachedEntry, CachedValue, EntityStore};

/// What an optimistic row is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Create,
    Update,
    Delete,
}

/// One staged optimistic row under a `pending:` key.
///
/// `token` identifies the row for clearing on settlement; for creates it
/// doubles as the placeholder id of the previewed record.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub token: i64,
    pub op: MutationOp,
    pub record: EntityRecord,
}

/// Executes mutations against the remote store with optimistic staging
/// and commit-or-clear reconciliation.
pub struct MutationPipeline {
    store: Arc<EntityStore>,
    remote: Arc<dyn RemoteStore>,
    next_placeholder: AtomicI64,
}

impl MutationPipeline {
    pub fn new(store: Arc<EntityStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            remote,
            next_placeholder: AtomicI64::new(-1),
        }
    }

    /// Placeholder ids are negative so they can never collide with a
    /// server-assigned id.
    fn next_token(&self) -> i64 {
        self.next_placeholder.fetch_sub(1, Ordering::Relaxed)
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    pub async fn create_recipe(&self, draft: NewRecipe) -> Result<Recipe, ApiError> {
        let token = self.next_token();
        let staged = EntityRecord::Recipe(draft.preview(token));
        let before = self.snapshot(&invalidation::canonical_keys(&staged));
        self.stage(PendingWrite {
            token,
            op: MutationOp::Create,
            record: staged,
        });

        match self.remote.create_recipe(&draft).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::Recipe(confirmed.clone()));
                self.clear_pending(EntityKind::Recipe, token);
                self.fan_out(EntityKind::Recipe);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::Recipe, token, &before, err),
        }
    }

    pub async fn update_recipe(&self, id: i64, patch: RecipePatch) -> Result<Recipe, ApiError> {
        let token = self.next_token();
        let staged = self.cached_recipe(id).map(|mut current| {
            patch.apply(&mut current);
            EntityRecord::Recipe(current)
        });
        let before = self.snapshot_for(staged.as_ref());
        if let Some(record) = staged {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Update,
                record,
            });
        }

        match self.remote.update_recipe(id, &patch).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::Recipe(confirmed.clone()));
                self.clear_pending(EntityKind::Recipe, token);
                self.fan_out(EntityKind::Recipe);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::Recipe, token, &before, err),
        }
    }

    pub async fn remove_recipe(&self, id: i64) -> Result<(), ApiError> {
        let token = self.next_token();
        let before = self.snapshot(&[CacheKey::Recipes, CacheKey::Recipe(id)]);
        if let Some(current) = self.cached_recipe(id) {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Delete,
                record: EntityRecord::Recipe(current),
            });
        }

        match self.remote.delete_recipe(id).await {
            Ok(()) => {
                if let Some(entry) = self.store.get(&CacheKey::Recipes) {
                    self.store.patch(&CacheKey::Recipes, entry.version, |value| {
                        apply_remove(value, EntityKind::Recipe, id);
                    });
                }
                self.store.remove(&CacheKey::Recipe(id));
                // Explicit cross-kind cascade: the server has already
                // orphaned these associations.
                for key in invalidation::recipe_delete_cascade(id) {
                    self.store.remove(&key);
                }
                self.clear_pending(EntityKind::Recipe, token);
                self.fan_out(EntityKind::Recipe);
                Ok(())
            }
            Err(err) => self.settle_failure(EntityKind::Recipe, token, &before, err),
        }
    }

    // =========================================================================
    // Ingredients
    // =========================================================================

    pub async fn create_ingredient(&self, draft: NewIngredient) -> Result<Ingredient, ApiError> {
        let token = self.next_token();
        let staged = EntityRecord::Ingredient(Ingredient {
            id: token,
            name: draft.name.clone(),
        });
        let before = self.snapshot(&invalidation::canonical_keys(&staged));
        self.stage(PendingWrite {
            token,
            op: MutationOp::Create,
            record: staged,
        });

        match self.remote.create_ingredient(&draft).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::Ingredient(confirmed.clone()));
                self.clear_pending(EntityKind::Ingredient, token);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::Ingredient, token, &before, err),
        }
    }

    pub async fn remove_ingredient(&self, id: i64) -> Result<(), ApiError> {
        let token = self.next_token();
        let before = self.snapshot(&[CacheKey::Ingredients]);
        if let Some(current) = self.cached_ingredient(id) {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Delete,
                record: EntityRecord::Ingredient(current),
            });
        }

        match self.remote.delete_ingredient(id).await {
            Ok(()) => {
                if let Some(entry) = self.store.get(&CacheKey::Ingredients) {
                    self.store.patch(&CacheKey::Ingredients, entry.version, |value| {
                        apply_remove(value, EntityKind::Ingredient, id);
                    });
                }
                self.clear_pending(EntityKind::Ingredient, token);
                Ok(())
            }
            Err(err) => self.settle_failure(EntityKind::Ingredient, token, &before, err),
        }
    }

    // =========================================================================
    // Recipe ingredients
    // =========================================================================

    pub async fn create_recipe_ingredient(
        &self,
        draft: NewRecipeIngredient,
    ) -> Result<RecipeIngredient, ApiError> {
        let token = self.next_token();
        let staged = EntityRecord::RecipeIngredient(draft.preview(token));
        let before = self.snapshot(&invalidation::canonical_keys(&staged));
        self.stage(PendingWrite {
            token,
            op: MutationOp::Create,
            record: staged,
        });

        match self.remote.create_recipe_ingredient(&draft).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::RecipeIngredient(confirmed.clone()));
                self.clear_pending(EntityKind::RecipeIngredient, token);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::RecipeIngredient, token, &before, err),
        }
    }

    pub async fn update_recipe_ingredient(
        &self,
        id: i64,
        patch: RecipeIngredientPatch,
    ) -> Result<RecipeIngredient, ApiError> {
        let token = self.next_token();
        let staged = self.cached_recipe_ingredient(id).map(|mut current| {
            patch.apply(&mut current);
            EntityRecord::RecipeIngredient(current)
        });
        let before = self.snapshot_for(staged.as_ref());
        if let Some(record) = staged {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Update,
                record,
            });
        }

        match self.remote.update_recipe_ingredient(id, &patch).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::RecipeIngredient(confirmed.clone()));
                self.clear_pending(EntityKind::RecipeIngredient, token);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::RecipeIngredient, token, &before, err),
        }
    }

    pub async fn remove_recipe_ingredient(&self, id: i64) -> Result<(), ApiError> {
        let token = self.next_token();
        let staged = self.cached_recipe_ingredient(id).map(EntityRecord::RecipeIngredient);
        let before = self.snapshot_for(staged.as_ref());
        if let Some(record) = staged.clone() {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Delete,
                record,
            });
        }

        match self.remote.delete_recipe_ingredient(id).await {
            Ok(()) => {
                if let Some(record) = staged {
                    self.remove_from_canonical(&record);
                } else {
                    debug!(id, "recipe-ingredient not cached; nothing to patch");
                }
                self.clear_pending(EntityKind::RecipeIngredient, token);
                Ok(())
            }
            Err(err) => self.settle_failure(EntityKind::RecipeIngredient, token, &before, err),
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(&self, draft: NewCategory) -> Result<Category, ApiError> {
        let token = self.next_token();
        let staged = EntityRecord::Category(Category {
            id: token,
            category_name: draft.category_name.clone(),
        });
        let before = self.snapshot(&invalidation::canonical_keys(&staged));
        self.stage(PendingWrite {
            token,
            op: MutationOp::Create,
            record: staged,
        });

        match self.remote.create_category(&draft).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::Category(confirmed.clone()));
                self.clear_pending(EntityKind::Category, token);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::Category, token, &before, err),
        }
    }

    pub async fn remove_category(&self, id: i64) -> Result<(), ApiError> {
        let token = self.next_token();
        let before = self.snapshot(&[CacheKey::Categories]);
        if let Some(current) = self.cached_category(id) {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Delete,
                record: EntityRecord::Category(current),
            });
        }

        match self.remote.delete_category(id).await {
            Ok(()) => {
                if let Some(entry) = self.store.get(&CacheKey::Categories) {
                    self.store.patch(&CacheKey::Categories, entry.version, |value| {
                        apply_remove(value, EntityKind::Category, id);
                    });
                }
                // The category-scoped list for a deleted category is
                // meaningless; drop it outright.
                self.store.remove(&CacheKey::RecipesByCategory { category_id: id });
                self.clear_pending(EntityKind::Category, token);
                Ok(())
            }
            Err(err) => self.settle_failure(EntityKind::Category, token, &before, err),
        }
    }

    // =========================================================================
    // Recipe categories
    // =========================================================================

    pub async fn create_recipe_category(
        &self,
        draft: NewRecipeCategory,
    ) -> Result<RecipeCategory, ApiError> {
        let token = self.next_token();
        let staged = EntityRecord::RecipeCategory(draft.preview(token));
        let before = self.snapshot(&invalidation::canonical_keys(&staged));
        self.stage(PendingWrite {
            token,
            op: MutationOp::Create,
            record: staged,
        });

        match self.remote.create_recipe_category(&draft).await {
            Ok(confirmed) => {
                self.apply_confirmed(EntityRecord::RecipeCategory(confirmed.clone()));
                self.clear_pending(EntityKind::RecipeCategory, token);
                self.fan_out(EntityKind::RecipeCategory);
                Ok(confirmed)
            }
            Err(err) => self.settle_failure(EntityKind::RecipeCategory, token, &before, err),
        }
    }

    pub async fn remove_recipe_category(&self, id: i64) -> Result<(), ApiError> {
        let token = self.next_token();
        let staged = self.cached_recipe_category(id).map(EntityRecord::RecipeCategory);
        let before = self.snapshot_for(staged.as_ref());
        if let Some(record) = staged.clone() {
            self.stage(PendingWrite {
                token,
                op: MutationOp::Delete,
                record,
            });
        }

        match self.remote.delete_recipe_category(id).await {
            Ok(()) => {
                if let Some(record) = staged {
                    self.remove_from_canonical(&record);
                } else {
                    debug!(id, "recipe-category not cached; nothing to patch");
                }
                self.clear_pending(EntityKind::RecipeCategory, token);
                self.fan_out(EntityKind::RecipeCategory);
                Ok(())
            }
            Err(err) => self.settle_failure(EntityKind::RecipeCategory, token, &before, err),
        }
    }

    // =========================================================================
    // Shared machinery
    // =========================================================================

    /// Stage an optimistic row under the kind's `pending:` key.
    fn stage(&self, write: PendingWrite) {
        let key = CacheKey::Pending(write.record.kind());
        debug!(key = %key, token = write.token, op = ?write.op, "staging optimistic write");
        let mut rows = self
            .store
            .get(&key)
            .and_then(|entry| match entry.value {
                CachedValue::Pending(rows) => Some(rows),
                _ => None,
            })
            .unwrap_or_default();
        rows.push(write);
        self.store.set(&key, CachedValue::Pending(rows));
    }

    /// Drop a staged row. Removes the `pending:` key entirely once the last
    /// row settles so skeleton rendering stops.
    fn clear_pending(&self, kind: EntityKind, token: i64) {
        let key = CacheKey::Pending(kind);
        let Some(entry) = self.store.get(&key) else { return };
        let CachedValue::Pending(mut rows) = entry.value else { return };
        rows.retain(|row| row.token != token);
        if rows.is_empty() {
            self.store.remove(&key);
        } else {
            self.store.set(&key, CachedValue::Pending(rows));
        }
    }

    /// Patch a server-confirmed record into every canonical key that holds
    /// it. Only keys already cached are touched - an uncached key will be
    /// loaded fresh on its next `ensure`.
    fn apply_confirmed(&self, record: EntityRecord) {
        for key in invalidation::canonical_keys(&record) {
            match (&key, &record) {
                (CacheKey::Recipe(_), EntityRecord::Recipe(recipe)) => {
                    // Singleton: the confirmed record is authoritative.
                    self.store.set(&key, CachedValue::Recipe(recipe.clone()));
                }
                _ => {
                    if let Some(entry) = self.store.get(&key) {
                        self.store.patch(&key, entry.version, |value| {
                            apply_upsert(value, &record);
                        });
                    }
                }
            }
        }
    }

    /// Remove a confirmed-deleted record from its canonical list keys.
    fn remove_from_canonical(&self, record: &EntityRecord) {
        for key in invalidation::canonical_keys(record) {
            match key {
                CacheKey::Recipe(_) => {
                    self.store.remove(&key);
                }
                _ => {
                    if let Some(entry) = self.store.get(&key) {
                        self.store.patch(&key, entry.version, |value| {
                            apply_remove(value, record.kind(), record.id());
                        });
                    }
                }
            }
        }
    }

    /// Category-scoped recipe lists join server-side; any mutation that can
    /// change membership invalidates them rather than patching.
    fn fan_out(&self, kind: EntityKind) {
        if invalidation::touches_category_scoped(kind) {
            self.store.invalidate_matching(CacheKey::is_category_scoped);
        }
    }

    fn settle_failure<T>(
        &self,
        kind: EntityKind,
        token: i64,
        before: &[(CacheKey, Option<CachedEntry>)],
        err: ApiError,
    ) -> Result<T, ApiError> {
        self.clear_pending(kind, token);
        self.verify_untouched(before);
        Err(err)
    }

    fn snapshot(&self, keys: &[CacheKey]) -> Vec<(CacheKey, Option<CachedEntry>)> {
        keys.iter()
            .map(|key| (key.clone(), self.store.get(key)))
            .collect()
    }

    fn snapshot_for(
        &self,
        staged: Option<&EntityRecord>,
    ) -> Vec<(CacheKey, Option<CachedEntry>)> {
        staged
            .map(|record| self.snapshot(&invalidation::canonical_keys(record)))
            .unwrap_or_default()
    }

    /// A failed mutation must leave every canonical key exactly as it was
    /// before the optimistic write.
    fn verify_untouched(&self, before: &[(CacheKey, Option<CachedEntry>)]) {
        if cfg!(debug_assertions) {
            for (key, snapshot) in before {
                let current = self.store.get(key);
                debug_assert_eq!(
                    &current, snapshot,
                    "canonical key {} changed during a failed mutation",
                    key
                );
            }
        }
    }

    // ===== Cached-record lookups for optimistic previews =====

    fn cached_recipe(&self, id: i64) -> Option<Recipe> {
        if let Some(entry) = self.store.get(&CacheKey::Recipe(id)) {
            if let CachedValue::Recipe(recipe) = entry.value {
                return Some(recipe);
            }
        }
        self.store
            .get(&CacheKey::Recipes)?
            .value
            .as_recipes()?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn cached_ingredient(&self, id: i64) -> Option<Ingredient> {
        self.store
            .get(&CacheKey::Ingredients)?
            .value
            .as_ingredients()?
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    fn cached_category(&self, id: i64) -> Option<Category> {
        self.store
            .get(&CacheKey::Categories)?
            .value
            .as_categories()?
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn cached_recipe_ingredient(&self, id: i64) -> Option<RecipeIngredient> {
        for key in self.store.keys() {
            if let CacheKey::RecipeIngredients { .. } = key {
                if let Some(found) = self
                    .store
                    .get(&key)
                    .and_then(|e| e.value.into_recipe_ingredients())
                    .and_then(|list| list.into_iter().find(|ri| ri.id == id))
                {
                    return Some(found);
                }
            }
        }
        None
    }

    fn cached_recipe_category(&self, id: i64) -> Option<RecipeCategory> {
        for key in self.store.keys() {
            if let CacheKey::RecipeCategories { .. } = key {
                if let Some(found) = self
                    .store
                    .get(&key)
                    .and_then(|e| e.value.into_recipe_categories())
                    .and_then(|list| list.into_iter().find(|rc| rc.id == id))
                {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Insert or replace a record by id inside a cached collection. Shapes
/// that do not match are left alone.
fn apply_upsert(value: &mut CachedValue, record: &EntityRecord) {
    match (value, record) {
        (CachedValue::Recipes(list), EntityRecord::Recipe(r)) => {
            upsert_by_id(list, r.clone(), |x| x.id)
        }
        (CachedValue::Recipe(slot), EntityRecord::Recipe(r)) => *slot = r.clone(),
        (CachedValue::Ingredients(list), EntityRecord::Ingredient(i)) => {
            upsert_by_id(list, i.clone(), |x| x.id)
        }
        (CachedValue::Categories(list), EntityRecord::Category(c)) => {
            upsert_by_id(list, c.clone(), |x| x.id)
        }
        (CachedValue::RecipeIngredients(list), EntityRecord::RecipeIngredient(ri)) => {
            upsert_by_id(list, ri.clone(), |x| x.id)
        }
        (CachedValue::RecipeCategories(list), EntityRecord::RecipeCategory(rc)) => {
            upsert_by_id(list, rc.clone(), |x| x.id)
        }
        (_, record) => debug!(kind = %record.kind(), "upsert skipped: shape mismatch"),
    }
}

/// Remove a record by id from a cached collection.
fn apply_remove(value: &mut CachedValue, kind: EntityKind, id: i64) {
    match (value, kind) {
        (CachedValue::Recipes(list), EntityKind::Recipe) => list.retain(|r| r.id != id),
        (CachedValue::Ingredients(list), EntityKind::Ingredient) => list.retain(|i| i.id != id),
        (CachedValue::Categories(list), EntityKind::Category) => list.retain(|c| c.id != id),
        (CachedValue::RecipeIngredients(list), EntityKind::RecipeIngredient) => {
            list.retain(|ri| ri.id != id)
        }
        (CachedValue::RecipeCategories(list), EntityKind::RecipeCategory) => {
            list.retain(|rc| rc.id != id)
        }
        (_, kind) => debug!(%kind, "remove skipped: shape mismatch"),
    }
}

fn upsert_by_id<T>(list: &mut Vec<T>, item: T, id_of: impl Fn(&T) -> i64) {
    let id = id_of(&item);
    match list.iter_mut().find(|existing| id_of(existing) == id) {
        Some(existing) => *existing = item,
        None => list.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(id: i64, name: &str) -> Ingredient {
        Ingredient {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_upsert_replaces_matching_id() {
        let mut list = vec![ingredient(1, "salt"), ingredient(2, "pepper")];
        upsert_by_id(&mut list, ingredient(2, "black pepper"), |i| i.id);
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].name, "black pepper");
    }

    #[test]
    fn test_upsert_appends_new_id() {
        let mut list = vec![ingredient(1, "salt")];
        upsert_by_id(&mut list, ingredient(2, "pepper"), |i| i.id);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_apply_remove_ignores_shape_mismatch() {
        let mut value = CachedValue::Ingredients(vec![ingredient(1, "salt")]);
        apply_remove(&mut value, EntityKind::Recipe, 1);
        assert_eq!(value.as_ingredients().map(|l| l.len()), Some(1));

        apply_remove(&mut value, EntityKind::Ingredient, 1);
        assert_eq!(value.as_ingredients().map(|l| l.len()), Some(0));
    }
}
