//! Versioned in-memory entity store with subscribe/notify semantics.
//!
//! The store is the only shared mutable state in the cache engine. Every
//! write goes through `set`/`patch`/`invalidate`/`remove`; components never
//! reach into an entry directly. Each entry carries a monotonically
//! increasing version counter so a stale write (an optimistic update racing
//! a slow fetch, or the reverse) can be detected and dropped instead of
//! clobbering newer data.
//!
//! Subscribers are notified synchronously after every successful write, in
//! registration order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{
    normalize_name, Category, Ingredient, Recipe, RecipeCategory, RecipeIngredient,
};

use super::key::CacheKey;
use super::mutation::PendingWrite;

/// One cached collection or singleton.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Recipe(Recipe),
    Recipes(Vec<Recipe>),
    Ingredients(Vec<Ingredient>),
    Categories(Vec<Category>),
    RecipeIngredients(Vec<RecipeIngredient>),
    RecipeCategories(Vec<RecipeCategory>),
    /// Optimistic rows under a `CacheKey::Pending` key.
    Pending(Vec<PendingWrite>),
}

impl CachedValue {
    pub fn as_recipes(&self) -> Option<&[Recipe]> {
        match self {
            CachedValue::Recipes(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_ingredients(&self) -> Option<&[Ingredient]> {
        match self {
            CachedValue::Ingredients(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_categories(&self) -> Option<&[Category]> {
        match self {
            CachedValue::Categories(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_recipe_ingredients(&self) -> Option<&[RecipeIngredient]> {
        match self {
            CachedValue::RecipeIngredients(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_recipe_categories(&self) -> Option<&[RecipeCategory]> {
        match self {
            CachedValue::RecipeCategories(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_pending(&self) -> Option<&[PendingWrite]> {
        match self {
            CachedValue::Pending(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_recipe(self) -> Option<Recipe> {
        match self {
            CachedValue::Recipe(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn into_recipes(self) -> Option<Vec<Recipe>> {
        match self {
            CachedValue::Recipes(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_ingredients(self) -> Option<Vec<Ingredient>> {
        match self {
            CachedValue::Ingredients(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_categories(self) -> Option<Vec<Category>> {
        match self {
            CachedValue::Categories(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_recipe_ingredients(self) -> Option<Vec<RecipeIngredient>> {
        match self {
            CachedValue::RecipeIngredients(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_recipe_categories(self) -> Option<Vec<RecipeCategory>> {
        match self {
            CachedValue::RecipeCategories(list) => Some(list),
            _ => None,
        }
    }
}

/// A cached value plus its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub value: CachedValue,
    /// Monotonically increasing per key. Starts at 1.
    pub version: u64,
    pub fetched_at: DateTime<Utc>,
    /// Marked by `invalidate`. A stale entry still serves reads while a
    /// refetch is in flight.
    pub stale: bool,
}

impl CachedEntry {
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    /// Fresh entries are served without a remote call.
    pub fn is_fresh(&self, stale_after: Duration) -> bool {
        !self.stale && (Utc::now() - self.fetched_at) < stale_after
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Updated { key: CacheKey, version: u64 },
    Invalidated { key: CacheKey },
    Removed { key: CacheKey },
}

struct SubscriberSlot {
    id: u64,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

#[derive(Default)]
struct StoreInner {
    entries: HashMap<CacheKey, CachedEntry>,
    subscribers: HashMap<CacheKey, Vec<SubscriberSlot>>,
    next_subscriber_id: u64,
    /// Point-query indexes, rebuilt whenever the backing collection
    /// changes. Keyed by normalized name.
    ingredient_names: HashMap<String, i64>,
    category_names: HashMap<String, i64>,
}

/// The keyed, versioned entity store.
///
/// Construct one per session and share it via `Arc`; drop it when the
/// session ends. All operations are synchronous - the lock is never held
/// across an await point.
pub struct EntityStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A poisoned lock means a panic mid-write; the cache is best-effort,
        // keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the entry for a key, if cached.
    pub fn get(&self, key: &CacheKey) -> Option<CachedEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// All currently cached keys.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.lock().entries.keys().cloned().collect()
    }

    /// Unconditional write. Bumps the version, clears the stale flag, and
    /// notifies subscribers. Returns the new version.
    pub fn set(&self, key: &CacheKey, value: CachedValue) -> u64 {
        let mut inner = self.lock();
        let version = Self::write_entry(&mut inner, key, value);
        Self::reindex(&mut inner, key);
        Self::notify(
            &mut inner,
            key,
            StoreEvent::Updated {
                key: key.clone(),
                version,
            },
        );
        version
    }

    /// Versioned write used by fetch resolution. `expected` is the version
    /// observed when the fetch was issued (`None` for a miss). A mismatch
    /// means a newer write landed while the fetch was in flight; the write
    /// is dropped.
    pub fn set_if_version(
        &self,
        key: &CacheKey,
        value: CachedValue,
        expected: Option<u64>,
    ) -> bool {
        let mut inner = self.lock();
        let current = inner.entries.get(key).map(|e| e.version);
        if current != expected {
            debug!(key = %key, ?expected, ?current, "versioned set rejected");
            return false;
        }
        let version = Self::write_entry(&mut inner, key, value);
        Self::reindex(&mut inner, key);
        Self::notify(
            &mut inner,
            key,
            StoreEvent::Updated {
                key: key.clone(),
                version,
            },
        );
        true
    }

    /// In-place edit guarded by the caller's expected version. A mismatch
    /// is a logged no-op and subscribers are not notified.
    pub fn patch(
        &self,
        key: &CacheKey,
        expected: u64,
        updater: impl FnOnce(&mut CachedValue),
    ) -> bool {
        let mut inner = self.lock();
        let version = match inner.entries.get_mut(key) {
            Some(entry) if entry.version == expected => {
                updater(&mut entry.value);
                entry.version += 1;
                entry.version
            }
            Some(entry) => {
                debug!(key = %key, expected, current = entry.version, "patch rejected: stale version");
                return false;
            }
            None => {
                debug!(key = %key, expected, "patch rejected: no entry");
                return false;
            }
        };
        Self::reindex(&mut inner, key);
        Self::notify(
            &mut inner,
            key,
            StoreEvent::Updated {
                key: key.clone(),
                version,
            },
        );
        true
    }

    /// Mark an entry stale without removing it. The next `ensure` for the
    /// key triggers a refetch; until it lands, the stale value still serves.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut inner = self.lock();
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                debug!(key = %key, "invalidated");
                Self::notify(&mut inner, key, StoreEvent::Invalidated { key: key.clone() });
            }
            None => debug!(key = %key, "invalidate: nothing cached"),
        }
    }

    /// Invalidate every cached key matching a predicate. Used for key
    /// families whose membership only the server can compute.
    pub fn invalidate_matching(&self, pred: impl Fn(&CacheKey) -> bool) {
        let matching: Vec<CacheKey> = {
            let inner = self.lock();
            inner.entries.keys().filter(|k| pred(k)).cloned().collect()
        };
        for key in matching {
            self.invalidate(&key);
        }
    }

    /// Drop an entry entirely (purge). Returns whether anything was cached.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut inner = self.lock();
        if inner.entries.remove(key).is_some() {
            debug!(key = %key, "removed");
            Self::reindex(&mut inner, key);
            Self::notify(&mut inner, key, StoreEvent::Removed { key: key.clone() });
            true
        } else {
            false
        }
    }

    /// Register an observer for a key. Events arrive in registration order
    /// relative to other subscribers. Dropping the subscription
    /// unsubscribes.
    pub fn subscribe(&self, key: &CacheKey) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner
            .subscribers
            .entry(key.clone())
            .or_default()
            .push(SubscriberSlot { id, tx });
        Subscription {
            key: key.clone(),
            id,
            rx,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Point query: ingredient id by (normalized) name.
    pub fn ingredient_id_by_name(&self, name: &str) -> Option<i64> {
        self.lock().ingredient_names.get(&normalize_name(name)).copied()
    }

    /// Point query: category id by (normalized) name.
    pub fn category_id_by_name(&self, name: &str) -> Option<i64> {
        self.lock().category_names.get(&normalize_name(name)).copied()
    }

    fn write_entry(inner: &mut StoreInner, key: &CacheKey, value: CachedValue) -> u64 {
        let version = inner.entries.get(key).map(|e| e.version + 1).unwrap_or(1);
        inner.entries.insert(
            key.clone(),
            CachedEntry {
                value,
                version,
                fetched_at: Utc::now(),
                stale: false,
            },
        );
        version
    }

    /// Rebuild the name index backing lookup-by-name when its collection
    /// changes.
    fn reindex(inner: &mut StoreInner, key: &CacheKey) {
        match key {
            CacheKey::Ingredients => {
                let index = match inner.entries.get(key).map(|e| &e.value) {
                    Some(CachedValue::Ingredients(list)) => list
                        .iter()
                        .map(|i| (normalize_name(&i.name), i.id))
                        .collect(),
                    _ => HashMap::new(),
                };
                inner.ingredient_names = index;
            }
            CacheKey::Categories => {
                let index = match inner.entries.get(key).map(|e| &e.value) {
                    Some(CachedValue::Categories(list)) => list
                        .iter()
                        .map(|c| (normalize_name(&c.category_name), c.id))
                        .collect(),
                    _ => HashMap::new(),
                };
                inner.category_names = index;
            }
            _ => {}
        }
    }

    fn notify(inner: &mut StoreInner, key: &CacheKey, event: StoreEvent) {
        if let Some(slots) = inner.subscribers.get_mut(key) {
            // Prune subscribers whose receiver is gone.
            slots.retain(|slot| slot.tx.send(event.clone()).is_ok());
            if slots.is_empty() {
                inner.subscribers.remove(key);
            }
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for an observer of one cache key. Dropping it unsubscribes.
pub struct Subscription {
    key: CacheKey,
    id: u64,
    rx: mpsc::UnboundedReceiver<StoreEvent>,
    inner: Weak<Mutex<StoreInner>>,
}

impl Subscription {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Wait for the next event on this key.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.rx.recv().await
    }

    /// Non-blocking poll for a pending event.
    pub fn try_recv(&mut self) -> Option<StoreEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(slots) = inner.subscribers.get_mut(&self.key) {
                slots.retain(|slot| slot.id != self.id);
                if slots.is_empty() {
                    inner.subscribers.remove(&self.key);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

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
    fn test_set_bumps_version() {
        let store = EntityStore::new();
        let key = CacheKey::Ingredients;

        let v1 = store.set(&key, CachedValue::Ingredients(vec![ingredient(1, "salt")]));
        let v2 = store.set(&key, CachedValue::Ingredients(vec![ingredient(1, "salt")]));
        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
    }

    #[test]
    fn test_patch_version_guard_is_noop_and_silent() {
        let store = EntityStore::new();
        let key = CacheKey::Ingredients;
        store.set(&key, CachedValue::Ingredients(vec![ingredient(1, "salt")]));
        store.set(&key, CachedValue::Ingredients(vec![ingredient(1, "salt")]));

        let mut sub = store.subscribe(&key);

        // Expected version 1 is stale (current is 2): no-op, no event.
        let applied = store.patch(&key, 1, |value| {
            if let CachedValue::Ingredients(list) = value {
                list.push(ingredient(2, "pepper"));
            }
        });
        assert!(!applied);
        assert_eq!(sub.try_recv(), None);

        let entry = store.get(&key).expect("entry");
        assert_eq!(entry.version, 2);
        assert_eq!(entry.value.as_ingredients().map(|l| l.len()), Some(1));

        // Matching version applies and notifies.
        let applied = store.patch(&key, 2, |value| {
            if let CachedValue::Ingredients(list) = value {
                list.push(ingredient(2, "pepper"));
            }
        });
        assert!(applied);
        assert!(matches!(
            sub.try_recv(),
            Some(StoreEvent::Updated { version: 3, .. })
        ));
    }

    #[test]
    fn test_set_if_version_rejects_concurrent_write() {
        let store = EntityStore::new();
        let key = CacheKey::Recipes;
        store.set(&key, CachedValue::Recipes(Vec::new()));

        // A fetch that started against a cache miss must not clobber the
        // entry that appeared while it was in flight.
        assert!(!store.set_if_version(&key, CachedValue::Recipes(Vec::new()), None));
        // And one that observed version 1 applies cleanly.
        assert!(store.set_if_version(&key, CachedValue::Recipes(Vec::new()), Some(1)));
    }

    #[test]
    fn test_invalidate_keeps_value_and_notifies() {
        let store = EntityStore::new();
        let key = CacheKey::Ingredients;
        store.set(&key, CachedValue::Ingredients(vec![ingredient(1, "salt")]));
        let mut sub = store.subscribe(&key);

        store.invalidate(&key);

        let entry = store.get(&key).expect("entry survives invalidation");
        assert!(entry.stale);
        assert!(!entry.is_fresh(Duration::minutes(60)));
        assert_eq!(
            sub.try_recv(),
            Some(StoreEvent::Invalidated { key: key.clone() })
        );
    }

    #[test]
    fn test_dropped_subscription_stops_receiving() {
        let store = EntityStore::new();
        let key = CacheKey::Recipes;

        let first = store.subscribe(&key);
        let mut second = store.subscribe(&key);
        drop(first);

        store.set(&key, CachedValue::Recipes(Vec::new()));
        assert!(matches!(second.try_recv(), Some(StoreEvent::Updated { .. })));
        assert_eq!(second.try_recv(), None);
    }

    #[test]
    fn test_name_index_point_query() {
        let store = EntityStore::new();
        store.set(
            &CacheKey::Ingredients,
            CachedValue::Ingredients(vec![ingredient(3, "tomato"), ingredient(9, "olive oil")]),
        );

        assert_eq!(store.ingredient_id_by_name("Tomato"), Some(3));
        assert_eq!(store.ingredient_id_by_name(" OLIVE OIL "), Some(9));
        assert_eq!(store.ingredient_id_by_name("basil"), None);

        store.remove(&CacheKey::Ingredients);
        assert_eq!(store.ingredient_id_by_name("tomato"), None);
    }

    #[test]
    fn test_invalidate_matching_hits_key_family() {
        let store = EntityStore::new();
        store.set(
            &CacheKey::RecipesByCategory { category_id: 1 },
            CachedValue::Recipes(Vec::new()),
        );
        store.set(
            &CacheKey::RecipesByCategory { category_id: 2 },
            CachedValue::Recipes(Vec::new()),
        );
        store.set(&CacheKey::Recipes, CachedValue::Recipes(Vec::new()));

        store.invalidate_matching(CacheKey::is_category_scoped);

        assert!(store
            .get(&CacheKey::RecipesByCategory { category_id: 1 })
            .expect("entry")
            .stale);
        assert!(store
            .get(&CacheKey::RecipesByCategory { category_id: 2 })
            .expect("entry")
            .stale);
        assert!(!store.get(&CacheKey::Recipes).expect("entry").stale);
    }
}
