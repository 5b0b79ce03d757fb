//! Static dependency map from a mutated entity to the cache keys it
//! affects.
//!
//! The client has no foreign-key engine of its own, so every cross-kind
//! relationship is spelled out here explicitly:
//!
//! | mutated kind     | affected keys                             |
//! |------------------|-------------------------------------------|
//! | Recipe           | `recipes-all`, `recipe:{id}`              |
//! | Ingredient       | `ingredients-all`                         |
//! | RecipeIngredient | `recipe-ingredients-by-recipe:{recipeId}` |
//! | Category         | `categories-all`                          |
//! | RecipeCategory   | `recipe-categories-by-recipe:{recipeId}`  |
//!
//! Deleting a recipe additionally purges both of its association keys,
//! and any mutation that can change category membership invalidates the
//! category-scoped recipe lists (their membership requires a server-side
//! join and cannot be patched locally).

use crate::models::{EntityKind, EntityRecord};

use super::key::CacheKey;

/// Canonical keys holding this record. Mutation results are patched into
/// these in place, since the confirmed row is fully known locally.
pub fn canonical_keys(record: &EntityRecord) -> Vec<CacheKey> {
    match record {
        EntityRecord::Recipe(r) => vec![CacheKey::Recipes, CacheKey::Recipe(r.id)],
        EntityRecord::Ingredient(_) => vec![CacheKey::Ingredients],
        EntityRecord::RecipeIngredient(ri) => vec![CacheKey::RecipeIngredients {
            recipe_id: ri.recipe_id,
        }],
        EntityRecord::Category(_) => vec![CacheKey::Categories],
        EntityRecord::RecipeCategory(rc) => vec![CacheKey::RecipeCategories {
            recipe_id: rc.recipe_id,
        }],
    }
}

/// Cross-kind cascade on recipe delete. The recipe's associations are
/// orphaned server-side the moment it goes away; the client purges their
/// keys so no view can surface them.
pub fn recipe_delete_cascade(recipe_id: i64) -> Vec<CacheKey> {
    vec![
        CacheKey::RecipeIngredients { recipe_id },
        CacheKey::RecipeCategories { recipe_id },
    ]
}

/// Cascade keys for deleting any record. Only recipes cascade.
pub fn delete_cascade(record: &EntityRecord) -> Vec<CacheKey> {
    match record {
        EntityRecord::Recipe(r) => recipe_delete_cascade(r.id),
        _ => Vec::new(),
    }
}

/// Whether mutating this kind can change membership of a category-scoped
/// recipe list.
pub fn touches_category_scoped(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Recipe | EntityKind::RecipeCategory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::{Recipe, RecipeCategory, RecipeIngredient};

    fn recipe(id: i64) -> Recipe {
        Recipe {
            id,
            title: "Stock".to_string(),
            description: None,
            prep_time: 10,
            cook_time: 120,
            total_time: 130,
            servings: 4,
            instructions: "Simmer bones.".to_string(),
            url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_recipe_canonical_keys() {
        let keys = canonical_keys(&EntityRecord::Recipe(recipe(7)));
        assert_eq!(keys, vec![CacheKey::Recipes, CacheKey::Recipe(7)]);
    }

    #[test]
    fn test_association_keys_are_recipe_scoped() {
        let keys = canonical_keys(&EntityRecord::RecipeIngredient(RecipeIngredient {
            id: 1,
            recipe_id: 42,
            ingredient_id: 5,
            quantity: 1.0,
            unit: "tsp".to_string(),
            details: None,
        }));
        assert_eq!(keys, vec![CacheKey::RecipeIngredients { recipe_id: 42 }]);

        let keys = canonical_keys(&EntityRecord::RecipeCategory(RecipeCategory {
            id: 1,
            recipe_id: 42,
            category_id: 3,
        }));
        assert_eq!(keys, vec![CacheKey::RecipeCategories { recipe_id: 42 }]);
    }

    #[test]
    fn test_recipe_delete_cascades_to_both_association_keys() {
        let keys = delete_cascade(&EntityRecord::Recipe(recipe(7)));
        assert_eq!(
            keys,
            vec![
                CacheKey::RecipeIngredients { recipe_id: 7 },
                CacheKey::RecipeCategories { recipe_id: 7 },
            ]
        );
    }

    #[test]
    fn test_only_membership_changing_kinds_touch_category_lists() {
        assert!(touches_category_scoped(EntityKind::Recipe));
        assert!(touches_category_scoped(EntityKind::RecipeCategory));
        assert!(!touches_category_scoped(EntityKind::Ingredient));
        assert!(!touches_category_scoped(EntityKind::RecipeIngredient));
        assert!(!touches_category_scoped(EntityKind::Category));
    }
}
