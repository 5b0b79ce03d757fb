//! Entity kind and record enums spanning the five cached entity families.
//!
//! The cache engine is mostly typed per entity, but the pending-write
//! machinery and the invalidation graph operate over "any record" - these
//! enums are that common denominator.

use serde::{Deserialize, Serialize};

use super::{Category, Ingredient, Recipe, RecipeCategory, RecipeIngredient};

/// One of the five entity families the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum EntityKind {
    Recipe,
    Ingredient,
    RecipeIngredient,
    Category,
    RecipeCategory,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Recipe => "recipe",
            EntityKind::Ingredient => "ingredient",
            EntityKind::RecipeIngredient => "recipe-ingredient",
            EntityKind::Category => "category",
            EntityKind::RecipeCategory => "recipe-category",
        };
        write!(f, "{}", name)
    }
}

/// A single record of any entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum EntityRecord {
    Recipe(Recipe),
    Ingredient(Ingredient),
    RecipeIngredient(RecipeIngredient),
    Category(Category),
    RecipeCategory(RecipeCategory),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Recipe(_) => EntityKind::Recipe,
            EntityRecord::Ingredient(_) => EntityKind::Ingredient,
            EntityRecord::RecipeIngredient(_) => EntityKind::RecipeIngredient,
            EntityRecord::Category(_) => EntityKind::Category,
            EntityRecord::RecipeCategory(_) => EntityKind::RecipeCategory,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            EntityRecord::Recipe(r) => r.id,
            EntityRecord::Ingredient(i) => i.id,
            EntityRecord::RecipeIngredient(ri) => ri.id,
            EntityRecord::Category(c) => c.id,
            EntityRecord::RecipeCategory(rc) => rc.id,
        }
    }

    /// The parent recipe id for association records, `None` otherwise.
    pub fn recipe_id(&self) -> Option<i64> {
        match self {
            EntityRecord::RecipeIngredient(ri) => Some(ri.recipe_id),
            EntityRecord::RecipeCategory(rc) => Some(rc.recipe_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(EntityKind::Recipe.to_string(), "recipe");
        assert_eq!(EntityKind::RecipeIngredient.to_string(), "recipe-ingredient");
    }

    #[test]
    fn test_record_accessors() {
        let record = EntityRecord::RecipeIngredient(RecipeIngredient {
            id: 12,
            recipe_id: 7,
            ingredient_id: 3,
            quantity: 2.0,
            unit: "tbsp".to_string(),
            details: None,
        });
        assert_eq!(record.kind(), EntityKind::RecipeIngredient);
        assert_eq!(record.id(), 12);
        assert_eq!(record.recipe_id(), Some(7));
    }
}
