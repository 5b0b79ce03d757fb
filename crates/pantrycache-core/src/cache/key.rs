//! Cache key space.
//!
//! Every cached collection or singleton is addressed by one of these keys.
//! The string forms (used in logs) mirror the key names the frontend sees:
//! `recipes-all`, `recipe:42`, `recipe-ingredients-by-recipe:42`, and so on.

use crate::models::EntityKind;

/// Address of one cached collection or singleton.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Every recipe the owner has.
    Recipes,
    /// One recipe by id.
    Recipe(i64),
    /// The full ingredient vocabulary.
    Ingredients,
    /// The full category list.
    Categories,
    /// Ingredient associations for one recipe.
    RecipeIngredients { recipe_id: i64 },
    /// Category memberships for one recipe.
    RecipeCategories { recipe_id: i64 },
    /// Recipes in one category, resolved by a server-side join.
    RecipesByCategory { category_id: i64 },
    /// Optimistic rows for in-flight mutations of a kind. Kept separate
    /// from the canonical keys so a skeleton row never pollutes the
    /// authoritative list.
    Pending(EntityKind),
}

impl CacheKey {
    /// Whether this key is a category-scoped recipe list.
    pub fn is_category_scoped(&self) -> bool {
        matches!(self, CacheKey::RecipesByCategory { .. })
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recipes => write!(f, "recipes-all"),
            CacheKey::Recipe(id) => write!(f, "recipe:{}", id),
            CacheKey::Ingredients => write!(f, "ingredients-all"),
            CacheKey::Categories => write!(f, "categories-all"),
            CacheKey::RecipeIngredients { recipe_id } => {
                write!(f, "recipe-ingredients-by-recipe:{}", recipe_id)
            }
            CacheKey::RecipeCategories { recipe_id } => {
                write!(f, "recipe-categories-by-recipe:{}", recipe_id)
            }
            CacheKey::RecipesByCategory { category_id } => {
                write!(f, "recipes-by-category:{}", category_id)
            }
            CacheKey::Pending(kind) => write!(f, "pending:{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(CacheKey::Recipes.to_string(), "recipes-all");
        assert_eq!(CacheKey::Recipe(42).to_string(), "recipe:42");
        assert_eq!(
            CacheKey::RecipeIngredients { recipe_id: 42 }.to_string(),
            "recipe-ingredients-by-recipe:42"
        );
        assert_eq!(
            CacheKey::RecipeCategories { recipe_id: 7 }.to_string(),
            "recipe-categories-by-recipe:7"
        );
        assert_eq!(
            CacheKey::Pending(EntityKind::Recipe).to_string(),
            "pending:recipe"
        );
    }
}
