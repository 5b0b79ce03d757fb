//! Recipe detail view: a recipe joined with its ingredient and category
//! associations.
//!
//! Pure functions over store snapshots. Nothing here mutates cached data;
//! every projection is built from clones.

use std::collections::HashMap;

use crate::models::{Category, Ingredient, Recipe, RecipeCategory, RecipeIngredient};
use crate::utils::{cmp_ignore_case, format_quantity};

/// One ingredient row ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientLine {
    pub association: RecipeIngredient,
    /// Resolved ingredient name; `None` if the vocabulary entry is not in
    /// the snapshot.
    pub ingredient_name: Option<String>,
}

impl IngredientLine {
    /// "2 cup flour (sifted)"
    pub fn summary(&self) -> String {
        let name = self.ingredient_name.as_deref().unwrap_or("unknown");
        let mut line = format!(
            "{} {} {}",
            format_quantity(self.association.quantity),
            self.association.unit,
            name
        );
        if let Some(ref details) = self.association.details {
            line.push_str(&format!(" ({})", details));
        }
        line
    }
}

/// A recipe with its joined associations, ingredients split into two
/// near-equal display columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub left_column: Vec<IngredientLine>,
    pub right_column: Vec<IngredientLine>,
    /// Sorted lexicographically by name.
    pub categories: Vec<Category>,
}

/// Assemble the detail view for one recipe.
///
/// Ingredient associations are ordered by association id ascending (the
/// order they were added to the recipe), then split at the midpoint.
pub fn recipe_detail(
    recipe: &Recipe,
    associations: &[RecipeIngredient],
    ingredients: &[Ingredient],
    memberships: &[RecipeCategory],
    categories: &[Category],
) -> RecipeDetail {
    let names: HashMap<i64, &str> = ingredients
        .iter()
        .map(|i| (i.id, i.name.as_str()))
        .collect();

    let mut lines: Vec<IngredientLine> = associations
        .iter()
        .map(|association| IngredientLine {
            association: association.clone(),
            ingredient_name: names
                .get(&association.ingredient_id)
                .map(|name| name.to_string()),
        })
        .collect();
    lines.sort_by_key(|line| line.association.id);

    let (left_column, right_column) = split_columns(&lines);

    let by_id: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let mut joined: Vec<Category> = memberships
        .iter()
        .filter_map(|m| by_id.get(&m.category_id).map(|c| (*c).clone()))
        .collect();
    joined.sort_by(|a, b| cmp_ignore_case(&a.category_name, &b.category_name));

    RecipeDetail {
        recipe: recipe.clone(),
        left_column,
        right_column,
        categories: joined,
    }
}

/// Split rows into two display columns, left getting the extra row for an
/// odd count.
pub fn split_columns<T: Clone>(rows: &[T]) -> (Vec<T>, Vec<T>) {
    let mid = rows.len().div_ceil(2);
    (rows[..mid].to_vec(), rows[mid..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn recipe() -> Recipe {
        Recipe {
            id: 1,
            title: "Focaccia".to_string(),
            description: None,
            prep_time: 30,
            cook_time: 25,
            total_time: 55,
            servings: 8,
            instructions: "Mix, proof, dimple, bake.".to_string(),
            url: None,
            created_at: Utc::now(),
        }
    }

    fn association(id: i64, ingredient_id: i64) -> RecipeIngredient {
        RecipeIngredient {
            id,
            recipe_id: 1,
            ingredient_id,
            quantity: 1.0,
            unit: "cup".to_string(),
            details: None,
        }
    }

    #[test]
    fn test_seven_rows_split_four_three() {
        let rows: Vec<i64> = (1..=7).collect();
        let (left, right) = split_columns(&rows);
        assert_eq!(left, vec![1, 2, 3, 4]);
        assert_eq!(right, vec![5, 6, 7]);
    }

    #[test]
    fn test_small_splits() {
        let (left, right) = split_columns::<i64>(&[]);
        assert!(left.is_empty() && right.is_empty());

        let (left, right) = split_columns(&[1]);
        assert_eq!((left.len(), right.len()), (1, 0));

        let (left, right) = split_columns(&[1, 2]);
        assert_eq!((left.len(), right.len()), (1, 1));
    }

    #[test]
    fn test_lines_ordered_by_association_id() {
        let associations = vec![association(9, 1), association(2, 2), association(5, 3)];
        let detail = recipe_detail(&recipe(), &associations, &[], &[], &[]);
        let ids: Vec<i64> = detail
            .left_column
            .iter()
            .chain(&detail.right_column)
            .map(|line| line.association.id)
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_categories_joined_and_sorted_by_name() {
        let categories = vec![
            Category { id: 1, category_name: "soup".to_string() },
            Category { id: 2, category_name: "Bread".to_string() },
            Category { id: 3, category_name: "dinner".to_string() },
        ];
        let memberships = vec![
            RecipeCategory { id: 10, recipe_id: 1, category_id: 2 },
            RecipeCategory { id: 11, recipe_id: 1, category_id: 1 },
            // Membership pointing at a category missing from the snapshot
            // is skipped, not surfaced.
            RecipeCategory { id: 12, recipe_id: 1, category_id: 99 },
        ];

        let detail = recipe_detail(&recipe(), &[], &[], &memberships, &categories);
        let names: Vec<&str> = detail
            .categories
            .iter()
            .map(|c| c.category_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bread", "soup"]);
    }

    #[test]
    fn test_line_summary() {
        let ingredients = vec![Ingredient { id: 4, name: "flour".to_string() }];
        let mut assoc = association(1, 4);
        assoc.quantity = 2.0;
        assoc.details = Some("sifted".to_string());

        let detail = recipe_detail(&recipe(), &[assoc], &ingredients, &[], &[]);
        assert_eq!(detail.left_column[0].summary(), "2 cup flour (sifted)");
    }
}
