//! Derived read-only views over cached entities.
//!
//! The assembler never mutates store contents in place; every projection
//! is a fresh value built from a snapshot. View code composes these with
//! `CacheSession::ensure_*` and re-runs them on store notifications.
//!
//! - `detail`: recipe joined with ingredients (two balanced columns) and
//!   sorted categories
//! - `list`: filter + sort + paginate with ellipsis-collapsed page
//!   controls, and the ingredient membership search

pub mod detail;
pub mod list;

pub use detail::{recipe_detail, split_columns, IngredientLine, RecipeDetail};
pub use list::{
    filter_and_sort, page_controls, page_count, page_slice, recipe_list,
    recipes_with_ingredient, PageControl, SortDirection, PAGE_SIZE,
};
