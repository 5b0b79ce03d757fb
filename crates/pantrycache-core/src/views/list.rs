//! List views: filter, sort, paginate.
//!
//! Everything here is a pure function from a snapshot to a projection.
//! Sorting is stable and deterministic; descending order is the reversed
//! comparator, not a reversed list, so toggling
//! ascending-descending-ascending restores the original order.

use std::collections::{HashMap, HashSet};

use crate::models::{normalize_name, Ingredient, Recipe, RecipeIngredient};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

/// Fixed page size for every paginated list.
pub const PAGE_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Case-insensitive substring filter plus lexicographic sort on a display
/// field.
pub fn filter_and_sort<'a, T>(
    items: &'a [T],
    query: &str,
    field: impl Fn(&T) -> &str,
    direction: SortDirection,
) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    let mut rows: Vec<&T> = items
        .iter()
        .filter(|item| needle.is_empty() || contains_ignore_case(field(item), &needle))
        .collect();
    rows.sort_by(|a, b| direction.apply(cmp_ignore_case(field(a), field(b))));
    rows
}

/// The recipe list is always title-ascending.
pub fn recipe_list<'a>(recipes: &'a [Recipe], query: &str) -> Vec<&'a Recipe> {
    filter_and_sort(recipes, query, |r| r.title.as_str(), SortDirection::Ascending)
}

/// Number of pages for a row count.
pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// One page of rows. Pages are 1-based; an out-of-range page is empty.
pub fn page_slice<'a, T>(rows: &[&'a T], page: usize) -> Vec<&'a T> {
    if page == 0 {
        return Vec::new();
    }
    rows.iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .copied()
        .collect()
}

/// One element of the rendered page-number row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Page(usize),
    /// Collapsed run of omitted pages; activating it jumps three pages
    /// past the current one in the run's direction.
    Ellipsis { jump_to: usize },
}

/// Page-number sequence with ellipsis collapse: always the first and last
/// page and the current page plus/minus one. A gap of a single page shows
/// the page itself; longer gaps collapse into one ellipsis control.
pub fn page_controls(current: usize, total: usize) -> Vec<PageControl> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let visible = |p: usize| p == 1 || p == total || p.abs_diff(current) <= 1;

    let mut controls = Vec::new();
    let mut p = 1;
    while p <= total {
        if visible(p) {
            controls.push(PageControl::Page(p));
            p += 1;
            continue;
        }
        let mut end = p;
        while end + 1 <= total && !visible(end + 1) {
            end += 1;
        }
        if end == p {
            // Hiding a single page behind an ellipsis saves nothing.
            controls.push(PageControl::Page(p));
        } else {
            let jump_to = if end < current {
                current.saturating_sub(3).max(1)
            } else {
                (current + 3).min(total)
            };
            controls.push(PageControl::Ellipsis { jump_to });
        }
        p = end + 1;
    }
    controls
}

/// Membership search: recipes that contain an ingredient whose normalized
/// name equals the query. `associations` is keyed by recipe id.
pub fn recipes_with_ingredient<'a>(
    recipes: &'a [Recipe],
    associations: &HashMap<i64, Vec<RecipeIngredient>>,
    ingredients: &[Ingredient],
    name: &str,
) -> Vec<&'a Recipe> {
    let needle = normalize_name(name);
    let matching: HashSet<i64> = ingredients
        .iter()
        .filter(|i| normalize_name(&i.name) == needle)
        .map(|i| i.id)
        .collect();
    if matching.is_empty() {
        return Vec::new();
    }

    recipes
        .iter()
        .filter(|recipe| {
            associations
                .get(&recipe.id)
                .is_some_and(|list| list.iter().any(|ri| matching.contains(&ri.ingredient_id)))
        })
        .collect()
}
