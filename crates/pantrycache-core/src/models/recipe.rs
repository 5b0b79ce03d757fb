//! Recipe domain model and mutation payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_minutes;

/// A recipe owned by the signed-in user.
///
/// `prep_time` and `cook_time` of zero mean "not specified" for display
/// purposes; `total_time` and `servings` are always meaningful. The server
/// assigns `id` and `created_at`; both are immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "prepTime")]
    pub prep_time: u32,
    #[serde(rename = "cookTime")]
    pub cook_time: u32,
    #[serde(rename = "totalTime")]
    pub total_time: u32,
    pub servings: u32,
    pub instructions: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Total time formatted for display, e.g. "1h 20m".
    pub fn display_total_time(&self) -> String {
        format_minutes(self.total_time)
    }

    /// Prep time for display, or `None` when unspecified (zero).
    pub fn display_prep_time(&self) -> Option<String> {
        (self.prep_time > 0).then(|| format_minutes(self.prep_time))
    }

    /// Cook time for display, or `None` when unspecified (zero).
    pub fn display_cook_time(&self) -> Option<String> {
        (self.cook_time > 0).then(|| format_minutes(self.cook_time))
    }
}

/// Payload for creating a recipe. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "prepTime")]
    pub prep_time: u32,
    #[serde(rename = "cookTime")]
    pub cook_time: u32,
    #[serde(rename = "totalTime")]
    pub total_time: u32,
    pub servings: u32,
    pub instructions: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl NewRecipe {
    /// Build the optimistic row rendered while the remote create is in
    /// flight. The placeholder id is negative and never reaches the server.
    pub fn preview(&self, placeholder_id: i64) -> Recipe {
        Recipe {
            id: placeholder_id,
            title: self.title.clone(),
            description: self.description.clone(),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            total_time: self.total_time,
            servings: self.servings,
            instructions: self.instructions.clone(),
            url: self.url.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Partial update for a recipe. `None` fields are left unchanged; an empty
/// string on an optional field clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecipePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "prepTime", default)]
    pub prep_time: Option<u32>,
    #[serde(rename = "cookTime", default)]
    pub cook_time: Option<u32>,
    #[serde(rename = "totalTime", default)]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RecipePatch {
    /// Merge this patch over an existing recipe.
    pub fn apply(&self, recipe: &mut Recipe) {
        if let Some(ref title) = self.title {
            recipe.title = title.clone();
        }
        if let Some(ref description) = self.description {
            recipe.description = non_empty(description);
        }
        if let Some(prep_time) = self.prep_time {
            recipe.prep_time = prep_time;
        }
        if let Some(cook_time) = self.cook_time {
            recipe.cook_time = cook_time;
        }
        if let Some(total_time) = self.total_time {
            recipe.total_time = total_time;
        }
        if let Some(servings) = self.servings {
            recipe.servings = servings;
        }
        if let Some(ref instructions) = self.instructions {
            recipe.instructions = instructions.clone();
        }
        if let Some(ref url) = self.url {
            recipe.url = non_empty(url);
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recipe {
        Recipe {
            id: 1,
            title: "Minestrone".to_string(),
            description: Some("Hearty vegetable soup".to_string()),
            prep_time: 20,
            cook_time: 60,
            total_time: 80,
            servings: 6,
            instructions: "Chop, simmer, serve.".to_string(),
            url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut recipe = sample();
        let patch = RecipePatch {
            title: Some("Winter Minestrone".to_string()),
            servings: Some(8),
            ..Default::default()
        };
        patch.apply(&mut recipe);

        assert_eq!(recipe.title, "Winter Minestrone");
        assert_eq!(recipe.servings, 8);
        assert_eq!(recipe.cook_time, 60);
        assert_eq!(recipe.description.as_deref(), Some("Hearty vegetable soup"));
    }

    #[test]
    fn test_patch_empty_string_clears_optional_field() {
        let mut recipe = sample();
        let patch = RecipePatch {
            description: Some(String::new()),
            ..Default::default()
        };
        patch.apply(&mut recipe);
        assert_eq!(recipe.description, None);
    }

    #[test]
    fn test_preview_uses_placeholder_id() {
        let draft = NewRecipe {
            title: "Toast".to_string(),
            description: None,
            prep_time: 0,
            cook_time: 5,
            total_time: 5,
            servings: 1,
            instructions: "Toast the bread.".to_string(),
            url: None,
        };
        let preview = draft.preview(-3);
        assert_eq!(preview.id, -3);
        assert_eq!(preview.title, "Toast");
        assert_eq!(preview.display_prep_time(), None);
    }
}
