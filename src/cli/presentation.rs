//! CLI presentation: plain-text formatters per command family.

use crate::cache::CachedImageInfo;
use crate::clock::rfc3339_millis;
use crate::preferences::{CookieConsent, Theme};
use crate::recipes::RecipeOutcome;
use crate::steps::RecipeSteps;
use crate::types::RecipeId;

pub fn format_cache_info(info: Option<&CachedImageInfo>, age_hours: Option<f64>) -> String {
    let Some(info) = info else {
        return "No cached image.".to_string();
    };
    let mut s = format!(
        "Cached image:\n  File: {}\n  Type: {}\n  Size: {} bytes\n  Cached at: {}",
        info.filename,
        info.mime_type,
        info.size_bytes,
        rfc3339_millis(info.timestamp)
    );
    if let Some(age) = age_hours {
        s.push_str(&format!("\n  Age: {:.1} h", age));
    }
    s
}

pub fn format_steps(steps: &RecipeSteps) -> String {
    let summary = steps.summary();
    let recipe = steps.recipe();
    let title = if recipe.name.is_empty() {
        format!("Recipe {}", recipe.id)
    } else {
        format!("{} (recipe {})", recipe.name, recipe.id)
    };
    let mut lines = vec![format!(
        "{}: {}/{} steps done ({}%)",
        title, summary.completed, summary.total, summary.percent
    )];
    if steps.is_stale() {
        lines.push("  note: recipe text changed since progress was saved".to_string());
    }
    for step in steps.steps() {
        let mark = if step.completed { "x" } else { " " };
        lines.push(format!("  [{}] {}. {}", mark, step.id, step.text));
    }
    if summary.is_complete {
        lines.push("All steps complete.".to_string());
    }
    lines.join("\n")
}

pub fn format_tracked_recipes(ids: &[RecipeId]) -> String {
    if ids.is_empty() {
        return "No saved step progress.".to_string();
    }
    let mut lines = vec!["Recipes with saved progress:".to_string()];
    lines.extend(ids.iter().map(|id| format!("  - {}", id)));
    lines.join("\n")
}

pub fn format_theme(theme: Option<Theme>) -> String {
    match theme {
        Some(theme) => format!("Theme: {}", theme),
        None => format!("Theme: {} (default)", Theme::default()),
    }
}

pub fn format_consent(consent: Option<&CookieConsent>) -> String {
    match consent {
        Some(c) => format!(
            "Cookie consent recorded at {}\n  Analytics: {}",
            c.timestamp,
            if c.preferences.analytics { "allowed" } else { "denied" }
        ),
        None => "No cookie consent recorded.".to_string(),
    }
}

pub fn format_recipe_outcome(outcome: &RecipeOutcome) -> String {
    match outcome {
        RecipeOutcome::Recipe(recipe) => {
            let mut s = format!("{}\n", recipe.dish_name);
            if !recipe.ingredients.is_empty() {
                s.push_str("\nIngredients:\n");
                for ingredient in &recipe.ingredients {
                    s.push_str(&format!("  - {}\n", ingredient));
                }
            }
            s.push_str("\nSteps:\n");
            for step in crate::steps::parse_steps(&recipe.recipe) {
                s.push_str(&format!("  {}. {}\n", step.id, step.text));
            }
            s.trim_end().to_string()
        }
        RecipeOutcome::NotFood { description } => {
            format!("Not food: {}", description)
        }
    }
}
