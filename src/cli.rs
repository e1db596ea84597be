//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{
    AuthCommands, CacheCommands, Cli, Commands, PrefsCommands, RecipeCommands, StepsCommands,
    ThemeArg,
};
pub use presentation::{
    format_cache_info, format_consent, format_recipe_outcome, format_steps, format_theme,
    format_tracked_recipes,
};
pub use route::RunContext;
