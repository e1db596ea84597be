//! CLI parse: clap types for foodsnap. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Foodsnap CLI - inspect and drive the client-side session state
#[derive(Parser)]
#[command(name = "foodsnap")]
#[command(about = "Pending image cache, step progress and session tools for the Foodsnap client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (searched for config/)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pending image cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Per-recipe step progress
    Steps {
        #[command(subcommand)]
        command: StepsCommands,
    },
    /// Theme and cookie consent
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
    /// Session state
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate recipes from dish photos
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Put an image into the pending slot
    Put {
        /// Image file to cache
        path: PathBuf,
        /// Cache the original bytes without resizing
        #[arg(long)]
        no_compress: bool,
    },
    /// Show what is cached, without decoding it
    Info,
    /// Restore the cached image to a file
    Load {
        /// Destination file
        #[arg(long)]
        out: PathBuf,
    },
    /// Remove the cached image
    Clear,
}

#[derive(Subcommand)]
pub enum StepsCommands {
    /// Show a recipe's steps with completion marks
    Show {
        recipe_id: u64,
        /// File holding the recipe text, one step per line
        #[arg(long)]
        text_file: PathBuf,
        /// Recipe display name
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Flip one step's completion
    Toggle {
        recipe_id: u64,
        step_id: u32,
        #[arg(long)]
        text_file: PathBuf,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Drop all progress for a recipe
    Reset { recipe_id: u64 },
    /// List recipes that have saved progress
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

#[derive(Subcommand)]
pub enum PrefsCommands {
    /// Show or change the theme
    Theme {
        #[arg(value_enum)]
        value: Option<ThemeArg>,
    },
    /// Show, record or revoke cookie consent
    Consent {
        /// Record consent with analytics allowed or denied
        #[arg(long)]
        analytics: Option<bool>,
        /// Forget the recorded choice
        #[arg(long, conflicts_with = "analytics")]
        revoke: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Show whether a previous session left the authenticated flag
    Status,
    /// Try to restore the previous session through a refresh
    Restore,
    /// Sign out on the server and locally
    Logout,
}

#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Sign in and generate a recipe from an image (or the cached one)
    Generate {
        /// Image file; the cached image is used when omitted
        #[arg(long)]
        image: Option<PathBuf>,
        /// Optional location hint
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Save the generated recipe
        #[arg(long)]
        save: bool,
    },
}
