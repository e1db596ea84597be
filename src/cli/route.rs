//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::{AuthService, TokenStore};
use crate::cache::{CachePolicy, ImageCache};
use crate::cli::parse::{
    AuthCommands, CacheCommands, Commands, PrefsCommands, RecipeCommands, StepsCommands, ThemeArg,
};
use crate::cli::presentation::{
    format_cache_info, format_consent, format_recipe_outcome, format_steps, format_theme,
    format_tracked_recipes,
};
use crate::clock::{system_clock, SharedClock};
use crate::compress::{prepare_upload, JpegCompressor};
use crate::config::{ClientConfig, ConfigLoader};
use crate::error::{ClientError, StorageError};
use crate::pipeline::RequestPipeline;
use crate::preferences::{CookiePreferences, PreferenceStore, Theme};
use crate::recipes::{RecipeClient, RecipeOutcome};
use crate::steps::{RecipeRef, RecipeSteps, StepProgressStore};
use crate::storage::Storage;
use crate::types::ImageFile;

/// Runtime context for CLI execution: config, storage and the stores built on it.
pub struct RunContext {
    config: ClientConfig,
    storage: Storage,
    cache: ImageCache,
    steps: StepProgressStore,
    preferences: PreferenceStore,
}

impl RunContext {
    /// Load config (explicit file or workspace layers) and open storage
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ClientError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        }
        .validated()?;

        let storage_path = resolve_storage_path(&workspace_root, &config.storage.path);
        std::fs::create_dir_all(&storage_path).map_err(StorageError::IoError)?;
        let storage = Storage::open(&storage_path)?;
        debug!(path = %storage_path.display(), "Storage opened");

        Ok(Self::with_storage(config, storage, system_clock()))
    }

    /// Build a context over an already opened store
    pub fn with_storage(config: ClientConfig, storage: Storage, clock: SharedClock) -> Self {
        let cache = ImageCache::new(
            storage.clone(),
            clock.clone(),
            CachePolicy::from(&config.image_cache),
        );
        let steps = StepProgressStore::new(storage.clone(), clock.clone());
        let preferences = PreferenceStore::new(storage.clone(), clock);
        Self {
            config,
            storage,
            cache,
            steps,
            preferences,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Startup notice for a session interrupted with a photo still pending.
    ///
    /// Commands that already deal with the cache or recipes get no notice.
    pub fn resume_hint(&self, command: &Commands) -> Option<String> {
        if matches!(command, Commands::Cache { .. } | Commands::Recipe { .. }) {
            return None;
        }
        let info = self.cache.info()?;
        let age = self.cache.cache_age_hours().unwrap_or_default();
        Some(format!(
            "A photo ({}) from {:.1}h ago is waiting; run `foodsnap recipe generate` to turn it into a recipe.",
            info.filename, age
        ))
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ClientError> {
        let result = match command {
            Commands::Cache { command } => self.handle_cache(command),
            Commands::Steps { command } => self.handle_steps(command),
            Commands::Prefs { command } => self.handle_prefs(command),
            Commands::Auth { command } => self.handle_auth(command),
            Commands::Recipe { command } => self.handle_recipe(command),
        };
        if let Err(e) = self.storage.flush() {
            tracing::warn!(error = %e, "Failed to flush storage");
        }
        result
    }

    fn handle_cache(&self, command: &CacheCommands) -> Result<String, ClientError> {
        match command {
            CacheCommands::Put { path, no_compress } => {
                let original = ImageFile::from_path(path).map_err(StorageError::IoError)?;
                let file = if *no_compress {
                    original
                } else {
                    prepare_upload(&JpegCompressor::default(), &original)
                };
                if self.cache.store(&file) {
                    Ok(format!(
                        "Cached {} ({} bytes{})",
                        file.name,
                        file.size(),
                        if file.compressed { ", compressed" } else { "" }
                    ))
                } else {
                    Ok(format!(
                        "Not enough space to cache {} ({} bytes, {} available)",
                        file.name,
                        file.size(),
                        self.cache.available_space()
                    ))
                }
            }
            CacheCommands::Info => Ok(format_cache_info(
                self.cache.info().as_ref(),
                self.cache.cache_age_hours(),
            )),
            CacheCommands::Load { out } => {
                let loaded = self.cache.load().ok_or(ClientError::NothingCached)?;
                std::fs::write(out, &loaded.file.bytes).map_err(StorageError::IoError)?;
                self.cache.release_preview(loaded.preview);
                Ok(format!(
                    "Restored {} to {}",
                    loaded.file.name,
                    out.display()
                ))
            }
            CacheCommands::Clear => {
                self.cache.clear();
                Ok("Image cache cleared.".to_string())
            }
        }
    }

    fn handle_steps(&self, command: &StepsCommands) -> Result<String, ClientError> {
        match command {
            StepsCommands::Show {
                recipe_id,
                text_file,
                name,
            } => {
                let steps = self.open_steps(*recipe_id, name, text_file)?;
                Ok(format_steps(&steps))
            }
            StepsCommands::Toggle {
                recipe_id,
                step_id,
                text_file,
                name,
            } => {
                let mut steps = self.open_steps(*recipe_id, name, text_file)?;
                if !steps.toggle(*step_id) {
                    return Ok(format!(
                        "Recipe {} has no step {} ({} steps)",
                        recipe_id,
                        step_id,
                        steps.steps().len()
                    ));
                }
                Ok(format_steps(&steps))
            }
            StepsCommands::Reset { recipe_id } => {
                if self.steps.reset(*recipe_id)? {
                    Ok(format!("Progress for recipe {} reset.", recipe_id))
                } else {
                    Ok(format!("Recipe {} had no saved progress.", recipe_id))
                }
            }
            StepsCommands::List => Ok(format_tracked_recipes(&self.steps.tracked_recipes()?)),
        }
    }

    fn open_steps(
        &self,
        recipe_id: u64,
        name: &str,
        text_file: &Path,
    ) -> Result<RecipeSteps, ClientError> {
        let text = std::fs::read_to_string(text_file).map_err(StorageError::IoError)?;
        let name = if name.is_empty() {
            self.steps
                .record(recipe_id)
                .map(|r| r.recipe_name)
                .unwrap_or_default()
        } else {
            name.to_string()
        };
        Ok(RecipeSteps::open(
            &self.steps,
            RecipeRef::new(recipe_id, name),
            &text,
        ))
    }

    fn handle_prefs(&self, command: &PrefsCommands) -> Result<String, ClientError> {
        match command {
            PrefsCommands::Theme { value } => {
                match value {
                    None => {}
                    Some(ThemeArg::Toggle) => {
                        self.preferences.toggle_theme()?;
                    }
                    Some(ThemeArg::Light) => self.preferences.set_theme(Theme::Light)?,
                    Some(ThemeArg::Dark) => self.preferences.set_theme(Theme::Dark)?,
                }
                Ok(format_theme(self.preferences.theme()))
            }
            PrefsCommands::Consent { analytics, revoke } => {
                if *revoke {
                    self.preferences.revoke_consent()?;
                } else if let Some(analytics) = analytics {
                    self.preferences.update_consent(CookiePreferences {
                        analytics: *analytics,
                    })?;
                }
                Ok(format_consent(self.preferences.consent().as_ref()))
            }
        }
    }

    fn handle_auth(&self, command: &AuthCommands) -> Result<String, ClientError> {
        let tokens = Arc::new(TokenStore::new(self.storage.clone()));
        match command {
            AuthCommands::Status => Ok(if tokens.was_authenticated() {
                "Previous session found; it will be restored through a refresh.".to_string()
            } else {
                "Signed out.".to_string()
            }),
            AuthCommands::Restore => {
                let service = AuthService::new(self.pipeline(tokens)?);
                let restored = block_on(service.initialize_session())?;
                Ok(if restored {
                    "Session restored.".to_string()
                } else {
                    "Signed out.".to_string()
                })
            }
            AuthCommands::Logout => {
                let service = AuthService::new(self.pipeline(tokens)?);
                block_on(service.sign_out())??;
                Ok("Signed out.".to_string())
            }
        }
    }

    fn handle_recipe(&self, command: &RecipeCommands) -> Result<String, ClientError> {
        match command {
            RecipeCommands::Generate {
                image,
                location,
                username,
                password,
                save,
            } => {
                let tokens = Arc::new(TokenStore::new(self.storage.clone()));
                let pipeline = self.pipeline(tokens)?;
                let auth = AuthService::new(Arc::clone(&pipeline));
                let recipes = RecipeClient::new(pipeline);
                let location = location.as_deref();

                block_on(async {
                    let profile = auth.sign_in(username, password).await?;
                    info!(username = %profile.username, "Generating recipe");

                    let (file, outcome) = match image {
                        Some(path) => {
                            let original =
                                ImageFile::from_path(path).map_err(StorageError::IoError)?;
                            let file = prepare_upload(&JpegCompressor::default(), &original);
                            let outcome = recipes.generate(&file, location).await?;
                            (file, outcome)
                        }
                        None => {
                            let generated =
                                recipes.generate_from_cache(&self.cache, location).await?;
                            (generated.file, generated.outcome)
                        }
                    };

                    let mut out = format_recipe_outcome(&outcome);
                    if let (true, RecipeOutcome::Recipe(recipe)) = (*save, &outcome) {
                        let id = recipes.save(&file, recipe).await?;
                        out.push_str(&format!("\n\nSaved as recipe {}", id));
                    }
                    Ok::<_, ClientError>(out)
                })?
            }
        }
    }

    fn pipeline(&self, tokens: Arc<TokenStore>) -> Result<Arc<RequestPipeline>, ClientError> {
        Ok(Arc::new(RequestPipeline::from_config(&self.config.api, tokens)?))
    }
}

fn resolve_storage_path(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, ClientError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ClientError::ConfigError(format!("Failed to start async runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}
