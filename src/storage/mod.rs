//! Origin-scoped Key-Value Storage
//!
//! Every persisted record in the client (image cache slot, step progress,
//! authenticated flag, preferences) lives under its own key in one shared
//! store. Writers follow last-writer-wins; other handles opened on the same
//! database observe changes through [`StorageWatcher`].

pub mod persistence;
pub mod watch;

pub use persistence::Storage;
pub use watch::{StorageEvent, StorageEventKind, StorageWatcher};

/// Key holding the single pending-image slot
pub const IMAGE_CACHE_KEY: &str = "foodsnap_cached_image";

/// Key holding the persisted "was authenticated" flag
pub const AUTH_FLAG_KEY: &str = "auth";

/// Key prefix for per-recipe step progress records
pub const RECIPE_PROGRESS_PREFIX: &str = "recipe-progress-";

pub const THEME_KEY: &str = "theme";

pub const COOKIE_CONSENT_KEY: &str = "cookie-consent";

/// Key holding the `Set-Cookie` headers of the current session (refresh cookie)
pub const SESSION_COOKIES_KEY: &str = "session-cookies";

/// Storage key for one recipe's step progress
pub fn recipe_progress_key(recipe_id: u64) -> String {
    format!("{RECIPE_PROGRESS_PREFIX}{recipe_id}")
}
