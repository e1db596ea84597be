//! Foodsnap: client-side persistence and resilience layer
//!
//! Keeps a signed-out user's pending photo across restarts, tracks which
//! recipe steps they have finished, and wraps backend calls so an expired
//! credential is refreshed once before the call is replayed.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod compress;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod preferences;
pub mod recipes;
pub mod steps;
pub mod storage;
pub mod types;

pub use auth::{AuthService, AuthState, Credential, TokenStore};
pub use cache::{CachePresence, CachedImageInfo, ImageCache, LoadedImage, PreviewHandle};
pub use error::{ClientError, PipelineError, StorageError};
pub use pipeline::{RefreshPolicy, RequestPipeline};
pub use steps::{RecipeSteps, StepProgressStore, StepRecord};
pub use types::ImageFile;
