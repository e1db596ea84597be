//! Configuration System
//!
//! Layered client configuration: built-in defaults, the user-level file, the
//! workspace files and finally `FOODSNAP__SECTION__KEY` environment variables.

use crate::error::ClientError;
use crate::logging::LoggingConfig;
use crate::pipeline::RefreshPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Where persisted records live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pending image slot limits
    #[serde(default)]
    pub image_cache: ImageCacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Headers attached to every request
    #[serde(default = "default_headers")]
    pub default_headers: HashMap<String, String>,

    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    120
}

fn default_headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            refresh_path: default_refresh_path(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            default_headers: default_headers(),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

pub(crate) fn default_storage_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "foodsnap")
        .map(|dirs| dirs.data_dir().join("storage"))
        .unwrap_or_else(|| PathBuf::from(".foodsnap/storage"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    /// Capacity of the single slot, metadata included
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: u64,

    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u64,

    /// Multiplier applied to the original size to estimate the encoded record
    #[serde(default = "default_overhead_factor")]
    pub size_overhead_factor: f64,
}

fn default_capacity_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_expiry_hours() -> u64 {
    24
}

fn default_overhead_factor() -> f64 {
    1.4
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: default_capacity_bytes(),
            expiry_hours: default_expiry_hours(),
            size_overhead_factor: default_overhead_factor(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Api(String),
    Storage(String),
    ImageCache(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Api(msg) => write!(f, "api: {}", msg),
            ValidationError::Storage(msg) => write!(f, "storage: {}", msg),
            ValidationError::ImageCache(msg) => write!(f, "image_cache: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "base_url must start with http:// or https:// (got '{}')",
                self.base_url
            ));
        }
        if !self.refresh_path.starts_with('/') {
            return Err("refresh_path must start with '/'".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

impl ImageCacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity_bytes == 0 {
            return Err("capacity_bytes must be positive".to_string());
        }
        if self.expiry_hours == 0 {
            return Err("expiry_hours must be positive".to_string());
        }
        if !(self.size_overhead_factor.is_finite() && self.size_overhead_factor >= 1.0) {
            return Err("size_overhead_factor must be a finite number >= 1.0".to_string());
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.api.validate() {
            errors.push(ValidationError::Api(e));
        }
        if self.storage.path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("path cannot be empty".to_string()));
        }
        if let Err(e) = self.image_cache.validate() {
            errors.push(ValidationError::ImageCache(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one error
    pub fn validated(self) -> Result<Self, ClientError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ClientError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}
