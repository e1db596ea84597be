//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("api.base_url", "http://localhost:8000")?
        .set_default("api.refresh_path", "/auth/refresh")?
        .set_default("api.refresh_policy", "per_request")?
        .set_default("image_cache.capacity_bytes", 4 * 1024 * 1024)?
        .set_default("image_cache.expiry_hours", 24)?
        .set_default("image_cache.size_overhead_factor", 1.4)
}
