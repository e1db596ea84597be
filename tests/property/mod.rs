//! Property-based tests for cache and step progress guarantees

mod cache_properties;
mod step_properties;
