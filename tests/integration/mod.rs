//! Integration tests for the Foodsnap client persistence and resilience layer

mod recipe_flow;
mod request_pipeline;
mod step_progress;
pub mod test_utils;

pub use test_utils::with_xdg_env;
