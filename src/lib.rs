pub mod batch;
pub mod catalog;
pub mod chart_data;
pub mod config;
pub mod constants;
pub mod coordinates;
pub mod env_state;
pub mod export;
pub mod footprint;
pub mod locator;
pub mod mast;
pub mod metadata;
pub mod normalizer;
pub mod resolver;
pub mod tesscope_errors;
pub mod validation;
mod worker_pool;
