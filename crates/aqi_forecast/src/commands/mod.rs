//! CLI command implementations.

pub mod features;
pub mod fetch;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod predict;
pub mod serve;
pub mod train;
