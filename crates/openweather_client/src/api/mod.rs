//! OpenWeatherMap HTTP API.

pub mod client;
pub mod models;
pub mod source;
