use aqi_structs::{Metric, ModelFamily};
use thiserror::Error;

/// Errors raised while fitting and selecting models.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("feature set is empty")]
    Empty,

    #[error(
        "not enough rows: {train} training and {eval} evaluation rows, at least {min} needed in each"
    )]
    InsufficientRows { train: usize, eval: usize, min: usize },

    #[error("{family} model is degenerate: {reason}")]
    Degenerate { family: ModelFamily, reason: String },

    #[error("feature row at {timestamp} has missing or non-finite values")]
    IncompleteRow { timestamp: i64 },

    #[error("no model produced a finite {metric}")]
    NoFiniteMetric { metric: Metric },

    #[error("no model families configured")]
    NoFamilies,

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),
}
