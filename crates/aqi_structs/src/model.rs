use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Regression model families the trainer can fit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModelFamily {
    Ridge,
    RandomForest,
    GradientBoosting,
}

impl ModelFamily {
    /// Default families, in tie-break priority order.
    pub const DEFAULT: [Self; 3] = [Self::RandomForest, Self::GradientBoosting, Self::Ridge];

    /// Registry name under which this family's artifact is stored.
    #[must_use]
    pub fn registry_name(self) -> String {
        format!("{}_{self}", crate::SERVED_MODEL_NAME)
    }
}

/// Evaluation metric used to compare fitted models.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Metric {
    /// Mean absolute error.
    #[default]
    Mae,
    /// Root mean squared error.
    Rmse,
    /// Coefficient of determination.
    R2,
}

impl Metric {
    #[must_use]
    pub const fn lower_is_better(self) -> bool {
        !matches!(self, Self::R2)
    }

    #[must_use]
    pub const fn value(self, metrics: &EvaluationMetrics) -> f64 {
        match self {
            Self::Mae => metrics.mae,
            Self::Rmse => metrics.rmse,
            Self::R2 => metrics.r2,
        }
    }
}

/// Metrics computed on the evaluation split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Reference to one version of a feature group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    pub group: String,
    pub version: u32,
}

impl FeatureRef {
    #[must_use]
    pub fn new(group: impl Into<String>, version: u32) -> Self {
        Self {
            group: group.into(),
            version,
        }
    }
}

impl core::fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@v{}", self.group, self.version)
    }
}

/// Metadata describing a registered model.
///
/// `version` is assigned by the registry on registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub name: String,
    pub version: u32,
    pub family: ModelFamily,
    pub description: String,
    pub metrics: EvaluationMetrics,
    /// The feature-store version this model was trained on.
    pub features: FeatureRef,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub eval_rows: usize,
    /// First and last timestamp of the evaluation split.
    pub eval_start: i64,
    pub eval_end: i64,
    /// Metric the served model was selected by.
    pub selection_metric: Metric,
    /// Identifier shared by all models registered in one training run.
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
}
