//! AQI regression models.
//!
//! Three model families are fitted on the same chronologically split,
//! standardised feature set: ridge regression (trained with Burn), a random
//! forest and gradient boosted trees (both on `ndarray`). The family with the
//! best evaluation metric becomes the served model. Every fitted model is a
//! plain serde value, so inference needs no Burn backend.

mod boosting;
mod dataset;
mod error;
mod forest;
mod linear;
mod metrics;
mod training;
mod tree;

use aqi_structs::{FEATURE_NAMES, FeatureRow, ModelFamily};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

pub use boosting::{BoostingParams, GradientBoosting};
pub use dataset::{
    AqiBatch, AqiBatcher, AqiDataset, AqiDatasetItem, StandardScaler, chronological_split,
};
pub use error::TrainingError;
pub use forest::{ForestParams, RandomForest};
pub use linear::{LinearRegressor, RidgeModule, RidgeParams};
pub use metrics::evaluate;
pub use training::{FamilyResult, TrainerConfig, TrainingReport, train_and_select};
pub use tree::{RegressionTree, TreeParams};

/// A fitted model of one family, operating on scaled features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FittedModel {
    Ridge(LinearRegressor),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl FittedModel {
    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        match self {
            Self::Ridge(_) => ModelFamily::Ridge,
            Self::RandomForest(_) => ModelFamily::RandomForest,
            Self::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    /// Predicts from an already scaled feature vector.
    #[must_use]
    pub fn predict(&self, scaled: ArrayView1<'_, f64>) -> f64 {
        match self {
            Self::Ridge(m) => m.predict(scaled),
            Self::RandomForest(m) => m.predict(scaled),
            Self::GradientBoosting(m) => m.predict(scaled),
        }
    }

    /// Impurity-based importances; linear models have none.
    #[must_use]
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Self::Ridge(_) => None,
            Self::RandomForest(m) => Some(m.feature_importances()),
            Self::GradientBoosting(m) => Some(m.feature_importances()),
        }
    }
}

/// A registered model artifact: the scaler fitted on the training split
/// together with the fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub model: FittedModel,
}

impl TrainedModel {
    #[must_use]
    pub fn new(scaler: StandardScaler, model: FittedModel) -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(ToString::to_string).collect(),
            scaler,
            model,
        }
    }

    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        self.model.family()
    }

    /// Predicts the AQI for one feature row.
    #[must_use]
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let features = row.features();
        let scaled = self.scaler.transform_row(ArrayView1::from(&features[..]));
        self.model.predict(ArrayView1::from(&scaled[..]))
    }

    /// Feature importances paired with their names, highest first.
    #[must_use]
    pub fn ranked_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.model.feature_importances()?;
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(ranked)
    }
}

#[cfg(test)]
mod tests {
    use aqi_structs::{FeatureRef, ML_FEATURE_GROUP};

    use super::*;
    use crate::dataset::tests::hourly_rows;

    fn quick_config() -> TrainerConfig {
        TrainerConfig {
            forest: ForestParams {
                n_trees: 5,
                ..ForestParams::default()
            },
            boosting: BoostingParams {
                n_stages: 10,
                ..BoostingParams::default()
            },
            ridge: RidgeParams {
                epochs: 100,
                ..RidgeParams::default()
            },
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn test_trained_model_survives_serialization() {
        let rows = hourly_rows(12);
        let sample = rows[11].clone();
        let report =
            train_and_select(rows, FeatureRef::new(ML_FEATURE_GROUP, 1), &quick_config()).unwrap();

        for result in &report.results {
            let json = serde_json::to_string(&result.model).unwrap();
            let restored: TrainedModel = serde_json::from_str(&json).unwrap();

            assert_eq!(restored.family(), result.family);
            let before = result.model.predict(&sample);
            let after = restored.predict(&sample);
            assert!((before - after).abs() < 1e-9);
        }
    }

    #[test]
    fn test_importances_only_for_tree_families() {
        let report = train_and_select(
            hourly_rows(12),
            FeatureRef::new(ML_FEATURE_GROUP, 1),
            &quick_config(),
        )
        .unwrap();

        for result in &report.results {
            let ranked = result.model.ranked_importances();
            match result.family {
                ModelFamily::Ridge => assert!(ranked.is_none()),
                _ => {
                    let ranked = ranked.unwrap();
                    assert_eq!(ranked.len(), FEATURE_NAMES.len());
                    assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
                }
            }
        }
    }
}
