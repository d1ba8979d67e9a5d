//! Gradient boosted regression trees with squared-error loss.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::{self, RegressionTree, TreeParams};

/// Gradient boosting hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_stages: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_stages: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: Some(3),
                ..TreeParams::default()
            },
        }
    }
}

/// Additive model: the training mean plus shrunken residual trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
    importances: Vec<f64>,
}

impl GradientBoosting {
    #[must_use]
    pub fn fit(x: &Array2<f64>, y: &[f64], params: &BoostingParams) -> Self {
        let n = x.nrows();
        let init = if n == 0 {
            0.0
        } else {
            y.iter().sum::<f64>() / n as f64
        };

        let mut current = vec![init; n];
        let mut importances = vec![0.0; x.ncols()];
        let mut stages = Vec::with_capacity(params.n_stages);

        for _ in 0..params.n_stages {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, f)| t - f).collect();
            let stage = RegressionTree::fit(
                x,
                &residuals,
                (0..n).collect(),
                &params.tree,
                &mut importances,
            );

            for (value, row) in current.iter_mut().zip(x.axis_iter(Axis(0))) {
                *value += params.learning_rate * stage.predict(row);
            }
            stages.push(stage);
        }

        tree::normalize(&mut importances);
        debug!(stages = stages.len(), rows = n, "Fitted gradient boosting");

        Self {
            init,
            learning_rate: params.learning_rate,
            stages,
            importances,
        }
    }

    #[must_use]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.stages
            .iter()
            .fold(self.init, |acc, stage| self.learning_rate.mul_add(stage.predict(row), acc))
    }

    /// Normalised impurity-decrease importance per feature.
    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}
