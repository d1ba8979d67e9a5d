//! Bagged ensemble of regression trees.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::{self, RegressionTree, TreeParams};

/// Random forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    /// Seed for bootstrap sampling.
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: TreeParams::default(),
            seed: 42,
        }
    }
}

/// Mean of fully grown trees, each fitted on a bootstrap sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fits the forest. Identical inputs and seed give an identical forest.
    #[must_use]
    pub fn fit(x: &Array2<f64>, y: &[f64], params: &ForestParams) -> Self {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut importances = vec![0.0; x.ncols()];
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let samples: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let mut tree_importances = vec![0.0; x.ncols()];
            let tree = RegressionTree::fit(x, y, samples, &params.tree, &mut tree_importances);

            tree::normalize(&mut tree_importances);
            for (total, value) in importances.iter_mut().zip(&tree_importances) {
                *total += value;
            }
            trees.push(tree);
        }

        tree::normalize(&mut importances);
        debug!(trees = trees.len(), rows = n, "Fitted random forest");

        Self { trees, importances }
    }

    /// Mean prediction over all trees.
    #[must_use]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normalised impurity-decrease importance per feature.
    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    fn linear_data() -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y = (0..40).map(|i| 3.0 * i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_forest_is_deterministic() {
        let (x, y) = linear_data();
        let params = ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        };

        let a = RandomForest::fit(&x, &y, &params);
        let b = RandomForest::fit(&x, &y, &params);

        assert_eq!(a, b);
    }

    #[test]
    fn test_forest_tracks_signal() {
        let (x, y) = linear_data();
        let params = ForestParams {
            n_trees: 20,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, &params);

        let low = forest.predict(array![5.0, 1.0].view());
        let high = forest.predict(array![35.0, 1.0].view());
        assert!(high > low);

        let importances = forest.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > 0.99);
    }
}
