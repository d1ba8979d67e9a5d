//! Design matrices, feature scaling and batching for Burn training.

use aqi_structs::{FEATURE_COUNT, FeatureRow};
use burn::prelude::*;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Chronological train/evaluation split of feature rows.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<FeatureRow>,
    pub eval: Vec<FeatureRow>,
}

/// Sorts rows by timestamp and splits them at `round(n * train_ratio)`.
///
/// The first rows train, the remainder evaluate, so the model is never
/// evaluated on data older than what it was trained on.
#[must_use]
pub fn chronological_split(mut rows: Vec<FeatureRow>, train_ratio: f64) -> Split {
    rows.sort_by_key(|r| r.timestamp);
    let n_train = ((rows.len() as f64) * train_ratio).round() as usize;
    let eval = rows.split_off(n_train.min(rows.len()));
    Split { train: rows, eval }
}

/// Feature matrix of shape `[rows, FEATURE_COUNT]`.
#[must_use]
pub fn feature_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    let mut matrix = Array2::zeros((rows.len(), FEATURE_COUNT));
    for (mut out, row) in matrix.axis_iter_mut(Axis(0)).zip(rows) {
        for (cell, value) in out.iter_mut().zip(row.features()) {
            *cell = value;
        }
    }
    matrix
}

/// Target vector (`calculated_aqi`).
#[must_use]
pub fn targets(rows: &[FeatureRow]) -> Vec<f64> {
    rows.iter().map(|r| r.calculated_aqi).collect()
}

/// Per-feature standardisation fitted on the training split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits column means and population standard deviations.
    ///
    /// Constant columns get a scale of 1 so they map to 0.
    #[must_use]
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());

        for column in x.axis_iter(Axis(1)) {
            let m = column.sum() / n;
            let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            mean.push(m);
            scale.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }

        Self { mean, scale }
    }

    /// Scales a matrix column by column.
    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            self.transform_in_place(row.iter_mut());
        }
        out
    }

    /// Scales a single feature vector.
    #[must_use]
    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut out = row.to_vec();
        self.transform_in_place(out.iter_mut());
        out
    }

    fn transform_in_place<'a>(&self, values: impl Iterator<Item = &'a mut f64>) {
        for ((value, mean), scale) in values.zip(&self.mean).zip(&self.scale) {
            *value = (*value - mean) / scale;
        }
    }
}

/// A single item in the AQI dataset.
#[derive(Debug, Clone)]
pub struct AqiDatasetItem {
    /// Scaled feature vector.
    pub features: Vec<f32>,
    /// Standardised target.
    pub target: f32,
}

/// In-memory dataset of scaled rows.
#[derive(Debug, Clone)]
pub struct AqiDataset {
    items: Vec<AqiDatasetItem>,
}

impl AqiDataset {
    /// Builds a dataset from a scaled matrix and matching targets.
    #[must_use]
    pub fn new(x: &Array2<f64>, y: &[f64]) -> Self {
        let items = x
            .axis_iter(Axis(0))
            .zip(y)
            .map(|(row, &target)| AqiDatasetItem {
                features: row.iter().map(|&v| v as f32).collect(),
                target: target as f32,
            })
            .collect();
        Self { items }
    }
}

impl burn::data::dataset::Dataset<AqiDatasetItem> for AqiDataset {
    fn get(&self, index: usize) -> Option<AqiDatasetItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A batch of training data.
#[derive(Debug, Clone)]
pub struct AqiBatch<B: Backend> {
    /// Input features tensor of shape `[batch_size, features]`.
    pub inputs: Tensor<B, 2>,
    /// Targets tensor of shape `[batch_size, 1]`.
    pub targets: Tensor<B, 2>,
}

/// Batcher for creating training batches.
#[derive(Debug, Clone)]
pub struct AqiBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> AqiBatcher<B> {
    #[must_use]
    pub const fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Creates a batch from a vector of items.
    pub fn batch(&self, items: Vec<AqiDatasetItem>) -> AqiBatch<B> {
        let batch_size = items.len();
        let width = items.first().map_or(0, |item| item.features.len());

        let mut features_data = Vec::with_capacity(batch_size * width);
        let mut targets_data = Vec::with_capacity(batch_size);

        for item in items {
            features_data.extend_from_slice(&item.features);
            targets_data.push(item.target);
        }

        let inputs = Tensor::<B, 1>::from_floats(features_data.as_slice(), &self.device)
            .reshape([batch_size, width]);

        let targets = Tensor::<B, 1>::from_floats(targets_data.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        AqiBatch { inputs, targets }
    }
}
