//! Ridge regression fitted by gradient descent with Burn.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::data::dataset::Dataset;
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{AqiBatcher, AqiDataset};

type TrainBackend = Autodiff<NdArray>;

/// Ridge hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RidgeParams {
    /// L2 penalty on the weights, as in `||y - Xw||² + alpha * ||w||²`.
    pub alpha: f64,
    pub learning_rate: f64,
    pub epochs: usize,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            learning_rate: 0.05,
            epochs: 500,
        }
    }
}

/// Single linear layer mapping features to the target.
#[derive(Module, Debug)]
pub struct RidgeModule<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> RidgeModule<B> {
    pub fn new(device: &B::Device, n_features: usize) -> Self {
        Self {
            // Zero start keeps fits reproducible; the objective is convex.
            linear: LinearConfig::new(n_features, 1)
                .with_initializer(Initializer::Zeros)
                .init(device),
        }
    }

    /// Forward pass: `[batch, features]` to `[batch, 1]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(input)
    }
}

/// Inference-only linear model extracted from a trained [`RidgeModule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressor {
    /// Fits ridge regression on `x` against `y`.
    ///
    /// The target is standardised during training and the learned
    /// coefficients are mapped back, which leaves the ridge optimum
    /// unchanged. Returns a description of the failure if the weights
    /// cannot be read back from the trained module.
    pub fn fit(x: &Array2<f64>, y: &[f64], params: &RidgeParams) -> Result<Self, String> {
        let n = x.nrows();
        if n == 0 {
            return Err("no training rows".to_string());
        }

        let y_mean = y.iter().sum::<f64>() / n as f64;
        let y_var = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if y_var > 0.0 { y_var.sqrt() } else { 1.0 };
        let y_scaled: Vec<f64> = y.iter().map(|v| (v - y_mean) / y_std).collect();

        let device = NdArrayDevice::default();
        let mut model = RidgeModule::<TrainBackend>::new(&device, x.ncols());
        let final_loss = train(&mut model, &AqiDataset::new(x, &y_scaled), params, &device);

        let weights = tensor_values(model.linear.weight.val())?;
        let bias = match &model.linear.bias {
            Some(bias) => tensor_values(bias.val())?.first().copied().unwrap_or(0.0),
            None => 0.0,
        };

        debug!(final_loss, epochs = params.epochs, "Fitted ridge regression");

        Ok(Self {
            weights: weights.iter().map(|w| w * y_std).collect(),
            intercept: bias.mul_add(y_std, y_mean),
        })
    }

    #[must_use]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.weights
            .iter()
            .zip(row.iter())
            .fold(self.intercept, |acc, (w, v)| w.mul_add(*v, acc))
    }
}

/// Full-batch Adam on mean squared error plus the scaled L2 penalty.
fn train<B: AutodiffBackend>(
    model: &mut RidgeModule<B>,
    dataset: &AqiDataset,
    params: &RidgeParams,
    device: &B::Device,
) -> f32 {
    let items = (0..dataset.len()).filter_map(|i| dataset.get(i)).collect();
    let batch = AqiBatcher::<B>::new(device.clone()).batch(items);

    let mut optimizer = AdamConfig::new().init();
    let loss_fn = MseLoss::new();
    let penalty = params.alpha / dataset.len().max(1) as f64;
    let mut final_loss = f32::NAN;

    for epoch in 0..params.epochs {
        let predictions = model.forward(batch.inputs.clone());
        let mse = loss_fn.forward(predictions, batch.targets.clone(), Reduction::Mean);
        let weight = model.linear.weight.val();
        let loss = mse + (weight.clone() * weight).sum().mul_scalar(penalty);

        if epoch + 1 == params.epochs {
            final_loss = loss
                .clone()
                .into_data()
                .to_vec::<f32>()
                .ok()
                .and_then(|v| v.first().copied())
                .unwrap_or(f32::NAN);
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, model);
        *model = optimizer.step(params.learning_rate, model.clone(), grads);
    }

    final_loss
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f64>, String> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map(|values| values.into_iter().map(f64::from).collect())
        .map_err(|e| format!("failed to read weights: {e:?}"))
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    #[test]
    fn test_recovers_linear_relationship() {
        // y = 2 * x0 - x1 + 10 on standardised-looking inputs.
        let x = Array2::from_shape_fn((50, 2), |(i, j)| {
            let t = i as f64 / 10.0 - 2.5;
            if j == 0 { t } else { (t * 1.7).sin() }
        });
        let y: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|r| 2.0f64.mul_add(r[0], -r[1]) + 10.0)
            .collect();

        let params = RidgeParams {
            alpha: 0.0,
            epochs: 1500,
            ..RidgeParams::default()
        };
        let model = LinearRegressor::fit(&x, &y, &params).unwrap();

        assert!((model.weights[0] - 2.0).abs() < 0.1, "{model:?}");
        assert!((model.weights[1] + 1.0).abs() < 0.1, "{model:?}");
        assert!((model.intercept - 10.0).abs() < 0.1, "{model:?}");
        let prediction = model.predict(array![1.0, 0.0].view());
        assert!((prediction - 12.0).abs() < 0.2);
    }

    #[test]
    fn test_penalty_shrinks_weights() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64 / 5.0 - 2.0);
        let y: Vec<f64> = x.column(0).iter().map(|v| 3.0 * v).collect();

        let free = RidgeParams {
            alpha: 0.0,
            ..RidgeParams::default()
        };
        let penalised = RidgeParams {
            alpha: 20.0,
            ..RidgeParams::default()
        };

        let free = LinearRegressor::fit(&x, &y, &free).unwrap();
        let ridge = LinearRegressor::fit(&x, &y, &penalised).unwrap();

        assert!(ridge.weights[0].abs() < free.weights[0].abs());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(LinearRegressor::fit(&x, &[], &RidgeParams::default()).is_err());
    }
}
