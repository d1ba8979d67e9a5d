//! Chronological evaluation of every model family and best-model selection.

use aqi_structs::{
    EvaluationMetrics, FeatureRef, FeatureRow, Metric, ModelCard, ModelFamily, SERVED_MODEL_NAME,
};
use chrono::{DateTime, Utc};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::dataset::{self, StandardScaler};
use crate::forest::{ForestParams, RandomForest};
use crate::linear::{LinearRegressor, RidgeParams};
use crate::metrics::evaluate;
use crate::{FittedModel, TrainedModel, TrainingError};

/// Configuration for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Share of rows (chronologically first) used for training.
    pub train_ratio: f64,
    /// Minimum rows in each split.
    pub min_rows_per_split: usize,
    /// Families to fit, in tie-break priority order.
    pub families: Vec<ModelFamily>,
    /// Metric used to pick the served model.
    pub selection_metric: Metric,
    /// Metric values closer than this are treated as equal.
    pub tie_epsilon: f64,
    pub ridge: RidgeParams,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            min_rows_per_split: 2,
            families: ModelFamily::DEFAULT.to_vec(),
            selection_metric: Metric::default(),
            tie_epsilon: 1e-9,
            ridge: RidgeParams::default(),
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl TrainerConfig {
    fn validate(&self) -> Result<(), TrainingError> {
        if self.families.is_empty() {
            return Err(TrainingError::NoFamilies);
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "train_ratio must be between 0 and 1, got {}",
                self.train_ratio
            )));
        }
        if !(self.tie_epsilon >= 0.0 && self.tie_epsilon.is_finite()) {
            return Err(TrainingError::InvalidConfig(format!(
                "tie_epsilon must be a non-negative number, got {}",
                self.tie_epsilon
            )));
        }
        Ok(())
    }
}

/// One fitted family and its evaluation-split metrics.
#[derive(Debug, Clone)]
pub struct FamilyResult {
    pub family: ModelFamily,
    pub metrics: EvaluationMetrics,
    pub model: TrainedModel,
}

/// Outcome of [`train_and_select`].
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Feature group version the models were trained on.
    pub features: FeatureRef,
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub eval_rows: usize,
    /// First evaluation timestamp.
    pub eval_start: i64,
    /// Last evaluation timestamp.
    pub eval_end: i64,
    pub selection_metric: Metric,
    /// Results in `families` order.
    pub results: Vec<FamilyResult>,
    /// Index of the selected result.
    pub best: usize,
}

impl TrainingReport {
    /// The selected model.
    #[must_use]
    pub fn best(&self) -> Option<&FamilyResult> {
        self.results.get(self.best)
    }

    /// Card describing `result` under the registry name `name`.
    ///
    /// The version is assigned by the registry.
    #[must_use]
    pub fn card(&self, result: &FamilyResult, name: &str) -> ModelCard {
        ModelCard {
            name: name.to_string(),
            version: 0,
            family: result.family,
            description: format!(
                "{} regressor predicting calculated_aqi, evaluated on the latest {} rows",
                result.family, self.eval_rows
            ),
            metrics: result.metrics,
            features: self.features.clone(),
            feature_names: result.model.feature_names.clone(),
            train_rows: self.train_rows,
            eval_rows: self.eval_rows,
            eval_start: self.eval_start,
            eval_end: self.eval_end,
            selection_metric: self.selection_metric,
            run_id: self.run_id,
            trained_at: self.trained_at,
        }
    }

    /// Every family under its own name, then the selected model as the served model.
    #[must_use]
    pub fn registrations(&self) -> Vec<(ModelCard, TrainedModel)> {
        let mut entries: Vec<(ModelCard, TrainedModel)> = self
            .results
            .iter()
            .map(|r| (self.card(r, &r.family.registry_name()), r.model.clone()))
            .collect();

        if let Some(best) = self.best() {
            entries.push((self.card(best, SERVED_MODEL_NAME), best.model.clone()));
        }
        entries
    }
}

/// Fits every configured family on the chronologically first rows, evaluates
/// on the remainder and selects the best by `config.selection_metric`.
///
/// # Errors
///
/// - [`TrainingError::Empty`] when `rows` is empty.
/// - [`TrainingError::InsufficientRows`] when a split is below `min_rows_per_split`.
/// - [`TrainingError::Degenerate`] when a family yields non-finite predictions.
pub fn train_and_select(
    rows: Vec<FeatureRow>,
    features: FeatureRef,
    config: &TrainerConfig,
) -> Result<TrainingReport, TrainingError> {
    config.validate()?;

    if rows.is_empty() {
        return Err(TrainingError::Empty);
    }
    if let Some(row) = rows.iter().find(|r| !r.is_complete()) {
        return Err(TrainingError::IncompleteRow {
            timestamp: row.timestamp,
        });
    }

    let split = dataset::chronological_split(rows, config.train_ratio);
    let (train_rows, eval_rows) = (split.train.len(), split.eval.len());
    if train_rows < config.min_rows_per_split || eval_rows < config.min_rows_per_split {
        return Err(TrainingError::InsufficientRows {
            train: train_rows,
            eval: eval_rows,
            min: config.min_rows_per_split,
        });
    }

    let x_train_raw = dataset::feature_matrix(&split.train);
    let scaler = StandardScaler::fit(&x_train_raw);
    let x_train = scaler.transform(&x_train_raw);
    let y_train = dataset::targets(&split.train);
    let x_eval = scaler.transform(&dataset::feature_matrix(&split.eval));
    let y_eval = dataset::targets(&split.eval);

    info!(
        train_rows,
        eval_rows,
        families = config.families.len(),
        "Training model families"
    );

    let mut results = Vec::with_capacity(config.families.len());
    for &family in &config.families {
        let fitted = fit_family(family, &x_train, &y_train, config)?;

        let predictions: Vec<f64> = x_eval
            .axis_iter(Axis(0))
            .map(|row| fitted.predict(row))
            .collect();
        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(TrainingError::Degenerate {
                family,
                reason: "non-finite prediction on the evaluation split".to_string(),
            });
        }

        let metrics = evaluate(&y_eval, &predictions);
        info!(
            %family,
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "Evaluated model"
        );

        results.push(FamilyResult {
            family,
            metrics,
            model: TrainedModel::new(scaler.clone(), fitted),
        });
    }

    let best = select_best(&results, config.selection_metric, config.tie_epsilon)?;
    let winner = &results[best];
    info!(
        family = %winner.family,
        metric = %config.selection_metric,
        value = config.selection_metric.value(&winner.metrics),
        "Selected best model"
    );

    let first_eval = split.eval.first().map_or(0, |r| r.timestamp);
    let last_eval = split.eval.last().map_or(0, |r| r.timestamp);

    Ok(TrainingReport {
        features,
        run_id: Uuid::new_v4(),
        trained_at: Utc::now(),
        train_rows,
        eval_rows,
        eval_start: first_eval,
        eval_end: last_eval,
        selection_metric: config.selection_metric,
        results,
        best,
    })
}

fn fit_family(
    family: ModelFamily,
    x: &ndarray::Array2<f64>,
    y: &[f64],
    config: &TrainerConfig,
) -> Result<FittedModel, TrainingError> {
    let fitted = match family {
        ModelFamily::Ridge => FittedModel::Ridge(
            LinearRegressor::fit(x, y, &config.ridge)
                .map_err(|reason| TrainingError::Degenerate { family, reason })?,
        ),
        ModelFamily::RandomForest => {
            FittedModel::RandomForest(RandomForest::fit(x, y, &config.forest))
        }
        ModelFamily::GradientBoosting => {
            FittedModel::GradientBoosting(GradientBoosting::fit(x, y, &config.boosting))
        }
    };
    Ok(fitted)
}

/// Index of the best result; within `epsilon` the earlier result wins.
///
/// Results with a non-finite metric are skipped.
fn select_best(
    results: &[FamilyResult],
    metric: Metric,
    epsilon: f64,
) -> Result<usize, TrainingError> {
    let mut best: Option<(usize, f64)> = None;

    for (index, result) in results.iter().enumerate() {
        let value = metric.value(&result.metrics);
        if !value.is_finite() {
            warn!(family = %result.family, %metric, "Skipping model with non-finite metric");
            continue;
        }
        let better = match best {
            None => true,
            Some((_, current)) if metric.lower_is_better() => value < current - epsilon,
            Some((_, current)) => value > current + epsilon,
        };
        if better {
            best = Some((index, value));
        }
    }

    best.map(|(index, _)| index)
        .ok_or(TrainingError::NoFiniteMetric { metric })
}
