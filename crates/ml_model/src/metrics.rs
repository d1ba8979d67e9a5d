//! Regression metrics on the evaluation split.

use aqi_structs::EvaluationMetrics;

/// Mean absolute error, root mean squared error and R² of `predicted`
/// against `actual`.
///
/// R² follows the usual convention for a constant target: 1 for a perfect
/// fit and 0 otherwise.
#[must_use]
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> EvaluationMetrics {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return EvaluationMetrics {
            mae: f64::NAN,
            rmse: f64::NAN,
            r2: f64::NAN,
        };
    }
    let count = n as f64;

    let pairs = || actual.iter().zip(predicted).take(n);

    let mae = pairs().map(|(a, p)| (a - p).abs()).sum::<f64>() / count;
    let ss_res = pairs().map(|(a, p)| (a - p).powi(2)).sum::<f64>();
    let rmse = (ss_res / count).sqrt();

    let mean = actual.iter().take(n).sum::<f64>() / count;
    let ss_tot = actual.iter().take(n).map(|a| (a - mean).powi(2)).sum::<f64>();

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    EvaluationMetrics { mae, rmse, r2 }
}
