//! CART regression tree with squared-error splits.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Growth limits for a regression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth, unlimited when `None`.
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs to be split.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grows a tree on the rows of `x` listed in `samples`.
    ///
    /// Duplicate sample indices are allowed (bootstrap). The squared-error
    /// reduction of every split is added to `importances[feature]`.
    #[must_use]
    pub fn fit(
        x: &Array2<f64>,
        y: &[f64],
        samples: Vec<usize>,
        params: &TreeParams,
        importances: &mut [f64],
    ) -> Self {
        let mut nodes = vec![Node::Leaf {
            value: mean(y, &samples),
        }];
        let mut pending = vec![(0, samples, 0)];

        while let Some((node, samples, depth)) = pending.pop() {
            let depth_ok = params.max_depth.is_none_or(|max| depth < max);
            if !depth_ok || samples.len() < params.min_samples_split.max(2) {
                continue;
            }

            let Some(split) = best_split(x, y, &samples, params.min_samples_leaf.max(1)) else {
                continue;
            };

            if let Some(slot) = importances.get_mut(split.feature) {
                *slot += split.gain;
            }

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            let left = nodes.len();
            nodes.push(Node::Leaf {
                value: mean(y, &left_samples),
            });
            let right = nodes.len();
            nodes.push(Node::Leaf {
                value: mean(y, &right_samples),
            });

            if let Some(slot) = nodes.get_mut(node) {
                *slot = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
            }

            pending.push((left, left_samples, depth + 1));
            pending.push((right, right_samples, depth + 1));
        }

        Self { nodes }
    }

    /// Predicts the target for one feature vector.
    #[must_use]
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    index = if value <= *threshold { *left } else { *right };
                }
                None => return f64::NAN,
            }
        }
    }

    /// Number of nodes, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf; a single leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0, 0)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(index) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }
}

fn mean(y: &[f64], samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64
}

/// Finds the split with the largest squared-error reduction.
///
/// Candidate thresholds are midpoints between consecutive distinct values.
/// Earlier features win ties.
fn best_split(
    x: &Array2<f64>,
    y: &[f64],
    samples: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = samples.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total * total / n as f64;

    // Pure nodes are leaves.
    if parent_sse <= f64::EPSILON * total_sq.max(1.0) {
        return None;
    }

    let mut best: Option<SplitCandidate> = None;
    let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in 0..x.ncols() {
        sorted.clear();
        sorted.extend(samples.iter().map(|&i| (x[[i, feature]], y[i])));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for k in 1..n {
            let (prev_value, prev_y) = sorted[k - 1];
            let value = sorted[k].0;
            left_sum += prev_y;

            if k < min_samples_leaf || n - k < min_samples_leaf || prev_value >= value {
                continue;
            }

            let right_sum = total - left_sum;
            let proxy = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
            let gain = proxy - total * total / n as f64;

            if gain > 0.0 && best.as_ref().is_none_or(|b| gain > b.gain) {
                let mut threshold = prev_value + (value - prev_value) / 2.0;
                if threshold >= value {
                    threshold = prev_value;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

/// Scales `values` to sum to 1, leaving all-zero input untouched.
pub(crate) fn normalize(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        for v in values {
            *v /= sum;
        }
    }
}
