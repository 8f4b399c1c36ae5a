//! Elementwise activations.

use ndarray::{Array, Array2, Axis, Dimension};

pub fn relu<D: Dimension>(x: &Array<f32, D>) -> Array<f32, D> {
    x.mapv(|v| v.max(0.0))
}

/// Gradient through ReLU, masked by the post-activation values.
pub fn relu_backward<D: Dimension>(
    grad: &Array<f32, D>,
    activated: &Array<f32, D>,
) -> Array<f32, D> {
    let mut out = grad.clone();
    out.zip_mut_with(activated, |g, &a| {
        if a <= 0.0 {
            *g = 0.0;
        }
    });
    out
}

/// Numerically stable per-row softmax over `[batch, classes]` logits.
pub fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

/// Index of the largest probability per row.
pub fn argmax_rows(probs: &Array2<f32>) -> Vec<usize> {
    probs
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0)
        })
        .collect()
}
