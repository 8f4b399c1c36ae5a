//! Cross-entropy over softmax class probabilities.

use ndarray::{Array2, ArrayView1};

/// Negative log-likelihood of the true class, averaged over the batch.
///
/// `probs` are softmax outputs, `[batch, classes]`. Returns the loss and
/// the gradient with respect to the pre-softmax logits,
/// `(probs - onehot) / batch`.
pub fn nll_loss(probs: &Array2<f32>, labels: ArrayView1<u8>) -> (f32, Array2<f32>) {
    let batch = probs.nrows();
    debug_assert_eq!(batch, labels.len());

    let mut total = 0.0f32;
    let mut dlogits = probs.clone();
    let scale = 1.0 / batch as f32;

    for (row, &label) in labels.iter().enumerate() {
        let label = label as usize;
        total -= probs[[row, label]].ln();
        dlogits[[row, label]] -= 1.0;
    }
    dlogits.mapv_inplace(|v| v * scale);

    (total * scale, dlogits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_prediction_has_near_zero_loss() {
        let probs = array![[0.999f32, 0.001], [0.001, 0.999]];
        let labels = array![0u8, 1];
        let (loss, _) = nll_loss(&probs, labels.view());
        assert!(loss < 0.01);
    }

    #[test]
    fn uniform_prediction_loss_is_ln_classes() {
        let probs = array![[0.5f32, 0.5], [0.5, 0.5]];
        let labels = array![0u8, 1];
        let (loss, _) = nll_loss(&probs, labels.view());
        assert!((loss - 2.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn gradient_is_probs_minus_onehot_over_batch() {
        let probs = array![[0.7f32, 0.3], [0.4, 0.6]];
        let labels = array![0u8, 1];
        let (_, grad) = nll_loss(&probs, labels.view());

        assert!((grad[[0, 0]] - (0.7 - 1.0) / 2.0).abs() < 1e-6);
        assert!((grad[[0, 1]] - 0.3 / 2.0).abs() < 1e-6);
        assert!((grad[[1, 0]] - 0.4 / 2.0).abs() < 1e-6);
        assert!((grad[[1, 1]] - (0.6 - 1.0) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let probs = array![[0.2f32, 0.8], [0.9, 0.1]];
        let labels = array![1u8, 0];
        let (_, grad) = nll_loss(&probs, labels.view());
        for row in grad.rows() {
            assert!(row.sum().abs() < 1e-6);
        }
    }
}
