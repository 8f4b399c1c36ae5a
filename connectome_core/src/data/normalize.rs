//! Per-subject standardization.

use ndarray::Array2;

/// Center and scale every row to zero mean and unit variance using only
/// that row's own values (`ddof = 0`).
///
/// Normalization runs across a subject's features, not across subjects
/// within a feature. Partitions are standardized independently, each with
/// its own statistics.
///
/// Rows with zero variance are only centered.
pub fn standardize_rows(features: &mut Array2<f32>) {
    for mut row in features.rows_mut() {
        let n = row.len() as f32;
        if n == 0.0 {
            continue;
        }
        let mean = row.sum() / n;
        let variance = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        let std = variance.sqrt();

        if std > f32::EPSILON {
            row.mapv_inplace(|v| (v - mean) / std);
        } else {
            row.mapv_inplace(|v| v - mean);
        }
    }
}
