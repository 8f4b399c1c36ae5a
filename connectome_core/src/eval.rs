//! Model evaluation: confusion-matrix metrics, ROC, and the Youden-optimal
//! decision threshold.

use std::io;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView3};
use plotters::prelude::*;
use serde::Serialize;

use crate::neural::activation::argmax_rows;
use crate::neural::ConnectomeNet;

/// Binary confusion counts, positive class = label 1.
///
/// Sensitivity and specificity come straight from these counts; nothing is
/// parsed out of formatted report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_pos: usize,
    pub true_neg: usize,
    pub false_pos: usize,
    pub false_neg: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: ArrayView1<u8>, predictions: &[usize]) -> Self {
        let mut matrix = Self {
            true_pos: 0,
            true_neg: 0,
            false_pos: 0,
            false_neg: 0,
        };
        for (&label, &pred) in labels.iter().zip(predictions.iter()) {
            match (label, pred) {
                (1, 1) => matrix.true_pos += 1,
                (0, 0) => matrix.true_neg += 1,
                (0, 1) => matrix.false_pos += 1,
                _ => matrix.false_neg += 1,
            }
        }
        matrix
    }

    pub fn accuracy(&self) -> f32 {
        let total = self.true_pos + self.true_neg + self.false_pos + self.false_neg;
        if total == 0 {
            return 0.0;
        }
        (self.true_pos + self.true_neg) as f32 / total as f32
    }

    /// True-positive rate.
    pub fn sensitivity(&self) -> f32 {
        let positives = self.true_pos + self.false_neg;
        if positives == 0 {
            return 0.0;
        }
        self.true_pos as f32 / positives as f32
    }

    /// True-negative rate.
    pub fn specificity(&self) -> f32 {
        let negatives = self.true_neg + self.false_pos;
        if negatives == 0 {
            return 0.0;
        }
        self.true_neg as f32 / negatives as f32
    }
}

/// ROC curve as parallel (fpr, tpr, threshold) series, threshold descending.
#[derive(Debug, Clone, Serialize)]
pub struct RocCurve {
    pub fpr: Vec<f32>,
    pub tpr: Vec<f32>,
    pub thresholds: Vec<f32>,
}

/// Sweep the positive-class scores as decision thresholds.
///
/// The curve starts at (0, 0) with a threshold just above the highest
/// score, then adds one point per distinct score, ending at (1, 1).
pub fn roc_curve(labels: ArrayView1<u8>, scores: &[f32]) -> RocCurve {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top = order.first().map(|&i| scores[i]).unwrap_or(0.0);
    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![top + 1.0];

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut idx = 0;
    while idx < order.len() {
        let threshold = scores[order[idx]];
        // Consume every subject tied at this score before emitting a point.
        while idx < order.len() && scores[order[idx]] == threshold {
            if labels[order[idx]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            idx += 1;
        }
        fpr.push(if negatives == 0 {
            0.0
        } else {
            fp as f32 / negatives as f32
        });
        tpr.push(if positives == 0 {
            0.0
        } else {
            tp as f32 / positives as f32
        });
        thresholds.push(threshold);
    }

    RocCurve {
        fpr,
        tpr,
        thresholds,
    }
}

/// Trapezoidal area under the ROC curve.
pub fn auc(roc: &RocCurve) -> f32 {
    let mut area = 0.0;
    for window in 0..roc.fpr.len().saturating_sub(1) {
        let width = roc.fpr[window + 1] - roc.fpr[window];
        let height = (roc.tpr[window + 1] + roc.tpr[window]) / 2.0;
        area += width * height;
    }
    area
}

/// Threshold maximizing the Youden index `(1 − FPR) + TPR − 1`.
///
/// Returns the threshold and its index on the curve; ties go to the first
/// (highest-threshold) maximum.
pub fn youden_threshold(roc: &RocCurve) -> (f32, usize) {
    let mut best_index = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (index, (&fpr, &tpr)) in roc.fpr.iter().zip(roc.tpr.iter()).enumerate() {
        let youden = (1.0 - fpr) + tpr - 1.0;
        if youden > best_value {
            best_value = youden;
            best_index = index;
        }
    }
    (roc.thresholds[best_index], best_index)
}

/// Summary metrics for one labeled partition.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub accuracy: f32,
    pub sensitivity: f32,
    pub specificity: f32,
    pub auc: f32,
    pub best_threshold: f32,
    pub best_index: usize,
    pub confusion: ConfusionMatrix,
    pub roc: RocCurve,
}

/// Hard predictions (arg-max) and class probabilities, inference mode.
pub fn predict(net: &mut ConnectomeNet, x: ArrayView3<f32>) -> (Array1<u8>, Array2<f32>) {
    let probs = net.predict_proba(x);
    let hard = argmax_rows(&probs).into_iter().map(|c| c as u8).collect();
    (Array1::from_vec(hard), probs)
}

/// Evaluate a trained model on a labeled partition.
pub fn evaluate_partition(
    net: &mut ConnectomeNet,
    x: ArrayView3<f32>,
    labels: ArrayView1<u8>,
) -> EvalReport {
    let probs = net.predict_proba(x);
    let predictions = argmax_rows(&probs);
    let confusion = ConfusionMatrix::from_predictions(labels, &predictions);

    let scores: Vec<f32> = probs.column(1).iter().copied().collect();
    let roc = roc_curve(labels, &scores);
    let area = auc(&roc);
    let (best_threshold, best_index) = youden_threshold(&roc);

    EvalReport {
        accuracy: confusion.accuracy(),
        sensitivity: confusion.sensitivity(),
        specificity: confusion.specificity(),
        auc: area,
        best_threshold,
        best_index,
        confusion,
        roc,
    }
}

/// Render the ROC curve with the Youden-optimal point marked.
pub fn plot_roc<P: AsRef<Path>>(roc: &RocCurve, best_index: usize, path: P) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(to_io)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ROC Curve", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(0f32..1f32, 0f32..1f32)
        .map_err(to_io)?;

    chart
        .configure_mesh()
        .x_desc("False Positive Rate")
        .y_desc("True Positive Rate")
        .draw()
        .map_err(to_io)?;

    chart
        .draw_series(LineSeries::new(
            roc.fpr.iter().zip(roc.tpr.iter()).map(|(&x, &y)| (x, y)),
            &BLUE,
        ))
        .map_err(to_io)?;

    if best_index < roc.fpr.len() {
        chart
            .draw_series(std::iter::once(Circle::new(
                (roc.fpr[best_index], roc.tpr[best_index]),
                5,
                RED.filled(),
            )))
            .map_err(to_io)?;
    }

    root.present().map_err(to_io)
}

fn to_io<E: std::fmt::Display>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}
