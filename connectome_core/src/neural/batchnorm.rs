//! Batch normalization over channels.

use ndarray::{Array1, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

/// Per-channel batch normalization with learned scale and shift.
///
/// Operates on `[elements, channels]` matrices; convolutional activations
/// are funneled through [`to_channel_rows`] / [`from_channel_rows`] so one
/// implementation serves both spatial and flat inputs. Training mode uses
/// batch statistics and updates the running estimates; inference mode uses
/// the running estimates only.
#[derive(Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    pub gamma: Array1<f32>,
    pub beta: Array1<f32>,
    pub running_mean: Array1<f32>,
    pub running_var: Array1<f32>,
    pub momentum: f32,
    pub eps: f32,
    #[serde(skip)]
    cache: Option<BnCache>,
}

#[derive(Clone)]
struct BnCache {
    x_hat: Array2<f32>,
    std_inv: Array1<f32>,
}

impl BatchNorm {
    pub fn new(channels: usize) -> Self {
        Self {
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
            running_mean: Array1::zeros(channels),
            running_var: Array1::ones(channels),
            momentum: 0.1,
            eps: 1e-5,
            cache: None,
        }
    }

    pub fn channels(&self) -> usize {
        self.gamma.len()
    }

    /// Forward pass over `[elements, channels]`.
    pub fn forward(&mut self, x: &Array2<f32>, training: bool) -> Array2<f32> {
        if training {
            let n = x.nrows() as f32;
            let mean = x.sum_axis(Axis(0)) / n;
            let centered = x - &mean;
            let var = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;
            let std_inv = var.mapv(|v| 1.0 / (v + self.eps).sqrt());
            let x_hat = centered * &std_inv;
            let out = &x_hat * &self.gamma + &self.beta;

            self.running_mean =
                &self.running_mean * (1.0 - self.momentum) + &(mean * self.momentum);
            self.running_var = &self.running_var * (1.0 - self.momentum) + &(var * self.momentum);
            self.cache = Some(BnCache { x_hat, std_inv });
            out
        } else {
            let std_inv = self.running_var.mapv(|v| 1.0 / (v + self.eps).sqrt());
            (x - &self.running_mean) * &std_inv * &self.gamma + &self.beta
        }
    }

    /// Backward pass; returns `(d_gamma, d_beta, d_input)`.
    pub fn backward(&self, grad: &Array2<f32>) -> (Array1<f32>, Array1<f32>, Array2<f32>) {
        let cache = self
            .cache
            .as_ref()
            .expect("forward must be called before backward");

        let n = grad.nrows() as f32;
        let d_gamma = (grad * &cache.x_hat).sum_axis(Axis(0));
        let d_beta = grad.sum_axis(Axis(0));

        let mean_grad = &d_beta / n;
        let mean_grad_xhat = &d_gamma / n;
        let scale = &self.gamma * &cache.std_inv;
        let d_input = (grad - &mean_grad - &(&cache.x_hat * &mean_grad_xhat)) * &scale;

        (d_gamma, d_beta, d_input)
    }
}

/// `[batch, channels, spatial]` → `[batch * spatial, channels]`.
pub(crate) fn to_channel_rows(x: &Array3<f32>) -> Array2<f32> {
    let (batch, channels, spatial) = x.dim();
    x.view()
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .to_owned()
        .into_shape((batch * spatial, channels))
        .expect("permuted copy is contiguous")
}

/// Inverse of [`to_channel_rows`].
pub(crate) fn from_channel_rows(rows: Array2<f32>, batch: usize, spatial: usize) -> Array3<f32> {
    let channels = rows.ncols();
    let stacked = rows
        .into_shape((batch, spatial, channels))
        .expect("row count factors into batch * spatial");
    stacked
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .to_owned()
}
