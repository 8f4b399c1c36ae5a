//! The two full-extent convolutions.
//!
//! Kernel shapes come in matched pairs: the row convolution spans one full
//! matrix row (1 × n), the column convolution spans the full remaining
//! column extent (n × 1). Together they collapse an `n × n` connectivity
//! matrix into a single feature vector per subject, a separable full-matrix
//! receptive field.

use ndarray::{Array1, Array2, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Row convolution: kernel `1 × n_node` over a single input channel.
///
/// Each filter responds once per matrix row, so the output spatial extent
/// is `n_node × 1`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RowConv {
    /// `[filters, n_node]`
    pub weight: Array2<f32>,
    /// `[filters]`
    pub bias: Array1<f32>,
    #[serde(skip)]
    cached_input: Option<Array3<f32>>,
}

impl RowConv {
    pub fn new(filters: usize, n_node: usize, rng: &mut StdRng) -> Self {
        let scale = (2.0 / n_node as f32).sqrt();
        let weight = Array2::from_shape_fn((filters, n_node), |_| {
            (rng.gen::<f32>() - 0.5) * 2.0 * scale
        });

        Self {
            weight,
            bias: Array1::zeros(filters),
            cached_input: None,
        }
    }

    /// `[batch, n, n]` → `[batch, filters, n]`.
    pub fn forward(&mut self, x: ArrayView3<f32>) -> Array3<f32> {
        let (batch, n, _) = x.dim();
        let filters = self.weight.nrows();

        let mut out = Array3::zeros((batch, filters, n));
        for subject in 0..batch {
            let x_s = x.index_axis(Axis(0), subject);
            let response = self.weight.dot(&x_s.t());
            out.index_axis_mut(Axis(0), subject).assign(&response);
        }
        out += &self.bias.view().insert_axis(Axis(1));

        self.cached_input = Some(x.to_owned());
        out
    }

    /// Returns `(d_weight, d_bias)`. The input gradient is never needed:
    /// this is the first layer.
    pub fn backward(&self, grad: &Array3<f32>) -> (Array2<f32>, Array1<f32>) {
        let x = self
            .cached_input
            .as_ref()
            .expect("forward must be called before backward");

        let batch = grad.len_of(Axis(0));
        let mut d_weight = Array2::zeros(self.weight.raw_dim());
        for subject in 0..batch {
            let g_s = grad.index_axis(Axis(0), subject);
            let x_s = x.index_axis(Axis(0), subject);
            d_weight += &g_s.dot(&x_s);
        }
        let d_bias = grad.sum_axis(Axis(2)).sum_axis(Axis(0));

        (d_weight, d_bias)
    }
}

/// Column convolution: kernel `n_node × 1` across every row-conv channel,
/// collapsing the remaining spatial extent to a single response per filter.
#[derive(Clone, Serialize, Deserialize)]
pub struct ColConv {
    /// `[filters, in_channels * n_node]`
    pub weight: Array2<f32>,
    /// `[filters]`
    pub bias: Array1<f32>,
    in_channels: usize,
    n_node: usize,
    #[serde(skip)]
    cached_input: Option<Array2<f32>>,
}

impl ColConv {
    pub fn new(filters: usize, in_channels: usize, n_node: usize, rng: &mut StdRng) -> Self {
        let fan_in = in_channels * n_node;
        let scale = (2.0 / fan_in as f32).sqrt();
        let weight =
            Array2::from_shape_fn((filters, fan_in), |_| (rng.gen::<f32>() - 0.5) * 2.0 * scale);

        Self {
            weight,
            bias: Array1::zeros(filters),
            in_channels,
            n_node,
            cached_input: None,
        }
    }

    /// `[batch, in_channels, n]` → `[batch, filters]`.
    pub fn forward(&mut self, x: &Array3<f32>) -> Array2<f32> {
        let (batch, channels, n) = x.dim();
        let flat = x
            .view()
            .into_shape((batch, channels * n))
            .expect("activations are contiguous row-major")
            .to_owned();

        let out = flat.dot(&self.weight.t()) + &self.bias;
        self.cached_input = Some(flat);
        out
    }

    /// Returns `(d_weight, d_bias, d_input)`.
    pub fn backward(&self, grad: &Array2<f32>) -> (Array2<f32>, Array1<f32>, Array3<f32>) {
        let flat = self
            .cached_input
            .as_ref()
            .expect("forward must be called before backward");

        let d_weight = grad.t().dot(flat);
        let d_bias = grad.sum_axis(Axis(0));

        let d_flat = grad.dot(&self.weight);
        let batch = d_flat.nrows();
        let d_input = d_flat
            .into_shape((batch, self.in_channels, self.n_node))
            .expect("gradient factors back into channel rows");

        (d_weight, d_bias, d_input)
    }
}
