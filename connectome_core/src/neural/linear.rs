//! Fully-connected layer.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
pub struct Linear {
    /// `[out, in]`
    pub weight: Array2<f32>,
    /// `[out]`
    pub bias: Array1<f32>,
    #[serde(skip)]
    cached_input: Option<Array2<f32>>,
}

impl Linear {
    pub fn new(out_features: usize, in_features: usize, rng: &mut StdRng) -> Self {
        let scale = (2.0 / in_features as f32).sqrt();
        let weight = Array2::from_shape_fn((out_features, in_features), |_| {
            (rng.gen::<f32>() - 0.5) * 2.0 * scale
        });

        Self {
            weight,
            bias: Array1::zeros(out_features),
            cached_input: None,
        }
    }

    /// `[batch, in]` → `[batch, out]`.
    pub fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        self.cached_input = Some(x.clone());
        x.dot(&self.weight.t()) + &self.bias
    }

    /// Returns `(d_weight, d_bias, d_input)`.
    pub fn backward(&self, grad: &Array2<f32>) -> (Array2<f32>, Array1<f32>, Array2<f32>) {
        let x = self
            .cached_input
            .as_ref()
            .expect("forward must be called before backward");

        let d_weight = grad.t().dot(x);
        let d_bias = grad.sum_axis(Axis(0));
        let d_input = grad.dot(&self.weight);

        (d_weight, d_bias, d_input)
    }
}
