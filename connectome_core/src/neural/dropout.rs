//! Inverted dropout.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Dropout over `[batch, features]` activations.
///
/// Active in training mode only: kept units are scaled by `1 / (1 - rate)`
/// so inference is a plain pass-through with no rescaling.
#[derive(Clone, Serialize, Deserialize)]
pub struct Dropout {
    pub rate: f32,
    #[serde(skip)]
    mask: Option<Array2<f32>>,
}

impl Dropout {
    pub fn new(rate: f32) -> Self {
        Self { rate, mask: None }
    }

    pub fn forward(&mut self, x: &Array2<f32>, training: bool, rng: &mut StdRng) -> Array2<f32> {
        if !training || self.rate <= 0.0 {
            self.mask = None;
            return x.clone();
        }

        let keep = 1.0 - self.rate;
        let mask = Array2::from_shape_fn(x.raw_dim(), |_| {
            if rng.gen::<f32>() < keep {
                1.0 / keep
            } else {
                0.0
            }
        });
        let out = x * &mask;
        self.mask = Some(mask);
        out
    }

    pub fn backward(&self, grad: &Array2<f32>) -> Array2<f32> {
        match &self.mask {
            Some(mask) => grad * mask,
            None => grad.clone(),
        }
    }
}
