//! Optimizers for the connectivity classifier.

use std::collections::HashMap;

use ndarray::{Array, ArrayD, Dimension};

/// Adam optimizer (Adaptive Moment Estimation).
///
/// Moment buffers are keyed by parameter name and created lazily on the
/// first update, so one optimizer serves every layer of the network.
/// The learning rate is public: the training loop applies its exponential
/// decay multiplier once per epoch.
pub struct AdamOptimizer {
    /// Learning rate
    pub learning_rate: f32,
    /// Exponential decay rate for first moment (typically 0.9)
    pub beta1: f32,
    /// Exponential decay rate for second moment (typically 0.999)
    pub beta2: f32,
    /// Small constant for numerical stability
    pub epsilon: f32,
    /// Shared timestep for bias correction
    t: i32,
    /// First moment estimates (mean of gradients)
    first_moments: HashMap<String, ArrayD<f32>>,
    /// Second moment estimates (variance of gradients)
    second_moments: HashMap<String, ArrayD<f32>>,
}

impl AdamOptimizer {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            first_moments: HashMap::new(),
            second_moments: HashMap::new(),
        }
    }

    /// Advance the shared timestep. Call once per optimization step, before
    /// the per-parameter updates of that step.
    pub fn begin_step(&mut self) {
        self.t += 1;
    }

    /// Update one parameter from its accumulated gradient.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique identifier for this parameter
    /// * `param` - Parameter tensor to update (modified in-place)
    /// * `grad` - Gradient tensor, same shape as `param`
    pub fn step<D: Dimension>(
        &mut self,
        name: &str,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
    ) {
        let g = grad.view().into_dyn();
        let b1 = self.beta1;
        let b2 = self.beta2;

        {
            let m = self
                .first_moments
                .entry(name.to_string())
                .or_insert_with(|| ArrayD::zeros(g.raw_dim()));
            m.zip_mut_with(&g, |m, &g| *m = b1 * *m + (1.0 - b1) * g);
        }
        {
            let v = self
                .second_moments
                .entry(name.to_string())
                .or_insert_with(|| ArrayD::zeros(g.raw_dim()));
            v.zip_mut_with(&g, |v, &g| *v = b2 * *v + (1.0 - b2) * g * g);
        }

        let correction1 = 1.0 - b1.powi(self.t.max(1));
        let correction2 = 1.0 - b2.powi(self.t.max(1));
        let lr = self.learning_rate;
        let eps = self.epsilon;

        let m = &self.first_moments[name];
        let v = &self.second_moments[name];

        let mut update = m.mapv(|m| m / correction1);
        update.zip_mut_with(v, |u, &v| *u = lr * *u / ((v / correction2).sqrt() + eps));

        param
            .view_mut()
            .into_dyn()
            .zip_mut_with(&update, |p, &u| *p -= u);
    }

    /// Drop all accumulated moments and restart the timestep.
    pub fn reset(&mut self) {
        self.t = 0;
        self.first_moments.clear();
        self.second_moments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn steps_move_against_the_gradient() {
        let mut optimizer = AdamOptimizer::new(0.1);
        let mut param: Array1<f32> = array![1.0, -1.0];
        let grad: Array1<f32> = array![1.0, -1.0];

        optimizer.begin_step();
        optimizer.step("p", &mut param, &grad);

        assert!(param[0] < 1.0);
        assert!(param[1] > -1.0);
    }

    #[test]
    fn repeated_steps_converge_on_a_quadratic() {
        let mut optimizer = AdamOptimizer::new(0.05);
        let mut param: Array1<f32> = array![5.0];

        for _ in 0..500 {
            let grad = param.mapv(|p| 2.0 * p); // d/dp p^2
            optimizer.begin_step();
            optimizer.step("p", &mut param, &grad);
        }

        assert!(param[0].abs() < 0.1);
    }

    #[test]
    fn parameters_keep_independent_moments() {
        let mut optimizer = AdamOptimizer::new(0.1);
        let mut a: Array1<f32> = array![0.0];
        let mut b: Array1<f32> = array![0.0];

        optimizer.begin_step();
        optimizer.step("a", &mut a, &array![1.0]);
        optimizer.step("b", &mut b, &array![-1.0]);

        assert!(a[0] < 0.0);
        assert!(b[0] > 0.0);
        assert!((a[0] + b[0]).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_accumulated_state() {
        let mut optimizer = AdamOptimizer::new(0.1);
        let mut param: Array1<f32> = array![1.0];
        optimizer.begin_step();
        optimizer.step("p", &mut param, &array![1.0]);

        optimizer.reset();

        let mut fresh: Array1<f32> = array![1.0];
        let mut fresh_optimizer = AdamOptimizer::new(0.1);
        fresh_optimizer.begin_step();
        fresh_optimizer.step("p", &mut fresh, &array![1.0]);

        optimizer.begin_step();
        let mut again: Array1<f32> = array![1.0];
        optimizer.step("p", &mut again, &array![1.0]);

        assert!((fresh[0] - again[0]).abs() < 1e-6);
    }
}
