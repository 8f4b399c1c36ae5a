//! The connectivity classifier network.

use ndarray::{Array1, Array2, ArrayView1, ArrayView3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointError, Checkpointable};
use crate::config::NetworkConfig;
use crate::neural::activation::{argmax_rows, relu, relu_backward, softmax_rows};
use crate::neural::batchnorm::{from_channel_rows, to_channel_rows, BatchNorm};
use crate::neural::conv::{ColConv, RowConv};
use crate::neural::dropout::Dropout;
use crate::neural::linear::Linear;
use crate::neural::loss::nll_loss;
use crate::neural::optimizer::AdamOptimizer;

const NETWORK_CHECKPOINT_VERSION: u32 = 1;

/// Feed-forward classifier over `n × n` connectivity matrices.
///
/// ```text
/// [B, n, n]
///   │ row conv (1 × n)            → [B, c1, n]
///   │ batch norm + ReLU
///   │ column conv (n × 1)         → [B, c2]
///   │ batch norm + ReLU
///   │ fully connected             → [B, fc1]
///   │ dropout (training only)
///   │ fully connected + softmax   → [B, classes]
/// ```
pub struct ConnectomeNet {
    conv1: RowConv,
    bn1: BatchNorm,
    conv2: ColConv,
    bn2: BatchNorm,
    fc1: Linear,
    dropout: Dropout,
    fc2: Linear,
    n_node: usize,
    num_classes: usize,
    seed: u64,
    rng: StdRng,
    cache: Option<ForwardCache>,
}

struct ForwardCache {
    /// Post-ReLU row-conv activations in `[batch * n, c1]` layout.
    z1_rows: Array2<f32>,
    /// Post-ReLU column-conv activations, `[batch, c2]`.
    z2: Array2<f32>,
    batch: usize,
}

/// Gradients for every learnable parameter, one training batch.
pub struct Gradients {
    pub conv1_weight: Array2<f32>,
    pub conv1_bias: Array1<f32>,
    pub bn1_gamma: Array1<f32>,
    pub bn1_beta: Array1<f32>,
    pub conv2_weight: Array2<f32>,
    pub conv2_bias: Array1<f32>,
    pub bn2_gamma: Array1<f32>,
    pub bn2_beta: Array1<f32>,
    pub fc1_weight: Array2<f32>,
    pub fc1_bias: Array1<f32>,
    pub fc2_weight: Array2<f32>,
    pub fc2_bias: Array1<f32>,
}

/// Complete parameter state, including batch-norm running estimates.
///
/// This is both the early-stopping snapshot and the checkpoint payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct NetState {
    pub conv1_weight: Array2<f32>,
    pub conv1_bias: Array1<f32>,
    pub bn1_gamma: Array1<f32>,
    pub bn1_beta: Array1<f32>,
    pub bn1_running_mean: Array1<f32>,
    pub bn1_running_var: Array1<f32>,
    pub conv2_weight: Array2<f32>,
    pub conv2_bias: Array1<f32>,
    pub bn2_gamma: Array1<f32>,
    pub bn2_beta: Array1<f32>,
    pub bn2_running_mean: Array1<f32>,
    pub bn2_running_var: Array1<f32>,
    pub fc1_weight: Array2<f32>,
    pub fc1_bias: Array1<f32>,
    pub fc2_weight: Array2<f32>,
    pub fc2_bias: Array1<f32>,
}

#[derive(Clone, Serialize, Deserialize)]
struct NetConfigSnapshot {
    n_node: usize,
    conv1_filters: usize,
    conv2_filters: usize,
    fc1_units: usize,
    dropout: f32,
    num_classes: usize,
    seed: u64,
}

#[derive(Serialize, Deserialize)]
struct NetCheckpoint {
    version: u32,
    config: NetConfigSnapshot,
    state: NetState,
}

impl ConnectomeNet {
    pub fn new(n_node: usize, config: &NetworkConfig, seed: u64) -> Self {
        let mut init_rng = StdRng::seed_from_u64(seed);

        let conv1 = RowConv::new(config.conv1_filters, n_node, &mut init_rng);
        let bn1 = BatchNorm::new(config.conv1_filters);
        let conv2 = ColConv::new(
            config.conv2_filters,
            config.conv1_filters,
            n_node,
            &mut init_rng,
        );
        let bn2 = BatchNorm::new(config.conv2_filters);
        let fc1 = Linear::new(config.fc1_units, config.conv2_filters, &mut init_rng);
        let dropout = Dropout::new(config.dropout);
        let fc2 = Linear::new(config.num_classes, config.fc1_units, &mut init_rng);

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            fc1,
            dropout,
            fc2,
            n_node,
            num_classes: config.num_classes,
            seed,
            rng: StdRng::seed_from_u64(seed.wrapping_add(0x9e37_79b9)),
            cache: None,
        }
    }

    pub fn n_node(&self) -> usize {
        self.n_node
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Forward pass. `training` selects batch statistics and an active
    /// dropout mask; inference uses running estimates and no masking.
    pub fn forward(&mut self, x: ArrayView3<f32>, training: bool) -> Array2<f32> {
        let (batch, _, n) = x.dim();

        let a1 = self.conv1.forward(x);
        let a1_rows = to_channel_rows(&a1);
        let r1_rows = self.bn1.forward(&a1_rows, training);
        let z1_rows = relu(&r1_rows);
        let z1 = from_channel_rows(z1_rows.clone(), batch, n);

        let a2 = self.conv2.forward(&z1);
        let r2 = self.bn2.forward(&a2, training);
        let z2 = relu(&r2);

        let f1 = self.fc1.forward(&z2);
        let d1 = self.dropout.forward(&f1, training, &mut self.rng);
        let logits = self.fc2.forward(&d1);
        let probs = softmax_rows(&logits);

        self.cache = Some(ForwardCache {
            z1_rows,
            z2,
            batch,
        });
        probs
    }

    /// Backward pass from the logit gradient produced by [`nll_loss`].
    fn backward(&mut self, d_logits: &Array2<f32>) -> Gradients {
        let cache = self
            .cache
            .as_ref()
            .expect("forward must be called before backward");

        let (fc2_weight, fc2_bias, d_d1) = self.fc2.backward(d_logits);
        let d_f1 = self.dropout.backward(&d_d1);
        let (fc1_weight, fc1_bias, d_z2) = self.fc1.backward(&d_f1);

        let d_r2 = relu_backward(&d_z2, &cache.z2);
        let (bn2_gamma, bn2_beta, d_a2) = self.bn2.backward(&d_r2);
        let (conv2_weight, conv2_bias, d_z1) = self.conv2.backward(&d_a2);

        let d_z1_rows = to_channel_rows(&d_z1);
        let d_r1_rows = relu_backward(&d_z1_rows, &cache.z1_rows);
        let (bn1_gamma, bn1_beta, d_a1_rows) = self.bn1.backward(&d_r1_rows);
        let d_a1 = from_channel_rows(d_a1_rows, cache.batch, self.n_node);
        let (conv1_weight, conv1_bias) = self.conv1.backward(&d_a1);

        Gradients {
            conv1_weight,
            conv1_bias,
            bn1_gamma,
            bn1_beta,
            conv2_weight,
            conv2_bias,
            bn2_gamma,
            bn2_beta,
            fc1_weight,
            fc1_bias,
            fc2_weight,
            fc2_bias,
        }
    }

    fn apply_gradients(&mut self, grads: &Gradients, optimizer: &mut AdamOptimizer) {
        optimizer.begin_step();
        optimizer.step("conv1.weight", &mut self.conv1.weight, &grads.conv1_weight);
        optimizer.step("conv1.bias", &mut self.conv1.bias, &grads.conv1_bias);
        optimizer.step("bn1.gamma", &mut self.bn1.gamma, &grads.bn1_gamma);
        optimizer.step("bn1.beta", &mut self.bn1.beta, &grads.bn1_beta);
        optimizer.step("conv2.weight", &mut self.conv2.weight, &grads.conv2_weight);
        optimizer.step("conv2.bias", &mut self.conv2.bias, &grads.conv2_bias);
        optimizer.step("bn2.gamma", &mut self.bn2.gamma, &grads.bn2_gamma);
        optimizer.step("bn2.beta", &mut self.bn2.beta, &grads.bn2_beta);
        optimizer.step("fc1.weight", &mut self.fc1.weight, &grads.fc1_weight);
        optimizer.step("fc1.bias", &mut self.fc1.bias, &grads.fc1_bias);
        optimizer.step("fc2.weight", &mut self.fc2.weight, &grads.fc2_weight);
        optimizer.step("fc2.bias", &mut self.fc2.bias, &grads.fc2_bias);
    }

    /// One optimization step: forward in training mode, cross-entropy,
    /// backward, Adam update. Returns the batch loss.
    pub fn train_batch(
        &mut self,
        x: ArrayView3<f32>,
        labels: ArrayView1<u8>,
        optimizer: &mut AdamOptimizer,
    ) -> f32 {
        let probs = self.forward(x, true);
        let (loss, d_logits) = nll_loss(&probs, labels);
        let grads = self.backward(&d_logits);
        self.apply_gradients(&grads, optimizer);
        loss
    }

    /// Class probabilities in inference mode.
    pub fn predict_proba(&mut self, x: ArrayView3<f32>) -> Array2<f32> {
        self.forward(x, false)
    }

    /// Average loss and accuracy over a labeled partition, inference mode.
    pub fn evaluate(&mut self, x: ArrayView3<f32>, labels: ArrayView1<u8>) -> (f32, f32) {
        let probs = self.forward(x, false);
        let (loss, _) = nll_loss(&probs, labels);

        let predictions = argmax_rows(&probs);
        let correct = predictions
            .iter()
            .zip(labels.iter())
            .filter(|(&pred, &label)| pred == label as usize)
            .count();
        let accuracy = correct as f32 / labels.len().max(1) as f32;

        (loss, accuracy)
    }

    /// Clone the full parameter state (early-stopping snapshot).
    pub fn state(&self) -> NetState {
        NetState {
            conv1_weight: self.conv1.weight.clone(),
            conv1_bias: self.conv1.bias.clone(),
            bn1_gamma: self.bn1.gamma.clone(),
            bn1_beta: self.bn1.beta.clone(),
            bn1_running_mean: self.bn1.running_mean.clone(),
            bn1_running_var: self.bn1.running_var.clone(),
            conv2_weight: self.conv2.weight.clone(),
            conv2_bias: self.conv2.bias.clone(),
            bn2_gamma: self.bn2.gamma.clone(),
            bn2_beta: self.bn2.beta.clone(),
            bn2_running_mean: self.bn2.running_mean.clone(),
            bn2_running_var: self.bn2.running_var.clone(),
            fc1_weight: self.fc1.weight.clone(),
            fc1_bias: self.fc1.bias.clone(),
            fc2_weight: self.fc2.weight.clone(),
            fc2_bias: self.fc2.bias.clone(),
        }
    }

    /// Replace the parameter state. Shapes must match the current topology.
    pub fn load_state(&mut self, state: NetState) -> Result<(), CheckpointError> {
        let checks = [
            ("conv1.weight", state.conv1_weight.dim() == self.conv1.weight.dim()),
            ("conv2.weight", state.conv2_weight.dim() == self.conv2.weight.dim()),
            ("fc1.weight", state.fc1_weight.dim() == self.fc1.weight.dim()),
            ("fc2.weight", state.fc2_weight.dim() == self.fc2.weight.dim()),
            ("bn1.gamma", state.bn1_gamma.len() == self.bn1.gamma.len()),
            ("bn2.gamma", state.bn2_gamma.len() == self.bn2.gamma.len()),
        ];
        for (name, ok) in checks {
            if !ok {
                return Err(CheckpointError::InvalidFormat(format!(
                    "parameter shape mismatch for {name}"
                )));
            }
        }

        self.conv1.weight = state.conv1_weight;
        self.conv1.bias = state.conv1_bias;
        self.bn1.gamma = state.bn1_gamma;
        self.bn1.beta = state.bn1_beta;
        self.bn1.running_mean = state.bn1_running_mean;
        self.bn1.running_var = state.bn1_running_var;
        self.conv2.weight = state.conv2_weight;
        self.conv2.bias = state.conv2_bias;
        self.bn2.gamma = state.bn2_gamma;
        self.bn2.beta = state.bn2_beta;
        self.bn2.running_mean = state.bn2_running_mean;
        self.bn2.running_var = state.bn2_running_var;
        self.fc1.weight = state.fc1_weight;
        self.fc1.bias = state.fc1_bias;
        self.fc2.weight = state.fc2_weight;
        self.fc2.bias = state.fc2_bias;
        Ok(())
    }

    fn config_snapshot(&self) -> NetConfigSnapshot {
        NetConfigSnapshot {
            n_node: self.n_node,
            conv1_filters: self.bn1.channels(),
            conv2_filters: self.bn2.channels(),
            fc1_units: self.fc1.bias.len(),
            dropout: self.dropout.rate,
            num_classes: self.num_classes,
            seed: self.seed,
        }
    }
}

impl Checkpointable for ConnectomeNet {
    fn save_checkpoint<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let snapshot = NetCheckpoint {
            version: NETWORK_CHECKPOINT_VERSION,
            config: self.config_snapshot(),
            state: self.state(),
        };
        Self::write_snapshot(&snapshot, path)
    }

    fn load_checkpoint<P: AsRef<std::path::Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: NetCheckpoint = Self::read_snapshot(path)?;
        if snapshot.version != NETWORK_CHECKPOINT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: NETWORK_CHECKPOINT_VERSION,
                found: snapshot.version,
            });
        }

        let config = NetworkConfig {
            conv1_filters: snapshot.config.conv1_filters,
            conv2_filters: snapshot.config.conv2_filters,
            fc1_units: snapshot.config.fc1_units,
            dropout: snapshot.config.dropout,
            num_classes: snapshot.config.num_classes,
        };
        let mut net = ConnectomeNet::new(snapshot.config.n_node, &config, snapshot.config.seed);
        net.load_state(snapshot.state)?;
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::embed::triangle_len;
    use ndarray::{Array1, Array3};

    fn small_config() -> NetworkConfig {
        NetworkConfig {
            conv1_filters: 6,
            conv2_filters: 8,
            fc1_units: 5,
            dropout: 0.4,
            num_classes: 2,
        }
    }

    fn toy_batch(subjects: usize, n_node: usize, seed: u64) -> (Array3<f32>, Array1<u8>) {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(seed);
        let width = triangle_len(n_node);
        let mut features = ndarray::Array2::zeros((subjects, width));
        let mut labels = Vec::with_capacity(subjects);
        for mut row in features.rows_mut() {
            let label = rng.gen::<bool>() as u8;
            // Separable classes: label shifts every connectivity value.
            let offset = if label == 1 { 1.0 } else { -1.0 };
            for v in row.iter_mut() {
                *v = offset + rng.gen::<f32>() * 0.1;
            }
            labels.push(label);
        }
        let matrices = crate::data::embed::embed_all(&features, n_node).unwrap();
        (matrices, Array1::from_vec(labels))
    }

    #[test]
    fn forward_produces_probability_rows() {
        let mut net = ConnectomeNet::new(4, &small_config(), 42);
        let (x, _) = toy_batch(3, 4, 0);

        let probs = net.forward(x.view(), false);
        assert_eq!(probs.dim(), (3, 2));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn inference_is_deterministic() {
        let mut net = ConnectomeNet::new(4, &small_config(), 42);
        let (x, _) = toy_batch(3, 4, 1);

        let a = net.predict_proba(x.view());
        let b = net.predict_proba(x.view());
        assert_eq!(a, b);
    }

    #[test]
    fn training_mode_dropout_perturbs_outputs() {
        let mut net = ConnectomeNet::new(4, &small_config(), 42);
        let (x, _) = toy_batch(3, 4, 2);

        let a = net.forward(x.view(), true);
        let b = net.forward(x.view(), true);
        // Fresh dropout masks (and running-stat updates) make repeated
        // training-mode passes differ.
        assert_ne!(a, b);
    }

    #[test]
    fn training_reduces_loss_on_separable_data() {
        let mut net = ConnectomeNet::new(4, &small_config(), 7);
        let mut optimizer = AdamOptimizer::new(0.01);
        let (x, labels) = toy_batch(16, 4, 3);

        let (initial_loss, _) = net.evaluate(x.view(), labels.view());
        for _ in 0..60 {
            net.train_batch(x.view(), labels.view(), &mut optimizer);
        }
        let (final_loss, accuracy) = net.evaluate(x.view(), labels.view());

        assert!(final_loss < initial_loss);
        assert!(accuracy > 0.8);
    }

    #[test]
    fn state_round_trip_preserves_outputs() {
        let mut net = ConnectomeNet::new(4, &small_config(), 11);
        let (x, labels) = toy_batch(6, 4, 4);
        let mut optimizer = AdamOptimizer::new(0.01);
        net.train_batch(x.view(), labels.view(), &mut optimizer);

        let state = net.state();
        let before = net.predict_proba(x.view());

        // Wreck the parameters, then restore.
        net.train_batch(x.view(), labels.view(), &mut optimizer);
        net.load_state(state).unwrap();
        let after = net.predict_proba(x.view());

        assert_eq!(before, after);
    }

    #[test]
    fn checkpoint_round_trip_preserves_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");

        let mut net = ConnectomeNet::new(4, &small_config(), 13);
        let (x, labels) = toy_batch(6, 4, 5);
        let mut optimizer = AdamOptimizer::new(0.01);
        net.train_batch(x.view(), labels.view(), &mut optimizer);

        net.save_checkpoint(&path).unwrap();
        let mut restored = ConnectomeNet::load_checkpoint(&path).unwrap();

        let expected = net.predict_proba(x.view());
        let actual = restored.predict_proba(x.view());
        assert_eq!(expected, actual);
    }

    #[test]
    fn load_state_rejects_mismatched_topology() {
        let net_a = ConnectomeNet::new(4, &small_config(), 1);
        let mut net_b = ConnectomeNet::new(5, &small_config(), 1);

        let err = net_b.load_state(net_a.state()).unwrap_err();
        assert!(matches!(err, CheckpointError::InvalidFormat(_)));
    }
}
