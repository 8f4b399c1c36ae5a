//! Neural network components for the connectivity classifier.
//!
//! Every layer implements an explicit forward/backward pair with cached
//! activations; there is no autograd. The network has exactly two modes,
//! training and inference, selected per forward call.

pub mod activation;
pub mod batchnorm;
pub mod conv;
pub mod dropout;
pub mod linear;
pub mod loss;
pub mod network;
pub mod optimizer;

pub use activation::{argmax_rows, relu, relu_backward, softmax_rows};
pub use batchnorm::BatchNorm;
pub use conv::{ColConv, RowConv};
pub use dropout::Dropout;
pub use linear::Linear;
pub use loss::nll_loss;
pub use network::{ConnectomeNet, Gradients, NetState};
pub use optimizer::AdamOptimizer;
