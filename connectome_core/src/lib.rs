//! # connectome_core — connectivity-matrix CNN training in pure Rust
//!
//! Training and evaluation pipeline for a two-convolution classifier over
//! brain functional-connectivity matrices. Subjects arrive as flattened
//! upper-triangular connectivity vectors; the pipeline rebuilds the full
//! symmetric matrices and trains a classifier that reads them with
//! full-row then full-column receptive fields.
//!
//! ## Pipeline overview
//!
//! ```text
//! dataset files (id, label, upper-triangular features)
//!   │
//!   ├─ data::load_dataset()      one partition per file
//!   ├─ pool three sources        training partition (fourth = validation)
//!   ├─ data::oversample()        duplicate minority rows until balanced
//!   ├─ data::standardize_rows()  per-subject z-score (ddof = 0)
//!   ├─ data::embed_all()         vector → n×n symmetric, unit diagonal
//!   └─ fixed-size batches        file order, no shuffling
//!        │
//!        ├─ training::fit()      Adam + per-epoch LR decay,
//!        │                       validation loss after every batch,
//!        │                       optional first-minimum early stopping,
//!        │                       timestamped bincode checkpoint
//!        └─ eval::evaluate_partition()
//!                                confusion-matrix metrics, AUC,
//!                                Youden-optimal threshold, ROC plot
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use connectome_core::{data, eval, training, ConnectomeNet, PipelineConfig};
//! use connectome_core::checkpoint::Checkpointable;
//!
//! let config = PipelineConfig::load_from_file("config/connectome.toml").unwrap();
//!
//! let prepared = data::prepare(&config.data, config.training.seed).unwrap();
//! let mut net = ConnectomeNet::new(config.data.n_node, &config.network, config.training.seed);
//!
//! let outcome = training::fit(&mut net, &prepared, &config.training, &config.output).unwrap();
//!
//! let mut model = ConnectomeNet::load_checkpoint(&outcome.checkpoint_path).unwrap();
//! let report = eval::evaluate_partition(
//!     &mut model,
//!     prepared.val_matrices.view(),
//!     prepared.val_labels.view(),
//! );
//! println!(
//!     "acc {:.4} sens {:.4} spec {:.4} auc {:.4}",
//!     report.accuracy, report.sensitivity, report.specificity, report.auc
//! );
//! ```

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod eval;
pub mod logging;
pub mod neural;
pub mod training;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{ConfigError, DataConfig, NetworkConfig, OutputConfig, PipelineConfig, TrainingConfig};

// checkpoint
pub use checkpoint::{CheckpointError, Checkpointable};

// data
pub use data::{
    embed_all, embed_upper_triangular, load_dataset, oversample, prepare, standardize_rows,
    triangle_len, upper_triangle, DataError, LabeledSet, PreparedData,
};

// neural
pub use neural::{AdamOptimizer, ConnectomeNet, NetState};

// training
pub use training::{fit, EarlyStopping, StopPoint, TrainError, TrainOutcome};

// eval
pub use eval::{
    auc, evaluate_partition, plot_roc, predict, roc_curve, youden_threshold, ConfusionMatrix,
    EvalReport, RocCurve,
};
