//! Dataset loading and preparation for the connectivity classifier.
//!
//! The preparation pipeline mirrors the order the trainer consumes it in:
//! load the four sources, pool three of them into the training partition,
//! oversample the training minority class, standardize each subject against
//! its own distribution, and embed every upper-triangular vector into a
//! symmetric connectivity matrix.

pub mod batch;
pub mod dataset;
pub mod embed;
pub mod normalize;
pub mod resample;

use std::fmt;

use ndarray::{Array1, Array3};

use crate::config::DataConfig;

pub use batch::{Batch, BatchIter};
pub use dataset::{load_dataset, LabeledSet};
pub use embed::{embed_all, embed_upper_triangular, triangle_len, upper_triangle};
pub use normalize::standardize_rows;
pub use resample::oversample;

/// Errors raised while loading or shaping dataset files.
///
/// All of these are fatal to the run: the pipeline performs no recovery on
/// malformed data.
#[derive(Debug)]
pub enum DataError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// A cell failed to parse as a number.
    Value {
        row: usize,
        column: usize,
        message: String,
    },
    /// A row carried fewer than the id + label + one feature minimum.
    ShortRow { row: usize, found: usize },
    /// A label was neither 0 nor 1.
    Label { row: usize, found: f64 },
    /// Partitions being combined disagree on feature width.
    WidthMismatch { expected: usize, found: usize },
    /// Feature rows and label vector disagree on subject count.
    RowCount { rows: usize, labels: usize },
    /// Feature-vector length does not match the upper-triangle size for
    /// `n_node`.
    TriangleLength {
        n_node: usize,
        expected: usize,
        found: usize,
    },
    /// A dataset file contained no rows.
    Empty,
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Io(err) => write!(f, "IO error: {err}"),
            DataError::Csv(err) => write!(f, "CSV error: {err}"),
            DataError::Value {
                row,
                column,
                message,
            } => write!(f, "row {row}, column {column}: {message}"),
            DataError::ShortRow { row, found } => {
                write!(f, "row {row} has only {found} columns; need id, label and features")
            }
            DataError::Label { row, found } => {
                write!(f, "row {row} has label {found}; labels must be 0 or 1")
            }
            DataError::WidthMismatch { expected, found } => {
                write!(f, "feature width mismatch: expected {expected}, found {found}")
            }
            DataError::RowCount { rows, labels } => {
                write!(f, "{rows} feature rows but {labels} labels")
            }
            DataError::TriangleLength {
                n_node,
                expected,
                found,
            } => write!(
                f,
                "feature vector of length {found} does not fill the upper triangle of a \
                 {n_node}x{n_node} matrix (expected {expected} values)",
            ),
            DataError::Empty => write!(f, "dataset file contains no rows"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<std::io::Error> for DataError {
    fn from(value: std::io::Error) -> Self {
        DataError::Io(value)
    }
}

impl From<csv::Error> for DataError {
    fn from(value: csv::Error) -> Self {
        DataError::Csv(value)
    }
}

/// Fully prepared partitions, ready for the training loop.
///
/// Training matrices are consumed in fixed-size batches in file order;
/// validation stays as one full-size batch.
#[derive(Debug)]
pub struct PreparedData {
    pub train_matrices: Array3<f32>,
    pub train_labels: Array1<u8>,
    pub val_matrices: Array3<f32>,
    pub val_labels: Array1<u8>,
    pub n_node: usize,
}

impl PreparedData {
    /// Iterate the training partition as contiguous batches of `batch_size`
    /// subjects (final batch may be short). No shuffling.
    pub fn train_batches(&self, batch_size: usize) -> BatchIter<'_> {
        batch::batches(&self.train_matrices, &self.train_labels, batch_size)
    }

    pub fn num_train_batches(&self, batch_size: usize) -> usize {
        batch::num_batches(self.train_labels.len(), batch_size)
    }
}

/// Run the full preparation pipeline described by `config`.
///
/// 1. Load every training source and the validation source.
/// 2. Pool the training sources row-wise; validation stays untouched.
/// 3. Oversample the training minority class (seeded; validation is never
///    resampled).
/// 4. Standardize each subject vector against its own mean and deviation,
///    per partition.
/// 5. Embed each vector into an `n_node` x `n_node` symmetric matrix with
///    unit diagonal.
pub fn prepare(config: &DataConfig, seed: u64) -> Result<PreparedData, DataError> {
    let mut sources = Vec::with_capacity(config.train_sources.len());
    for path in &config.train_sources {
        tracing::debug!(path = %path.display(), "loading training source");
        sources.push(load_dataset(path)?);
    }
    let train = LabeledSet::concat(&sources)?;
    let mut val = load_dataset(&config.val_source)?;

    if train.features.ncols() != val.features.ncols() {
        return Err(DataError::WidthMismatch {
            expected: train.features.ncols(),
            found: val.features.ncols(),
        });
    }

    let counts_before = train.class_counts();
    let mut train = oversample(&train, seed);
    let counts_after = train.class_counts();
    tracing::info!(?counts_before, ?counts_after, "oversampled training partition");
    crate::logging::log_resample(counts_before, counts_after)?;

    standardize_rows(&mut train.features);
    standardize_rows(&mut val.features);

    let train_matrices = embed_all(&train.features, config.n_node)?;
    let val_matrices = embed_all(&val.features, config.n_node)?;

    Ok(PreparedData {
        train_matrices,
        train_labels: train.labels,
        val_matrices,
        val_labels: val.labels,
        n_node: config.n_node,
    })
}
