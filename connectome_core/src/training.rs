//! Training loop with exponential learning-rate decay and optional early
//! stopping.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use crate::checkpoint::{timestamped_model_path, CheckpointError, Checkpointable};
use crate::config::{OutputConfig, TrainingConfig};
use crate::data::PreparedData;
use crate::logging;
use crate::neural::{AdamOptimizer, ConnectomeNet};

/// First-minimum early stopping over the validation-loss series.
///
/// Tracks the best loss seen so far; the first observation above that best
/// value signals a stop, regardless of remaining epoch budget.
pub struct EarlyStopping {
    enabled: bool,
    best: f32,
}

impl EarlyStopping {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            best: f32::INFINITY,
        }
    }

    /// Feed one validation loss; returns `true` when training must stop.
    pub fn observe(&mut self, val_loss: f32) -> bool {
        if !self.enabled {
            return false;
        }
        if val_loss > self.best {
            return true;
        }
        self.best = val_loss;
        false
    }
}

/// Where the loop stopped early, in global batch coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPoint {
    pub epoch: usize,
    pub step: usize,
}

/// Everything the training run produced.
pub struct TrainOutcome {
    pub checkpoint_path: PathBuf,
    /// One entry per training batch.
    pub train_losses: Vec<f32>,
    /// One entry per training batch; the whole validation partition is
    /// re-forwarded after every batch update.
    pub val_losses: Vec<f32>,
    pub stopped_early: Option<StopPoint>,
    pub elapsed_ms: u128,
}

#[derive(Debug)]
pub enum TrainError {
    Io(std::io::Error),
    Checkpoint(CheckpointError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Io(err) => write!(f, "IO error during training: {err}"),
            TrainError::Checkpoint(err) => write!(f, "checkpoint error: {err}"),
        }
    }
}

impl std::error::Error for TrainError {}

impl From<std::io::Error> for TrainError {
    fn from(value: std::io::Error) -> Self {
        TrainError::Io(value)
    }
}

impl From<CheckpointError> for TrainError {
    fn from(value: CheckpointError) -> Self {
        TrainError::Checkpoint(value)
    }
}

/// Train `net` on the prepared partitions.
///
/// Per epoch: the learning-rate multiplier is applied once at the top, then
/// every batch runs forward → loss → backward → Adam update, followed by a
/// full validation forward pass. Validating after every batch (rather than
/// every epoch) is the expensive part of this loop; the validation set is
/// forwarded `batches × epochs` times.
///
/// With early stopping enabled, the first batch whose validation loss
/// exceeds the best seen so far stops the run, and the checkpoint holds the
/// parameter snapshot captured before that batch's update. Otherwise the
/// state after the final batch is checkpointed.
///
/// Any I/O failure is fatal; there are no retries and no partial-state
/// recovery.
pub fn fit(
    net: &mut ConnectomeNet,
    data: &PreparedData,
    config: &TrainingConfig,
    output: &OutputConfig,
) -> Result<TrainOutcome, TrainError> {
    let started = Instant::now();
    let checkpoint_path = timestamped_model_path(&output.model_dir);

    let mut optimizer = AdamOptimizer::new(config.learning_rate);
    let mut stopper = EarlyStopping::new(config.early_stopping);
    let total_steps = data.num_train_batches(config.batch_size);

    let mut train_losses = Vec::new();
    let mut val_losses = Vec::new();
    let mut stopped_early = None;

    tracing::info!(
        epochs = config.num_epochs,
        batch_size = config.batch_size,
        train_subjects = data.train_labels.len(),
        val_subjects = data.val_labels.len(),
        "starting training"
    );

    'epochs: for epoch in 0..config.num_epochs {
        optimizer.learning_rate *= config.gamma;

        for (step, batch) in data.train_batches(config.batch_size).enumerate() {
            let snapshot = net.state();

            let train_loss = net.train_batch(batch.matrices, batch.labels, &mut optimizer);
            let (val_loss, _) = net.evaluate(data.val_matrices.view(), data.val_labels.view());

            train_losses.push(train_loss);
            val_losses.push(val_loss);
            logging::log_training_step(epoch, step, train_loss, val_loss, optimizer.learning_rate)?;

            if (step + 1) % config.log_every == 0 {
                tracing::info!(
                    epoch = epoch + 1,
                    epochs = config.num_epochs,
                    step = step + 1,
                    total_steps,
                    train_loss,
                    val_loss,
                    "training step"
                );
            }

            if stopper.observe(val_loss) {
                net.load_state(snapshot)?;
                net.save_checkpoint(&checkpoint_path)?;
                stopped_early = Some(StopPoint { epoch, step });
                tracing::info!(
                    epoch = epoch + 1,
                    step = step + 1,
                    val_loss,
                    "validation loss rose past its minimum; stopping early"
                );
                break 'epochs;
            }
        }
    }

    if stopped_early.is_none() {
        net.save_checkpoint(&checkpoint_path)?;
    }

    tracing::info!(
        path = %checkpoint_path.display(),
        steps = train_losses.len(),
        "saved model checkpoint"
    );

    Ok(TrainOutcome {
        checkpoint_path,
        train_losses,
        val_losses,
        stopped_early,
        elapsed_ms: started.elapsed().as_millis(),
    })
}
