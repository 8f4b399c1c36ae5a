use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

fn log_dir() -> io::Result<()> {
    fs::create_dir_all("logs")
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Class counts around the oversampling step.
#[derive(Debug, Serialize)]
pub struct ResampleLogEntry {
    pub counts_before: [usize; 2],
    pub counts_after: [usize; 2],
    pub timestamp_ms: u128,
}

pub fn log_resample(counts_before: [usize; 2], counts_after: [usize; 2]) -> io::Result<()> {
    log_dir()?;
    let entry = ResampleLogEntry {
        counts_before,
        counts_after,
        timestamp_ms: now_ms(),
    };
    append_json_line("logs/resample.jsonl", &entry)
}

/// One line per training step. The validation loss is recomputed after
/// every batch, so both series share the same index.
#[derive(Debug, Serialize)]
pub struct TrainingStepEntry {
    pub epoch: usize,
    pub step: usize,
    pub train_loss: f32,
    pub val_loss: f32,
    pub learning_rate: f32,
    pub timestamp_ms: u128,
}

pub fn log_training_step(
    epoch: usize,
    step: usize,
    train_loss: f32,
    val_loss: f32,
    learning_rate: f32,
) -> io::Result<()> {
    log_dir()?;
    let entry = TrainingStepEntry {
        epoch,
        step,
        train_loss,
        val_loss,
        learning_rate,
        timestamp_ms: now_ms(),
    };
    append_json_line("logs/training.jsonl", &entry)
}

#[derive(Debug, Serialize)]
pub struct EvalLogEntry {
    pub accuracy: f32,
    pub sensitivity: f32,
    pub specificity: f32,
    pub auc: f32,
    pub best_threshold: f32,
    pub timestamp_ms: u128,
}

pub fn log_evaluation(report: &crate::eval::EvalReport) -> io::Result<()> {
    log_dir()?;
    let entry = EvalLogEntry {
        accuracy: report.accuracy,
        sensitivity: report.sensitivity,
        specificity: report.specificity,
        auc: report.auc,
        best_threshold: report.best_threshold,
        timestamp_ms: now_ms(),
    };
    append_json_line("logs/evaluation.jsonl", &entry)
}
