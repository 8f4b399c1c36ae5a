//! Train the connectivity classifier end to end, then evaluate the saved
//! checkpoint on the held-out partition.
//!
//! ```text
//! train [config.toml]      defaults to config/connectome.toml
//! ```

use std::env;

use anyhow::{Context, Result};

use connectome_core::checkpoint::Checkpointable;
use connectome_core::{data, eval, logging, training, ConnectomeNet, PipelineConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/connectome.toml".to_string());
    let config = PipelineConfig::load_from_file(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;

    let prepared =
        data::prepare(&config.data, config.training.seed).context("preparing datasets")?;
    tracing::info!(
        train_subjects = prepared.train_labels.len(),
        val_subjects = prepared.val_labels.len(),
        n_node = prepared.n_node,
        "data prepared"
    );

    let mut net = ConnectomeNet::new(config.data.n_node, &config.network, config.training.seed);
    let outcome = training::fit(&mut net, &prepared, &config.training, &config.output)
        .context("training failed")?;

    if let Some(stop) = outcome.stopped_early {
        tracing::info!(epoch = stop.epoch + 1, step = stop.step + 1, "stopped early");
    }

    // Evaluate the checkpoint that was actually written, not the live net.
    let mut model = ConnectomeNet::load_checkpoint(&outcome.checkpoint_path)
        .context("reloading checkpoint for evaluation")?;
    let report = eval::evaluate_partition(
        &mut model,
        prepared.val_matrices.view(),
        prepared.val_labels.view(),
    );

    if config.output.save_roc {
        eval::plot_roc(&report.roc, report.best_index, &config.output.roc_path)
            .context("rendering ROC curve")?;
        tracing::info!(path = %config.output.roc_path.display(), "saved ROC figure");
    }
    logging::log_evaluation(&report).context("writing evaluation log")?;

    tracing::info!(
        accuracy = report.accuracy,
        sensitivity = report.sensitivity,
        specificity = report.specificity,
        auc = report.auc,
        best_threshold = report.best_threshold,
        elapsed_ms = outcome.elapsed_ms as u64,
        "validation results"
    );

    Ok(())
}
