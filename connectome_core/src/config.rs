//! Pipeline configuration management via TOML files.
//!
//! Every component takes its configuration section as an explicit value at
//! construction; there are no free-standing module-level constants.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Full pipeline configuration loaded from a TOML file.
///
/// # Examples
///
/// ```
/// use connectome_core::PipelineConfig;
///
/// let config = PipelineConfig::load_from_file("config/connectome.toml")
///     .unwrap_or_else(|_| PipelineConfig::default());
///
/// println!("Matrix dimension: {}", config.data.n_node);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub network: NetworkConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawPipelineConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        Ok(Self {
            data: DataConfig::try_from_raw(raw.data)?,
            network: NetworkConfig::try_from_raw(raw.network)?,
            training: TrainingConfig::try_from_raw(raw.training)?,
            output: OutputConfig::from_raw(raw.output),
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            network: NetworkConfig::default(),
            training: TrainingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Dataset sources and the connectivity-matrix dimension.
///
/// Three sources are pooled into the training partition; `val_source` is the
/// held-out validation partition.
#[derive(Debug, Clone, Serialize)]
pub struct DataConfig {
    pub train_sources: Vec<PathBuf>,
    pub val_source: PathBuf,
    /// Number of nodes in the connectivity matrix. Each subject row must
    /// carry exactly `n_node * (n_node - 1) / 2` feature values.
    pub n_node: usize,
}

impl DataConfig {
    fn try_from_raw(raw: RawDataConfig) -> Result<Self, ConfigError> {
        if raw.train_sources.is_empty() {
            return Err(ConfigError::Parse(
                "data.train_sources must name at least one dataset".into(),
            ));
        }
        if raw.n_node < 2 {
            return Err(ConfigError::Parse("data.n_node must be ≥ 2".into()));
        }

        Ok(Self {
            train_sources: raw.train_sources,
            val_source: raw.val_source,
            n_node: raw.n_node,
        })
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_sources: default_train_sources(),
            val_source: default_val_source(),
            n_node: default_n_node(),
        }
    }
}

/// Network topology parameters.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfig {
    /// Output channels of the row convolution (kernel 1 × n_node).
    pub conv1_filters: usize,
    /// Output channels of the column convolution (kernel n_node × 1).
    pub conv2_filters: usize,
    /// Width of the hidden fully-connected layer.
    pub fc1_units: usize,
    /// Dropout rate applied after the hidden layer, training mode only.
    pub dropout: f32,
    pub num_classes: usize,
}

impl NetworkConfig {
    fn try_from_raw(raw: RawNetworkConfig) -> Result<Self, ConfigError> {
        if raw.conv1_filters == 0 || raw.conv2_filters == 0 || raw.fc1_units == 0 {
            return Err(ConfigError::Parse(
                "network layer widths must be non-zero".into(),
            ));
        }
        if !raw.dropout.is_finite() || !(0.0..1.0).contains(&raw.dropout) {
            return Err(ConfigError::Parse(
                "network.dropout must lie in [0, 1)".into(),
            ));
        }
        if raw.num_classes < 2 {
            return Err(ConfigError::Parse("network.num_classes must be ≥ 2".into()));
        }

        Ok(Self {
            conv1_filters: raw.conv1_filters,
            conv2_filters: raw.conv2_filters,
            fc1_units: raw.fc1_units,
            dropout: raw.dropout,
            num_classes: raw.num_classes,
        })
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            conv1_filters: default_conv1_filters(),
            conv2_filters: default_conv2_filters(),
            fc1_units: default_fc1_units(),
            dropout: default_dropout(),
            num_classes: default_num_classes(),
        }
    }
}

/// Training-loop parameters.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingConfig {
    pub num_epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Exponential learning-rate decay multiplier, applied once per epoch.
    pub gamma: f32,
    /// Stop at the first validation-loss increase and keep the state
    /// captured before the triggering update.
    pub early_stopping: bool,
    pub seed: u64,
    /// Console progress interval, in training steps.
    pub log_every: usize,
}

impl TrainingConfig {
    fn try_from_raw(raw: RawTrainingConfig) -> Result<Self, ConfigError> {
        if raw.num_epochs == 0 || raw.batch_size == 0 {
            return Err(ConfigError::Parse(
                "training.num_epochs and training.batch_size must be non-zero".into(),
            ));
        }
        if !raw.learning_rate.is_finite() || raw.learning_rate <= 0.0 {
            return Err(ConfigError::Parse(
                "training.learning_rate must be positive".into(),
            ));
        }
        if !raw.gamma.is_finite() || raw.gamma <= 0.0 || raw.gamma > 1.0 {
            return Err(ConfigError::Parse(
                "training.gamma must lie in (0, 1]".into(),
            ));
        }

        Ok(Self {
            num_epochs: raw.num_epochs,
            batch_size: raw.batch_size,
            learning_rate: raw.learning_rate,
            gamma: raw.gamma,
            early_stopping: raw.early_stopping,
            seed: raw.seed,
            log_every: raw.log_every.max(1),
        })
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_epochs: default_num_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            gamma: default_gamma(),
            early_stopping: false,
            seed: 0,
            log_every: default_log_every(),
        }
    }
}

/// Checkpoint and figure destinations.
#[derive(Debug, Clone, Serialize)]
pub struct OutputConfig {
    /// Directory receiving `model_{timestamp}.ckpt` files.
    pub model_dir: PathBuf,
    pub save_roc: bool,
    pub roc_path: PathBuf,
}

impl OutputConfig {
    fn from_raw(raw: RawOutputConfig) -> Self {
        Self {
            model_dir: raw.model_dir,
            save_roc: raw.save_roc,
            roc_path: raw.roc_path,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            save_roc: false,
            roc_path: default_roc_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPipelineConfig {
    #[serde(default)]
    data: RawDataConfig,
    #[serde(default)]
    network: RawNetworkConfig,
    #[serde(default)]
    training: RawTrainingConfig,
    #[serde(default)]
    output: RawOutputConfig,
}

#[derive(Debug, Deserialize)]
struct RawDataConfig {
    #[serde(default = "default_train_sources")]
    train_sources: Vec<PathBuf>,
    #[serde(default = "default_val_source")]
    val_source: PathBuf,
    #[serde(default = "default_n_node")]
    n_node: usize,
}

impl Default for RawDataConfig {
    fn default() -> Self {
        let defaults = DataConfig::default();
        Self {
            train_sources: defaults.train_sources,
            val_source: defaults.val_source,
            n_node: defaults.n_node,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNetworkConfig {
    #[serde(default = "default_conv1_filters")]
    conv1_filters: usize,
    #[serde(default = "default_conv2_filters")]
    conv2_filters: usize,
    #[serde(default = "default_fc1_units")]
    fc1_units: usize,
    #[serde(default = "default_dropout")]
    dropout: f32,
    #[serde(default = "default_num_classes")]
    num_classes: usize,
}

impl Default for RawNetworkConfig {
    fn default() -> Self {
        Self {
            conv1_filters: default_conv1_filters(),
            conv2_filters: default_conv2_filters(),
            fc1_units: default_fc1_units(),
            dropout: default_dropout(),
            num_classes: default_num_classes(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTrainingConfig {
    #[serde(default = "default_num_epochs")]
    num_epochs: usize,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_learning_rate")]
    learning_rate: f32,
    #[serde(default = "default_gamma")]
    gamma: f32,
    #[serde(default)]
    early_stopping: bool,
    #[serde(default)]
    seed: u64,
    #[serde(default = "default_log_every")]
    log_every: usize,
}

impl Default for RawTrainingConfig {
    fn default() -> Self {
        Self {
            num_epochs: default_num_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            gamma: default_gamma(),
            early_stopping: false,
            seed: 0,
            log_every: default_log_every(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOutputConfig {
    #[serde(default = "default_model_dir")]
    model_dir: PathBuf,
    #[serde(default)]
    save_roc: bool,
    #[serde(default = "default_roc_path")]
    roc_path: PathBuf,
}

impl Default for RawOutputConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            save_roc: false,
            roc_path: default_roc_path(),
        }
    }
}

fn default_train_sources() -> Vec<PathBuf> {
    vec![
        PathBuf::from("data/dataset_550.csv"),
        PathBuf::from("data/dataset_206.csv"),
        PathBuf::from("data/dataset_ucla.csv"),
    ]
}

fn default_val_source() -> PathBuf {
    PathBuf::from("data/dataset_cobre.csv")
}

fn default_n_node() -> usize {
    246
}

fn default_conv1_filters() -> usize {
    100
}

fn default_conv2_filters() -> usize {
    200
}

fn default_fc1_units() -> usize {
    100
}

fn default_dropout() -> f32 {
    0.4
}

fn default_num_classes() -> usize {
    2
}

fn default_num_epochs() -> usize {
    15
}

fn default_batch_size() -> usize {
    20
}

fn default_learning_rate() -> f32 {
    1.0e-4
}

fn default_gamma() -> f32 {
    0.5
}

fn default_log_every() -> usize {
    2
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_roc_path() -> PathBuf {
    PathBuf::from("figures/roc_val.png")
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}
