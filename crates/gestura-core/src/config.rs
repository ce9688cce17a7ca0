//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::landmarks::NormalizationMode;

const DEFAULT_SECRET: &str = "change-this-secret";

/// Paths to all Gestura data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// Action command table (`data/actions.json`).
    pub actions_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            actions_file: root.join("actions.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Training hyperparameters and retrain policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Minimum stored samples (real + augmented) before a retrain is accepted.
    pub min_samples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub hidden_layers: Vec<usize>,
    /// Augmented copies stored per captured sample.
    pub augment_variants: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            min_samples: 20,
            epochs: 25,
            batch_size: 32,
            learning_rate: 0.001,
            hidden_layers: vec![128, 64],
            augment_variants: 5,
        }
    }
}

/// Top-level Gestura configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GesturaConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Secret used to sign and verify session tokens.
    #[serde(skip_serializing)]
    pub auth_secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl_hours: i64,
    /// Normalization applied to captured samples.
    pub normalization: NormalizationMode,
    pub training: TrainingSettings,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl GesturaConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = env_parse("PORT").unwrap_or(8000);

        let auth_secret = std::env::var("GESTURA_SECRET").unwrap_or_else(|_| {
            tracing::warn!("GESTURA_SECRET not set, using the built-in development secret");
            DEFAULT_SECRET.to_string()
        });

        let normalization = match std::env::var("GESTURA_SCALE_NORMALIZE").as_deref() {
            Ok("1") | Ok("true") | Ok("yes") => NormalizationMode::TranslationAndScale,
            _ => NormalizationMode::TranslationOnly,
        };

        let defaults = TrainingSettings::default();
        let training = TrainingSettings {
            min_samples: env_parse("GESTURA_MIN_SAMPLES").unwrap_or(defaults.min_samples),
            epochs: env_parse("GESTURA_EPOCHS").unwrap_or(defaults.epochs),
            batch_size: env_parse("GESTURA_BATCH_SIZE").unwrap_or(defaults.batch_size),
            learning_rate: env_parse("GESTURA_LEARNING_RATE").unwrap_or(defaults.learning_rate),
            augment_variants: env_parse("GESTURA_AUGMENT_VARIANTS")
                .unwrap_or(defaults.augment_variants),
            hidden_layers: defaults.hidden_layers,
        };

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            auth_secret,
            token_ttl_hours: env_parse("GESTURA_TOKEN_TTL_HOURS").unwrap_or(24),
            normalization,
            training,
        })
    }
}
