// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::*;
use crate::errors::{AnalyticsError, Result};
use crate::storage::Datatype;

/// Where every artifact lives, relative to `data_dir` unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub predictions_dir: PathBuf,
    pub models_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Annotation exports, one sub-directory of JSONL files per project
    pub exports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_dir: PathBuf::from("raw"),
            processed_dir: PathBuf::from("processed"),
            predictions_dir: PathBuf::from("predictions"),
            models_dir: PathBuf::from("models"),
            results_dir: PathBuf::from("results"),
            exports_dir: PathBuf::from("doccano_export"),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `data_dir` with the default layout
    pub fn rooted_at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    fn under_root(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.data_dir.join(dir)
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.under_root(&self.raw_dir)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.under_root(&self.processed_dir)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.under_root(&self.predictions_dir)
    }

    pub fn models_path(&self) -> PathBuf {
        self.under_root(&self.models_dir)
    }

    pub fn exports_path(&self) -> PathBuf {
        self.under_root(&self.exports_dir)
    }

    /// Aggregated evaluation table
    pub fn results_file(&self) -> PathBuf {
        self.under_root(&self.results_dir).join(RESULTS_FILE_NAME)
    }
}

/// Dataset preparation and splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub seed: u64,
    pub required_columns: Vec<String>,
    pub stratify_column: String,
    pub folds: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            stratify_column: DEFAULT_STRATIFY_COLUMN.to_string(),
            folds: DEFAULT_FOLDS,
        }
    }
}

/// Training behaviour of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Partition `train_all` fits on
    pub datatype: String,
    /// Run the hyperparameter grid search inside `train` for ML models
    pub grid_search: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            datatype: "train".to_string(),
            grid_search: true,
        }
    }
}

/// Which implementations run and where their resources live
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Implementation names to activate; empty activates every registered one
    pub enabled: Vec<String>,
    /// Keyword dictionary for `keyword_dictionary` (json, csv or xlsx)
    pub keywords_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub models: ModelsConfig,
}

impl Config {
    /// Defaults with every artifact under `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig::rooted_at(data_dir),
            ..Default::default()
        }
    }

    /// Partition `train_all` reads
    pub fn training_datatype(&self) -> Result<Datatype> {
        let datatype: Datatype = self.training.datatype.parse()?;
        if !datatype.is_dataset() {
            return Err(AnalyticsError::Config(format!(
                "training.datatype must name a dataset partition, got '{}'",
                datatype
            )));
        }
        Ok(datatype)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data.required_columns.is_empty() {
            return Err(AnalyticsError::Config(
                "data.required_columns must not be empty".to_string(),
            ));
        }
        if !self.data.required_columns.iter().any(|c| c == "text") {
            return Err(AnalyticsError::Config(
                "data.required_columns must include 'text'".to_string(),
            ));
        }
        if self.data.folds < 2 {
            return Err(AnalyticsError::Config(format!(
                "data.folds must be at least 2, got {}",
                self.data.folds
            )));
        }
        if self.data.stratify_column.trim().is_empty() {
            return Err(AnalyticsError::Config(
                "data.stratify_column must not be empty".to_string(),
            ));
        }
        self.training_datatype()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.required_columns.len(), 16);
        assert_eq!(config.training_datatype().unwrap(), Datatype::Train);
    }

    #[test]
    fn test_relative_dirs_resolve_under_data_dir() {
        let storage = StorageConfig::rooted_at("/tmp/sdg");
        assert_eq!(storage.raw_path(), PathBuf::from("/tmp/sdg/raw"));
        assert_eq!(
            storage.results_file(),
            PathBuf::from("/tmp/sdg/results/all_eval_results.jsonl")
        );
    }

    #[test]
    fn test_rejects_non_dataset_training_datatype() {
        let mut config = Config::default();
        config.training.datatype = "models".to_string();
        assert!(matches!(config.validate(), Err(AnalyticsError::Config(_))));

        config.training.datatype = "trian".to_string();
        assert!(matches!(
            config.validate(),
            Err(AnalyticsError::UnknownDatatype(_))
        ));
    }

    #[test]
    fn test_rejects_single_fold() {
        let mut config = Config::default();
        config.data.folds = 1;
        assert!(config.validate().is_err());
    }
}
