// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

pub use loader::{load_config, read_config};
pub use settings::{Config, DataConfig, ModelsConfig, StorageConfig, TrainingConfig};
