// Training/Prediction Orchestrator
//
// Runs the model contract across every (implementation, category) pair for a
// project, and every persisted artifact across the projects holding a target
// partition. Each unit succeeds or fails on its own.

mod predict;
mod report;
mod train;

pub use report::{Failure, RunReport, Unit};

use crate::config::Config;
use crate::models::ModelRegistry;
use crate::storage::DatasetStore;

pub struct Orchestrator<'a> {
    config: &'a Config,
    store: &'a DatasetStore,
    registry: &'a ModelRegistry,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, store: &'a DatasetStore, registry: &'a ModelRegistry) -> Self {
        Self {
            config,
            store,
            registry,
        }
    }
}
