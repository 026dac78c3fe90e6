// Model registry
//
// Implementations register by name at startup; the orchestrator only ever sees
// names, `Model` values and artifact files.

use serde_json::Value;
use std::path::Path;

use super::contract::{Classifier, Model, ModelArtifact, ModelKind};
use super::logistic_regression::LogisticRegressionSubsampled;
use super::rules::{KeywordDictionaryModel, StarsSustainModel};
use crate::config::Config;
use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

/// A concrete classifier that can be registered
pub trait ModelImplementation: Classifier + Sized + 'static {
    /// Registry name; also the `model_name` part of artifact addresses
    const NAME: &'static str;

    /// Fresh, untrained instance bound to `category`
    fn create(category: Sdg, config: &Config) -> Result<Self>;

    /// Rebuild from the `state` of a persisted artifact
    fn restore(category: Sdg, state: Value) -> Result<Self>;
}

type Factory = fn(Sdg, &Config) -> Result<Box<dyn Classifier>>;
type Restorer = fn(Sdg, Value) -> Result<Box<dyn Classifier>>;

#[derive(Clone, Copy)]
struct Registration {
    name: &'static str,
    create: Factory,
    restore: Restorer,
}

fn create_boxed<M: ModelImplementation>(category: Sdg, config: &Config) -> Result<Box<dyn Classifier>> {
    Ok(Box::new(M::create(category, config)?))
}

fn restore_boxed<M: ModelImplementation>(category: Sdg, state: Value) -> Result<Box<dyn Classifier>> {
    Ok(Box::new(M::restore(category, state)?))
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    registrations: Vec<Registration>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in implementation
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register::<KeywordDictionaryModel>();
        registry.register::<StarsSustainModel>();
        registry.register::<LogisticRegressionSubsampled>();
        registry
    }

    /// Add an implementation; a later registration replaces one with the same name
    pub fn register<M: ModelImplementation>(&mut self) {
        let registration = Registration {
            name: M::NAME,
            create: create_boxed::<M>,
            restore: restore_boxed::<M>,
        };
        match self.registrations.iter_mut().find(|r| r.name == M::NAME) {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.name).collect()
    }

    /// Names to run: everything registered when `enabled` is empty,
    /// otherwise exactly the listed ones
    pub fn activated(&self, enabled: &[String]) -> Result<Vec<&'static str>> {
        if enabled.is_empty() {
            return Ok(self.names());
        }
        enabled
            .iter()
            .map(|name| self.lookup(name).map(|r| r.name))
            .collect()
    }

    /// Fresh instance of `name` bound to `category`
    pub fn create(&self, name: &str, category: Sdg, config: &Config) -> Result<Model> {
        let registration = self.lookup(name)?;
        let inner = (registration.create)(category, config)?;
        Ok(Model::new(category, registration.name, inner))
    }

    /// Load a persisted artifact
    pub fn restore(&self, path: &Path) -> Result<Model> {
        let artifact = ModelArtifact::read(path)?;
        let declared: ModelKind = artifact.model_type.parse()?;
        let registration = self.lookup(&artifact.model_name)?;

        let inner = (registration.restore)(artifact.sdg, artifact.state)?;
        if inner.kind() != declared {
            return Err(AnalyticsError::Malformed {
                path: path.to_path_buf(),
                reason: format!(
                    "artifact declares '{}' but {} is '{}'",
                    declared,
                    registration.name,
                    inner.kind()
                ),
            });
        }

        Ok(Model::restored(
            artifact.sdg,
            registration.name,
            artifact.trained_at,
            inner,
        ))
    }

    fn lookup(&self, name: &str) -> Result<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| AnalyticsError::UnknownModel(name.to_string()))
    }
}
