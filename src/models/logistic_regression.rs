// Logistic regression over TF-IDF with majority-class under-sampling
//
// When grid search is enabled, `train` searches the hyperparameter grid with
// stratified folds (reduced to the minority-class count) and keeps the best
// configuration; otherwise it fits the default configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::contract::{Classifier, ModelKind};
use super::pipeline::{effective_folds, grid_search, HyperParams, TextPipeline};
use super::registry::ModelImplementation;
use crate::config::Config;
use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

#[derive(Debug, Serialize, Deserialize)]
pub struct LogisticRegressionSubsampled {
    category: Sdg,
    seed: u64,
    grid_search: bool,
    folds: usize,
    /// Mean fold accuracy of the kept configuration, when it came from a search
    best_score: Option<f64>,
    pipeline: Option<TextPipeline>,
}

impl LogisticRegressionSubsampled {
    pub fn params(&self) -> Option<HyperParams> {
        self.pipeline.as_ref().map(TextPipeline::params)
    }

    fn run_search(&mut self, texts: &[String], labels: &[u8], folds: usize) -> Result<f64> {
        let (pipeline, score) = grid_search(texts, labels, &HyperParams::grid(), folds, self.seed)?;
        tracing::info!(
            category = %self.category,
            params = ?pipeline.params(),
            score,
            folds,
            "Grid search finished"
        );
        self.pipeline = Some(pipeline);
        self.best_score = Some(score);
        Ok(score)
    }
}

impl Classifier for LogisticRegressionSubsampled {
    fn kind(&self) -> ModelKind {
        ModelKind::Ml
    }

    fn fit(&mut self, texts: &[String], labels: &[u8]) -> Result<()> {
        let folds = effective_folds(labels, self.folds);
        if self.grid_search && folds >= 2 {
            self.run_search(texts, labels, folds)?;
            return Ok(());
        }

        if self.grid_search {
            tracing::warn!(
                category = %self.category,
                requested = self.folds,
                "Too few minority-class documents for grid search, using defaults"
            );
        }
        self.pipeline = Some(TextPipeline::fit(texts, labels, HyperParams::default(), self.seed)?);
        self.best_score = None;
        Ok(())
    }

    fn predict_proba(&self, text: &str) -> Result<[f64; 2]> {
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            AnalyticsError::Training("estimator has not been fitted".to_string())
        })?;
        Ok(pipeline.predict_proba(text))
    }

    fn search(&mut self, texts: &[String], labels: &[u8], folds: usize) -> Result<f64> {
        let usable = effective_folds(labels, folds);
        if usable < 2 {
            return Err(AnalyticsError::Training(format!(
                "cross-validation needs at least 2 documents of each class, got {} folds",
                usable
            )));
        }
        if usable < folds {
            tracing::warn!(
                category = %self.category,
                requested = folds,
                usable,
                "Reducing folds to the minority-class count"
            );
        }
        self.run_search(texts, labels, usable)
    }

    fn state(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| AnalyticsError::Training(format!("cannot serialize estimator: {}", e)))
    }
}

impl ModelImplementation for LogisticRegressionSubsampled {
    const NAME: &'static str = "logistic_regression_subsampled";

    fn create(category: Sdg, config: &Config) -> Result<Self> {
        Ok(Self {
            category,
            seed: config.data.seed,
            grid_search: config.training.grid_search,
            folds: config.data.folds,
            best_score: None,
            pipeline: None,
        })
    }

    fn restore(category: Sdg, state: Value) -> Result<Self> {
        let mut model: Self = serde_json::from_value(state)
            .map_err(|e| AnalyticsError::Training(format!("invalid estimator state: {}", e)))?;
        if model.pipeline.is_none() {
            return Err(AnalyticsError::Training(
                "artifact holds no fitted estimator".to_string(),
            ));
        }
        model.category = category;
        Ok(model)
    }
}
