// Batch training

use std::path::PathBuf;

use super::report::{RunReport, Unit};
use super::Orchestrator;
use crate::errors::{AnalyticsError, Result};
use crate::storage::{validate_name, Coordinate, Datatype, DocumentRecord};
use crate::taxonomy::Sdg;

/// Texts and labels binarized for one category
fn training_set(documents: &[DocumentRecord], category: Sdg) -> (Vec<String>, Vec<u8>) {
    documents
        .iter()
        .map(|document| (document.text.clone(), document.binary_label(category)))
        .unzip()
}

impl Orchestrator<'_> {
    /// Train and persist every activated implementation for every category
    pub fn train_all(&self, project: &str) -> Result<RunReport> {
        validate_name(project)?;
        let datatype = self.config.training_datatype()?;
        let names = self.registry.activated(&self.config.models.enabled)?;
        self.ensure_project(datatype, project)?;

        tracing::info!(
            project = project,
            datatype = %datatype,
            models = names.len(),
            "Training all models"
        );

        let mut report = RunReport::default();
        for category in Sdg::ALL {
            let documents = match self.store.load_for_category(datatype, category, project) {
                Ok(documents) => documents,
                Err(e) => {
                    for name in &names {
                        report.fail(Unit::new(category, *name, Some(project)), &e);
                    }
                    continue;
                }
            };
            let (texts, labels) = training_set(&documents, category);

            for name in &names {
                let unit = Unit::new(category, *name, Some(project));
                match self.train_unit(name, category, &texts, &labels) {
                    Ok(path) => {
                        tracing::info!(
                            category = %category,
                            model = name,
                            path = %path.display(),
                            "Saved model"
                        );
                        report.complete(unit);
                    }
                    Err(e) => report.fail(unit, &e),
                }
            }
        }

        tracing::info!(project = project, summary = %report, "Training finished");
        Ok(report)
    }

    fn train_unit(&self, name: &str, category: Sdg, texts: &[String], labels: &[u8]) -> Result<PathBuf> {
        let mut model = self.registry.create(name, category, self.config)?;
        model.train(texts, labels)?;
        let path = self.store.resolver().resolve(&Coordinate::model(category, name))?;
        model.persist(&path)?;
        Ok(path)
    }

    /// Hyperparameter search for one ML implementation and category; the
    /// winning configuration replaces the persisted artifact
    pub fn cross_validate(
        &self,
        project: &str,
        name: &str,
        category: Sdg,
        folds: Option<usize>,
    ) -> Result<f64> {
        validate_name(project)?;
        let datatype = self.config.training_datatype()?;
        self.ensure_project(datatype, project)?;

        let documents = self.store.load_for_category(datatype, category, project)?;
        let (texts, labels) = training_set(&documents, category);

        let mut model = self.registry.create(name, category, self.config)?;
        let folds = folds.unwrap_or(self.config.data.folds);
        let score = model.cross_validate(&texts, &labels, folds)?;

        let path = self.store.resolver().resolve(&Coordinate::model(category, name))?;
        model.persist(&path)?;
        tracing::info!(
            category = %category,
            model = name,
            project = project,
            score,
            path = %path.display(),
            "Cross-validated model saved"
        );
        Ok(score)
    }

    fn ensure_project(&self, datatype: Datatype, project: &str) -> Result<()> {
        if self.store.discover_projects(Some(datatype))?.contains(project) {
            Ok(())
        } else {
            Err(AnalyticsError::NotFound(
                self.store.resolver().directory(datatype).join(project),
            ))
        }
    }
}
