// Batch prediction

use std::collections::HashSet;
use std::path::PathBuf;

use super::report::{RunReport, Unit};
use super::Orchestrator;
use crate::errors::{AnalyticsError, Result};
use crate::models::Model;
use crate::storage::{Coordinate, Datatype, PredictionRecord};
use crate::taxonomy::Sdg;

impl Orchestrator<'_> {
    /// Predict `datatype` partitions with every persisted model not in `ignore`.
    /// Existing prediction files are kept when `overwrite` is false.
    pub fn predict_all(
        &self,
        datatype: Datatype,
        ignore: &HashSet<String>,
        overwrite: bool,
    ) -> Result<RunReport> {
        if !datatype.is_dataset() {
            return Err(AnalyticsError::Config(format!(
                "cannot predict on '{}'",
                datatype
            )));
        }

        let artifacts = self
            .store
            .resolver()
            .discover(&Coordinate::any(Datatype::Models))?;
        tracing::info!(datatype = %datatype, models = artifacts.len(), "Predicting with all models");

        let mut report = RunReport::default();
        for (path, coordinate) in artifacts {
            let (Some(category), Some(name)) = (coordinate.category, coordinate.model_name.as_deref()) else {
                continue;
            };

            if ignore.contains(name) {
                tracing::info!(category = %category, model = name, "Skipping ignored model");
                report.skip(Unit::new(category, name, None));
                continue;
            }

            let projects = match self.store.projects_with_data(datatype, category) {
                Ok(projects) => projects,
                Err(e) => {
                    report.fail(Unit::new(category, name, None), &e);
                    continue;
                }
            };

            // restored on first use, then shared by every project; a failed
            // restore fails each remaining project
            let mut model: Option<Result<Model>> = None;
            for project in &projects {
                let unit = Unit::new(category, name, Some(project.as_str()));
                let target = Coordinate::predictions(category, name, project.as_str(), datatype);

                match self.store.exists(&target) {
                    Ok(true) if !overwrite => {
                        tracing::info!(unit = %unit, "Predictions exist, skipping");
                        report.skip(unit);
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        report.fail(unit, &e);
                        continue;
                    }
                }

                let active = match model.get_or_insert_with(|| self.registry.restore(&path)) {
                    Ok(active) => active,
                    Err(e) => {
                        report.fail(unit, e);
                        continue;
                    }
                };

                match self.predict_unit(active, category, project, datatype, &target) {
                    Ok(path) => {
                        tracing::info!(unit = %unit, path = %path.display(), "Saved predictions");
                        report.complete(unit);
                    }
                    Err(e) => report.fail(unit, &e),
                }
            }
        }

        tracing::info!(datatype = %datatype, summary = %report, "Prediction finished");
        Ok(report)
    }

    fn predict_unit(
        &self,
        model: &Model,
        category: Sdg,
        project: &str,
        datatype: Datatype,
        target: &Coordinate,
    ) -> Result<PathBuf> {
        let documents = self.store.load_for_category(datatype, category, project)?;
        let records = documents
            .into_iter()
            .map(|document| {
                let prediction = model.predict(&document.text)?;
                Ok(PredictionRecord::new(document.index, document.text, prediction))
            })
            .collect::<Result<Vec<_>>>()?;
        self.store.save(&records, target)
    }
}
