// Evaluation engine
//
// Joins every prediction file with the ground truth of its source partition,
// writes the per-record outcome back into the file and regenerates the
// aggregated results table.

use std::collections::HashMap;

use super::metrics::{ConfusionCounts, EvaluationRecord, Outcome};
use crate::errors::{AnalyticsError, Result};
use crate::storage::{read_records, write_records, Coordinate, DatasetStore, Datatype, PredictionRecord};

pub struct EvaluationEngine<'a> {
    store: &'a DatasetStore,
}

impl<'a> EvaluationEngine<'a> {
    pub fn new(store: &'a DatasetStore) -> Self {
        Self { store }
    }

    /// Evaluate one prediction file, enriching its records in place
    pub fn evaluate(&self, coordinate: &Coordinate) -> Result<EvaluationRecord> {
        let missing = |field: &'static str| AnalyticsError::MissingCoordinateField {
            datatype: Datatype::Predictions.as_str(),
            field,
        };
        let category = coordinate.category.ok_or_else(|| missing("category"))?;
        let model_name = coordinate.model_name.as_deref().ok_or_else(|| missing("model_name"))?;
        let project = coordinate.project.as_deref().ok_or_else(|| missing("project"))?;
        let source = coordinate.source.ok_or_else(|| missing("source"))?;

        let truth: HashMap<usize, u8> = self
            .store
            .load_for_category(source, category, project)?
            .iter()
            .map(|document| (document.index, document.binary_label(category)))
            .collect();

        let path = self.store.resolver().resolve(coordinate)?;
        let mut predictions: Vec<PredictionRecord> = read_records(&path)?;
        let mut counts = ConfusionCounts::default();
        for record in &mut predictions {
            let actual = *truth.get(&record.index).ok_or_else(|| AnalyticsError::Malformed {
                path: path.clone(),
                reason: format!(
                    "document index {} is not in the {} partition of {}",
                    record.index, source, project
                ),
            })?;
            let outcome = Outcome::classify(record.prediction.prediction, actual);
            record.original_label = Some(actual);
            record.comparison = Some(outcome);
            counts.record(outcome);
        }
        write_records(&path, &predictions)?;

        let evaluation = EvaluationRecord::new(category, model_name, project, source, counts);
        tracing::info!(
            category = %category,
            model = model_name,
            project = project,
            datatype = %source,
            documents = counts.total(),
            precision = evaluation.precision,
            recall = evaluation.recall,
            f1 = evaluation.f1,
            "Evaluated predictions"
        );
        Ok(evaluation)
    }

    /// Evaluate every prediction file and overwrite the aggregated results.
    ///
    /// A file that fails to evaluate does not stop the others. The table is
    /// rewritten with the rows that succeeded, then the first error is returned.
    pub fn evaluate_all(&self) -> Result<Vec<EvaluationRecord>> {
        let resolver = self.store.resolver();
        let discovered = resolver.discover(&Coordinate::any(Datatype::Predictions))?;
        if discovered.is_empty() {
            tracing::warn!(
                dir = %resolver.directory(Datatype::Predictions).display(),
                "No prediction files found"
            );
        }

        let mut results = Vec::with_capacity(discovered.len());
        let mut first_error = None;
        for (path, coordinate) in &discovered {
            match self.evaluate(coordinate) {
                Ok(record) => results.push(record),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Evaluation failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        let path = resolver.results_file();
        write_records(&path, &results)?;
        tracing::info!(rows = results.len(), path = %path.display(), "Wrote evaluation results");
        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// The aggregated results of the last full run
    pub fn load_results(&self) -> Result<Vec<EvaluationRecord>> {
        read_records(&self.store.resolver().results_file())
    }
}
