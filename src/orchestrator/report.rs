// Run reports for batch training and prediction

use serde::Serialize;
use std::fmt;

use crate::errors::AnalyticsError;
use crate::taxonomy::Sdg;

/// One (category, implementation[, project]) combination of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub category: Sdg,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Unit {
    pub fn new(category: Sdg, model_name: impl Into<String>, project: Option<&str>) -> Self {
        Self {
            category,
            model_name: model_name.into(),
            project: project.map(str::to_string),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.category, self.model_name)?;
        if let Some(project) = &self.project {
            write!(f, " / {}", project)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub unit: Unit,
    pub error: String,
}

/// Outcome of every unit of a batch; a failed unit never stops the others
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub completed: Vec<Unit>,
    pub skipped: Vec<Unit>,
    pub failed: Vec<Failure>,
}

impl RunReport {
    pub(crate) fn complete(&mut self, unit: Unit) {
        self.completed.push(unit);
    }

    pub(crate) fn skip(&mut self, unit: Unit) {
        self.skipped.push(unit);
    }

    pub(crate) fn fail(&mut self, unit: Unit, error: &AnalyticsError) {
        tracing::error!(unit = %unit, error = %error, "Unit failed");
        self.failed.push(Failure {
            unit,
            error: error.to_string(),
        });
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} skipped, {} failed",
            self.completed.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}
