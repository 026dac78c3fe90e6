// Model Contract - lifecycle shared by every classifier implementation
//
// A model is bound to one category at construction. Implementations declare a
// `ModelKind` and supply only the hooks for that kind; `Model` dispatches on the
// kind and rejects anything the active kind does not support.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

/// Free-form prediction details (confidence, matched keywords, spans)
pub type Metadata = Map<String, Value>;

/// Declared variant of an implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Rules,
    Ml,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Rules => "rules",
            ModelKind::Ml => "ml",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rules" => Ok(ModelKind::Rules),
            "ml" => Ok(ModelKind::Ml),
            other => Err(AnalyticsError::UnknownModelType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Trained,
}

/// Output of one model for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: Sdg,
    /// 0 or 1
    pub prediction: u8,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Variant-specific hooks of a classifier implementation.
///
/// Every hook defaults to `Unsupported`; a rules implementation overrides
/// `evaluate_rules`, an ml implementation overrides `fit`, `predict_proba`
/// and `search`.
pub trait Classifier: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Evaluate the fixed trigger conditions: label plus matched triggers
    fn evaluate_rules(&self, _text: &str) -> Result<(u8, Metadata)> {
        Err(self.unsupported("evaluate_rules"))
    }

    /// Fit the estimator on binary labels
    fn fit(&mut self, _texts: &[String], _labels: &[u8]) -> Result<()> {
        Err(self.unsupported("fit"))
    }

    /// Class probabilities `[p(0), p(1)]` from the fitted estimator
    fn predict_proba(&self, _text: &str) -> Result<[f64; 2]> {
        Err(self.unsupported("predict_proba"))
    }

    /// Stratified k-fold hyperparameter search; keeps the best configuration
    /// refitted on all data and returns its mean fold accuracy
    fn search(&mut self, _texts: &[String], _labels: &[u8], _folds: usize) -> Result<f64> {
        Err(self.unsupported("cross_validate"))
    }

    /// Serializable trained state
    fn state(&self) -> Result<Value>;

    fn unsupported(&self, operation: &'static str) -> AnalyticsError {
        AnalyticsError::Unsupported {
            operation,
            kind: self.kind().as_str(),
        }
    }
}

/// On-disk form of a trained model
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub sdg: Sdg,
    pub model_name: String,
    pub model_type: String,
    pub trained_at: Option<DateTime<Utc>>,
    pub state: Value,
}

impl ModelArtifact {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalyticsError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|e| AnalyticsError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| AnalyticsError::json(path, e))
    }
}

/// One classifier bound to one category
pub struct Model {
    category: Sdg,
    name: String,
    state: ModelState,
    trained_at: Option<DateTime<Utc>>,
    inner: Box<dyn Classifier>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("category", &self.category)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .finish()
    }
}

impl Model {
    pub(crate) fn new(category: Sdg, name: impl Into<String>, inner: Box<dyn Classifier>) -> Self {
        Self {
            category,
            name: name.into(),
            state: ModelState::Uninitialized,
            trained_at: None,
            inner,
        }
    }

    pub(crate) fn restored(
        category: Sdg,
        name: impl Into<String>,
        trained_at: Option<DateTime<Utc>>,
        inner: Box<dyn Classifier>,
    ) -> Self {
        Self {
            state: ModelState::Trained,
            trained_at,
            ..Self::new(category, name, inner)
        }
    }

    pub fn category(&self) -> Sdg {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModelKind {
        self.inner.kind()
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    /// Rules: nothing is learned, the model only becomes ready.
    /// Ml: fit the estimator.
    pub fn train(&mut self, texts: &[String], labels: &[u8]) -> Result<()> {
        check_lengths(texts, labels)?;
        match self.kind() {
            ModelKind::Rules => {}
            ModelKind::Ml => self.inner.fit(texts, labels)?,
        }
        self.mark_trained();
        Ok(())
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        if self.state != ModelState::Trained {
            return Err(AnalyticsError::NotTrained {
                category: self.category.key(),
                model_name: self.name.clone(),
            });
        }

        let (prediction, metadata) = match self.kind() {
            ModelKind::Rules => self.inner.evaluate_rules(text)?,
            ModelKind::Ml => {
                let proba = self.inner.predict_proba(text)?;
                // argmax, ties resolve to the negative class
                let label = usize::from(proba[1] > proba[0]);
                let mut metadata = Metadata::new();
                metadata.insert("confidence".to_string(), Value::from(proba[label]));
                (label as u8, metadata)
            }
        };

        Ok(Prediction {
            category: self.category,
            prediction,
            metadata,
        })
    }

    /// Hyperparameter search over the implementation's grid; ml only
    pub fn cross_validate(&mut self, texts: &[String], labels: &[u8], folds: usize) -> Result<f64> {
        if self.kind() != ModelKind::Ml {
            return Err(self.inner.unsupported("cross_validate"));
        }
        check_lengths(texts, labels)?;
        let score = self.inner.search(texts, labels, folds)?;
        self.mark_trained();
        Ok(score)
    }

    /// Write the artifact as pretty JSON, replacing any previous one
    pub fn persist(&self, path: &Path) -> Result<()> {
        if self.state != ModelState::Trained {
            return Err(AnalyticsError::NotTrained {
                category: self.category.key(),
                model_name: self.name.clone(),
            });
        }

        let artifact = ModelArtifact {
            sdg: self.category,
            model_name: self.name.clone(),
            model_type: self.kind().as_str().to_string(),
            trained_at: self.trained_at,
            state: self.inner.state()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AnalyticsError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&artifact).map_err(|e| AnalyticsError::json(path, e))?;
        fs::write(path, json).map_err(|e| AnalyticsError::io(path, e))?;
        Ok(())
    }

    fn mark_trained(&mut self) {
        self.state = ModelState::Trained;
        self.trained_at = Some(Utc::now());
    }
}

fn check_lengths(texts: &[String], labels: &[u8]) -> Result<()> {
    if texts.len() != labels.len() {
        return Err(AnalyticsError::Training(format!(
            "{} texts but {} labels",
            texts.len(),
            labels.len()
        )));
    }
    Ok(())
}
