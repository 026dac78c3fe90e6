// Record types persisted by the dataset store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::evaluation::Outcome;
use crate::models::Prediction;
use crate::taxonomy::Sdg;

/// Span-level annotation: `[start, end, category]`, character offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan(pub usize, pub usize, pub Sdg);

/// One course outline with its annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Position in the project's combined raw set; stable across partitions
    pub index: usize,
    pub text: String,
    /// Union of document-level and span-level categories
    #[serde(default)]
    pub labels: BTreeSet<Sdg>,
    #[serde(default)]
    pub has_label: bool,
    #[serde(default)]
    pub cats: Vec<Sdg>,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
    /// Remaining export columns (department, course code, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DocumentRecord {
    pub fn new(
        index: usize,
        text: impl Into<String>,
        cats: Vec<Sdg>,
        entities: Vec<EntitySpan>,
        fields: Map<String, Value>,
    ) -> Self {
        let labels: BTreeSet<Sdg> = cats
            .iter()
            .copied()
            .chain(entities.iter().map(|span| span.2))
            .collect();

        Self {
            index,
            text: text.into(),
            has_label: !labels.is_empty(),
            labels,
            cats,
            entities,
            fields,
        }
    }

    /// 1 when the document carries `category`, else 0
    pub fn binary_label(&self, category: Sdg) -> u8 {
        u8::from(self.labels.contains(&category))
    }

    /// Column value as text; `None` when the column is absent
    pub fn field_text(&self, column: &str) -> Option<String> {
        match self.fields.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }
}

/// One model output for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub index: usize,
    pub text: String,
    pub prediction: Prediction,
    /// Ground truth, attached by the evaluation engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_label: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Outcome>,
}

impl PredictionRecord {
    pub fn new(index: usize, text: impl Into<String>, prediction: Prediction) -> Self {
        Self {
            index,
            text: text.into(),
            prediction,
            original_label: None,
            comparison: None,
        }
    }
}
