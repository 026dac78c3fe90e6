// Confusion-matrix metrics
//
// Undefined ratios are NaN, never zero: zero precision and "no positive
// predictions" mean different things when comparing models.

use serde::{Deserialize, Serialize};

use crate::storage::Datatype;
use crate::taxonomy::Sdg;

/// Classification of one prediction against its ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "TP")]
    TruePositive,
    #[serde(rename = "FP")]
    FalsePositive,
    #[serde(rename = "TN")]
    TrueNegative,
    #[serde(rename = "FN")]
    FalseNegative,
}

impl Outcome {
    pub fn classify(predicted: u8, actual: u8) -> Self {
        match (predicted == 1, actual == 1) {
            (true, true) => Outcome::TruePositive,
            (true, false) => Outcome::FalsePositive,
            (false, true) => Outcome::FalseNegative,
            (false, false) => Outcome::TrueNegative,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.true_positives += 1,
            Outcome::FalsePositive => self.false_positives += 1,
            Outcome::TrueNegative => self.true_negatives += 1,
            Outcome::FalseNegative => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// TP / (TP + FP), NaN without positive predictions
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN), NaN without positive ground truth
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        f1_score(self.precision(), self.recall())
    }
}

impl FromIterator<Outcome> for ConfusionCounts {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut counts = Self::default();
        for outcome in iter {
            counts.record(outcome);
        }
        counts
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Harmonic mean; NaN if either input is NaN or both are zero
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision.is_nan() || recall.is_nan() || (precision == 0.0 && recall == 0.0) {
        return f64::NAN;
    }
    2.0 * precision * recall / (precision + recall)
}

/// One row of the aggregated results table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub sdg: Sdg,
    pub model_name: String,
    pub project_name: String,
    pub datatype: Datatype,
    #[serde(with = "nan_as_null")]
    pub precision: f64,
    #[serde(with = "nan_as_null")]
    pub recall: f64,
    #[serde(with = "nan_as_null")]
    pub f1: f64,
    #[serde(rename = "TP")]
    pub tp: usize,
    #[serde(rename = "FP")]
    pub fp: usize,
    #[serde(rename = "TN")]
    pub tn: usize,
    #[serde(rename = "FN")]
    pub r#fn: usize,
}

impl EvaluationRecord {
    pub fn new(
        sdg: Sdg,
        model_name: impl Into<String>,
        project_name: impl Into<String>,
        datatype: Datatype,
        counts: ConfusionCounts,
    ) -> Self {
        Self {
            sdg,
            model_name: model_name.into(),
            project_name: project_name.into(),
            datatype,
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
            tp: counts.true_positives,
            fp: counts.false_positives,
            tn: counts.true_negatives,
            r#fn: counts.false_negatives,
        }
    }
}

/// NaN is written as `null` and `null` is read back as NaN
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
