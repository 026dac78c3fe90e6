// Evaluation
// Confusion-matrix metrics per prediction file and the aggregated results table

mod engine;
mod metrics;

pub use engine::EvaluationEngine;
pub use metrics::{f1_score, ConfusionCounts, EvaluationRecord, Outcome};
