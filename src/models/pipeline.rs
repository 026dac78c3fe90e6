// Text classification pipeline
//
// TF-IDF over all training texts, seeded random under-sampling of the majority
// class, then logistic regression. Grid search scores every hyperparameter
// combination by mean accuracy over stratified folds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::logistic::BinaryLogisticRegression;
use super::tfidf::{SparseVector, TfIdfVectorizer};
use crate::errors::{AnalyticsError, Result};
use crate::storage::split::stratified_folds;

const C_VALUES: [f64; 3] = [0.1, 1.0, 10.0];
const MAX_FEATURES: [usize; 3] = [1000, 5000, 10000];
const NGRAM_RANGES: [(usize, usize); 2] = [(1, 1), (1, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    /// `None` keeps the whole vocabulary
    pub max_features: Option<usize>,
    pub ngram_range: (usize, usize),
    /// Inverse regularization strength
    pub c: f64,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            max_features: None,
            ngram_range: (1, 1),
            c: 1.0,
        }
    }
}

impl HyperParams {
    /// Search space, C outermost and n-gram range innermost
    pub fn grid() -> Vec<HyperParams> {
        let mut grid = Vec::with_capacity(C_VALUES.len() * MAX_FEATURES.len() * NGRAM_RANGES.len());
        for c in C_VALUES {
            for max_features in MAX_FEATURES {
                for ngram_range in NGRAM_RANGES {
                    grid.push(HyperParams {
                        max_features: Some(max_features),
                        ngram_range,
                        c,
                    });
                }
            }
        }
        grid
    }
}

/// Counts of (negative, positive) labels
pub fn class_counts(labels: &[u8]) -> (usize, usize) {
    let positive = labels.iter().filter(|&&l| l == 1).count();
    (labels.len() - positive, positive)
}

/// Positions kept after dropping random majority-class items down to the
/// minority-class count, in ascending order
fn under_sample(labels: &[u8], seed: u64) -> Vec<usize> {
    let (negatives, positives): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i] == 0);

    let (mut majority, minority) = if negatives.len() >= positives.len() {
        (negatives, positives)
    } else {
        (positives, negatives)
    };

    let mut rng = StdRng::seed_from_u64(seed);
    majority.shuffle(&mut rng);
    majority.truncate(minority.len());

    let mut kept: Vec<usize> = majority.into_iter().chain(minority).collect();
    kept.sort_unstable();
    kept
}

/// Fitted vectorizer and classifier
#[derive(Debug, Serialize, Deserialize)]
pub struct TextPipeline {
    params: HyperParams,
    vectorizer: TfIdfVectorizer,
    classifier: BinaryLogisticRegression,
}

impl TextPipeline {
    pub fn fit(texts: &[String], labels: &[u8], params: HyperParams, seed: u64) -> Result<Self> {
        let (negatives, positives) = class_counts(labels);
        if negatives == 0 || positives == 0 {
            return Err(AnalyticsError::Training(format!(
                "need both classes to fit, got {} negative and {} positive",
                negatives, positives
            )));
        }

        let vectorizer = TfIdfVectorizer::fit(texts, params.max_features, params.ngram_range);

        let kept = under_sample(labels, seed);
        let rows: Vec<SparseVector> = kept.iter().map(|&i| vectorizer.transform(&texts[i])).collect();
        let sampled_labels: Vec<u8> = kept.iter().map(|&i| labels[i]).collect();
        let classifier =
            BinaryLogisticRegression::fit(&rows, &sampled_labels, vectorizer.len(), params.c)?;

        Ok(Self {
            params,
            vectorizer,
            classifier,
        })
    }

    pub fn params(&self) -> HyperParams {
        self.params
    }

    pub fn predict_proba(&self, text: &str) -> [f64; 2] {
        self.classifier.predict_proba(&self.vectorizer.transform(text))
    }

    fn accuracy(&self, texts: &[&String], labels: &[u8]) -> f64 {
        if texts.is_empty() {
            return f64::NAN;
        }
        let correct = texts
            .iter()
            .zip(labels)
            .filter(|(text, label)| {
                let [p0, p1] = self.predict_proba(text);
                u8::from(p1 > p0) == **label
            })
            .count();
        correct as f64 / texts.len() as f64
    }
}

/// Folds actually usable: no more than the minority-class count
pub fn effective_folds(labels: &[u8], requested: usize) -> usize {
    let (negatives, positives) = class_counts(labels);
    requested.min(negatives.min(positives))
}

/// Exhaustive search over `grid`; returns the best configuration refitted on
/// all data with its mean fold accuracy. The first of equally scoring
/// configurations wins.
pub fn grid_search(
    texts: &[String],
    labels: &[u8],
    grid: &[HyperParams],
    folds: usize,
    seed: u64,
) -> Result<(TextPipeline, f64)> {
    let assignments = stratified_folds(labels, folds, seed)?;

    let mut best: Option<(HyperParams, f64)> = None;
    for &params in grid {
        let mut total = 0.0;
        for held_out in &assignments {
            let mut in_fold = vec![false; texts.len()];
            for &position in held_out {
                in_fold[position] = true;
            }

            let (train_texts, train_labels): (Vec<String>, Vec<u8>) = texts
                .iter()
                .zip(labels)
                .enumerate()
                .filter(|(i, _)| !in_fold[*i])
                .map(|(_, (text, &label))| (text.clone(), label))
                .unzip();
            let fold_texts: Vec<&String> = held_out.iter().map(|&i| &texts[i]).collect();
            let fold_labels: Vec<u8> = held_out.iter().map(|&i| labels[i]).collect();

            let pipeline = TextPipeline::fit(&train_texts, &train_labels, params, seed)?;
            total += pipeline.accuracy(&fold_texts, &fold_labels);
        }

        let score = total / assignments.len() as f64;
        tracing::debug!(?params, score, "Grid search candidate");
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((params, score));
        }
    }

    let (params, score) =
        best.ok_or_else(|| AnalyticsError::Training("empty hyperparameter grid".to_string()))?;
    let pipeline = TextPipeline::fit(texts, labels, params, seed)?;
    Ok((pipeline, score))
}
