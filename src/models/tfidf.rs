// TF-IDF vectorizer
//
// Vocabulary is capped at `max_features` terms by corpus frequency (ties broken
// alphabetically). idf = ln((1 + n) / (1 + df)) + 1, rows are l2-normalized.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::text::{ngrams, tokenize_and_stem};

/// Sparse row: (column, weight) sorted by column
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    ngram_range: (usize, usize),
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    pub fn fit(texts: &[String], max_features: Option<usize>, ngram_range: (usize, usize)) -> Self {
        let documents: Vec<Vec<String>> = texts
            .iter()
            .map(|text| ngrams(&tokenize_and_stem(text), ngram_range))
            .collect();

        let mut term_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut document_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for document in &documents {
            for term in document {
                *term_counts.entry(term.as_str()).or_insert(0) += 1;
            }
            let unique: BTreeSet<&str> = document.iter().map(String::as_str).collect();
            for term in unique {
                *document_counts.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        if let Some(limit) = max_features {
            // BTreeMap order is alphabetical; a stable sort keeps it among ties
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            ranked.truncate(limit);
        }
        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n = documents.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = document_counts.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(column, term)| (term.to_string(), column))
            .collect();

        Self {
            ngram_range,
            vocabulary,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in ngrams(&tokenize_and_stem(text), self.ngram_range) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.idf[column]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut row {
                *weight /= norm;
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "water water energy".to_string(),
            "water policy".to_string(),
            "energy markets".to_string(),
        ]
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let vectorizer = TfIdfVectorizer::fit(&corpus(), Some(2), (1, 1));
        assert_eq!(vectorizer.len(), 2);
        let terms: Vec<&String> = vectorizer.vocabulary.keys().collect();
        assert_eq!(terms, vec!["energi", "water"]);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let vectorizer = TfIdfVectorizer::fit(&corpus(), None, (1, 2));
        let row = vectorizer.transform("water energy policy");
        let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(row.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn test_unknown_terms_give_empty_row() {
        let vectorizer = TfIdfVectorizer::fit(&corpus(), None, (1, 1));
        assert!(vectorizer.transform("astronomy").is_empty());
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let vectorizer = TfIdfVectorizer::fit(&corpus(), None, (1, 1));
        let row = vectorizer.transform("water policy");
        let water = vectorizer.vocabulary["water"];
        let policy = vectorizer.vocabulary["polici"];
        let weight = |column: usize| row.iter().find(|(c, _)| *c == column).map(|(_, w)| *w).unwrap();
        assert!(weight(policy) > weight(water));
    }
}
