// Binary logistic regression on TF-IDF rows
//
// Fitting is done by smartcore on a dense copy of the training rows, with
// `alpha = 1 / C`. Probabilities are computed from the fitted coefficients so
// prediction works on sparse rows directly.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use smartcore::numbers::realnum::RealNumber;

use super::tfidf::SparseVector;
use crate::errors::{AnalyticsError, Result};

type Estimator = LogisticRegression<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct BinaryLogisticRegression {
    estimator: Estimator,
}

fn densify(rows: &[SparseVector], n_features: usize) -> Result<DenseMatrix<f64>> {
    let dense: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| {
            let mut values = vec![0.0; n_features];
            for &(column, x) in row {
                values[column] = x;
            }
            values
        })
        .collect();
    DenseMatrix::from_2d_vec(&dense)
        .map_err(|e| AnalyticsError::Training(format!("cannot build feature matrix: {}", e)))
}

impl BinaryLogisticRegression {
    /// Fit on sparse rows with `n_features` columns and 0/1 labels
    pub fn fit(rows: &[SparseVector], labels: &[u8], n_features: usize, c: f64) -> Result<Self> {
        if n_features == 0 {
            return Err(AnalyticsError::Training(
                "empty vocabulary, nothing to fit".to_string(),
            ));
        }

        let x = densify(rows, n_features)?;
        let y: Vec<u32> = labels.iter().map(|&label| u32::from(label)).collect();
        let params = LogisticRegressionParameters::default().with_alpha(1.0 / c);
        let estimator = LogisticRegression::fit(&x, &y, params)
            .map_err(|e| AnalyticsError::Training(format!("logistic regression failed: {}", e)))?;

        let (classes, columns) = estimator.coefficients().shape();
        if classes != 1 || columns != n_features {
            return Err(AnalyticsError::Training(format!(
                "expected a binary model over {} features, got {}x{} coefficients",
                n_features, classes, columns
            )));
        }
        Ok(Self { estimator })
    }

    pub fn weights(&self) -> Vec<f64> {
        let coefficients = self.estimator.coefficients();
        (0..coefficients.shape().1)
            .map(|column| *coefficients.get((0, column)))
            .collect()
    }

    pub fn decision(&self, row: &SparseVector) -> f64 {
        let coefficients = self.estimator.coefficients();
        let width = coefficients.shape().1;
        *self.estimator.intercept().get((0, 0))
            + row
                .iter()
                .filter(|(column, _)| *column < width)
                .map(|&(column, x)| *coefficients.get((0, column)) * x)
                .sum::<f64>()
    }

    /// `[p(0), p(1)]`
    pub fn predict_proba(&self, row: &SparseVector) -> [f64; 2] {
        let p = self.decision(row).sigmoid();
        [1.0 - p, p]
    }
}
