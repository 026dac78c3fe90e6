// Deterministic dataset splitting
//
// Two-stage shuffle split for train/dev/test/traindev, plus stratified k-fold
// assignment shared by dataset cross-validation and the ML grid search.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

use crate::errors::{AnalyticsError, Result};
use crate::storage::DocumentRecord;

/// Share of the full set held out as `test`
pub const TEST_FRACTION: f64 = 0.2;

/// Share of `traindev` held out as `dev` (0.25 * 80% = 20%)
pub const DEV_FRACTION: f64 = 0.25;

/// The four partitions of one project
#[derive(Debug, Clone, PartialEq)]
pub struct Splits {
    pub train: Vec<DocumentRecord>,
    pub dev: Vec<DocumentRecord>,
    pub test: Vec<DocumentRecord>,
    pub traindev: Vec<DocumentRecord>,
}

/// Shuffle with `seed` and hold out `ceil(test_fraction * n)` items.
/// Returns `(kept, held_out)`.
pub fn train_test_split<T: Clone>(items: &[T], test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let n_test = (test_fraction * items.len() as f64).ceil() as usize;
    let n_test = n_test.min(items.len());

    let mut order: Vec<usize> = (0..items.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let held_out = order[..n_test].iter().map(|&i| items[i].clone()).collect();
    let kept = order[n_test..].iter().map(|&i| items[i].clone()).collect();
    (kept, held_out)
}

/// 60/20/20 split with `traindev` = `train` + `dev`
pub fn split(records: &[DocumentRecord], seed: u64) -> Splits {
    let (traindev, test) = train_test_split(records, TEST_FRACTION, seed);
    let (train, dev) = train_test_split(&traindev, DEV_FRACTION, seed);

    Splits {
        train,
        dev,
        test,
        traindev,
    }
}

/// Assign positions to `k` folds, stratified on `keys`.
///
/// Members of each stratum are shuffled, then dealt round-robin with a counter
/// that carries across strata, so fold sizes differ by at most one. Returns the
/// held-out positions of each fold; every position appears in exactly one fold.
pub fn stratified_folds<K: Ord + Clone>(keys: &[K], k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(AnalyticsError::Config(format!(
            "cross-validation needs at least 2 folds, got {}",
            k
        )));
    }
    if k > keys.len() {
        return Err(AnalyticsError::Config(format!(
            "cannot build {} folds from {} records",
            k,
            keys.len()
        )));
    }

    let mut strata: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (position, key) in keys.iter().enumerate() {
        strata.entry(key.clone()).or_default().push(position);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0usize;

    for members in strata.values_mut() {
        members.shuffle(&mut rng);
        for &position in members.iter() {
            folds[next % k].push(position);
            next += 1;
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// `k` (train_fold, dev_fold) pairs stratified on a grouping column
pub fn stratified_k_fold(
    records: &[DocumentRecord],
    column: &str,
    k: usize,
    seed: u64,
) -> Result<Vec<(Vec<DocumentRecord>, Vec<DocumentRecord>)>> {
    let keys = records
        .iter()
        .map(|record| record.field_text(column))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| AnalyticsError::MissingColumns {
            columns: vec![column.to_string()],
        })?;

    let folds = stratified_folds(&keys, k, seed)?;
    let pairs = folds
        .iter()
        .map(|dev_positions| {
            let mut in_dev = vec![false; records.len()];
            for &p in dev_positions {
                in_dev[p] = true;
            }
            let (dev, train): (Vec<_>, Vec<_>) = records
                .iter()
                .cloned()
                .enumerate()
                .partition(|(position, _)| in_dev[*position]);
            (
                train.into_iter().map(|(_, r)| r).collect(),
                dev.into_iter().map(|(_, r)| r).collect(),
            )
        })
        .collect();

    Ok(pairs)
}
