//! Deterministic dataset splitting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{DimorphError, Result};

/// Train/test index sets of one fold.
#[derive(Debug, Clone)]
pub struct FoldSplit {
    /// Indices outside the held-out fold.
    pub train: Vec<usize>,
    /// Indices of the held-out fold.
    pub test: Vec<usize>,
}

/// Stratified k-fold assignment over binary labels.
///
/// Indices of each label class are shuffled with the seeded generator and
/// dealt round-robin over the folds, so every fold's label mix tracks the
/// dataset's. The same seed always produces the same folds.
pub fn stratified_k_fold(labels: &[u8], folds: usize, seed: u64) -> Result<Vec<FoldSplit>> {
    if folds < 2 {
        return Err(DimorphError::InvalidConfig {
            message: format!("folds must be at least 2, got {folds}"),
        });
    }
    if labels.len() < folds {
        return Err(DimorphError::InvalidConfig {
            message: format!(
                "cannot split {} samples into {folds} folds",
                labels.len()
            ),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![0usize; labels.len()];
    for class in [0u8, 1u8] {
        let mut indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        indices.shuffle(&mut rng);
        for (position, index) in indices.into_iter().enumerate() {
            assignment[index] = position % folds;
        }
    }

    let splits = (0..folds)
        .map(|fold| {
            let (test, train) = (0..labels.len()).partition(|&i| assignment[i] == fold);
            FoldSplit { train, test }
        })
        .collect();
    Ok(splits)
}

/// Seeded shuffle split into a kept part and a held-out fraction.
///
/// Returns `(kept, held_out)`. The held-out part always gets at least one
/// element.
pub fn shuffle_split(
    indices: &[usize],
    held_out_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if indices.len() < 2 {
        return Err(DimorphError::InvalidConfig {
            message: format!("cannot split {} samples", indices.len()),
        });
    }
    if !(0.0..1.0).contains(&held_out_fraction) || held_out_fraction <= 0.0 {
        return Err(DimorphError::InvalidConfig {
            message: format!("held-out fraction must be in (0, 1), got {held_out_fraction}"),
        });
    }

    let mut shuffled = indices.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let held = ((indices.len() as f64 * held_out_fraction).round() as usize)
        .clamp(1, indices.len() - 1);
    let kept = shuffled.split_off(held);
    Ok((kept, shuffled))
}
