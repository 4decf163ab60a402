//! Seeded train/held-out split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_fraction)` rows.
///
/// At least one training row always remains. Fewer than two rows are all
/// used for training.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < 2 {
        return Split {
            train: indices,
            test: Vec::new(),
        };
    }

    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let fraction = test_fraction.clamp(0.0, 1.0);
    let test_len = ((n as f64 * fraction).ceil() as usize).min(n - 1);
    let train = indices.split_off(test_len);

    Split { train, test: indices }
}
