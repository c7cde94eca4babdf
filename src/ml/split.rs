//! Seeded stratified train/test split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::error::PipelineError;

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of held-out rows for `n` samples.
pub fn test_count(n: usize, test_size: f64) -> usize {
    // Guard the ceiling against products like 0.3 * 100 landing a hair above 30.
    ((test_size * n as f64) - 1e-9).ceil().max(0.0) as usize
}

/// Split `labels` into train/test partitions that preserve class proportions.
///
/// Per-class held-out counts are the floor of each class's exact share, with
/// the leftover rows going to the classes with the largest remainders (ties
/// to the lower class index), so every class proportion in the test partition
/// is within one row of the full dataset's. Every class keeps at least one
/// row in each partition, which can pull a rare class above its share.
pub fn stratified_split(
    labels: &[usize],
    n_classes: usize,
    test_size: f64,
    seed: u64,
) -> Result<SplitIndices, PipelineError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "held-out fraction must be in (0, 1), got {test_size}"
        )));
    }

    let n = labels.len();
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &label) in labels.iter().enumerate() {
        let bucket = by_class.get_mut(label).ok_or_else(|| {
            PipelineError::InsufficientData(format!("label {label} outside 0..{n_classes}"))
        })?;
        bucket.push(row);
    }

    for (class, rows) in by_class.iter().enumerate() {
        if rows.len() < 2 {
            return Err(PipelineError::InsufficientData(format!(
                "class {class} has {} rows; every class needs at least 2 to stratify",
                rows.len()
            )));
        }
    }

    let n_test = test_count(n, test_size);
    let n_train = n - n_test;
    if n_test < n_classes || n_train < n_classes {
        return Err(PipelineError::InsufficientData(format!(
            "a {n}-row dataset leaves {n_train} train / {n_test} test rows for {n_classes} classes"
        )));
    }

    let per_class = allocate(&by_class, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (rows, &take) in by_class.iter_mut().zip(&per_class) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

fn allocate(by_class: &[Vec<usize>], n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = by_class
        .iter()
        .map(|rows| rows.len() as f64 * n_test as f64 / n as f64)
        .collect();
    // Every class gets at least one held-out row.
    let mut counts: Vec<usize> = exact.iter().map(|e| (e.floor() as usize).max(1)).collect();
    while counts.iter().sum::<usize>() > n_test {
        let Some(largest) = (0..counts.len()).max_by_key(|&c| (counts[c], usize::MAX - c)) else {
            break;
        };
        if counts[largest] <= 1 {
            break;
        }
        counts[largest] -= 1;
    }

    let mut order: Vec<usize> = (0..by_class.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    for &class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        // Keep at least one row of each class for training.
        if counts[class] + 1 < by_class[class].len() {
            counts[class] += 1;
            remaining -= 1;
        }
    }
    counts
}
