//! Evaluation metrics for the binary KOI classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display names of the two classes, indexed by class.
pub const CLASS_LABELS: [&str; 2] = ["Confirmed Planet", "Candidate"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Tally aligned truth/prediction pairs.
    pub fn from_predictions(truth: &[usize], predicted: &[usize], n_classes: usize) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Rows = actual class, columns = predicted class.
    pub fn rows(&self) -> Vec<Vec<u32>> {
        self.counts
            .chunks(self.n_classes.max(1))
            .map(|r| r.to_vec())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Precision/recall statistics for a single class.
pub struct ClassMetrics {
    pub label: String,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    pub f1: f64,
    /// Total number of true examples for the class.
    pub support: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-class precision/recall/F1 with accuracy and macro/weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total_support: u32,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let correct: u64 = (0..cm.n_classes).map(|k| cm.get(k, k) as u64).sum();
    ratio(correct as f64, cm.total() as f64)
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix, labels: &[&str]) -> Self {
        let k = cm.n_classes;
        let mut classes = Vec::with_capacity(k);
        for class_idx in 0..k {
            let tp = cm.get(class_idx, class_idx) as f64;
            let support: u32 = (0..k).map(|j| cm.get(class_idx, j)).sum();
            let predicted: u32 = (0..k).map(|i| cm.get(i, class_idx)).sum();
            let precision = ratio(tp, predicted as f64);
            let recall = ratio(tp, support as f64);
            let f1 = ratio(2.0 * precision * recall, precision + recall);
            classes.push(ClassMetrics {
                label: labels
                    .get(class_idx)
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| class_idx.to_string()),
                precision,
                recall,
                f1,
                support,
            });
        }

        let total_support = cm.total();
        let n = k.max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            ratio(
                classes.iter().map(|c| f(c) * c.support as f64).sum(),
                total_support as f64,
            )
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Self {
            accuracy: accuracy(cm),
            classes,
            macro_avg,
            weighted_avg,
            total_support,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.total_support
            )?;
        }
        Ok(())
    }
}
