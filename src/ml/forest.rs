//! Random forest classifier: bootstrap-aggregated CART trees with
//! entropy or Gini splits, built in parallel with rayon.
//!
//! Trees draw their own seed from a master `StdRng` before fan-out, so the
//! fitted forest is identical for a given seed regardless of thread count.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::matrix::FeatureMatrix;

/// Smallest gap between two feature values that still yields a threshold.
const FEATURE_THRESHOLD: f64 = 1e-7;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

impl SplitCriterion {
    /// Node impurity from class counts.
    pub fn impurity(self, counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            SplitCriterion::Gini => {
                1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
            }
            SplitCriterion::Entropy => counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|c| {
                    let p = c / total;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub criterion: SplitCriterion,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 30,
            criterion: SplitCriterion::Entropy,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Arena node; children are indices into [`DecisionTree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class probabilities at this leaf.
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class distribution of the leaf `row` falls into. Rows go left when
    /// `value <= threshold`.
    pub fn predict_proba_row(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                Node::Leaf { .. } => 0,
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Check arena links and leaf shapes after deserialization.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature}"));
                    }
                    // Children are always pushed after their parent.
                    let n_nodes = self.nodes.len();
                    if *left <= idx || *right <= idx || *left >= n_nodes || *right >= n_nodes {
                        return Err(format!("node {idx} has invalid children"));
                    }
                }
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!("leaf {idx} has {} classes", distribution.len()));
                    }
                }
            }
        }
        Ok(())
    }
}

struct TreeBuilder<'a> {
    x: &'a FeatureMatrix,
    y: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    child_impurity: f64,
    left_impurity: f64,
    right_impurity: f64,
    n_left: usize,
}

impl TreeBuilder<'_> {
    fn class_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &s in samples {
            counts[self.y[s]] += 1.0;
        }
        counts
    }

    fn leaf(&mut self, counts: &[f64], total: f64) -> usize {
        let distribution = counts.iter().map(|c| c / total).collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize, impurity: f64) -> usize {
        let counts = self.class_counts(&samples);
        let total = samples.len() as f64;

        if depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split
            || impurity <= f64::EPSILON
        {
            return self.leaf(&counts, total);
        }

        let Some(best) = self.find_split(&samples, &counts) else {
            return self.leaf(&counts, total);
        };

        let n_left = best.n_left as f64;
        let n_right = total - n_left;
        self.importances[best.feature] +=
            total * impurity - n_left * best.left_impurity - n_right * best.right_impurity;

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.x.get(s, best.feature) <= best.threshold);

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.grow(left_samples, depth + 1, best.left_impurity);
        let right = self.grow(right_samples, depth + 1, best.right_impurity);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    /// Best split over a random feature subset. Features are visited in a
    /// shuffled order; if the first `max_features` are all constant on this
    /// node, the search continues until one valid split is found.
    fn find_split(&mut self, samples: &[usize], parent_counts: &[f64]) -> Option<BestSplit> {
        let criterion = self.params.criterion;
        let total = samples.len() as f64;
        let mut features: Vec<usize> = (0..self.x.n_cols()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(samples.len());

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }

            sorted.clear();
            sorted.extend(samples.iter().map(|&s| (self.x.get(s, feature), self.y[s])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            if sorted[sorted.len() - 1].0 <= sorted[0].0 + FEATURE_THRESHOLD {
                continue;
            }

            let mut left = vec![0.0; self.n_classes];
            let mut right = parent_counts.to_vec();
            for i in 0..sorted.len() - 1 {
                let (value, class) = sorted[i];
                left[class] += 1.0;
                right[class] -= 1.0;

                let next = sorted[i + 1].0;
                if next <= value + FEATURE_THRESHOLD {
                    continue;
                }

                let n_left = (i + 1) as f64;
                let n_right = total - n_left;
                let left_impurity = criterion.impurity(&left, n_left);
                let right_impurity = criterion.impurity(&right, n_right);
                let child_impurity = (n_left * left_impurity + n_right * right_impurity) / total;

                if best
                    .as_ref()
                    .map_or(true, |b| child_impurity < b.child_impurity)
                {
                    let mut threshold = value / 2.0 + next / 2.0;
                    if threshold >= next || !threshold.is_finite() {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        child_impurity,
                        left_impurity,
                        right_impurity,
                        n_left: i + 1,
                    });
                }
            }
        }
        best
    }
}

/// Fit one tree on a bootstrap sample drawn with `rng`.
fn fit_tree(
    x: &FeatureMatrix,
    y: &[usize],
    n_classes: usize,
    params: &ForestParams,
    max_features: usize,
    seed: u64,
) -> (DecisionTree, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = x.n_rows();
    let samples: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

    let mut builder = TreeBuilder {
        x,
        y,
        n_classes,
        params,
        max_features,
        rng,
        nodes: Vec::new(),
        importances: vec![0.0; x.n_cols()],
    };
    let root_counts = builder.class_counts(&samples);
    let root_impurity = params.criterion.impurity(&root_counts, samples.len() as f64);
    builder.grow(samples, 0, root_impurity);

    let mut importances = builder.importances;
    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        importances.iter_mut().for_each(|v| *v /= sum);
    }
    (DecisionTree { nodes: builder.nodes }, importances)
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_classes: usize,
    pub n_features: usize,
    pub criterion: SplitCriterion,
    pub max_depth: usize,
    pub trees: Vec<DecisionTree>,
    /// Mean decrease in impurity per feature, normalized to sum to 1.
    pub feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fit `params.n_trees` trees on `x`/`y`, one rayon task per tree.
    /// Each split considers `sqrt(n_features)` candidate features.
    pub fn fit(
        x: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self, PipelineError> {
        if x.n_rows() == 0 || x.n_rows() != y.len() {
            return Err(PipelineError::InsufficientData(format!(
                "{} feature rows for {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if x.n_cols() == 0 {
            return Err(PipelineError::EmptyFeatures);
        }
        if params.n_trees == 0 || params.max_depth == 0 {
            return Err(PipelineError::InvalidConfig(
                "tree count and max depth must be positive".to_string(),
            ));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(PipelineError::InsufficientData(format!(
                "label {bad} outside 0..{n_classes}"
            )));
        }

        let max_features = ((x.n_cols() as f64).sqrt() as usize).max(1);
        let mut master = StdRng::seed_from_u64(params.seed);
        let seeds: Vec<u64> = (0..params.n_trees).map(|_| master.random()).collect();

        let fitted: Vec<(DecisionTree, Vec<f64>)> = seeds
            .into_par_iter()
            .map(|seed| fit_tree(x, y, n_classes, params, max_features, seed))
            .collect();

        let mut feature_importances = vec![0.0; x.n_cols()];
        let mut contributing = 0usize;
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, importances) in fitted {
            if tree.nodes.len() > 1 {
                contributing += 1;
                for (acc, v) in feature_importances.iter_mut().zip(&importances) {
                    *acc += v;
                }
            }
            trees.push(tree);
        }
        if contributing > 0 {
            let sum: f64 = feature_importances.iter().sum();
            if sum > 0.0 {
                feature_importances.iter_mut().for_each(|v| *v /= sum);
            }
        }

        log::debug!(
            "Fitted {} trees (max depth reached {})",
            trees.len(),
            trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
        );

        Ok(Self {
            n_classes,
            n_features: x.n_cols(),
            criterion: params.criterion,
            max_depth: params.max_depth,
            trees,
            feature_importances,
        })
    }

    /// Mean of the per-tree leaf distributions.
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba_row(row)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    pub fn predict_row(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba_row(row))
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<usize> {
        x.rows().map(|row| self.predict_row(row)).collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}
