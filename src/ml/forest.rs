//! Random forest classifier
//!
//! CART trees grown on bootstrap samples with Gini impurity and random
//! feature subsampling at each split. Leaves keep the share of adverse
//! samples, and the forest averages leaf probabilities across trees.
//! Training is seeded, so identical data and parameters give an identical
//! forest.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Hyperparameters for forest training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// None = grow until pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(8),
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        probability: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Candidate split found while scanning a feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// A single CART tree, stored as a flat node arena (root at index 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn fit(
        x: &[Vec<f64>],
        y: &[bool],
        sample: Vec<usize>,
        n_features: usize,
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, sample, 0, n_features, params, rng);
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[bool],
        indices: Vec<usize>,
        depth: usize,
        n_features: usize,
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> usize {
        let total = indices.len();
        let positives = indices.iter().filter(|&&i| y[i]).count();
        let probability = if total == 0 { 0.0 } else { positives as f64 / total as f64 };

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probability,
            samples: total,
        });

        let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
        let pure = positives == 0 || positives == total;
        if depth_reached || pure || total < params.min_samples_split.max(2) {
            return node_id;
        }

        let parent_impurity = gini(positives, total);
        let Some(split) = self.best_split(x, y, &indices, n_features, params, rng) else {
            return node_id;
        };
        if parent_impurity - split.impurity <= 1e-12 {
            return node_id;
        }

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.grow(x, y, left_idx, depth + 1, n_features, params, rng);
        let right = self.grow(x, y, right_idx, depth + 1, n_features, params, rng);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[bool],
        indices: &[usize],
        n_features: usize,
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let max_features = ((n_features as f64).sqrt().floor() as usize).clamp(1, n_features);
        let sampled = index::sample(rng, n_features, max_features).into_vec();

        let best = Self::scan_features(x, y, indices, &sampled, params.min_samples_leaf);
        if best.is_some() || max_features == n_features {
            return best;
        }

        // Sampled features had no valid threshold, try the rest
        let remaining: Vec<usize> = (0..n_features).filter(|f| !sampled.contains(f)).collect();
        Self::scan_features(x, y, indices, &remaining, params.min_samples_leaf)
    }

    fn scan_features(
        x: &[Vec<f64>],
        y: &[bool],
        indices: &[usize],
        features: &[usize],
        min_samples_leaf: usize,
    ) -> Option<SplitCandidate> {
        let total = indices.len();
        let total_pos = indices.iter().filter(|&&i| y[i]).count();
        let min_leaf = min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;

        for &feature in features {
            let mut values: Vec<(f64, bool)> = indices.iter().map(|&i| (x[i][feature], y[i])).collect();
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0;
            for i in 0..total - 1 {
                if values[i].1 {
                    left_pos += 1;
                }
                if values[i].0 >= values[i + 1].0 {
                    continue;
                }
                let left_n = i + 1;
                let right_n = total - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let impurity = (left_n as f64 * gini(left_pos, left_n)
                    + right_n as f64 * gini(total_pos - left_pos, right_n))
                    / total as f64;

                if best.map_or(true, |b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (values[i].0 + values[i + 1].0) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best
    }

    pub fn predict_proba(&self, sample: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { probability, .. } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Checks node references of a deserialized tree. Children always sit
    /// after their parent in the arena, which also rules out cycles.
    fn validate_structure(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(RiskError::artifact("tree has no nodes"));
        }
        let len = self.nodes.len();
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { probability, .. } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(RiskError::artifact(format!(
                            "node {} has leaf probability {} outside [0, 1]",
                            id, probability
                        )));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(RiskError::artifact(format!(
                            "node {} splits on feature {} of {}",
                            id, feature, n_features
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(RiskError::artifact(format!("node {} has a non-finite threshold", id)));
                    }
                    for child in [*left, *right] {
                        if child <= id || child >= len {
                            return Err(RiskError::artifact(format!(
                                "node {} points to invalid child {} ({} nodes)",
                                id, child, len
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Bagged ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    params: ForestParams,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[bool], params: ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(RiskError::validation("cannot train on an empty dataset"));
        }
        if x.len() != y.len() {
            return Err(RiskError::validation(format!(
                "feature rows ({}) and labels ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(RiskError::validation("forest needs at least one tree"));
        }

        let n_features = x[0].len();
        if n_features == 0 {
            return Err(RiskError::validation("feature rows are empty"));
        }
        for (i, row) in x.iter().enumerate() {
            if row.len() != n_features {
                return Err(RiskError::validation(format!(
                    "row {} has {} features, expected {}",
                    i,
                    row.len(),
                    n_features
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(RiskError::validation(format!("row {} has non-finite features", i)));
            }
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                DecisionTree::fit(x, y, bootstrap, n_features, &params, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            n_features,
            params,
        })
    }

    /// Mean adverse-class probability across trees
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64> {
        if sample.len() != self.n_features {
            return Err(RiskError::validation(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::validation("features must be finite"));
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(sample)).sum();
        Ok((sum / self.trees.len() as f64).clamp(0.0, 1.0))
    }

    /// Reject forests that would panic or loop at prediction time
    pub fn validate_structure(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(RiskError::artifact("forest has no trees"));
        }
        if self.n_features == 0 {
            return Err(RiskError::artifact("forest expects zero features"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate_structure(self.n_features).map_err(|e| match e {
                RiskError::Artifact(msg) => RiskError::artifact(format!("tree {}: {}", i, msg)),
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}
