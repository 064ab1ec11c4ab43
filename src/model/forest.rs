//! Random forest classifier
//!
//! Artifact format (JSON):
//!
//! ```json
//! {
//!   "artifact_version": "2024.06",
//!   "feature_names": ["N", "P", "K", "..."],
//!   "labels": ["apple", "banana", "..."],
//!   "trees": [
//!     { "nodes": [
//!         { "split": { "feature": 6, "threshold": 0.42, "left": 1, "right": 2 } },
//!         { "leaf": { "distribution": [0.0, 1.0, "..."] } },
//!         { "leaf": { "distribution": [1.0, 0.0, "..."] } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Nodes live in a flat arena; node 0 is the root and children always sit
//! after their parent, so traversal terminates. A sample goes left when
//! `x[feature] <= threshold`. Prediction is the mean of the reached leaf
//! distributions.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{LabelProbability, ProbabilityDistribution};
use crate::error::StartupError;
use crate::features::{feature_names, FEATURE_COUNT};
use crate::utils::ScaledVector;

/// Single node of a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

/// Decision tree stored as a node arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Single-leaf tree
    pub fn constant(distribution: Vec<f64>) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { distribution }],
        }
    }

    /// One split on `feature`, with a leaf on each side
    pub fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> Self {
        Self {
            nodes: vec![
                TreeNode::Split { feature, threshold, left: 1, right: 2 },
                TreeNode::Leaf { distribution: left },
                TreeNode::Leaf { distribution: right },
            ],
        }
    }

    /// Leaf distribution reached by `sample`
    fn leaf(&self, sample: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if sample[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn validate(&mut self, tree_idx: usize, n_labels: usize) -> Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("tree {} has no nodes", tree_idx);
        }

        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            match node {
                TreeNode::Split { feature, threshold, left, right } => {
                    if *feature >= FEATURE_COUNT {
                        anyhow::bail!(
                            "tree {} node {} splits on feature {} (only {} features)",
                            tree_idx, idx, feature, FEATURE_COUNT
                        );
                    }
                    if !threshold.is_finite() {
                        anyhow::bail!("tree {} node {} has a non-finite threshold", tree_idx, idx);
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= n_nodes {
                            anyhow::bail!(
                                "tree {} node {} links to invalid child {}",
                                tree_idx, idx, child
                            );
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_labels {
                        anyhow::bail!(
                            "tree {} leaf {} has {} classes, expected {}",
                            tree_idx, idx, distribution.len(), n_labels
                        );
                    }
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        anyhow::bail!("tree {} leaf {} has an invalid class weight", tree_idx, idx);
                    }
                    let mass: f64 = distribution.iter().sum();
                    if mass <= 0.0 {
                        anyhow::bail!("tree {} leaf {} has zero mass", tree_idx, idx);
                    }
                    // Leaves may hold raw class counts
                    distribution.iter_mut().for_each(|p| *p /= mass);
                }
            }
        }

        Ok(())
    }
}

/// Fitted random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub artifact_version: String,
    pub feature_names: Vec<String>,
    labels: Vec<String>,
    trees: Vec<DecisionTree>,

    #[serde(skip)]
    label_index: FxHashMap<String, usize>,
}

impl RandomForest {
    /// Load and validate a forest artifact
    ///
    /// Any failure (missing file, bad JSON, structural problem, feature set
    /// mismatch) is reported as `ModelUnavailable`.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        Self::load_inner(path).map_err(|e| StartupError::ModelUnavailable(format!("{:#}", e)))
    }

    fn load_inner(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {:?}", path))?;

        let mut forest: RandomForest = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse model JSON")?;

        forest.validate()?;
        Ok(forest)
    }

    /// Build a forest in code, with the same checks as `load`
    pub fn from_parts(
        artifact_version: &str,
        labels: Vec<String>,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, StartupError> {
        let mut forest = RandomForest {
            artifact_version: artifact_version.to_string(),
            feature_names: feature_names().iter().map(|s| s.to_string()).collect(),
            labels,
            trees,
            label_index: FxHashMap::default(),
        };
        forest
            .validate()
            .map_err(|e| StartupError::ModelUnavailable(format!("{:#}", e)))?;
        Ok(forest)
    }

    fn validate(&mut self) -> Result<()> {
        if self.labels.is_empty() {
            anyhow::bail!("model has no labels");
        }

        let expected = feature_names();
        if self.feature_names.len() != expected.len()
            || self.feature_names.iter().zip(&expected).any(|(a, b)| a.as_str() != *b)
        {
            anyhow::bail!(
                "model was trained on features {:?}, serving path builds {:?}",
                self.feature_names,
                expected
            );
        }

        let mut label_index = FxHashMap::default();
        for (i, label) in self.labels.iter().enumerate() {
            if label_index.insert(label.clone(), i).is_some() {
                anyhow::bail!("duplicate label '{}'", label);
            }
        }

        if self.trees.is_empty() {
            anyhow::bail!("model has no trees");
        }

        let n_labels = self.labels.len();
        for (tree_idx, tree) in self.trees.iter_mut().enumerate() {
            tree.validate(tree_idx, n_labels)?;
        }

        self.label_index = label_index;
        Ok(())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.label_index.get(label).copied()
    }

    /// Class probabilities for a raw sample, in label order
    pub fn probabilities(&self, sample: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.labels.len()];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf(sample)) {
                *a += p;
            }
        }

        let total: f64 = acc.iter().sum();
        if total > 0.0 {
            acc.iter_mut().for_each(|a| *a /= total);
        }
        acc
    }

    /// Probability of one class for a raw sample
    pub fn class_probability(&self, sample: &[f64], class: usize) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf(sample)[class]).sum();
        sum / self.trees.len() as f64
    }

    /// Probability distribution over the label set
    pub fn predict(&self, vector: &ScaledVector) -> ProbabilityDistribution {
        let probabilities = self.probabilities(vector.values());
        ProbabilityDistribution::new(
            self.labels
                .iter()
                .zip(probabilities)
                .map(|(label, probability)| LabelProbability {
                    label: label.clone(),
                    probability,
                })
                .collect(),
        )
    }
}
