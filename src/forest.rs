//! Tree-ensemble regressor stored as plain JSON.
//!
//! Covers both random forests (`aggregation: "mean"`) and boosted trees
//! (`aggregation: "sum"`, learning rate already folded into the leaves).
//! Internal nodes send `x[feature] <= threshold` left, everything else right.

use crate::error::{BundleError, InferenceError};
use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    #[serde(default)]
    pub feature: usize,
    #[serde(default)]
    pub threshold: f32,
    #[serde(default)]
    pub left: usize,
    #[serde(default)]
    pub right: usize,
    /// Set on leaves only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Node {
    pub fn leaf(value: f64) -> Self {
        Self { feature: 0, threshold: 0.0, left: 0, right: 0, value: Some(value) }
    }

    pub fn split(feature: usize, threshold: f32, left: usize, right: usize) -> Self {
        Self { feature, threshold, left, right, value: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Root first; children always come after their parent.
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Structural checks run once at load time, so evaluation can walk
    /// trees without cycle or bounds guards beyond the input length.
    pub fn validate(&self, n_features: usize) -> Result<(), BundleError> {
        if self.trees.is_empty() {
            return Err(BundleError::EmptyEnsemble);
        }
        if !self.base_score.is_finite() {
            return Err(BundleError::InvalidTree {
                tree: 0,
                node: 0,
                reason: format!("base_score is not finite: {}", self.base_score),
            });
        }

        for (t, tree) in self.trees.iter().enumerate() {
            let invalid = |node: usize, reason: String| BundleError::InvalidTree { tree: t, node, reason };

            if tree.nodes.is_empty() {
                return Err(invalid(0, "tree has no nodes".into()));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let Some(v) = node.value {
                    if !v.is_finite() {
                        return Err(invalid(i, format!("leaf value is not finite: {v}")));
                    }
                    continue;
                }
                if node.feature >= n_features {
                    return Err(invalid(
                        i,
                        format!("feature index {} out of range (0..{n_features})", node.feature),
                    ));
                }
                if !node.threshold.is_finite() {
                    return Err(invalid(i, format!("threshold is not finite: {}", node.threshold)));
                }
                for child in [node.left, node.right] {
                    if child <= i || child >= tree.nodes.len() {
                        return Err(invalid(i, format!("child index {child} is invalid")));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn eval(&self, x: &[f32]) -> Result<f64, InferenceError> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += eval_tree(tree, x)?;
        }
        let out = match self.aggregation {
            Aggregation::Sum => self.base_score + sum,
            Aggregation::Mean => self.base_score + sum / self.trees.len() as f64,
        };
        Ok(out)
    }
}

fn eval_tree(tree: &Tree, x: &[f32]) -> Result<f64, InferenceError> {
    let mut idx = 0usize;
    loop {
        let node = tree
            .nodes
            .get(idx)
            .ok_or_else(|| InferenceError::Unavailable(format!("dangling node index {idx}")))?;

        if let Some(value) = node.value {
            return Ok(value);
        }

        let v = *x.get(node.feature).ok_or(InferenceError::ShapeMismatch {
            got: x.len(),
            expected: node.feature + 1,
        })?;

        idx = if v <= node.threshold { node.left } else { node.right };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f32, lo: f64, hi: f64) -> Tree {
        Tree {
            nodes: vec![Node::split(feature, threshold, 1, 2), Node::leaf(lo), Node::leaf(hi)],
        }
    }

    #[test]
    fn stump_goes_left_on_threshold() {
        let t = stump(0, 5.0, 10.0, 20.0);
        assert_eq!(eval_tree(&t, &[4.0]).unwrap(), 10.0);
        assert_eq!(eval_tree(&t, &[5.0]).unwrap(), 10.0);
        assert_eq!(eval_tree(&t, &[5.5]).unwrap(), 20.0);
    }

    #[test]
    fn mean_and_sum_aggregate_differently() {
        let trees = vec![stump(0, 5.0, 100.0, 200.0), stump(1, 0.5, 300.0, 500.0)];
        let mean = TreeEnsemble { aggregation: Aggregation::Mean, base_score: 0.0, trees: trees.clone() };
        let sum = TreeEnsemble { aggregation: Aggregation::Sum, base_score: 50.0, trees };

        assert_eq!(mean.eval(&[7.0, 1.0]).unwrap(), 350.0);
        assert_eq!(sum.eval(&[7.0, 1.0]).unwrap(), 750.0);
    }

    #[test]
    fn short_input_is_a_shape_mismatch() {
        let e = TreeEnsemble { aggregation: Aggregation::Mean, base_score: 0.0, trees: vec![stump(3, 1.0, 0.0, 1.0)] };
        assert!(matches!(e.eval(&[0.0]), Err(InferenceError::ShapeMismatch { .. })));
    }

    #[test]
    fn validation_rejects_bad_structure() {
        let empty = TreeEnsemble { aggregation: Aggregation::Sum, base_score: 0.0, trees: vec![] };
        assert!(matches!(empty.validate(4), Err(BundleError::EmptyEnsemble)));

        let out_of_range = TreeEnsemble { aggregation: Aggregation::Sum, base_score: 0.0, trees: vec![stump(4, 1.0, 0.0, 1.0)] };
        assert!(matches!(out_of_range.validate(4), Err(BundleError::InvalidTree { node: 0, .. })));

        let cyclic = TreeEnsemble {
            aggregation: Aggregation::Sum,
            base_score: 0.0,
            trees: vec![Tree { nodes: vec![Node::split(0, 1.0, 0, 1), Node::leaf(1.0)] }],
        };
        assert!(cyclic.validate(1).is_err());

        let nan_leaf = TreeEnsemble {
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            trees: vec![stump(0, 1.0, f64::NAN, 1.0)],
        };
        assert!(matches!(nan_leaf.validate(1), Err(BundleError::InvalidTree { node: 1, .. })));

        assert!(TreeEnsemble { aggregation: Aggregation::Mean, base_score: 0.0, trees: vec![stump(0, 1.0, 0.0, 1.0)] }
            .validate(1)
            .is_ok());
    }

    #[test]
    fn leaves_parse_without_split_fields() {
        let t: Tree = serde_json::from_str(
            r#"{"nodes":[{"feature":0,"threshold":2.5,"left":1,"right":2},{"value":1.0},{"value":2.0}]}"#,
        )
        .unwrap();
        assert_eq!(t.nodes[1], Node::leaf(1.0));
    }
}
