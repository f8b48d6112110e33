//! A single isolation tree.
//!
//! Built over a sub-sample of the (scaled) training rows by recursive random
//! partitioning: pick a feature that still varies on the node, pick a split
//! value uniformly between that feature's min and max, recurse until the node
//! holds one row, all rows are identical, or the height limit is reached.
//!
//! Nodes are stored in a flat arena so the tree serializes as a plain list.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Euler–Mascheroni constant, used by the harmonic-number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful BST search over `n` points.
///
/// Normalizes isolation depths: `c(n) = 2 H(n-1) - 2 (n-1) / n` with
/// `H(i) ≈ ln(i) + γ`, `c(2) = 1`, `c(0) = c(1) = 0`.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding `size` training rows.
    Leaf { size: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    /// Grow a tree over `data[sample]`, stopping at `max_depth`.
    pub fn grow(data: &[Vec<f64>], sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(data, sample, 0, max_depth, rng);
        tree
    }

    /// Returns the arena index of the node it created.
    fn grow_node(
        &mut self,
        data: &[Vec<f64>],
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= max_depth || rows.len() <= 1 {
            return idx;
        }

        // Features that still vary on this node, with their ranges
        let width = data[rows[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = data[r][f];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            return idx;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| data[r][feature] <= threshold);

        let left = self.grow_node(data, left_rows, depth + 1, max_depth, rng);
        let right = self.grow_node(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    /// Depth at which `x` is isolated, corrected by `c(leaf size)` for
    /// leaves cut off by the height limit.
    pub fn path_length(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(size),
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Leaf sizes must add up to the sub-sample the tree was grown on.
    pub fn leaf_sample_total(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| match n {
                Node::Leaf { size } => *size,
                Node::Split { .. } => 0,
            })
            .sum()
    }

    /// Every split must point forward to nodes inside the arena, so
    /// traversal always terminates.
    pub fn is_well_formed(&self) -> bool {
        let len = self.nodes.len();
        len > 0
            && self.nodes.iter().enumerate().all(|(i, n)| match n {
                Node::Split {
                    left,
                    right,
                    threshold,
                    ..
                } => *left > i && *right > i && *left < len && *right < len && threshold.is_finite(),
                Node::Leaf { .. } => true,
            })
    }

    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }
}
