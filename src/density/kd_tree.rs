// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use crate::geometry::{Aabb, Vec3};

const LEAF_SIZE: usize = 8;

enum KdNode {
    Leaf {
        bbox: Aabb,
        ids: Vec<usize>,
    },
    Split {
        bbox: Aabb,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

impl KdNode {
    fn bbox(&self) -> &Aabb {
        match self {
            KdNode::Leaf { bbox, .. } => bbox,
            KdNode::Split { bbox, .. } => bbox,
        }
    }
}

/// Static KD-tree over points, built by recursive median split on the
/// longest axis.
pub struct KdTree {
    pnts: Vec<Vec3>,
    root: Option<KdNode>,
}

impl KdTree {
    pub fn build(pnts: Vec<Vec3>) -> Self {
        let root = if pnts.is_empty() {
            None
        } else {
            let ids: Vec<usize> = (0..pnts.len()).collect();
            Some(Self::build_node(&pnts, ids))
        };
        Self { pnts, root }
    }

    fn build_node(pnts: &[Vec3], mut ids: Vec<usize>) -> KdNode {
        let bbox = Aabb::from_iter(ids.iter().map(|&i| &pnts[i]));
        if ids.len() <= LEAF_SIZE {
            return KdNode::Leaf { bbox, ids };
        }
        let axis = bbox.longest_axis();
        let mid = ids.len() / 2;
        ids.select_nth_unstable_by(mid, |&a, &b| pnts[a][axis].total_cmp(&pnts[b][axis]));
        let right_ids = ids.split_off(mid);

        KdNode::Split {
            bbox,
            left: Box::new(Self::build_node(pnts, ids)),
            right: Box::new(Self::build_node(pnts, right_ids)),
        }
    }

    pub fn len(&self) -> usize {
        self.pnts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pnts.is_empty()
    }

    pub fn point(&self, id: usize) -> &Vec3 {
        &self.pnts[id]
    }

    /// Ids of every point within `radius` of `p`, with their squared
    /// distances.
    pub fn radius_search(&self, p: &Vec3, radius: f64) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        let Some(root) = &self.root else {
            return out;
        };
        let r2 = radius * radius;
        let mut query = Aabb::from_points(p, p);
        query.expand(radius);

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.bbox().intersects(&query) {
                continue;
            }
            match node {
                KdNode::Leaf { ids, .. } => {
                    for &i in ids {
                        let d2 = self.pnts[i].dist_squared(p);
                        if d2 <= r2 {
                            out.push((i, d2));
                        }
                    }
                }
                KdNode::Split { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        out
    }

    /// Closest point to `p`.
    pub fn nearest(&self, p: &Vec3) -> Option<(usize, f64)> {
        let root = self.root.as_ref()?;
        let mut best: Option<(usize, f64)> = None;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Some((_, bd)) = best {
                if box_dist2(node.bbox(), p) > bd {
                    continue;
                }
            }
            match node {
                KdNode::Leaf { ids, .. } => {
                    for &i in ids {
                        let d2 = self.pnts[i].dist_squared(p);
                        if best.is_none_or(|(_, bd)| d2 < bd) {
                            best = Some((i, d2));
                        }
                    }
                }
                KdNode::Split { left, right, .. } => {
                    // visit the nearer child first
                    if box_dist2(left.bbox(), p) <= box_dist2(right.bbox(), p) {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }
        best
    }
}

fn box_dist2(b: &Aabb, p: &Vec3) -> f64 {
    let mut d2 = 0.0;
    for i in 0..3 {
        let d = if p[i] < b.min[i] {
            b.min[i] - p[i]
        } else if p[i] > b.max[i] {
            p[i] - b.max[i]
        } else {
            0.0
        };
        d2 += d * d;
    }
    d2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points() -> Vec<Vec3> {
        let mut v = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                v.push(Vec3::new(i as f64, j as f64, 0.0));
            }
        }
        v
    }

    #[test]
    fn radius_search_matches_brute_force() {
        let pts = grid_points();
        let tree = KdTree::build(pts.clone());
        let q = Vec3::new(4.2, 5.1, 0.3);
        let mut got: Vec<usize> = tree.radius_search(&q, 1.7).into_iter().map(|(i, _)| i).collect();
        got.sort_unstable();
        let want: Vec<usize> = (0..pts.len()).filter(|&i| pts[i].dist(&q) <= 1.7).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn nearest_finds_closest_grid_point() {
        let tree = KdTree::build(grid_points());
        let (id, _) = tree.nearest(&Vec3::new(7.4, 2.6, 1.0)).unwrap();
        assert_eq!(*tree.point(id), Vec3::new(7.0, 3.0, 0.0));
    }

    #[test]
    fn empty_tree_returns_nothing() {
        let tree = KdTree::build(Vec::new());
        assert!(tree.radius_search(&Vec3::zero(), 10.0).is_empty());
        assert!(tree.nearest(&Vec3::zero()).is_none());
    }
}
