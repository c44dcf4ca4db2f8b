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

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use log::{debug, warn};
use smallvec::SmallVec;

use crate::{
    geometry::Vec2,
    kernel::{incircle, orient2d},
};

/// Scale of the super triangle relative to the input extent.
const SUPER_SCALE: f64 = 64.0;
const SQRT_3: f64 = 1.732_050_807_568_877_2;
/// Lawson passes after constraint recovery.
const MAX_LEGALIZE_PASSES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Edge(usize, usize);

impl Edge {
    #[inline]
    fn new(a: usize, b: usize) -> Self {
        if a < b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Counter-clockwise vertex triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle(pub usize, pub usize, pub usize);

impl Triangle {
    #[inline]
    pub fn as_array(&self) -> [usize; 3] {
        [self.0, self.1, self.2]
    }

    #[inline]
    fn edges(&self) -> [(usize, usize); 3] {
        [(self.0, self.1), (self.1, self.2), (self.2, self.0)]
    }

    #[inline]
    fn has_vertex(&self, v: usize) -> bool {
        self.0 == v || self.1 == v || self.2 == v
    }

    #[inline]
    fn other_across(&self, e: Edge) -> Option<usize> {
        self.as_array().into_iter().find(|&w| w != e.0 && w != e.1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdtError {
    TooFewPoints,
    /// The constraint crosses another constraint.
    CrossesConstraint(usize, usize),
    /// Flipping did not converge.
    NotRecovered(usize, usize),
}

#[derive(Default)]
struct Adj {
    // undirected edge -> up to 2 triangle indices
    edge2tris: AHashMap<Edge, SmallVec<[usize; 2]>>,
}

impl Adj {
    fn rebuild(tris: &[Triangle]) -> Self {
        let mut s = Adj {
            edge2tris: AHashMap::with_capacity_and_hasher(tris.len() * 3, Default::default()),
        };
        for (ti, t) in tris.iter().enumerate() {
            s.add_tri(ti, *t);
        }
        s
    }

    #[inline]
    fn add_tri(&mut self, ti: usize, t: Triangle) {
        for (a, b) in t.edges() {
            self.edge2tris.entry(Edge::new(a, b)).or_default().push(ti);
        }
    }

    #[inline]
    fn remove_tri(&mut self, ti: usize, t: Triangle) {
        for (a, b) in t.edges() {
            let e = Edge::new(a, b);
            if let Some(v) = self.edge2tris.get_mut(&e) {
                if let Some(pos) = v.iter().position(|&x| x == ti) {
                    v.swap_remove(pos);
                }
                if v.is_empty() {
                    self.edge2tris.remove(&e);
                }
            }
        }
    }

    #[inline]
    fn replace_tri(&mut self, ti: usize, old_t: Triangle, new_t: Triangle) {
        self.remove_tri(ti, old_t);
        self.add_tri(ti, new_t);
    }
}

/// Constrained Delaunay triangulation of a planar point set.
///
/// Points are inserted with Bowyer-Watson inside a super triangle,
/// constraints are recovered by edge flips, and triangles reachable from
/// the super triangle without crossing a constraint are discarded.
#[derive(Clone, Debug, Default)]
pub struct Cdt {
    pub points: Vec<Vec2>,
    pub triangles: Vec<Triangle>,
    /// Constraint pieces present as edges.
    pub constrained: Vec<[usize; 2]>,
    /// Constraints that could not be made into edges.
    pub unrecovered: Vec<[usize; 2]>,
}

impl Cdt {
    /// Unconstrained Delaunay triangulation. Duplicate points are ignored.
    pub fn build(pts: &[Vec2]) -> Self {
        let (points, mut triangles) = Self::delaunay_with_super(pts);
        let n = pts.len();
        triangles.retain(|t| t.0 < n && t.1 < n && t.2 < n);
        Self {
            points: points[..n.min(points.len())].to_vec(),
            triangles,
            constrained: Vec::new(),
            unrecovered: Vec::new(),
        }
    }

    /// Triangulates `pts` so that every segment of `constraints` is an
    /// edge, keeping only the region enclosed by constraint loops.
    pub fn build_constrained(pts: &[Vec2], constraints: &[[usize; 2]]) -> Result<Self, CdtError> {
        if pts.len() < 3 {
            return Err(CdtError::TooFewPoints);
        }
        let n = pts.len();
        let (points, triangles) = Self::delaunay_with_super(pts);
        let mut cdt = Self {
            points,
            triangles,
            constrained: Vec::new(),
            unrecovered: Vec::new(),
        };
        let mut adj = Adj::rebuild(&cdt.triangles);

        let mut constrained: AHashSet<Edge> = AHashSet::default();
        for &[a, b] in constraints {
            if a == b {
                continue;
            }
            for (p, q) in cdt.split_at_collinear(a, b) {
                match cdt.recover_constraint(p, q, &mut adj, &constrained) {
                    Ok(()) => {
                        if constrained.insert(Edge::new(p, q)) {
                            cdt.constrained.push([p, q]);
                        }
                    }
                    Err(e) => {
                        debug!("constraint {p}-{q} not recovered: {e:?}");
                        cdt.unrecovered.push([p, q]);
                    }
                }
            }
        }

        cdt.legalize_all(&mut adj, &constrained);
        cdt.remove_outside(n, &adj, &constrained);
        cdt.points.truncate(n);
        Ok(cdt)
    }

    fn delaunay_with_super(pts: &[Vec2]) -> (Vec<Vec2>, Vec<Triangle>) {
        let mut points = pts.to_vec();
        if points.len() < 3 {
            return (points, Vec::new());
        }
        let (mut minx, mut miny) = (f64::MAX, f64::MAX);
        let (mut maxx, mut maxy) = (f64::MIN, f64::MIN);
        for p in &points {
            minx = minx.min(p.x);
            miny = miny.min(p.y);
            maxx = maxx.max(p.x);
            maxy = maxy.max(p.y);
        }
        let delta = (maxx - minx).max(maxy - miny);
        let cx = 0.5 * (minx + maxx);
        let cy = 0.5 * (miny + maxy);
        let r = SUPER_SCALE * delta + 1.0;

        let s0 = points.len();
        points.push(Vec2::new(cx, cy + 2.0 * r));
        points.push(Vec2::new(cx - SQRT_3 * r, cy - r));
        points.push(Vec2::new(cx + SQRT_3 * r, cy - r));

        let mut triangles = vec![Triangle(s0, s0 + 1, s0 + 2)];
        for pid in 0..s0 {
            Self::bowyer_watson_insert_point(pid, &points, &mut triangles);
        }
        (points, triangles)
    }

    /// Insert a single point using Bowyer-Watson.
    fn bowyer_watson_insert_point(pid: usize, points: &[Vec2], triangles: &mut Vec<Triangle>) {
        let p = &points[pid];

        let mut bad = Vec::new();
        for (i, &t) in triangles.iter().enumerate() {
            if Self::point_in_circumcircle(p, t, points) {
                bad.push(i);
            }
        }
        if bad.is_empty() {
            // duplicate of an existing vertex
            return;
        }

        let mut edge_count: AHashMap<Edge, usize> = AHashMap::default();
        for &i in &bad {
            for (a, b) in triangles[i].edges() {
                *edge_count.entry(Edge::new(a, b)).or_insert(0) += 1;
            }
        }
        let boundary: Vec<Edge> = edge_count
            .into_iter()
            .filter_map(|(e, c)| (c == 1).then_some(e))
            .collect();

        bad.sort_unstable();
        for &i in bad.iter().rev() {
            triangles.swap_remove(i);
        }

        for e in boundary {
            let o = orient2d(&points[e.0], &points[e.1], p);
            if o > 0.0 {
                triangles.push(Triangle(e.0, e.1, pid));
            } else if o < 0.0 {
                triangles.push(Triangle(e.0, pid, e.1));
            }
        }
    }

    fn point_in_circumcircle(p: &Vec2, t: Triangle, points: &[Vec2]) -> bool {
        let (a, b, c) = (t.0, t.1, t.2);
        let (aa, bb, cc) = if orient2d(&points[a], &points[b], &points[c]) > 0.0 {
            (a, b, c)
        } else {
            (a, c, b)
        };
        incircle(&points[aa], &points[bb], &points[cc], p) > 0.0
    }

    /// Breaks `a-b` at every input point lying strictly inside it.
    fn split_at_collinear(&self, a: usize, b: usize) -> Vec<(usize, usize)> {
        let (pa, pb) = (self.points[a], self.points[b]);
        let d = pb - pa;
        let len2 = d.dot(&d);
        let mut mids: Vec<(f64, usize)> = Vec::new();
        for (i, p) in self.points.iter().enumerate() {
            if i == a || i == b || len2 <= 0.0 {
                continue;
            }
            if orient2d(&pa, &pb, p) != 0.0 {
                continue;
            }
            let t = (*p - pa).dot(&d) / len2;
            if t > 0.0 && t < 1.0 {
                mids.push((t, i));
            }
        }
        if mids.is_empty() {
            return vec![(a, b)];
        }
        mids.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut out = Vec::with_capacity(mids.len() + 1);
        let mut prev = a;
        for (_, m) in mids {
            out.push((prev, m));
            prev = m;
        }
        out.push((prev, b));
        out
    }

    /// Does edge `u-v` cross segment `a-b` at a single interior point?
    fn crosses(&self, a: usize, b: usize, u: usize, v: usize) -> bool {
        if u == a || u == b || v == a || v == b {
            return false;
        }
        let p = &self.points;
        let o1 = orient2d(&p[a], &p[b], &p[u]);
        let o2 = orient2d(&p[a], &p[b], &p[v]);
        let o3 = orient2d(&p[u], &p[v], &p[a]);
        let o4 = orient2d(&p[u], &p[v], &p[b]);
        o1 * o2 < 0.0 && o3 * o4 < 0.0
    }

    fn recover_constraint(
        &mut self,
        a: usize,
        b: usize,
        adj: &mut Adj,
        constrained: &AHashSet<Edge>,
    ) -> Result<(), CdtError> {
        if adj.edge2tris.contains_key(&Edge::new(a, b)) {
            return Ok(());
        }
        let mut queue: VecDeque<Edge> = adj
            .edge2tris
            .keys()
            .copied()
            .filter(|e| self.crosses(a, b, e.0, e.1))
            .collect();
        if queue.iter().any(|e| constrained.contains(e)) {
            return Err(CdtError::CrossesConstraint(a, b));
        }

        let max_iter = 4 * (queue.len() + 1) * (queue.len() + 1) + 64;
        let mut iter = 0usize;
        while let Some(e) = queue.pop_front() {
            iter += 1;
            if iter > max_iter {
                return Err(CdtError::NotRecovered(a, b));
            }
            let Some(ts) = adj.edge2tris.get(&e) else { continue };
            if ts.len() != 2 {
                continue;
            }
            let (t0, t1) = (ts[0], ts[1]);
            let (Some(x), Some(y)) = (
                self.triangles[t0].other_across(e),
                self.triangles[t1].other_across(e),
            ) else {
                continue;
            };
            let p = &self.points;
            let convex = orient2d(&p[x], &p[y], &p[e.0]) * orient2d(&p[x], &p[y], &p[e.1]) < 0.0;
            if !convex {
                queue.push_back(e);
                continue;
            }
            if let Some(new_e) = self.flip_shared_edge_with_adj(e, t0, t1, adj) {
                if self.crosses(a, b, new_e.0, new_e.1) {
                    queue.push_back(new_e);
                }
            }
        }

        if adj.edge2tris.contains_key(&Edge::new(a, b)) {
            Ok(())
        } else {
            Err(CdtError::NotRecovered(a, b))
        }
    }

    fn flip_shared_edge_with_adj(&mut self, e: Edge, t0_idx: usize, t1_idx: usize, adj: &mut Adj) -> Option<Edge> {
        let t0_old = self.triangles[t0_idx];
        let t1_old = self.triangles[t1_idx];
        let (u, v) = (e.0, e.1);
        let x = t0_old.other_across(e)?;
        let y = t1_old.other_across(e)?;
        if x == y {
            return None;
        }

        let p = &self.points;
        let t0_new = if orient2d(&p[x], &p[u], &p[y]) >= 0.0 {
            Triangle(x, u, y)
        } else {
            Triangle(x, y, u)
        };
        let t1_new = if orient2d(&p[x], &p[y], &p[v]) >= 0.0 {
            Triangle(x, y, v)
        } else {
            Triangle(x, v, y)
        };

        self.triangles[t0_idx] = t0_new;
        self.triangles[t1_idx] = t1_new;
        adj.replace_tri(t0_idx, t0_old, t0_new);
        adj.replace_tri(t1_idx, t1_old, t1_new);
        Some(Edge::new(x, y))
    }

    /// Lawson flips on every unconstrained edge until the triangulation
    /// is locally Delaunay.
    fn legalize_all(&mut self, adj: &mut Adj, constrained: &AHashSet<Edge>) {
        for _ in 0..MAX_LEGALIZE_PASSES {
            let mut flips = 0usize;
            for ti in 0..self.triangles.len() {
                for (u, v) in self.triangles[ti].edges() {
                    let e = Edge::new(u, v);
                    if constrained.contains(&e) {
                        continue;
                    }
                    let Some(neis) = adj.edge2tris.get(&e) else { continue };
                    if neis.len() != 2 {
                        continue;
                    }
                    let (t0, t1) = (neis[0], neis[1]);
                    let (Some(a), Some(b)) = (self.triangles[t0].other_across(e), self.triangles[t1].other_across(e))
                    else {
                        continue;
                    };
                    let p = &self.points;
                    let (aa, bb, cc) = if orient2d(&p[u], &p[v], &p[a]) > 0.0 {
                        (u, v, a)
                    } else {
                        (v, u, a)
                    };
                    let convex = orient2d(&p[a], &p[b], &p[u]) * orient2d(&p[a], &p[b], &p[v]) < 0.0;
                    if convex
                        && incircle(&p[aa], &p[bb], &p[cc], &p[b]) > 0.0
                        && self.flip_shared_edge_with_adj(e, t0, t1, adj).is_some()
                    {
                        flips += 1;
                        break;
                    }
                }
            }
            if flips == 0 {
                break;
            }
        }
    }

    /// Flood fill from the super triangle, stopping at constraints.
    fn remove_outside(&mut self, n: usize, adj: &Adj, constrained: &AHashSet<Edge>) {
        let mut outside = vec![false; self.triangles.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for (ti, t) in self.triangles.iter().enumerate() {
            if t.0 >= n || t.1 >= n || t.2 >= n {
                outside[ti] = true;
                queue.push_back(ti);
            }
        }
        while let Some(ti) = queue.pop_front() {
            for (u, v) in self.triangles[ti].edges() {
                let e = Edge::new(u, v);
                if constrained.contains(&e) {
                    continue;
                }
                let Some(neis) = adj.edge2tris.get(&e) else { continue };
                for &nb in neis {
                    if !outside[nb] {
                        outside[nb] = true;
                        queue.push_back(nb);
                    }
                }
            }
        }

        if outside.iter().all(|&o| o) {
            warn!("constraint loops do not close, keeping the convex hull");
            self.triangles.retain(|t| !(t.has_vertex(n) || t.has_vertex(n + 1) || t.has_vertex(n + 2)));
            return;
        }
        let mut k = 0;
        self.triangles.retain(|_| {
            let keep = !outside[k];
            k += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(p: &[Vec2], t: &Triangle) -> f64 {
        orient2d(&p[t.0], &p[t.1], &p[t.2])
    }

    #[test]
    fn square_gives_two_ccw_triangles() {
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let d = Cdt::build(&pts);
        assert_eq!(d.triangles.len(), 2);
        assert!(d.triangles.iter().all(|t| signed_area(&pts, t) > 0.0));
    }

    #[test]
    fn concave_loop_keeps_only_inside() {
        // L-shaped outline
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let cons: Vec<[usize; 2]> = (0..6).map(|i| [i, (i + 1) % 6]).collect();
        let cdt = Cdt::build_constrained(&pts, &cons).unwrap();
        assert!(cdt.unrecovered.is_empty());
        assert_eq!(cdt.triangles.len(), 4);
        let area: f64 = cdt.triangles.iter().map(|t| 0.5 * signed_area(&pts, t)).sum();
        assert!((area - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constraint_is_recovered_by_flips() {
        // a thin diamond where the Delaunay diagonal is the short one
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, -0.2),
            Vec2::new(4.0, 0.0),
            Vec2::new(2.0, 0.2),
        ];
        let cons = vec![[0, 1], [1, 2], [2, 3], [3, 0], [0, 2]];
        let cdt = Cdt::build_constrained(&pts, &cons).unwrap();
        assert!(cdt.unrecovered.is_empty());
        assert_eq!(cdt.triangles.len(), 2);
        for t in &cdt.triangles {
            assert!(t.has_vertex(0) && t.has_vertex(2));
        }
    }

    #[test]
    fn collinear_point_splits_constraint() {
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 1.0),
        ];
        let cons = vec![[0, 2], [2, 3], [3, 0]];
        let cdt = Cdt::build_constrained(&pts, &cons).unwrap();
        assert_eq!(cdt.triangles.len(), 2);
    }
}
