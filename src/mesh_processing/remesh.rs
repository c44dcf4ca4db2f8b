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

use log::{debug, info};
use smallvec::SmallVec;

use crate::{
    density::GridDensity,
    geometry::{
        Vec2,
        util::{tri_area, tri_min_angle, tri_normal},
    },
    impl_mesh,
    mesh::{
        basic_types::*,
        edge_collapse::{CollapseOpts, uw_orient},
    },
    surface::bezier::ParametricSurface,
};

#[derive(Debug, Clone)]
pub struct RemeshOptions {
    pub iterations: usize,
    /// Split an edge whose length exceeds its target by this factor.
    pub split_ratio: f64,
    /// Collapse an edge shorter than this fraction of its target.
    pub collapse_ratio: f64,
    pub max_rounds: usize,
    /// Share of the sorted candidates handled per round.
    pub round_frac: f64,
    pub swap_max_normal_turn: f64,
    pub smooth_passes: usize,
    pub relax: f64,
    pub grow_ratio: f64,
}

impl RemeshOptions {
    pub fn new(iterations: usize, grow_ratio: f64) -> Self {
        Self {
            iterations,
            split_ratio: 1.41,
            collapse_ratio: 0.707,
            max_rounds: 20,
            round_frac: 0.1,
            swap_max_normal_turn: std::f64::consts::PI / 16.0,
            smooth_passes: 2,
            relax: 0.1,
            grow_ratio,
        }
    }
}

impl Default for RemeshOptions {
    fn default() -> Self {
        Self::new(10, 1.3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemeshError {
    InvalidOptions,
    NotTriangulated,
}

/// Counts of the operators applied by one remesh iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemeshStats {
    pub splits: usize,
    pub collapses: usize,
    pub swaps: usize,
    pub smoothed: usize,
}

/// Where edge `e` sits in triangle `t`: the nodes `(x, y, opp)` with
/// `x -> y` in the triangle's winding.
#[inline]
fn oriented_in_tri(t: &Tri, a: usize, b: usize) -> Option<(usize, usize, usize)> {
    (0..3).find_map(|k| {
        let (x, y, z) = (t.n[k], t.n[(k + 1) % 3], t.n[(k + 2) % 3]);
        ((x == a && y == b) || (x == b && y == a)).then_some((x, y, z))
    })
}

impl_mesh! {
    /// Per-node target lengths from the density field and the surface
    /// target map, diffused over the edges so neighbouring targets never
    /// grow faster than `grow_ratio`.
    pub fn set_target_lengths(&mut self, surf: &ParametricSurface, density: &GridDensity, grow_ratio: f64) {
        let base = density.base_len();
        for n in self.nodes.iter_mut().filter(|n| !n.removed) {
            let t = density.target_len(&n.pnt);
            n.target_len = t.min(surf.interp_target_map(n.uw.x, n.uw.y, base));
        }

        let slope = (grow_ratio - 1.0).max(0.0);
        for _ in 0..self.nodes.len().max(1) {
            let mut changed = false;
            for ei in 0..self.edges.len() {
                if self.edges[ei].removed {
                    continue;
                }
                let [a, b] = self.edges[ei].n;
                let len = self.edge_len(ei);
                let (ta, tb) = (self.nodes[a].target_len, self.nodes[b].target_len);
                if ta > tb + slope * len {
                    self.nodes[a].target_len = tb + slope * len;
                    changed = true;
                } else if tb > ta + slope * len {
                    self.nodes[b].target_len = ta + slope * len;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    #[inline]
    pub fn edge_target(&self, ei: usize) -> f64 {
        let [a, b] = self.edges[ei].n;
        0.5 * (self.nodes[a].target_len + self.nodes[b].target_len)
    }

    fn edge_ratio(&self, ei: usize) -> f64 {
        let t = self.edge_target(ei);
        if t > 0.0 { self.edge_len(ei) / t } else { 0.0 }
    }

    /// Inserts the parametric midpoint of `ei`, lifted to the surface, and
    /// splits every triangle on the edge in two.
    pub fn split_edge(&mut self, ei: usize, surf: &ParametricSurface) -> Result<usize, &'static str> {
        let edge = &self.edges[ei];
        if edge.removed {
            return Err("edge removed");
        }
        if edge.border {
            return Err("border edge");
        }
        if edge.num_tris() < 2 {
            return Err("open edge");
        }
        let [a, b] = edge.n;
        let tris: SmallVec<[usize; 2]> = edge.t.into_iter().flatten().collect();

        let uw = self.nodes[a].uw.lerp(&self.nodes[b].uw, 0.5);
        let m = self.add_node(surf.comp_pnt_uw(&uw), uw);
        self.nodes[m].target_len = 0.5 * (self.nodes[a].target_len + self.nodes[b].target_len);

        let mut new_tris: SmallVec<[[usize; 3]; 4]> = SmallVec::new();
        for &t in &tris {
            let Some((x, y, z)) = oriented_in_tri(&self.tris[t], a, b) else {
                continue;
            };
            new_tris.push([x, m, z]);
            new_tris.push([m, y, z]);
        }
        for &t in &tris {
            self.remove_tri(t);
        }
        for n in new_tris {
            self.add_tri(n[0], n[1], n[2])?;
        }
        Ok(m)
    }

    /// Replaces the diagonal `ei` of its two triangles by the other one
    /// when that raises the smaller minimum angle.
    pub fn swap_edge(&mut self, ei: usize, max_normal_turn: f64) -> Result<(), &'static str> {
        let edge = &self.edges[ei];
        if edge.removed || edge.border {
            return Err("border or removed edge");
        }
        let (Some(t0), Some(t1)) = (edge.t[0], edge.t[1]) else {
            return Err("edge needs two triangles");
        };
        let [ea, eb] = edge.n;
        let (a, b, c) = oriented_in_tri(&self.tris[t0], ea, eb).ok_or("edge not on triangle")?;
        let (_, _, d) = oriented_in_tri(&self.tris[t1], ea, eb).ok_or("edge not on triangle")?;
        if c == d || self.find_edge(c, d).is_some() {
            return Err("diagonal already exists");
        }
        if self.nodes[a].edges.len() <= 3 || self.nodes[b].edges.len() <= 3 {
            return Err("three valent node");
        }

        let p = |n: usize| self.nodes[n].pnt;
        let q = |n: usize| self.nodes[n].uw;
        let old_q = tri_min_angle(&p(a), &p(b), &p(c)).min(tri_min_angle(&p(b), &p(a), &p(d)));
        let new_q = tri_min_angle(&p(a), &p(d), &p(c)).min(tri_min_angle(&p(d), &p(b), &p(c)));
        if new_q <= old_q {
            return Err("no quality gain");
        }

        let old_sign = uw_orient(&q(a), &q(b), &q(c)).signum();
        if uw_orient(&q(a), &q(d), &q(c)).signum() != old_sign
            || uw_orient(&q(d), &q(b), &q(c)).signum() != old_sign
        {
            return Err("parametric fold");
        }

        let avg = (self.tri_norm(t0) + self.tri_norm(t1)).normalized();
        let cos_max = max_normal_turn.cos();
        for n in [tri_normal(&p(a), &p(d), &p(c)), tri_normal(&p(d), &p(b), &p(c))] {
            if !n.is_finite() || n.dot(&avg) < cos_max {
                return Err("normal turn");
            }
        }

        self.remove_tri(t0);
        self.remove_tri(t1);
        self.add_tri(a, d, c)?;
        self.add_tri(d, b, c)?;
        Ok(())
    }

    /// Area-weighted Laplacian step in parameter space for every free node.
    /// Returns how many nodes moved.
    pub fn smooth(&mut self, surf: &ParametricSurface, relax: f64) -> usize {
        let mut moved = 0;
        for ni in 0..self.nodes.len() {
            let node = &self.nodes[ni];
            if node.removed || node.fixed || node.edges.is_empty() {
                continue;
            }
            let tris = self.node_tris(ni);
            let mut sum = Vec2::default();
            let mut wsum = 0.0;
            for &t in &tris {
                let [pa, pb, pc] = self.tri_pnts(t);
                let area = tri_area(&pa, &pb, &pc);
                let n = self.tris[t].n;
                let cen = Vec2::new(
                    (self.nodes[n[0]].uw.x + self.nodes[n[1]].uw.x + self.nodes[n[2]].uw.x) / 3.0,
                    (self.nodes[n[0]].uw.y + self.nodes[n[1]].uw.y + self.nodes[n[2]].uw.y) / 3.0,
                );
                sum = sum + cen * area;
                wsum += area;
            }
            if wsum <= 0.0 {
                continue;
            }
            let old = self.nodes[ni].uw;
            let target = sum * (1.0 / wsum);
            let uw = old + (target - old) * relax;
            if !surf.valid_uw(&uw) {
                continue;
            }

            let keeps_orientation = tris.iter().all(|&t| {
                let n = self.tris[t].n;
                let at = |k: usize| if n[k] == ni { uw } else { self.nodes[n[k]].uw };
                let before = uw_orient(&self.nodes[n[0]].uw, &self.nodes[n[1]].uw, &self.nodes[n[2]].uw);
                let after = uw_orient(&at(0), &at(1), &at(2));
                after != 0.0 && after.signum() == before.signum()
            });
            if !keeps_orientation {
                continue;
            }
            self.nodes[ni].uw = uw;
            self.nodes[ni].pnt = surf.comp_pnt_uw(&uw);
            moved += 1;
        }
        moved
    }

    /// Edges whose ratio passes `keep`, most extreme first, trimmed to the
    /// share handled in one round.
    fn round_candidates(&self, frac: f64, keep: impl Fn(f64) -> bool, longest_first: bool) -> Vec<usize> {
        let mut cands: Vec<(usize, f64)> = self
            .live_edges()
            .filter(|&e| !self.edges[e].border)
            .map(|e| (e, self.edge_ratio(e)))
            .filter(|&(_, r)| keep(r))
            .collect();
        if longest_first {
            cands.sort_by(|a, b| b.1.total_cmp(&a.1));
        } else {
            cands.sort_by(|a, b| a.1.total_cmp(&b.1));
        }
        let take = ((cands.len() as f64 * frac).ceil() as usize).max(1);
        cands.truncate(take);
        cands.into_iter().map(|(e, _)| e).collect()
    }

    pub fn remesh_iteration(
        &mut self,
        surf: &ParametricSurface,
        density: &GridDensity,
        opts: &RemeshOptions,
    ) -> RemeshStats {
        let mut stats = RemeshStats::default();
        self.set_target_lengths(surf, density, opts.grow_ratio);
        let collapse_opts = CollapseOpts::default();

        for _ in 0..opts.max_rounds {
            let mut round = 0usize;
            for e in self.round_candidates(opts.round_frac, |r| r > opts.split_ratio, true) {
                if !self.edges[e].removed && self.edge_ratio(e) > opts.split_ratio && self.split_edge(e, surf).is_ok() {
                    round += 1;
                    stats.splits += 1;
                }
            }
            for e in self.round_candidates(opts.round_frac, |r| r < opts.collapse_ratio, false) {
                if self.edges[e].removed || self.edge_ratio(e) >= opts.collapse_ratio {
                    continue;
                }
                if self.collapse_edge(e, surf, &collapse_opts).is_ok() {
                    round += 1;
                    stats.collapses += 1;
                }
            }
            if round == 0 {
                break;
            }
        }

        for e in 0..self.edges.len() {
            if !self.edges[e].removed && self.swap_edge(e, opts.swap_max_normal_turn).is_ok() {
                stats.swaps += 1;
            }
        }
        for _ in 0..opts.smooth_passes {
            stats.smoothed += self.smooth(surf, opts.relax);
        }
        self.dump_garbage();
        stats
    }

    /// Runs `opts.iterations` rounds of split/collapse, swap and smooth.
    pub fn remesh(
        &mut self,
        surf: &ParametricSurface,
        density: &GridDensity,
        opts: &RemeshOptions,
    ) -> Result<(), RemeshError> {
        if !(opts.split_ratio > 1.0) || !(opts.collapse_ratio > 0.0) || opts.collapse_ratio >= opts.split_ratio {
            return Err(RemeshError::InvalidOptions);
        }
        if self.state == MeshState::Empty {
            return Err(RemeshError::NotTriangulated);
        }
        for iter in 0..opts.iterations {
            let stats = self.remesh_iteration(surf, density, opts);
            debug!("surface {} iteration {iter}: {stats:?}", self.surf_id);
            info!(
                "Surf {} Iter {}/{} Num Tris = {}",
                self.surf_id,
                iter + 1,
                opts.iterations,
                self.num_tris()
            );
        }
        self.state = MeshState::IterativelyRemeshed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MeshConfig,
        geometry::Vec3,
        surface::bezier::planar_grid,
    };

    fn square(size: f64) -> ParametricSurface {
        ParametricSurface::new(
            0,
            0,
            planar_grid([
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(size, 0.0, 0.0),
                Vec3::new(size, size, 0.0),
                Vec3::new(0.0, size, 0.0),
            ]),
        )
        .unwrap()
    }

    /// Square border sampled `n` times per side.
    fn border_mesh(surf: &ParametricSurface, n: usize) -> Mesh {
        let mut pts = Vec::new();
        let corners = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        for k in 0..4 {
            for i in 0..n {
                pts.push(corners[k].lerp(&corners[(k + 1) % 4], i as f64 / n as f64));
            }
        }
        let segs: Vec<[usize; 2]> = (0..pts.len()).map(|i| [i, (i + 1) % pts.len()]).collect();
        let mut m = Mesh::new(0, 0);
        m.init_mesh(surf, &pts, &segs).unwrap();
        m
    }

    fn check_valid(m: &Mesh) {
        for t in m.live_tris() {
            assert!(m.tri_norm(t).z > 0.0, "flipped triangle {t}");
        }
        for e in m.live_edges() {
            let n = m.edges[e].num_tris();
            assert!(n == 1 || n == 2);
            assert_eq!(n == 1, m.edges[e].border);
        }
    }

    #[test]
    fn split_edge_makes_two_tris_per_side() {
        let s = square(1.0);
        let mut m = border_mesh(&s, 1);
        let before = m.num_tris();
        let diag = m.live_edges().find(|&e| !m.edges[e].border).unwrap();
        let mid = m.split_edge(diag, &s).unwrap();
        assert_eq!(m.num_tris(), before + 2);
        assert!(!m.nodes[mid].fixed);
        approx::assert_relative_eq!(m.nodes[mid].pnt.x, 0.5, epsilon = 1e-12);
        check_valid(&m);
    }

    #[test]
    fn split_rejects_border() {
        let s = square(1.0);
        let mut m = border_mesh(&s, 1);
        let e = m.live_edges().find(|&e| m.edges[e].border).unwrap();
        assert!(m.split_edge(e, &s).is_err());
    }

    #[test]
    fn split_and_swap_next_to_border_keep_flags() {
        let s = square(1.0);
        let mut m = border_mesh(&s, 2);
        let border = m.live_edges().filter(|&e| m.edges[e].border).count();
        assert_eq!(border, 8);
        let inner: Vec<usize> = m.live_edges().filter(|&e| !m.edges[e].border).collect();
        for e in inner {
            m.split_edge(e, &s).unwrap();
        }
        check_valid(&m);
        let inner: Vec<usize> = m.live_edges().filter(|&e| !m.edges[e].border).collect();
        for e in inner {
            let _ = m.swap_edge(e, std::f64::consts::PI / 4.0);
        }
        m.dump_garbage();
        check_valid(&m);
        assert_eq!(m.live_edges().filter(|&e| m.edges[e].border).count(), border);
        let border_edges: Vec<usize> = m.live_edges().filter(|&e| m.edges[e].border).collect();
        for e in border_edges {
            assert!(m.split_edge(e, &s).is_err());
        }
    }

    #[test]
    fn remesh_refines_to_target() {
        let s = square(1.0);
        let mut m = border_mesh(&s, 8);
        let cfg = MeshConfig::new(0.125).with_min_len(0.05);
        let density = GridDensity::from_config(&cfg);
        m.remesh(&s, &density, &RemeshOptions::new(4, cfg.grow_ratio)).unwrap();
        assert_eq!(m.state, MeshState::IterativelyRemeshed);
        check_valid(&m);
        let q = m.quality();
        approx::assert_relative_eq!(q.total_area, 1.0, epsilon = 1e-9);
        // roughly 2 tris per target square
        assert!(q.num_tris > 64 && q.num_tris < 400, "{} tris", q.num_tris);
        assert!(q.min_angle > 0.1);
    }

    #[test]
    fn remesh_rejects_inverted_ratios() {
        let s = square(1.0);
        let mut m = border_mesh(&s, 2);
        let mut opts = RemeshOptions::default();
        opts.collapse_ratio = 2.0;
        assert_eq!(m.remesh(&s, &GridDensity::default(), &opts), Err(RemeshError::InvalidOptions));
    }
}
