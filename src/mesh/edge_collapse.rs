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

use ahash::{AHashMap, AHashSet};
use log::warn;
use smallvec::SmallVec;

use crate::{
    geometry::{Vec2, Vec3, util::tri_normal},
    impl_mesh,
    surface::bezier::ParametricSurface,
};

/// Result of a successful collapse check. Feed it to `commit_collapse`.
#[derive(Debug, Clone, Copy)]
pub struct CollapsePlan {
    pub edge: usize,
    pub v_keep: usize,
    pub v_gone: usize,
    pub uw: Vec2,
    pub pnt: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseReject {
    Removed,
    BorderForbidden,
    /// Both ends are fixed nodes.
    BothFixed,
    NotManifold,
    LinkCondition, // common neighbors != {c,d}
    LowValence,
    NormalFlip,
    ParamFlip,
}

pub struct CollapseOpts {
    /// Largest allowed change of any surviving triangle normal, in radians.
    pub max_normal_turn: f64,
    /// Smallest valence allowed at the two opposite nodes before collapse.
    pub min_opposite_valence: usize,
}

impl Default for CollapseOpts {
    fn default() -> Self {
        Self {
            max_normal_turn: std::f64::consts::PI / 8.0,
            min_opposite_valence: 4,
        }
    }
}

/// Signed parametric area (times two) of a triangle.
#[inline(always)]
pub(crate) fn uw_orient(a: &Vec2, b: &Vec2, c: &Vec2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

impl_mesh! {
    /// Opposite nodes of the two triangles on `ei`.
    fn edge_opposites(&self, ei: usize) -> Option<(usize, usize, usize, usize)> {
        let e = &self.edges[ei];
        let (t0, t1) = (e.t[0]?, e.t[1]?);
        let c = self.opposite_node(t0, ei)?;
        let d = self.opposite_node(t1, ei)?;
        Some((t0, t1, c, d))
    }

    /// Triangle nodes after moving `from` to `to` at `pos`/`uw`.
    fn moved_tri(&self, ti: usize, from: usize, to: usize) -> [usize; 3] {
        let mut n = self.tris[ti].n;
        for v in n.iter_mut() {
            if *v == from {
                *v = to;
            }
        }
        n
    }

    /// Whether the triangles around `keep` and `gone`, minus `skip`, can be
    /// rebuilt with `gone` moved onto `keep`: none degenerate and no edge
    /// carrying more than two.
    fn collapse_fits(&self, keep: usize, gone: usize, skip: [usize; 2]) -> bool {
        let mut around = self.node_tris(keep);
        for t in self.node_tris(gone) {
            if !around.contains(&t) {
                around.push(t);
            }
        }
        around.retain(|t| !skip.contains(t));

        let mut count: AHashMap<(usize, usize), usize> = AHashMap::new();
        for &t in &around {
            let n = self.moved_tri(t, gone, keep);
            if n[0] == n[1] || n[1] == n[2] || n[2] == n[0] {
                return false;
            }
            for k in 0..3 {
                let (a, b) = (n[k], n[(k + 1) % 3]);
                *count.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        count.into_iter().all(|((a, b), c)| {
            let outside = self.find_edge(a, b).map_or(0, |e| {
                self.edges[e].t.into_iter().flatten().filter(|t| !around.contains(t)).count()
            });
            c + outside <= 2
        })
    }

    pub fn plan_collapse(
        &self,
        ei: usize,
        surf: &ParametricSurface,
        opts: &CollapseOpts,
    ) -> Result<CollapsePlan, CollapseReject> {
        let edge = &self.edges[ei];
        if edge.removed {
            return Err(CollapseReject::Removed);
        }
        if edge.border {
            return Err(CollapseReject::BorderForbidden);
        }
        let [a, b] = edge.n;
        let (fa, fb) = (self.nodes[a].fixed, self.nodes[b].fixed);
        if fa && fb {
            return Err(CollapseReject::BothFixed);
        }
        let (t0, t1, c, d) = self.edge_opposites(ei).ok_or(CollapseReject::NotManifold)?;
        if c == d {
            return Err(CollapseReject::NotManifold);
        }

        // interior: N(a) ∩ N(b) must be exactly {c, d}
        let na: AHashSet<usize> = self.node_neighbors(a).into_iter().filter(|&x| x != b).collect();
        let common: AHashSet<usize> = self
            .node_neighbors(b)
            .into_iter()
            .filter(|x| *x != a && na.contains(x))
            .collect();
        if common.len() != 2 || !common.contains(&c) || !common.contains(&d) {
            return Err(CollapseReject::LinkCondition);
        }
        if self.nodes[c].edges.len() < opts.min_opposite_valence
            || self.nodes[d].edges.len() < opts.min_opposite_valence
        {
            return Err(CollapseReject::LowValence);
        }

        let (v_keep, v_gone) = if fb { (b, a) } else { (a, b) };
        if !self.collapse_fits(v_keep, v_gone, [t0, t1]) {
            return Err(CollapseReject::NotManifold);
        }
        let (uw, pnt) = if fa || fb {
            (self.nodes[v_keep].uw, self.nodes[v_keep].pnt)
        } else {
            let uw = self.nodes[a].uw.lerp(&self.nodes[b].uw, 0.5);
            (uw, surf.comp_pnt_uw(&uw))
        };

        let cos_max = opts.max_normal_turn.cos();
        for v in [v_keep, v_gone] {
            for t in self.node_tris(v) {
                if t == t0 || t == t1 {
                    continue;
                }
                let old = self.tris[t].n;
                let new = self.moved_tri(t, v, v_keep);
                let place = |n: usize| if n == v_keep { (pnt, uw) } else { (self.nodes[n].pnt, self.nodes[n].uw) };
                let (p0, u0) = place(new[0]);
                let (p1, u1) = place(new[1]);
                let (p2, u2) = place(new[2]);

                let old_orient = uw_orient(&self.nodes[old[0]].uw, &self.nodes[old[1]].uw, &self.nodes[old[2]].uw);
                let new_orient = uw_orient(&u0, &u1, &u2);
                if new_orient == 0.0 || new_orient.signum() != old_orient.signum() {
                    return Err(CollapseReject::ParamFlip);
                }
                let n_old = self.tri_norm(t);
                let n_new = tri_normal(&p0, &p1, &p2);
                if !n_new.is_finite() || n_old.dot(&n_new) < cos_max {
                    return Err(CollapseReject::NormalFlip);
                }
            }
        }

        Ok(CollapsePlan { edge: ei, v_keep, v_gone, uw, pnt })
    }

    /// Applies a checked collapse. `v_gone` is left flagged removed.
    ///
    /// If a rebuilt triangle cannot be inserted the removed ones are put
    /// back and the mesh is left as it was.
    pub fn commit_collapse(&mut self, plan: &CollapsePlan) -> Result<(), CollapseReject> {
        let (keep, gone) = (plan.v_keep, plan.v_gone);

        // constraint edges on the ring survive with their flag
        let mut border_to: SmallVec<[usize; 8]> = SmallVec::new();
        for v in [keep, gone] {
            for &e in &self.nodes[v].edges {
                if self.edges[e].border {
                    border_to.push(self.edges[e].other_node(v));
                }
            }
        }

        let gone_tris = self.node_tris(gone);
        let old: SmallVec<[[usize; 3]; 8]> = gone_tris.iter().map(|&t| self.tris[t].n).collect();
        let mut rebuilt: SmallVec<[[usize; 3]; 8]> = SmallVec::new();
        for &t in &gone_tris {
            let n = self.tris[t].n;
            if !n.contains(&keep) {
                rebuilt.push(self.moved_tri(t, gone, keep));
            }
        }
        for &t in &gone_tris {
            self.remove_tri(t);
        }
        let mut added: SmallVec<[usize; 8]> = SmallVec::new();
        for n in rebuilt {
            match self.add_tri(n[0], n[1], n[2]) {
                Ok(t) => added.push(t),
                Err(_) => {
                    for t in added {
                        self.remove_tri(t);
                    }
                    for n in old {
                        if self.add_tri(n[0], n[1], n[2]).is_err() {
                            warn!("surface {}: collapse rollback lost a triangle", self.surf_id);
                        }
                    }
                    return Err(CollapseReject::NotManifold);
                }
            }
        }

        self.nodes[keep].uw = plan.uw;
        self.nodes[keep].pnt = plan.pnt;
        self.nodes[gone].removed = true;
        for x in border_to {
            if x == keep || x == gone {
                continue;
            }
            if let Some(e) = self.find_edge(keep, x) {
                self.edges[e].border = true;
            }
        }
        Ok(())
    }

    pub fn collapse_edge(
        &mut self,
        ei: usize,
        surf: &ParametricSurface,
        opts: &CollapseOpts,
    ) -> Result<usize, CollapseReject> {
        let plan = self.plan_collapse(ei, surf, opts)?;
        self.commit_collapse(&plan)?;
        Ok(plan.v_keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::basic_types::Mesh;

    /// Hexagon fan around an interior node plus one extra ring node.
    fn fan() -> (Mesh, ParametricSurface) {
        use crate::surface::bezier::planar_grid;
        let surf = ParametricSurface::new(
            0,
            0,
            planar_grid([
                Vec3::new(-2.0, -2.0, 0.0),
                Vec3::new(2.0, -2.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(-2.0, 2.0, 0.0),
            ]),
        )
        .unwrap();
        let mut m = Mesh::new(0, 0);
        let add = |m: &mut Mesh, x: f64, y: f64| {
            let uw = Vec2::new((x + 2.0) / 4.0, (y + 2.0) / 4.0);
            m.add_node(Vec3::new(x, y, 0.0), uw)
        };
        let c = add(&mut m, 0.0, 0.0);
        let d = add(&mut m, 0.3, 0.0);
        let ring: Vec<usize> = (0..8)
            .map(|k| {
                let a = k as f64 * std::f64::consts::TAU / 8.0;
                add(&mut m, a.cos(), a.sin())
            })
            .collect();
        // c at centre, d slightly right, ring of 8
        // triangles: fan of c over ring[2..=6], fan of d over ring[6..=8,0..=2]
        for k in 2..6 {
            m.add_tri(c, ring[k], ring[k + 1]).unwrap();
        }
        m.add_tri(c, ring[6], d).unwrap();
        m.add_tri(c, d, ring[2]).unwrap();
        for k in [6, 7] {
            m.add_tri(d, ring[k], ring[(k + 1) % 8]).unwrap();
        }
        for k in [0, 1] {
            m.add_tri(d, ring[k], ring[k + 1]).unwrap();
        }
        for &r in &ring {
            m.nodes[r].fixed = true;
        }
        (m, surf)
    }

    #[test]
    fn collapse_interior_edge() {
        let (mut m, surf) = fan();
        let before = m.num_tris();
        let e = m.find_edge(0, 1).unwrap();
        let keep = m.collapse_edge(e, &surf, &CollapseOpts::default()).unwrap();
        assert_eq!(m.num_tris(), before - 2);
        assert!(!m.nodes[keep].removed);
        m.dump_garbage();
        assert_eq!(m.nodes.len(), 9);
        for t in m.live_tris() {
            assert!(m.tri_norm(t).z > 0.0);
        }
        for e in m.live_edges() {
            assert!(m.edges[e].num_tris() >= 1);
        }
    }

    #[test]
    fn collapse_keeps_fixed_node() {
        let (mut m, surf) = fan();
        m.nodes[1].fixed = true;
        let e = m.find_edge(0, 1).unwrap();
        let plan = m.plan_collapse(e, &surf, &CollapseOpts::default()).unwrap();
        assert_eq!(plan.v_keep, 1);
        assert_eq!(plan.pnt, m.nodes[1].pnt);
    }

    #[test]
    fn border_and_fixed_edges_are_rejected() {
        let (mut m, surf) = fan();
        let e = m.find_edge(2, 3).unwrap();
        assert_eq!(
            m.plan_collapse(e, &surf, &CollapseOpts::default()).unwrap_err(),
            CollapseReject::BothFixed
        );
        let e = m.find_edge(0, 1).unwrap();
        m.edges[e].border = true;
        assert_eq!(
            m.plan_collapse(e, &surf, &CollapseOpts::default()).unwrap_err(),
            CollapseReject::BorderForbidden
        );
    }

    /// Two-row strip of four triangles, p0 p1 p2 along the bottom.
    fn strip() -> Mesh {
        let mut m = Mesh::new(0, 0);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0), (1.0, 1.0), (2.0, 1.0)] {
            m.add_node(Vec3::new(x, y, 0.0), Vec2::new(x / 2.0, y));
        }
        let (p0, p1, p2, q0, q1, q2) = (0, 1, 2, 3, 4, 5);
        m.add_tri(p0, p1, q0).unwrap();
        m.add_tri(p1, q1, q0).unwrap();
        m.add_tri(p1, p2, q1).unwrap();
        m.add_tri(p2, q2, q1).unwrap();
        m
    }

    #[test]
    fn overloaded_rebuild_is_not_planned() {
        let m = strip();
        // moving p0 onto q1 would put a third triangle on p1-q1
        assert!(!m.collapse_fits(4, 0, [usize::MAX; 2]));
    }

    #[test]
    fn failed_commit_restores_mesh() {
        let mut m = strip();
        let plan = CollapsePlan {
            edge: usize::MAX,
            v_keep: 4,
            v_gone: 0,
            uw: m.nodes[4].uw,
            pnt: m.nodes[4].pnt,
        };
        assert_eq!(m.commit_collapse(&plan), Err(CollapseReject::NotManifold));
        assert_eq!(m.num_tris(), 4);
        assert!(!m.nodes[0].removed);
        assert_eq!(m.nodes[0].pnt, Vec3::new(0.0, 0.0, 0.0));
        for e in m.live_edges() {
            let n = m.edges[e].num_tris();
            assert!(n == 1 || n == 2, "edge {e} has {n} tris");
        }
        let bottom = m.live_tris().filter(|&t| m.tris[t].n.contains(&0)).count();
        assert_eq!(bottom, 1);
        for t in m.live_tris() {
            assert!(m.tri_norm(t).z > 0.0);
        }
    }
}
