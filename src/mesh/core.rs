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

use std::io::Write;

use ahash::AHashMap;
use log::{debug, warn};
use smallvec::SmallVec;

use crate::{
    geometry::{
        Vec2, Vec3,
        util::{tri_area, tri_min_angle, tri_normal},
    },
    impl_mesh,
    mesh::{
        basic_types::*,
        simple::SimpleMesh,
    },
    operations::triangulation::{Cdt, CdtError},
    surface::bezier::ParametricSurface,
};

/// Aggregate triangle quality of one mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshQuality {
    pub num_tris: usize,
    /// Smallest interior angle over all triangles, in radians.
    pub min_angle: f64,
    pub min_area: f64,
    pub total_area: f64,
}

impl_mesh! {
    pub fn new(surf_id: usize, comp_id: i32) -> Self {
        Self {
            surf_id,
            comp_id,
            state: MeshState::Empty,
            nodes: Vec::new(),
            edges: Vec::new(),
            tris: Vec::new(),
            edge_map: AHashMap::new(),
            simp: SimpleMesh::default(),
        }
    }

    #[inline(always)]
    fn edge_key(a: usize, b: usize) -> (usize, usize) {
        if a < b { (a, b) } else { (b, a) }
    }

    pub fn add_node(&mut self, pnt: Vec3, uw: Vec2) -> usize {
        self.nodes.push(Node { pnt, uw, ..Default::default() });
        self.nodes.len() - 1
    }

    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_map.get(&Self::edge_key(a, b)).copied()
    }

    /// Existing edge between `a` and `b`, or a new one.
    pub fn add_edge(&mut self, a: usize, b: usize) -> usize {
        if let Some(e) = self.find_edge(a, b) {
            return e;
        }
        let e = self.edges.len();
        self.edges.push(Edge { n: [a, b], ..Default::default() });
        self.edge_map.insert(Self::edge_key(a, b), e);
        self.nodes[a].edges.push(e);
        self.nodes[b].edges.push(e);
        e
    }

    /// Adds a triangle with its edges. Fails if any of its edges already
    /// carries two triangles.
    pub fn add_tri(&mut self, n0: usize, n1: usize, n2: usize) -> Result<usize, &'static str> {
        if n0 == n1 || n1 == n2 || n2 == n0 {
            return Err("degenerate triangle");
        }
        let n = [n0, n1, n2];
        for k in 0..3 {
            if let Some(e) = self.find_edge(n[k], n[(k + 1) % 3]) {
                if self.edges[e].num_tris() >= 2 {
                    return Err("edge already has two triangles");
                }
            }
        }
        let ti = self.tris.len();
        let mut e = [0usize; 3];
        for k in 0..3 {
            let ei = self.add_edge(n[k], n[(k + 1) % 3]);
            let edge = &mut self.edges[ei];
            if edge.t[0].is_none() {
                edge.t[0] = Some(ti);
            } else {
                edge.t[1] = Some(ti);
            }
            e[k] = ei;
        }
        self.tris.push(Tri { n, e, ..Default::default() });
        Ok(ti)
    }

    /// Flags a triangle removed and drops edges left without triangles.
    /// Border edges outlive their triangles so a re-added triangle picks
    /// the flag back up; `dump_garbage` purges the ones left bare.
    pub fn remove_tri(&mut self, ti: usize) {
        if self.tris[ti].removed {
            return;
        }
        self.tris[ti].removed = true;
        for ei in self.tris[ti].e {
            let edge = &mut self.edges[ei];
            for slot in edge.t.iter_mut() {
                if *slot == Some(ti) {
                    *slot = None;
                }
            }
            if edge.t[0].is_none() {
                edge.t.swap(0, 1);
            }
            if edge.num_tris() == 0 && !edge.border {
                self.remove_edge(ei);
            }
        }
    }

    pub fn remove_edge(&mut self, ei: usize) {
        if self.edges[ei].removed {
            return;
        }
        self.edges[ei].removed = true;
        let [a, b] = self.edges[ei].n;
        self.edge_map.remove(&Self::edge_key(a, b));
        for n in [a, b] {
            if let Some(pos) = self.nodes[n].edges.iter().position(|&x| x == ei) {
                self.nodes[n].edges.swap_remove(pos);
            }
        }
    }

    pub fn remove_node(&mut self, ni: usize) {
        self.nodes[ni].removed = true;
    }

    /// Purges every flagged node, edge and triangle and renumbers the rest.
    pub fn dump_garbage(&mut self) {
        for ei in 0..self.edges.len() {
            if !self.edges[ei].removed && self.edges[ei].num_tris() == 0 {
                self.remove_edge(ei);
            }
        }
        // nodes without edges are garbage too
        for n in self.nodes.iter_mut() {
            if n.edges.is_empty() {
                n.removed = true;
            }
        }

        let mut node_map = vec![usize::MAX; self.nodes.len()];
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (i, n) in self.nodes.drain(..).enumerate() {
            if !n.removed {
                node_map[i] = nodes.len();
                nodes.push(Node { edges: SmallVec::new(), ..n });
            }
        }

        let mut edge_map = vec![usize::MAX; self.edges.len()];
        let mut edges = Vec::with_capacity(self.edges.len());
        for (i, e) in self.edges.drain(..).enumerate() {
            if !e.removed && node_map[e.n[0]] != usize::MAX && node_map[e.n[1]] != usize::MAX {
                edge_map[i] = edges.len();
                edges.push(e);
            }
        }

        let mut tri_map = vec![usize::MAX; self.tris.len()];
        let mut tris = Vec::with_capacity(self.tris.len());
        for (i, t) in self.tris.drain(..).enumerate() {
            if !t.removed {
                tri_map[i] = tris.len();
                tris.push(t);
            }
        }

        for t in tris.iter_mut() {
            for k in 0..3 {
                t.n[k] = node_map[t.n[k]];
                t.e[k] = edge_map[t.e[k]];
            }
        }
        self.edge_map.clear();
        for (ei, e) in edges.iter_mut().enumerate() {
            e.n = [node_map[e.n[0]], node_map[e.n[1]]];
            for slot in e.t.iter_mut() {
                *slot = slot.and_then(|t| (tri_map[t] != usize::MAX).then(|| tri_map[t]));
            }
            if e.t[0].is_none() {
                e.t.swap(0, 1);
            }
            nodes[e.n[0]].edges.push(ei);
            nodes[e.n[1]].edges.push(ei);
            self.edge_map.insert(Self::edge_key(e.n[0], e.n[1]), ei);
        }

        self.nodes = nodes;
        self.edges = edges;
        self.tris = tris;
    }

    pub fn num_tris(&self) -> usize {
        self.tris.iter().filter(|t| !t.removed).count()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.removed).count()
    }

    pub fn live_tris(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.tris.len()).filter(|&t| !self.tris[t].removed)
    }

    pub fn live_edges(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.edges.len()).filter(|&e| !self.edges[e].removed)
    }

    #[inline]
    pub fn tri_pnts(&self, ti: usize) -> [Vec3; 3] {
        let n = self.tris[ti].n;
        [self.nodes[n[0]].pnt, self.nodes[n[1]].pnt, self.nodes[n[2]].pnt]
    }

    pub fn tri_norm(&self, ti: usize) -> Vec3 {
        let [a, b, c] = self.tri_pnts(ti);
        tri_normal(&a, &b, &c)
    }

    pub fn tri_center(&self, ti: usize) -> Vec3 {
        let [a, b, c] = self.tri_pnts(ti);
        (a + b + c) / 3.0
    }

    pub fn edge_len(&self, ei: usize) -> f64 {
        let [a, b] = self.edges[ei].n;
        self.nodes[a].pnt.dist(&self.nodes[b].pnt)
    }

    /// Index of the vertex of `ti` that is not on edge `ei`.
    pub fn opposite_node(&self, ti: usize, ei: usize) -> Option<usize> {
        let [a, b] = self.edges[ei].n;
        self.tris[ti].n.into_iter().find(|&n| n != a && n != b)
    }

    /// Triangles around node `ni`.
    pub fn node_tris(&self, ni: usize) -> SmallVec<[usize; 8]> {
        let mut out: SmallVec<[usize; 8]> = SmallVec::new();
        for &ei in &self.nodes[ni].edges {
            for t in self.edges[ei].t.into_iter().flatten() {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
        out
    }

    /// Nodes joined to `ni` by an edge.
    pub fn node_neighbors(&self, ni: usize) -> SmallVec<[usize; 8]> {
        self.nodes[ni].edges.iter().map(|&e| self.edges[e].other_node(ni)).collect()
    }

    /// Constrained triangulation of the given parametric points.
    ///
    /// The points are stretched by the surface's distance maps before
    /// triangulating so that parametric triangles are close to isotropic
    /// in 3D. Every input point becomes a fixed node and every recovered
    /// segment a border edge.
    pub fn init_mesh(
        &mut self,
        surf: &ParametricSurface,
        uw_points: &[Vec2],
        segments: &[[usize; 2]],
    ) -> Result<(), CdtError> {
        let (mu, mw) = (surf.max_u(), surf.max_w());
        let scaled: Vec<Vec2> = uw_points
            .iter()
            .map(|p| Vec2::new(p.x * surf.u_scale(p.y / mw), p.y * surf.w_scale(p.x / mu)))
            .collect();

        let cdt = Cdt::build_constrained(&scaled, segments)?;
        if !cdt.unrecovered.is_empty() {
            warn!(
                "surface {}: {} border segments missing from the triangulation",
                self.surf_id,
                cdt.unrecovered.len()
            );
        }

        self.nodes.clear();
        self.edges.clear();
        self.tris.clear();
        self.edge_map.clear();
        for uw in uw_points {
            let n = self.add_node(surf.comp_pnt_uw(uw), *uw);
            self.nodes[n].fixed = true;
        }
        let mut rejected = 0usize;
        for t in &cdt.triangles {
            if self.add_tri(t.0, t.1, t.2).is_err() {
                rejected += 1;
            }
        }
        if rejected > 0 {
            warn!("surface {}: {rejected} triangles rejected", self.surf_id);
        }
        for &[a, b] in &cdt.constrained {
            if let Some(e) = self.find_edge(a, b) {
                self.edges[e].border = true;
            }
        }
        self.dump_garbage();
        self.state = MeshState::Triangulated;
        debug!("surface {}: initial mesh of {} tris", self.surf_id, self.num_tris());
        Ok(())
    }

    pub fn quality(&self) -> MeshQuality {
        let mut q = MeshQuality {
            min_angle: f64::MAX,
            min_area: f64::MAX,
            ..Default::default()
        };
        for t in self.live_tris() {
            let [a, b, c] = self.tri_pnts(t);
            let area = tri_area(&a, &b, &c);
            q.num_tris += 1;
            q.total_area += area;
            q.min_area = q.min_area.min(area);
            q.min_angle = q.min_angle.min(tri_min_angle(&a, &b, &c));
        }
        if q.num_tris == 0 {
            q.min_angle = 0.0;
            q.min_area = 0.0;
        }
        q
    }

    /// Drops triangles flagged interior, then the edges and nodes they
    /// leave unused.
    pub fn remove_interior_tris_edges_nodes(&mut self) -> usize {
        let interior: Vec<usize> = self.live_tris().filter(|&t| self.tris[t].interior).collect();
        for &t in &interior {
            self.remove_tri(t);
        }
        self.dump_garbage();
        self.state = MeshState::InteriorTrisRemoved;
        interior.len()
    }

    /// Flattens the live mesh into point and triangle arrays.
    pub fn load_simp_tris(&mut self) {
        let mut map = vec![usize::MAX; self.nodes.len()];
        let mut simp = SimpleMesh {
            surf_id: self.surf_id,
            comp_id: self.comp_id,
            ..Default::default()
        };
        for t in self.live_tris() {
            let mut tri = [0usize; 3];
            for (k, &n) in self.tris[t].n.iter().enumerate() {
                if map[n] == usize::MAX {
                    map[n] = simp.pnts.len();
                    simp.pnts.push(self.nodes[n].pnt);
                    simp.uws.push(self.nodes[n].uw);
                }
                tri[k] = map[n];
            }
            simp.tris.push(tri);
        }
        self.simp = simp;
        self.condense_simp_tris();
        self.state = MeshState::Simplified;
    }

    /// Purges coincident points and the triangles they collapse.
    pub fn condense_simp_tris(&mut self) {
        self.simp.condense();
    }

    /// ASCII STL of this surface's live triangles.
    pub fn write_stl<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let tris: Vec<[Vec3; 3]> = self.live_tris().map(|t| self.tri_pnts(t)).collect();
        crate::io::stl::write_facets(writer, &format!("surf_{}", self.surf_id), &tris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::bezier::planar_grid;

    fn unit_square() -> ParametricSurface {
        ParametricSurface::new(
            0,
            0,
            planar_grid([
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]),
        )
        .unwrap()
    }

    fn square_mesh(surf: &ParametricSurface) -> Mesh {
        let pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let segs: Vec<[usize; 2]> = (0..5).map(|i| [i, (i + 1) % 5]).collect();
        let mut m = Mesh::new(0, 0);
        m.init_mesh(surf, &pts, &segs).unwrap();
        m
    }

    #[test]
    fn init_mesh_marks_border_edges() {
        let s = unit_square();
        let m = square_mesh(&s);
        assert_eq!(m.num_tris(), 3);
        let border = m.live_edges().filter(|&e| m.edges[e].border).count();
        assert_eq!(border, 5);
        for e in m.live_edges() {
            assert!(m.edges[e].num_tris() >= 1 && m.edges[e].num_tris() <= 2);
            assert_eq!(m.edges[e].num_tris() == 1, m.edges[e].border);
        }
        for t in m.live_tris() {
            assert!(m.tri_norm(t).z > 0.0);
        }
    }

    #[test]
    fn dump_garbage_renumbers() {
        let s = unit_square();
        let mut m = square_mesh(&s);
        let t = m.live_tris().next().unwrap();
        m.remove_tri(t);
        m.dump_garbage();
        assert_eq!(m.tris.len(), 2);
        for (ti, tri) in m.tris.iter().enumerate() {
            for k in 0..3 {
                let e = &m.edges[tri.e[k]];
                assert!(e.t.contains(&Some(ti)));
                assert_eq!(m.find_edge(tri.n[k], tri.n[(k + 1) % 3]), Some(tri.e[k]));
            }
        }
    }

    #[test]
    fn readded_tri_keeps_border_flags() {
        let s = unit_square();
        let mut m = square_mesh(&s);
        let t = m.live_tris().find(|&t| m.tris[t].e.iter().any(|&e| m.edges[e].border)).unwrap();
        let [a, b, c] = m.tris[t].n;
        m.remove_tri(t);
        m.add_tri(a, b, c).unwrap();
        m.dump_garbage();
        assert_eq!(m.live_edges().filter(|&e| m.edges[e].border).count(), 5);
        for e in m.live_edges() {
            assert_eq!(m.edges[e].num_tris() == 1, m.edges[e].border);
        }
    }

    #[test]
    fn bare_border_edges_are_purged() {
        let s = unit_square();
        let mut m = square_mesh(&s);
        let all: Vec<usize> = m.live_tris().collect();
        for t in all {
            m.remove_tri(t);
        }
        m.dump_garbage();
        assert!(m.edges.is_empty());
        assert!(m.nodes.is_empty());
    }

    #[test]
    fn add_tri_rejects_third_triangle_on_edge() {
        let mut m = Mesh::new(0, 0);
        for p in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, -1.0), (1.0, 1.0)] {
            m.add_node(Vec3::new(p.0, p.1, 0.0), Vec2::new(p.0, p.1));
        }
        m.add_tri(0, 1, 2).unwrap();
        m.add_tri(1, 0, 3).unwrap();
        assert!(m.add_tri(0, 1, 4).is_err());
    }

    #[test]
    fn simplified_mesh_has_no_duplicate_points() {
        let s = unit_square();
        let mut m = square_mesh(&s);
        m.load_simp_tris();
        assert_eq!(m.simp.pnts.len(), 5);
        assert_eq!(m.simp.tris.len(), 3);
        let q = m.quality();
        assert!((q.total_area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn write_stl_emits_one_facet_per_tri() {
        let s = unit_square();
        let m = square_mesh(&s);
        let mut buf = Vec::new();
        m.write_stl(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("solid surf_0"));
        assert_eq!(text.matches("facet normal").count(), 3);
    }
}
