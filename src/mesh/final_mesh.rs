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

use ahash::AHashMap;
use log::debug;

use crate::{
    geometry::{Aabb, Vec3, util::tri_normal},
    mesh::simple::SimpleMesh,
};

const POINT_HASH: f64 = 1.0e4;
/// Points of neighbouring surfaces closer than this are one point.
pub const WELD_TOL: f64 = 1.0e-12;

/// Indexed triangle mesh of the whole model, points shared between
/// surfaces.
#[derive(Debug, Clone, Default)]
pub struct FinalMesh {
    pub pnts: Vec<Vec3>,
    pub tris: Vec<[usize; 3]>,
    pub tri_comp: Vec<i32>,
    pub tri_surf: Vec<usize>,
}

impl FinalMesh {
    /// Concatenates the simplified surface meshes in order and merges
    /// coincident points.
    pub fn assemble(simps: &[SimpleMesh]) -> Self {
        let mut out = FinalMesh::default();
        let mut buckets: AHashMap<i64, Vec<usize>> = AHashMap::new();
        let tol2 = WELD_TOL * WELD_TOL;
        let mut dropped = 0usize;

        for simp in simps {
            let mut local = Vec::with_capacity(simp.pnts.len());
            for p in &simp.pnts {
                let key = ((p.x + p.y + p.z) * POINT_HASH).floor() as i64;
                let mut found = None;
                'cells: for k in key - 1..=key + 1 {
                    if let Some(ids) = buckets.get(&k) {
                        for &j in ids {
                            if out.pnts[j].dist_squared(p) <= tol2 {
                                found = Some(j);
                                break 'cells;
                            }
                        }
                    }
                }
                let id = found.unwrap_or_else(|| {
                    let j = out.pnts.len();
                    out.pnts.push(*p);
                    buckets.entry(key).or_default().push(j);
                    j
                });
                local.push(id);
            }
            for t in &simp.tris {
                let g = [local[t[0]], local[t[1]], local[t[2]]];
                if g[0] == g[1] || g[1] == g[2] || g[2] == g[0] {
                    dropped += 1;
                    continue;
                }
                out.tris.push(g);
                out.tri_comp.push(simp.comp_id);
                out.tri_surf.push(simp.surf_id);
            }
        }
        if dropped > 0 {
            debug!("{dropped} triangles collapsed while welding surfaces");
        }
        out
    }

    pub fn num_pnts(&self) -> usize {
        self.pnts.len()
    }

    pub fn num_tris(&self) -> usize {
        self.tris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }

    pub fn bbox(&self) -> Aabb {
        Aabb::from_iter(self.pnts.iter())
    }

    pub fn tri_pnts(&self, t: usize) -> [Vec3; 3] {
        let [a, b, c] = self.tris[t];
        [self.pnts[a], self.pnts[b], self.pnts[c]]
    }

    pub fn tri_normal(&self, t: usize) -> Vec3 {
        let [a, b, c] = self.tri_pnts(t);
        tri_normal(&a, &b, &c)
    }

    /// Number of triangles on every undirected edge.
    pub fn edge_use(&self) -> AHashMap<(usize, usize), usize> {
        let mut map: AHashMap<(usize, usize), usize> = AHashMap::with_capacity(self.tris.len() * 2);
        for t in &self.tris {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                *map.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        map
    }

    /// `(border, over_shared)`: edges with one triangle and edges with
    /// more than two.
    pub fn open_edge_counts(&self) -> (usize, usize) {
        let uses = self.edge_use();
        let border = uses.values().filter(|&&n| n == 1).count();
        let over = uses.values().filter(|&&n| n > 2).count();
        (border, over)
    }

    pub fn check_water_tight(&self) -> String {
        let (border, over) = self.open_edge_counts();
        if border == 0 && over == 0 {
            "Is Water Tight\n".to_string()
        } else {
            format!("NOT Water Tight : {border} Border Edges, {over} Edges > 2 Tris\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tet_faces() -> Vec<SimpleMesh> {
        let p = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        faces
            .iter()
            .enumerate()
            .map(|(i, f)| SimpleMesh {
                pnts: vec![p[f[0]], p[f[1]], p[f[2]]],
                tris: vec![[0, 1, 2]],
                surf_id: i,
                comp_id: 0,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn assemble_welds_shared_points() {
        let fm = FinalMesh::assemble(&tet_faces());
        assert_eq!(fm.num_pnts(), 4);
        assert_eq!(fm.num_tris(), 4);
        assert_eq!(fm.check_water_tight(), "Is Water Tight\n");
    }

    #[test]
    fn open_surface_reports_border_edges() {
        let mut faces = tet_faces();
        faces.pop();
        let fm = FinalMesh::assemble(&faces);
        assert_eq!(
            fm.check_water_tight(),
            "NOT Water Tight : 3 Border Edges, 0 Edges > 2 Tris\n"
        );
    }
}
