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
use log::{info, warn};

use crate::{
    geometry::Vec3,
    mesh::{SimpleMesh, final_mesh::WELD_TOL},
};

/// Two free edges weld when the summed squared distance of their
/// endpoints is below this.
/// Free edges weld when their end points are within this fraction of the
/// minimum edge length.
pub const BORDER_WELD_FRACTION: f64 = 0.01;
const POINT_HASH: f64 = 1.0e4;

/// Outcome of `connect_border_edges`.
#[derive(Debug, Clone, Default)]
pub struct BorderReport {
    pub free_edges: usize,
    pub welded: usize,
    /// End points of free edges that found no partner.
    pub unmatched: Vec<[Vec3; 2]>,
}

/// An edge used by exactly one triangle of the assembly.
#[derive(Debug, Clone, Copy)]
struct FreeEdge {
    surf: usize,
    local: [usize; 2],
    pnts: [Vec3; 2],
}

/// Global ids for the points of every surface, merging points within
/// `WELD_TOL`.
fn weld_ids(simps: &[SimpleMesh]) -> Vec<Vec<usize>> {
    let mut buckets: AHashMap<i64, Vec<(usize, Vec3)>> = AHashMap::new();
    let mut next = 0usize;
    let tol2 = WELD_TOL * WELD_TOL;
    simps
        .iter()
        .map(|simp| {
            simp.pnts
                .iter()
                .map(|p| {
                    let key = ((p.x + p.y + p.z) * POINT_HASH).floor() as i64;
                    for k in key - 1..=key + 1 {
                        if let Some(hit) = buckets
                            .get(&k)
                            .and_then(|v| v.iter().find(|(_, q)| q.dist_squared(p) <= tol2))
                        {
                            return hit.0;
                        }
                    }
                    let id = next;
                    next += 1;
                    buckets.entry(key).or_default().push((id, *p));
                    id
                })
                .collect()
        })
        .collect()
}

fn free_edges(simps: &[SimpleMesh]) -> Vec<FreeEdge> {
    let ids = weld_ids(simps);
    let mut uses: AHashMap<(usize, usize), (usize, FreeEdge)> = AHashMap::new();
    for (s, simp) in simps.iter().enumerate() {
        for t in &simp.tris {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                let (ga, gb) = (ids[s][a], ids[s][b]);
                let entry = uses.entry((ga.min(gb), ga.max(gb))).or_insert((
                    0,
                    FreeEdge {
                        surf: s,
                        local: [a, b],
                        pnts: [simp.pnts[a], simp.pnts[b]],
                    },
                ));
                entry.0 += 1;
            }
        }
    }
    let mut out: Vec<(usize, usize, FreeEdge)> = uses
        .into_iter()
        .filter(|(_, (n, _))| *n == 1)
        .map(|((a, b), (_, e))| (a, b, e))
        .collect();
    out.sort_by_key(|&(a, b, _)| (a, b));
    out.into_iter().map(|(_, _, e)| e).collect()
}

/// Squared mismatch of two edges, trying both orientations. `true` when
/// the best match pairs `a.0` with `b.1`.
fn edge_match(a: &FreeEdge, b: &FreeEdge) -> (f64, bool) {
    let same = a.pnts[0].dist_squared(&b.pnts[0]) + a.pnts[1].dist_squared(&b.pnts[1]);
    let flip = a.pnts[0].dist_squared(&b.pnts[1]) + a.pnts[1].dist_squared(&b.pnts[0]);
    if flip <= same { (flip, true) } else { (same, false) }
}

/// Welds free edges of the simplified meshes onto nearby free edges.
///
/// Edges are bucketed by midpoint on a grid of cell `2 * tol`; within reach
/// of each other, the closest pairs weld first while their summed squared
/// end point mismatch is under `tol²`. The second edge's points are snapped onto
/// the first's. Edges left over are reported, never dropped.
pub fn connect_border_edges(simps: &mut [SimpleMesh], tol: f64) -> BorderReport {
    let edges = free_edges(simps);
    let tol2 = tol * tol;
    let cell = 2.0 * tol;
    let key = |e: &FreeEdge| {
        let m = (e.pnts[0] + e.pnts[1]) * (0.5 / cell);
        (m.x.floor() as i64, m.y.floor() as i64, m.z.floor() as i64)
    };
    let mut grid: AHashMap<(i64, i64, i64), Vec<usize>> = AHashMap::new();
    for (i, e) in edges.iter().enumerate() {
        grid.entry(key(e)).or_default().push(i);
    }

    let mut pairs: Vec<(f64, usize, usize, bool)> = Vec::new();
    for (i, e) in edges.iter().enumerate() {
        let (x, y, z) = key(e);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = grid.get(&(x + dx, y + dy, z + dz)) else { continue };
                    for &j in bucket.iter().filter(|&&j| j > i) {
                        let (d, flip) = edge_match(e, &edges[j]);
                        if d < tol2 {
                            pairs.push((d, i, j, flip));
                        }
                    }
                }
            }
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut matched = vec![false; edges.len()];
    let mut report = BorderReport {
        free_edges: edges.len(),
        ..Default::default()
    };
    for (_, i, j, flip) in pairs {
        if matched[i] || matched[j] {
            continue;
        }
        matched[i] = true;
        matched[j] = true;
        let (keep, gone) = (&edges[i], &edges[j]);
        let target = if flip { [keep.pnts[1], keep.pnts[0]] } else { keep.pnts };
        for k in 0..2 {
            simps[gone.surf].pnts[gone.local[k]] = target[k];
        }
        report.welded += 1;
    }

    for (e, m) in edges.iter().zip(&matched) {
        if !m {
            report.unmatched.push(e.pnts);
        }
    }
    if !report.unmatched.is_empty() {
        warn!("{} border edges found no partner", report.unmatched.len());
    }
    info!("connected {} of {} free border edges", report.welded * 2, report.free_edges);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FinalMesh;

    fn quad(z_off: f64, x0: f64) -> SimpleMesh {
        SimpleMesh {
            pnts: vec![
                Vec3::new(x0, 0.0, 0.0),
                Vec3::new(x0 + 1.0, 0.0, z_off),
                Vec3::new(x0 + 1.0, 1.0, z_off),
                Vec3::new(x0, 1.0, 0.0),
            ],
            tris: vec![[0, 1, 2], [0, 2, 3]],
            ..Default::default()
        }
    }

    #[test]
    fn nearly_coincident_edges_weld() {
        // the right edge of `a` sits 1e-3 away from the left edge of `b`
        let a = quad(0.0, 0.0);
        let mut b = quad(0.0, 1.0);
        for p in b.pnts.iter_mut() {
            if p.x == 1.0 {
                p.x += 1e-3;
            }
        }
        let mut simps = vec![a, b];
        let before = FinalMesh::assemble(&simps).open_edge_counts().0;
        let report = connect_border_edges(&mut simps, 0.01);
        assert_eq!(report.welded, 1);
        assert_eq!(report.unmatched.len(), 6);
        let after = FinalMesh::assemble(&simps).open_edge_counts().0;
        assert_eq!(after, before - 2);
    }

    #[test]
    fn distant_edges_are_reported() {
        let mut simps = vec![quad(0.0, 0.0), quad(0.0, 1.5)];
        let report = connect_border_edges(&mut simps, 0.01);
        assert_eq!(report.welded, 0);
        assert_eq!(report.unmatched.len(), report.free_edges);
        assert_eq!(report.free_edges, 8);
    }

    #[test]
    fn tolerance_follows_model_scale() {
        let shrink = |mut m: SimpleMesh| {
            for p in m.pnts.iter_mut() {
                *p = *p * 1e-3;
            }
            m
        };
        let tol = 1e-3 * 0.01;

        // 1e-6 apart on a model a thousandth the size
        let a = shrink(quad(0.0, 0.0));
        let mut b = shrink(quad(0.0, 1.0));
        for p in b.pnts.iter_mut() {
            if p.x == 1e-3 {
                p.x += 1e-6;
            }
        }
        let mut simps = vec![a, b];
        assert_eq!(connect_border_edges(&mut simps, tol).welded, 1);

        // a gap of half an edge stays open
        let mut simps = vec![shrink(quad(0.0, 0.0)), shrink(quad(0.0, 1.5))];
        assert_eq!(connect_border_edges(&mut simps, tol).welded, 0);
    }
}
