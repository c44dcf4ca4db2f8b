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

use cfdmesh::{
    MeshConfig,
    curve::icurve::build_border_icurves,
    density::GridDensity,
    geometry::Vec3,
    intersection::{IntersectionSet, assembly::END_MERGE_FRACTION},
    surface::{ParametricSurface, bezier::planar_grid, patch},
};

fn quad(comp: i32, id: usize, corners: [[f64; 3]; 4]) -> ParametricSurface {
    ParametricSurface::new(comp, id, planar_grid(corners.map(Vec3::from))).unwrap()
}

fn intersect_surfs(isect: &mut IntersectionSet, surfs: &[ParametricSurface], a: usize, b: usize) {
    let mut found = Vec::new();
    for pa in surfs[a].patches() {
        for pb in surfs[b].patches() {
            patch::intersect(pa, pb, &mut |ps| found.push(ps));
        }
    }
    for ps in &found {
        isect.add_intersection_seg(surfs, ps);
    }
}

/// A floor with two crossing walls of one other component.
fn plus_model() -> Vec<ParametricSurface> {
    vec![
        quad(0, 0, [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]]),
        quad(1, 1, [[0.0, -0.8, -0.5], [0.0, 0.8, -0.5], [0.0, 0.8, 0.5], [0.0, -0.8, 0.5]]),
        quad(1, 2, [[-0.8, 0.0, -0.5], [0.8, 0.0, -0.5], [0.8, 0.0, 0.5], [-0.8, 0.0, 0.5]]),
    ]
}

#[test]
fn plus_crossing_splits_both_chains() {
    let surfs = plus_model();
    let mut isect = IntersectionSet::new(4.0);
    intersect_surfs(&mut isect, &surfs, 0, 1);
    intersect_surfs(&mut isect, &surfs, 0, 2);
    isect.build_chains();
    assert_eq!(isect.num_intersect_chains(), 2);

    isect.merge_interior_chain_ipnts();
    isect.intersect_split_chains();
    assert_eq!(isect.num_intersect_chains(), 4);

    // every piece ends at the crossing on the floor
    for c in isect.chains.iter().filter(|c| !c.border) {
        let ends = [c.first_ipnt(&isect.segs), c.last_ipnt(&isect.segs)];
        let at_origin = ends
            .iter()
            .flatten()
            .filter(|&&ip| isect.ipnts[ip].pnt.norm() < 1e-6)
            .count();
        assert_eq!(at_origin, 1);
    }
}

#[test]
fn shared_edge_gives_one_matched_border() {
    let surfs = vec![
        quad(0, 0, [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
        quad(0, 1, [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
    ];
    let icurves = build_border_icurves(&surfs);
    assert_eq!(icurves.len(), 7);
    let shared: Vec<_> = icurves.iter().filter(|c| c.matched).collect();
    assert_eq!(shared.len(), 1);
    assert_ne!(shared[0].surf_a(), shared[0].surf_b());

    let density = GridDensity::from_config(&MeshConfig::new(0.25));
    let mut isect = IntersectionSet::new(2.5);
    isect.load_border_curves(&surfs, &icurves);
    isect.tessellate_chains(&surfs, &density);
    isect.merge_border_end_points(&surfs, density.min_len() * END_MERGE_FRACTION);

    let chain = isect
        .chains
        .iter()
        .find(|c| c.surf_a != c.surf_b)
        .expect("shared border chain");
    for k in [0, chain.tess.len() - 1] {
        let pa = surfs[chain.surf_a].comp_pnt_uw(&chain.tess_uw_a[k]);
        let pb = surfs[chain.surf_b].comp_pnt_uw(&chain.tess_uw_b[k]);
        assert!(pa.dist(&pb) < 1e-6);
        assert!(pa.dist(&isect.ipnts[chain.tess[k]].pnt) < 1e-6);
    }

    // both corners of the shared edge are single points shared by three chains
    for k in [0, chain.tess.len() - 1] {
        let ip = chain.tess[k];
        let users = isect
            .chains
            .iter()
            .filter(|c| c.tess.first() == Some(&ip) || c.tess.last() == Some(&ip))
            .count();
        assert_eq!(users, 3);
    }
}

#[test]
fn merging_end_points_twice_changes_nothing() {
    let surfs = vec![
        quad(0, 0, [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
        quad(0, 1, [[1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]]),
        quad(0, 2, [[0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
    ];
    let icurves = build_border_icurves(&surfs);
    let density = GridDensity::from_config(&MeshConfig::new(0.3));
    let mut isect = IntersectionSet::new(3f64.sqrt());
    isect.load_border_curves(&surfs, &icurves);
    isect.tessellate_chains(&surfs, &density);
    isect.merge_border_end_points(&surfs, density.min_len() * END_MERGE_FRACTION);

    let snapshot = isect.clone();
    isect.merge_border_end_points(&surfs, density.min_len() * END_MERGE_FRACTION);

    assert_eq!(isect.ipnts.len(), snapshot.ipnts.len());
    for (a, b) in isect.chains.iter().zip(&snapshot.chains) {
        assert_eq!(a.tess, b.tess);
        assert_eq!(a.tess_uw_a, b.tess_uw_a);
        assert_eq!(a.tess_uw_b, b.tess_uw_b);
    }
    for (a, b) in isect.ipnts.iter().zip(&snapshot.ipnts) {
        assert_eq!(a.pnt, b.pnt);
    }
}

#[test]
fn separated_surfaces_do_not_intersect() {
    let surfs = vec![
        quad(0, 0, [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
        quad(1, 1, [[0.0, 0.0, 2.0], [1.0, 0.0, 2.0], [1.0, 1.0, 2.0], [0.0, 1.0, 2.0]]),
    ];
    let mut isect = IntersectionSet::new(3.0);
    intersect_surfs(&mut isect, &surfs, 0, 1);
    isect.build_chains();
    assert_eq!(isect.num_intersect_chains(), 0);
    assert!(isect.segs.is_empty());
}
