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
use cfdmesh::{
    CfdMeshOrchestrator, ExportFlags, MeshConfig, MeshError, PipelineStage,
    density::Source,
    geometry::Vec3,
    mesh::FinalMesh,
    surface::{ParametricSurface, bezier::planar_grid},
};

/// Six flat faces of an axis-aligned cube.
fn cube(comp: i32, first_id: usize, min: Vec3, size: f64) -> Vec<ParametricSurface> {
    let c = |x: f64, y: f64, z: f64| min + Vec3::new(x, y, z) * size;
    let faces = [
        [c(0., 0., 0.), c(0., 1., 0.), c(1., 1., 0.), c(1., 0., 0.)],
        [c(0., 0., 1.), c(1., 0., 1.), c(1., 1., 1.), c(0., 1., 1.)],
        [c(0., 0., 0.), c(1., 0., 0.), c(1., 0., 1.), c(0., 0., 1.)],
        [c(0., 1., 0.), c(0., 1., 1.), c(1., 1., 1.), c(1., 1., 0.)],
        [c(0., 0., 0.), c(0., 0., 1.), c(0., 1., 1.), c(0., 1., 0.)],
        [c(1., 0., 0.), c(1., 1., 0.), c(1., 1., 1.), c(1., 0., 1.)],
    ];
    faces
        .iter()
        .enumerate()
        .map(|(i, f)| ParametricSurface::new(comp, first_id + i, planar_grid(*f)).unwrap())
        .collect()
}

fn run(cfg: MeshConfig, surfs: Vec<ParametricSurface>) -> CfdMeshOrchestrator {
    run_with_sources(cfg, surfs, Vec::new())
}

fn run_with_sources(cfg: MeshConfig, surfs: Vec<ParametricSurface>, sources: Vec<Source>) -> CfdMeshOrchestrator {
    let mut o = CfdMeshOrchestrator::new(cfg).unwrap();
    o.load_surfaces(surfs).unwrap();
    for src in sources {
        o.add_source(src).unwrap();
    }
    o.run(None).unwrap();
    o
}

fn assert_water_tight(o: &CfdMeshOrchestrator) {
    assert_eq!(o.check_water_tight().unwrap(), "Is Water Tight\n");
    assert_eq!(o.stats().unmatched_border_edges, 0);
}

fn assert_valid_tris(mesh: &FinalMesh) {
    let mut uses: AHashMap<(usize, usize), usize> = AHashMap::new();
    for t in &mesh.tris {
        assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2], "degenerate tri {t:?}");
        for k in 0..3 {
            let (a, b) = (t[k], t[(k + 1) % 3]);
            *uses.entry((a.min(b), a.max(b))).or_default() += 1;
        }
    }
    assert!(uses.values().all(|&n| n <= 2));
}

#[test]
fn single_cube_is_watertight() {
    let o = run(MeshConfig::new(0.5), cube(0, 0, Vec3::zero(), 1.0));
    assert_eq!(o.stage(), PipelineStage::BorderConnected);

    let stats = o.stats();
    assert_eq!(stats.num_surfs, 6);
    assert_eq!(stats.num_intersect_chains, 0);
    assert_eq!(stats.interior_tris_removed, 0);
    assert_eq!(stats.unmatched_border_edges, 0);
    assert!(stats.num_tris >= 12);

    assert_valid_tris(o.final_mesh());
    assert_water_tight(&o);
    assert_eq!(o.final_mesh().open_edge_counts(), (0, 0));
}

#[test]
fn source_refinement_near_a_face_stays_watertight() {
    let uniform = run(MeshConfig::new(0.5), cube(0, 0, Vec3::zero(), 1.0));
    for (len, rad) in [(0.05, 0.3), (0.1, 0.4), (0.05, 0.6), (0.02, 0.25)] {
        let src = Source::point("p", Vec3::new(0.5, 0.5, -0.05), len, rad);
        let o = run_with_sources(MeshConfig::new(0.5), cube(0, 0, Vec3::zero(), 1.0), vec![src]);
        assert!(
            o.stats().num_tris > uniform.stats().num_tris,
            "source ({len}, {rad}) did not refine"
        );
        assert_valid_tris(o.final_mesh());
        assert_water_tight(&o);
        assert_eq!(o.final_mesh().open_edge_counts(), (0, 0));
    }
}

#[test]
fn halving_base_length_refines() {
    let coarse = run(MeshConfig::new(0.5), cube(0, 0, Vec3::zero(), 1.0));
    let fine = run(MeshConfig::new(0.25), cube(0, 0, Vec3::zero(), 1.0));
    let (nc, nf) = (coarse.stats().num_tris, fine.stats().num_tris);
    assert!(nf > 2 * nc, "coarse {nc}, fine {nf}");
    assert!(nf < 8 * nc, "coarse {nc}, fine {nf}");
}

#[test]
fn overlapping_cubes_lose_interior_tris() {
    let mut surfs = cube(0, 0, Vec3::zero(), 1.0);
    surfs.extend(cube(1, 6, Vec3::new(0.55, 0.35, 0.25), 1.0));
    let o = run(MeshConfig::new(0.25), surfs);

    let stats = o.stats();
    assert!(stats.num_intersect_chains > 0);
    assert!(stats.interior_tris_removed > 0);
    assert_valid_tris(o.final_mesh());
    assert_water_tight(&o);

    // no surviving tri sits inside the other cube
    let inside = |p: &Vec3, lo: Vec3| (0..3).all(|i| p[i] > lo[i] + 1e-3 && p[i] < lo[i] + 1.0 - 1e-3);
    let fm = o.final_mesh();
    for t in 0..fm.num_tris() {
        let [a, b, c] = fm.tri_pnts(t);
        let cen = (a + b + c) / 3.0;
        let other = if fm.tri_comp[t] == 0 { Vec3::new(0.55, 0.35, 0.25) } else { Vec3::zero() };
        assert!(!inside(&cen, other), "tri {t} of comp {} is buried", fm.tri_comp[t]);
    }
}

#[test]
fn half_mesh_keeps_upper_side() {
    let cfg = MeshConfig::new(0.25).with_half_mesh(true);
    let o = run(cfg, cube(0, 0, Vec3::new(0.0, -0.5, 0.0), 1.0));
    let fm = o.final_mesh();
    assert!(fm.num_tris() > 0);
    for t in 0..fm.num_tris() {
        let [a, b, c] = fm.tri_pnts(t);
        assert!((a.y + b.y + c.y) / 3.0 > -1e-9);
    }
}

#[test]
fn out_of_order_stage_is_rejected() {
    let mut o = CfdMeshOrchestrator::new(MeshConfig::new(0.5)).unwrap();
    o.load_surfaces(cube(0, 0, Vec3::zero(), 1.0)).unwrap();
    for res in [o.remesh(), o.init_mesh(), o.connect_border_edges(), o.remove_interior_tris()] {
        assert!(matches!(res, Err(MeshError::InvalidState { .. })));
    }
    assert!(o.export_files(std::env::temp_dir(), "never").is_err());
    assert_eq!(o.stage(), PipelineStage::SurfacesLoaded);
}

#[test]
fn exports_every_enabled_format() {
    let dir = std::env::temp_dir().join(format!("cfdmesh_export_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let cfg = MeshConfig::new(0.5).with_export(ExportFlags::all());
    let mut o = run(cfg, cube(0, 0, Vec3::zero(), 1.0));
    let written = o.export_files(&dir, "cube").unwrap();
    assert_eq!(o.stage(), PipelineStage::Exported);
    assert_eq!(written.len(), 8);
    for p in &written {
        let meta = std::fs::metadata(p).unwrap();
        assert!(meta.len() > 0, "{} is empty", p.display());
    }
    let stl = std::fs::read_to_string(dir.join("cube.stl")).unwrap();
    assert!(stl.starts_with("solid"));
    std::fs::remove_dir_all(&dir).ok();
}
