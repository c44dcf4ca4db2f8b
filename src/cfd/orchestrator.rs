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

use std::{
    fmt,
    path::{Path, PathBuf},
};

use ahash::{AHashMap, AHashSet};
use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::{
    cfd::{
        border::{BORDER_WELD_FRACTION, BorderReport, connect_border_edges},
        interior::{RayCaster, RayDir, flag_interior_tris},
    },
    config::MeshConfig,
    curve::icurve::build_border_icurves,
    density::{GridDensity, Source},
    error::{MeshError, MeshResult},
    geometry::{Aabb, Vec2, Vec3, util::tri_area},
    intersection::{IPntId, IntersectionSet, assembly::END_MERGE_FRACTION},
    io::{self, PolyDomain},
    mesh::{FinalMesh, Mesh, SimpleMesh},
    mesh_processing::remesh::RemeshOptions,
    surface::{
        ParametricSurface,
        bezier::planar_grid,
        patch::{self, PatchSegment},
    },
};

/// Component id of the y = 0 slice plane. It is intersected but never
/// meshed.
pub const SLICE_COMP_ID: i32 = -999;
/// Surfaces entirely below this y are dropped in half-mesh mode.
const HALF_MESH_CUT_Y: f64 = -0.01;
/// Chain points on one surface closer than this in (u, w) are one node.
const NODE_UW_TOL2: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Clean,
    SurfacesLoaded,
    SourcesUpdated,
    GridBuilt,
    Intersected,
    MeshInitialized,
    Remeshed,
    InteriorRemoved,
    BorderConnected,
    Exported,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Counts gathered over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub num_surfs: usize,
    pub num_border_chains: usize,
    pub num_intersect_chains: usize,
    pub num_tris: usize,
    pub num_nodes: usize,
    pub interior_tris_removed: usize,
    pub unmatched_border_edges: usize,
}

/// Drives the whole meshing pipeline over one model.
///
/// Stages run in a fixed order:
/// `load_surfaces → update_sources → build_grid → intersect → init_mesh →
/// remesh → remove_interior_tris → connect_border_edges → export_files`.
/// Calling one out of order fails with `MeshError::InvalidState`.
#[derive(Debug)]
pub struct CfdMeshOrchestrator {
    config: MeshConfig,
    density: GridDensity,
    surfs: Vec<ParametricSurface>,
    /// Index of the slice plane in `surfs`, always the last entry.
    slice_surf: Option<usize>,
    isect: IntersectionSet,
    meshes: Vec<Mesh>,
    stage: PipelineStage,
    interior_removed: usize,
    border: BorderReport,
    final_mesh: FinalMesh,
}

impl CfdMeshOrchestrator {
    pub fn new(config: MeshConfig) -> MeshResult<Self> {
        config.validate()?;
        Ok(Self {
            density: GridDensity::from_config(&config),
            config,
            surfs: Vec::new(),
            slice_surf: None,
            isect: IntersectionSet::new(1.0),
            meshes: Vec::new(),
            stage: PipelineStage::Clean,
            interior_removed: 0,
            border: BorderReport::default(),
            final_mesh: FinalMesh::default(),
        })
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn density(&self) -> &GridDensity {
        &self.density
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Model surfaces, without the slice plane.
    pub fn surfaces(&self) -> &[ParametricSurface] {
        &self.surfs[..self.num_model_surfs()]
    }

    pub fn intersections(&self) -> &IntersectionSet {
        &self.isect
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn final_mesh(&self) -> &FinalMesh {
        &self.final_mesh
    }

    pub fn border_report(&self) -> &BorderReport {
        &self.border
    }

    fn num_model_surfs(&self) -> usize {
        self.slice_surf.unwrap_or(self.surfs.len())
    }

    fn require_stage(&self, allowed: &[PipelineStage]) -> MeshResult<()> {
        if allowed.contains(&self.stage) {
            return Ok(());
        }
        let expected = allowed.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" or ");
        Err(MeshError::InvalidState {
            expected,
            found: self.stage.to_string(),
        })
    }

    /// Takes ownership of the model surfaces.
    ///
    /// In half-mesh mode surfaces lying entirely at y < -0.01 or on the
    /// y = 0 plane are dropped. Surface ids are renumbered in order, and
    /// components sharing a border control row are merged.
    pub fn load_surfaces(&mut self, surfs: Vec<ParametricSurface>) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::Clean, PipelineStage::SurfacesLoaded])?;
        let half = self.config.half_mesh;
        let mut kept: Vec<ParametricSurface> = surfs
            .into_iter()
            .filter(|s| !(half && (s.less_than_y(HALF_MESH_CUT_Y) || s.plane_at_y_zero())))
            .collect();
        if kept.is_empty() {
            return Err(MeshError::EmptyModel);
        }
        for (i, s) in kept.iter_mut().enumerate() {
            s.set_surf_id(i);
        }
        merge_touching_components(&mut kept);

        self.surfs = kept;
        self.slice_surf = None;
        self.meshes.clear();
        self.final_mesh = FinalMesh::default();
        self.stage = PipelineStage::SurfacesLoaded;
        info!("loaded {} surfaces", self.surfs.len());
        Ok(())
    }

    pub fn read_surfaces_file<P: AsRef<Path>>(&mut self, path: P) -> MeshResult<()> {
        let surfs = io::load_surfaces(path)?;
        self.load_surfaces(surfs)
    }

    pub fn add_source(&mut self, src: Source) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::SurfacesLoaded, PipelineStage::SourcesUpdated])?;
        self.density.add_source(src);
        self.stage = PipelineStage::SurfacesLoaded;
        Ok(())
    }

    pub fn clear_sources(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::SurfacesLoaded, PipelineStage::SourcesUpdated])?;
        self.density.clear_sources();
        self.stage = PipelineStage::SurfacesLoaded;
        Ok(())
    }

    /// Syncs the source mirrors (`sym` is a per-axis sign vector such as
    /// (1, -1, 1), `None` for none) and fixes radii too small for the
    /// growth ratio.
    pub fn update_sources(&mut self, sym: Option<Vec3>) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::SurfacesLoaded, PipelineStage::SourcesUpdated])?;
        self.density.apply_config(&self.config);
        self.density.update_mirrors(sym);
        self.density.check_correct_rads();
        self.stage = PipelineStage::SourcesUpdated;
        Ok(())
    }

    /// Scales every length control, and the sources, by `factor`.
    pub fn scale_tri_size(&mut self, factor: f64) -> MeshResult<()> {
        self.require_stage(&[
            PipelineStage::Clean,
            PipelineStage::SurfacesLoaded,
            PipelineStage::SourcesUpdated,
        ])?;
        if !(factor > 0.0) || !factor.is_finite() {
            return Err(MeshError::InvalidConfig(format!("scale factor must be positive, got {factor}")));
        }
        self.config.scale_tri_size(factor);
        self.config.validate()?;
        self.density.apply_config(&self.config);
        self.density.scale_all_sources(factor);
        Ok(())
    }

    /// Builds each surface's curvature target map and limits the whole
    /// set of samples, source anchors included, by the growth ratio.
    pub fn build_grid(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::SourcesUpdated])?;
        for s in &mut self.surfs {
            s.build_target_map(&self.density);
        }

        let mut samples: Vec<(Vec3, f64)> = Vec::new();
        let mut spans: Vec<(usize, usize)> = Vec::with_capacity(self.surfs.len());
        for s in &self.surfs {
            let start = samples.len();
            samples.extend(s.target_map_samples());
            spans.push((start, samples.len()));
        }
        for src in self.density.sources() {
            samples.extend(src.anchors());
        }
        let limited = self.density.limit_by_growth(&samples);
        for (s, (a, b)) in self.surfs.iter_mut().zip(spans) {
            s.set_target_map_values(&limited[a..b]);
        }

        self.stage = PipelineStage::GridBuilt;
        info!("grid built from {} samples", samples.len());
        Ok(())
    }

    fn model_bbox(&self) -> Aabb {
        self.surfs[..self.num_model_surfs()]
            .iter()
            .fold(Aabb::empty(), |b, s| b.union(s.bbox()))
    }

    /// A flat 4×4 grid on y = 0 reaching one unit past the model in x and z.
    fn slice_plane(&self) -> MeshResult<ParametricSurface> {
        let b = self.model_bbox();
        let (x0, x1) = (b.min.x - 1.0, b.max.x + 1.0);
        let (z0, z1) = (b.min.z - 1.0, b.max.z + 1.0);
        let grid = planar_grid([
            Vec3::new(x0, 0.0, z0),
            Vec3::new(x1, 0.0, z0),
            Vec3::new(x1, 0.0, z1),
            Vec3::new(x0, 0.0, z1),
        ]);
        ParametricSurface::new(SLICE_COMP_ID, self.surfs.len(), grid)
    }

    fn intersect_pair(&mut self, i: usize, j: usize) -> usize {
        let (a, b) = (&self.surfs[i], &self.surfs[j]);
        if !a.bbox().intersects(b.bbox()) {
            return 0;
        }
        let mut found: Vec<PatchSegment> = Vec::new();
        for pa in a.patches() {
            for pb in b.patches() {
                patch::intersect(pa, pb, &mut |ps| found.push(ps));
            }
        }
        found
            .iter()
            .filter(|ps| self.isect.add_intersection_seg(&self.surfs, ps))
            .count()
    }

    /// Intersects every cross-component surface pair, then assembles,
    /// splits and merges the chains. The y = 0 slice plane joins in when
    /// `intersect_sym_plane` or `half_mesh` is set.
    pub fn intersect(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::GridBuilt])?;
        let n = self.num_model_surfs();
        self.isect = IntersectionSet::new(self.model_bbox().diag_dist());

        let mut raw = 0usize;
        for i in 0..n {
            for j in i + 1..n {
                let (a, b) = (&self.surfs[i], &self.surfs[j]);
                if a.comp_id() == b.comp_id() {
                    continue;
                }
                if !a.bbox().intersects(b.bbox()) {
                    continue;
                }
                // abutting surfaces meet along a border, not a crossing
                if a.border_curve_on_surface(b) || b.border_curve_on_surface(a) {
                    continue;
                }
                raw += self.intersect_pair(i, j);
            }
        }

        if self.config.intersect_sym_plane || self.config.half_mesh {
            let slice = self.slice_plane()?;
            let sid = slice.surf_id();
            self.surfs.push(slice);
            self.slice_surf = Some(sid);
            for i in 0..n {
                if !self.surfs[i].plane_at_y_zero() {
                    raw += self.intersect_pair(i, sid);
                }
            }
        }
        debug!("{raw} raw intersection segments");

        let icurves = build_border_icurves(&self.surfs[..n]);
        self.isect.build_chains();
        self.isect.load_border_curves(&self.surfs, &icurves);
        self.isect.merge_interior_chain_ipnts();
        self.isect.split_border_curves();
        self.isect.intersect_split_chains();

        self.stage = PipelineStage::Intersected;
        info!(
            "{} border chains, {} intersection chains",
            self.isect.num_border_chains(),
            self.isect.num_intersect_chains()
        );
        Ok(())
    }

    /// Tessellates the chains, closes their junctions and triangulates
    /// each model surface from the chains that touch it.
    pub fn init_mesh(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::Intersected])?;
        self.isect.tessellate_chains(&self.surfs, &self.density);
        let tol = self.density.min_len() * END_MERGE_FRACTION;
        self.isect.merge_border_end_points(&self.surfs, tol);
        self.build_mesh();
        self.stage = PipelineStage::MeshInitialized;
        Ok(())
    }

    /// Constraint points and segments of one surface, taken from the
    /// tessellation of every chain on it.
    fn surface_constraints(&self, s: usize) -> (Vec<Vec2>, Vec<[usize; 2]>) {
        let mut uws: Vec<Vec2> = Vec::new();
        let mut nodes: AHashMap<IPntId, SmallVec<[usize; 2]>> = AHashMap::new();
        let mut seen: AHashSet<(usize, usize)> = AHashSet::new();
        let mut segs: Vec<[usize; 2]> = Vec::new();

        for chain in self.isect.chains.iter().filter(|c| c.touches(s)) {
            for poly in chain.tess_polylines(s) {
                let mut prev: Option<usize> = None;
                for (k, uw) in poly.iter().enumerate() {
                    let Some(&ip) = chain.tess.get(k) else { break };
                    let bucket = nodes.entry(ip).or_default();
                    let found = bucket.iter().copied().find(|&n| uws[n].dist_squared(uw) < NODE_UW_TOL2);
                    let node = found.unwrap_or_else(|| {
                        uws.push(*uw);
                        bucket.push(uws.len() - 1);
                        uws.len() - 1
                    });
                    if let Some(p) = prev {
                        if p != node && seen.insert((p.min(node), p.max(node))) {
                            segs.push([p, node]);
                        }
                    }
                    prev = Some(node);
                }
            }
        }
        (uws, segs)
    }

    fn build_mesh(&mut self) {
        let n = self.num_model_surfs();
        let mut meshes = Vec::with_capacity(n);
        for s in 0..n {
            let surf = &self.surfs[s];
            let mut mesh = Mesh::new(s, surf.comp_id());
            let (uws, segs) = self.surface_constraints(s);
            if segs.len() < 3 {
                warn!("surface {s} has no closed border, skipped");
            } else if let Err(e) = mesh.init_mesh(surf, &uws, &segs) {
                warn!("surface {s} could not be triangulated: {e:?}");
            }
            meshes.push(mesh);
        }
        self.meshes = meshes;
        info!(
            "initial mesh: {} tris",
            self.meshes.iter().map(|m| m.num_tris()).sum::<usize>()
        );
    }

    /// Runs `remesh_iterations` improvement iterations on every surface
    /// and flattens the results.
    pub fn remesh(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::MeshInitialized])?;
        let opts = RemeshOptions::new(self.config.remesh_iterations, self.config.grow_ratio);
        let total = self.meshes.len();
        for (k, mesh) in self.meshes.iter_mut().enumerate() {
            let surf = &self.surfs[mesh.surf_id];
            if mesh.num_tris() > 0 {
                if let Err(e) = mesh.remesh(surf, &self.density, &opts) {
                    warn!("surface {} remesh skipped: {e:?}", mesh.surf_id);
                }
            }
            mesh.load_simp_tris();
            debug!("Surf {}/{} done, {} tris", k + 1, total, mesh.simp.tris.len());
        }
        self.stage = PipelineStage::Remeshed;
        Ok(())
    }

    /// Drops every triangle that lies inside another component, and in
    /// half-mesh mode every triangle below the symmetry plane.
    pub fn remove_interior_tris(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::Remeshed])?;
        let caster = RayCaster::new(&self.surfs, Some(SLICE_COMP_ID));
        let half = self.config.half_mesh;
        let mut removed = 0;
        for mesh in &mut self.meshes {
            flag_interior_tris(mesh, &caster, half);
            removed += mesh.remove_interior_tris_edges_nodes();
            mesh.load_simp_tris();
        }
        self.interior_removed = removed;
        self.stage = PipelineStage::InteriorRemoved;
        info!("removed {removed} interior tris");
        Ok(())
    }

    /// Welds the free edges left between surfaces and assembles the final
    /// indexed mesh.
    pub fn connect_border_edges(&mut self) -> MeshResult<()> {
        self.require_stage(&[PipelineStage::InteriorRemoved])?;
        let mut simps: Vec<SimpleMesh> = self.meshes.iter_mut().map(|m| std::mem::take(&mut m.simp)).collect();
        self.border = connect_border_edges(&mut simps, self.density.min_len() * BORDER_WELD_FRACTION);
        self.final_mesh = FinalMesh::assemble(&simps);
        for (m, s) in self.meshes.iter_mut().zip(simps) {
            m.simp = s;
        }
        self.stage = PipelineStage::BorderConnected;
        info!(
            "final mesh: {} points, {} tris",
            self.final_mesh.num_pnts(),
            self.final_mesh.num_tris()
        );
        Ok(())
    }

    /// Every stage from `update_sources` through `connect_border_edges`.
    pub fn run(&mut self, sym: Option<Vec3>) -> MeshResult<()> {
        self.update_sources(sym)?;
        self.build_grid()?;
        self.intersect()?;
        self.init_mesh()?;
        self.remesh()?;
        self.remove_interior_tris()?;
        self.connect_border_edges()
    }

    /// One point inside each model component, for the volume mesher.
    pub fn interior_points(&self) -> Vec<Vec3> {
        let caster = RayCaster::new(&self.surfs, Some(SLICE_COMP_ID));
        let fm = &self.final_mesh;
        let eps = 1e-3 * self.model_bbox().diag_dist().max(1e-9);
        let mut comps: Vec<i32> = fm.tri_comp.clone();
        comps.sort_unstable();
        comps.dedup();

        let mut out = Vec::new();
        for comp in comps {
            let mut tris: Vec<(f64, usize)> = (0..fm.num_tris())
                .filter(|&t| fm.tri_comp[t] == comp)
                .map(|t| {
                    let [a, b, c] = fm.tri_pnts(t);
                    (tri_area(&a, &b, &c), t)
                })
                .collect();
            tris.sort_by(|a, b| b.0.total_cmp(&a.0));
            'tris: for &(_, t) in tris.iter().take(8) {
                let [a, b, c] = fm.tri_pnts(t);
                let cen = (a + b + c) / 3.0;
                let n = fm.tri_normal(t);
                if !n.is_finite() {
                    continue;
                }
                for p in [cen - n * eps, cen + n * eps] {
                    if caster.inside_comp(&p, comp, RayDir::X) && caster.inside_comp(&p, comp, RayDir::Z) {
                        out.push(p);
                        break 'tris;
                    }
                }
            }
        }
        out
    }

    /// Writes every format enabled in the config as `dir/base.<ext>`.
    /// Returns the written paths.
    pub fn export_files<P: AsRef<Path>>(&mut self, dir: P, base: &str) -> MeshResult<Vec<PathBuf>> {
        self.require_stage(&[PipelineStage::BorderConnected, PipelineStage::Exported])?;
        let flags = self.config.export.clone();
        let path = |ext: &str| dir.as_ref().join(format!("{base}.{ext}"));
        let mut written = Vec::new();
        let fm = &self.final_mesh;

        if flags.stl {
            io::stl::save_stl(path("stl"), fm)?;
            written.push(path("stl"));
        }
        if flags.poly {
            let domain = PolyDomain::around(
                &fm.bbox(),
                self.config.far_field_scale,
                self.config.half_mesh,
                self.interior_points(),
            );
            io::poly::save_poly(path("poly"), fm, &domain)?;
            written.push(path("poly"));
        }
        if flags.tri {
            io::tri::save_tri(path("tri"), fm)?;
            written.push(path("tri"));
        }
        if flags.obj {
            io::obj::save_obj(path("obj"), fm)?;
            written.push(path("obj"));
        }
        if flags.nascart {
            let comps: Vec<i32> = self.surfaces().iter().map(|s| s.comp_id()).collect();
            io::nascart::save_nascart(path("dat"), path("key"), fm, &comps)?;
            written.push(path("dat"));
            written.push(path("key"));
        }
        if flags.gmsh {
            io::gmsh::save_gmsh(path("msh"), fm)?;
            written.push(path("msh"));
        }
        if flags.srf {
            io::srf::save_srf(path("srf"), self.surfaces(), &self.isect)?;
            written.push(path("srf"));
        }
        self.stage = PipelineStage::Exported;
        info!("exported {} files", written.len());
        Ok(written)
    }

    pub fn check_water_tight(&self) -> MeshResult<String> {
        self.require_stage(&[PipelineStage::BorderConnected, PipelineStage::Exported])?;
        Ok(self.final_mesh.check_water_tight())
    }

    pub fn stats(&self) -> MeshStats {
        let assembled = self.stage >= PipelineStage::BorderConnected;
        MeshStats {
            num_surfs: self.num_model_surfs(),
            num_border_chains: self.isect.num_border_chains(),
            num_intersect_chains: self.isect.num_intersect_chains(),
            num_tris: if assembled {
                self.final_mesh.num_tris()
            } else {
                self.meshes.iter().map(|m| m.num_tris()).sum()
            },
            num_nodes: if assembled {
                self.final_mesh.num_pnts()
            } else {
                self.meshes.iter().map(|m| m.num_nodes()).sum()
            },
            interior_tris_removed: self.interior_removed,
            unmatched_border_edges: self.border.unmatched.len(),
        }
    }
}

/// Gives surfaces of components that share a border control row the
/// component id of the first of them.
fn merge_touching_components(surfs: &mut [ParametricSurface]) {
    let mut parent: AHashMap<i32, i32> = AHashMap::new();
    fn root(parent: &AHashMap<i32, i32>, mut c: i32) -> i32 {
        while let Some(&p) = parent.get(&c) {
            if p == c {
                break;
            }
            c = p;
        }
        c
    }
    for s in 0..surfs.len() {
        for t in s + 1..surfs.len() {
            let (ca, cb) = (root(&parent, surfs[s].comp_id()), root(&parent, surfs[t].comp_id()));
            if ca != cb && surfs[s].border_match(&surfs[t]) {
                parent.insert(cb, ca);
                debug!("component {cb} merged into {ca}");
            }
        }
    }
    for s in surfs.iter_mut() {
        let c = root(&parent, s.comp_id());
        s.set_comp_id(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(comp: i32, z: f64) -> ParametricSurface {
        ParametricSurface::new(
            comp,
            0,
            planar_grid([
                Vec3::new(0.0, 0.0, z),
                Vec3::new(1.0, 0.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(0.0, 1.0, z),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn stages_must_run_in_order() {
        let mut o = CfdMeshOrchestrator::new(MeshConfig::new(0.5)).unwrap();
        assert!(matches!(o.intersect(), Err(MeshError::InvalidState { .. })));
        o.load_surfaces(vec![square(0, 0.0)]).unwrap();
        assert!(matches!(o.build_grid(), Err(MeshError::InvalidState { .. })));
        o.update_sources(None).unwrap();
        assert_eq!(o.stage(), PipelineStage::SourcesUpdated);
        assert!(matches!(o.check_water_tight(), Err(MeshError::InvalidState { .. })));
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut o = CfdMeshOrchestrator::new(MeshConfig::default()).unwrap();
        assert!(matches!(o.load_surfaces(Vec::new()), Err(MeshError::EmptyModel)));
    }

    #[test]
    fn half_mesh_drops_surfaces_below_plane() {
        let mut o = CfdMeshOrchestrator::new(MeshConfig::default().with_half_mesh(true)).unwrap();
        let below = ParametricSurface::new(
            0,
            1,
            planar_grid([
                Vec3::new(0.0, -2.0, 0.0),
                Vec3::new(1.0, -2.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, -1.0, 0.0),
            ]),
        )
        .unwrap();
        o.load_surfaces(vec![square(0, 1.0), below]).unwrap();
        assert_eq!(o.surfaces().len(), 1);
        assert_eq!(o.surfaces()[0].surf_id(), 0);
    }

    #[test]
    fn components_sharing_a_border_merge() {
        let a = square(3, 0.0);
        let b = ParametricSurface::new(
            7,
            1,
            planar_grid([
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ]),
        )
        .unwrap();
        let c = square(9, 5.0);
        let mut surfs = vec![a, b, c];
        merge_touching_components(&mut surfs);
        assert_eq!(surfs[0].comp_id(), 3);
        assert_eq!(surfs[1].comp_id(), 3);
        assert_eq!(surfs[2].comp_id(), 9);
    }

    #[test]
    fn scale_tri_size_only_before_grid() {
        let mut o = CfdMeshOrchestrator::new(MeshConfig::new(1.0)).unwrap();
        o.scale_tri_size(0.5).unwrap();
        assert_eq!(o.config().base_len, 0.5);
        o.load_surfaces(vec![square(0, 0.0)]).unwrap();
        o.update_sources(None).unwrap();
        o.build_grid().unwrap();
        assert!(o.scale_tri_size(2.0).is_err());
    }
}
