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
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    geometry::{Aabb, Vec3},
    mesh::Mesh,
    surface::ParametricSurface,
};

/// Topological radius of the vote neighbourhood.
pub const RING_DEPTH: usize = 3;
/// Lateral skew added to every axis ray so it does not run along edges.
const RAY_SKEW: f64 = 1e-4;
/// Triangles centred below this y are dropped in half-mesh mode.
const HALF_MESH_Y: f64 = 1e-10;
const JITTER_TRIES: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayDir {
    X,
    Y,
    Z,
    /// Pseudo-random direction from a `StdRng` seeded with the value.
    Jitter(u64),
}

/// Parity ray casts against every closed component of the model.
pub struct RayCaster<'a> {
    surfs: &'a [ParametricSurface],
    comps: Vec<(i32, Vec<usize>)>,
    extent: Vec3,
    reach: f64,
}

impl<'a> RayCaster<'a> {
    /// `skip_comp` components (the slice plane) never count as solids.
    pub fn new(surfs: &'a [ParametricSurface], skip_comp: Option<i32>) -> Self {
        let mut groups: AHashMap<i32, Vec<usize>> = AHashMap::new();
        let mut bbox = Aabb::empty();
        for (i, s) in surfs.iter().enumerate() {
            if Some(s.comp_id()) == skip_comp {
                continue;
            }
            groups.entry(s.comp_id()).or_default().push(i);
            bbox = bbox.union(s.bbox());
        }
        let mut comps: Vec<(i32, Vec<usize>)> = groups.into_iter().collect();
        comps.sort_by_key(|(c, _)| *c);
        let extent = if bbox.is_empty() {
            Vec3::zero()
        } else {
            Vec3::new(bbox.extent(0), bbox.extent(1), bbox.extent(2))
        };
        let reach = 1.0 + if bbox.is_empty() { 0.0 } else { bbox.diag_dist() };
        Self { surfs, comps, extent, reach }
    }

    fn ray_end(&self, p: &Vec3, dir: RayDir) -> Vec3 {
        match dir {
            RayDir::X => *p + Vec3::new(1.0 + self.extent.x, RAY_SKEW, RAY_SKEW),
            RayDir::Y => *p + Vec3::new(RAY_SKEW, 1.0 + self.extent.y, RAY_SKEW),
            RayDir::Z => *p + Vec3::new(RAY_SKEW, RAY_SKEW, 1.0 + self.extent.z),
            RayDir::Jitter(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut d = Vec3::zero();
                while d.norm_squared() < 1e-6 {
                    d = Vec3::new(
                        rng.random_range(-1.0..1.0),
                        rng.random_range(-1.0..1.0),
                        rng.random_range(-1.0..1.0),
                    );
                }
                *p + d.normalized() * self.reach
            }
        }
    }

    /// Is `p` inside any component other than `own_comp`? A component
    /// contains the point when the ray crosses its surfaces an odd number
    /// of times.
    pub fn inside_other(&self, p: &Vec3, own_comp: i32, dir: RayDir) -> bool {
        let end = self.ray_end(p, dir);
        self.comps.iter().filter(|(c, _)| *c != own_comp).any(|(_, ids)| {
            let hits: usize = ids.iter().map(|&s| self.surfs[s].intersect_line_seg(p, &end).len()).sum();
            hits % 2 == 1
        })
    }

    /// Does `p` lie inside component `comp`?
    pub fn inside_comp(&self, p: &Vec3, comp: i32, dir: RayDir) -> bool {
        let end = self.ray_end(p, dir);
        self.comps.iter().filter(|(c, _)| *c == comp).any(|(_, ids)| {
            let hits: usize = ids.iter().map(|&s| self.surfs[s].intersect_line_seg(p, &end).len()).sum();
            hits % 2 == 1
        })
    }
}

/// Triangles within `depth` steps of `start` across non-border edges.
pub fn tri_ring(mesh: &Mesh, start: usize, depth: usize) -> Vec<usize> {
    let mut seen: AHashSet<usize> = AHashSet::new();
    let mut out = vec![start];
    seen.insert(start);
    let mut queue = VecDeque::from([(start, 0usize)]);
    while let Some((t, d)) = queue.pop_front() {
        if d == depth {
            continue;
        }
        for &e in &mesh.tris[t].e {
            let edge = &mesh.edges[e];
            if edge.border {
                continue;
            }
            if let Some(o) = edge.other_tri(t) {
                if !mesh.tris[o].removed && seen.insert(o) {
                    out.push(o);
                    queue.push_back((o, d + 1));
                }
            }
        }
    }
    out
}

/// Per-triangle ±1 verdicts along one ray direction, cast lazily.
struct Verdicts {
    dir: RayDir,
    vals: Vec<Option<i32>>,
}

impl Verdicts {
    fn new(dir: RayDir, n: usize) -> Self {
        Self { dir, vals: vec![None; n] }
    }

    fn get(&mut self, caster: &RayCaster, mesh: &Mesh, t: usize) -> i32 {
        if let Some(v) = self.vals[t] {
            return v;
        }
        let v = if caster.inside_other(&mesh.tri_center(t), mesh.comp_id, self.dir) { 1 } else { -1 };
        self.vals[t] = Some(v);
        v
    }

    fn vote(&mut self, caster: &RayCaster, mesh: &Mesh, ring: &[usize]) -> i32 {
        ring.iter().map(|&t| self.get(caster, mesh, t)).sum()
    }
}

/// Flags the triangles of `mesh` that lie inside another component.
///
/// Each triangle casts a +x ray and the verdicts are summed over its
/// neighbourhood. A tied vote is recast along +y, then +z, then along
/// seeded jittered directions. A vote that stays tied keeps the triangle.
/// Returns the number of triangles flagged.
pub fn flag_interior_tris(mesh: &mut Mesh, caster: &RayCaster, half_mesh: bool) -> usize {
    let n = mesh.tris.len();
    let mut xs = Verdicts::new(RayDir::X, n);
    let mut ys = Verdicts::new(RayDir::Y, n);
    let mut zs = Verdicts::new(RayDir::Z, n);
    let mut flags = vec![false; n];
    let mut ties = 0usize;

    for t in mesh.live_tris().collect::<Vec<_>>() {
        if half_mesh && mesh.tri_center(t).y < HALF_MESH_Y {
            flags[t] = true;
            continue;
        }
        let ring = tri_ring(mesh, t, RING_DEPTH);
        let mut vote = xs.vote(caster, mesh, &ring);
        if vote == 0 {
            vote = ys.vote(caster, mesh, &ring);
        }
        if vote == 0 {
            vote = zs.vote(caster, mesh, &ring);
        }
        let mut k = 0;
        while vote == 0 && k < JITTER_TRIES {
            let seed = (t as u64) * JITTER_TRIES + k;
            vote = ring
                .iter()
                .map(|&r| {
                    let inside = caster.inside_other(&mesh.tri_center(r), mesh.comp_id, RayDir::Jitter(seed));
                    if inside { 1 } else { -1 }
                })
                .sum();
            k += 1;
        }
        if vote == 0 {
            ties += 1;
            warn!("surface {} tri {t}: interior vote tied, keeping it", mesh.surf_id);
        }
        flags[t] = vote > 0;
    }

    let mut count = 0;
    for (t, f) in flags.into_iter().enumerate() {
        if f && !mesh.tris[t].removed {
            mesh.tris[t].interior = true;
            count += 1;
        }
    }
    debug!("surface {}: {count} interior tris, {ties} unresolved ties", mesh.surf_id);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::bezier::planar_grid;

    /// Closed unit cube of six flat surfaces, outward orientation not
    /// required for parity.
    fn cube(comp: i32, first_id: usize, min: Vec3, size: f64) -> Vec<ParametricSurface> {
        let c = |x: f64, y: f64, z: f64| min + Vec3::new(x, y, z) * size;
        let faces = [
            [c(0., 0., 0.), c(1., 0., 0.), c(1., 1., 0.), c(0., 1., 0.)],
            [c(0., 0., 1.), c(0., 1., 1.), c(1., 1., 1.), c(1., 0., 1.)],
            [c(0., 0., 0.), c(0., 0., 1.), c(1., 0., 1.), c(1., 0., 0.)],
            [c(0., 1., 0.), c(1., 1., 0.), c(1., 1., 1.), c(0., 1., 1.)],
            [c(0., 0., 0.), c(0., 1., 0.), c(0., 1., 1.), c(0., 0., 1.)],
            [c(1., 0., 0.), c(1., 0., 1.), c(1., 1., 1.), c(1., 1., 0.)],
        ];
        faces
            .iter()
            .enumerate()
            .map(|(i, f)| ParametricSurface::new(comp, first_id + i, planar_grid(*f)).unwrap())
            .collect()
    }

    #[test]
    fn parity_detects_point_inside_box() {
        let surfs = cube(1, 0, Vec3::new(0.0, 0.0, 0.0), 1.0);
        let caster = RayCaster::new(&surfs, None);
        let inside = Vec3::new(0.31, 0.42, 0.53);
        let outside = Vec3::new(-0.5, 0.42, 0.53);
        for dir in [RayDir::X, RayDir::Y, RayDir::Z, RayDir::Jitter(7)] {
            assert!(caster.inside_other(&inside, 0, dir), "{dir:?}");
            assert!(!caster.inside_other(&outside, 0, dir), "{dir:?}");
        }
        assert!(!caster.inside_other(&inside, 1, RayDir::X));
        assert!(caster.inside_comp(&inside, 1, RayDir::Y));
    }

    #[test]
    fn jittered_rays_are_deterministic() {
        let surfs = cube(0, 0, Vec3::zero(), 1.0);
        let caster = RayCaster::new(&surfs, None);
        let p = Vec3::new(0.5, 0.5, 0.5);
        assert_eq!(caster.ray_end(&p, RayDir::Jitter(3)), caster.ray_end(&p, RayDir::Jitter(3)));
        assert!(caster.ray_end(&p, RayDir::Jitter(3)).dist(&p) > 1.0);
    }
}
