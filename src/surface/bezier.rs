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

use log::debug;

use crate::{
    curve::scurve::SCurve,
    density::grid::GridDensity,
    error::{MeshError, MeshResult},
    geometry::{Aabb, Vec2, Vec3},
    surface::patch::SurfacePatch,
};

/// Distance-map sampling resolution per parametric direction.
const DIST_MAP_SAMPLES: usize = 101;
/// Target-map samples per cubic section.
const NUM_MAP: usize = 10;
/// Newton iterations for `closest_uw`.
const MAX_NEWTON_ITER: usize = 10;
const MAX_COMPASS_FAILS: usize = 20;

pub const BORDER_MATCH_TOL2: f64 = 1e-8;

/// Blending functions of the cubic Bernstein basis and their derivatives.
#[inline(always)]
fn blend(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

#[inline(always)]
fn blend_deriv(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [
        -3.0 * s * s,
        3.0 - 12.0 * t + 9.0 * t * t,
        6.0 * t - 9.0 * t * t,
        3.0 * t * t,
    ]
}

/// One trimmed surface described by a grid of bicubic Bezier control points.
///
/// The grid is `nu × nw` with both dimensions `3k + 1`, so it holds
/// `(nu - 1) / 3` cubic sections along u. Parameters run over
/// `[0, max_u] × [0, max_w]`, one unit per section.
#[derive(Debug, Clone)]
pub struct ParametricSurface {
    surf_id: usize,
    comp_id: i32,
    /// `pnts[i][j]`: i along u, j along w.
    pnts: Vec<Vec<Vec3>>,
    bbox: Aabb,
    patches: Vec<SurfacePatch>,
    pub border_curves: Vec<SCurve>,

    u_scale: Vec<f64>,
    w_scale: Vec<f64>,
    scale_u_flag: bool,

    target_map: Vec<Vec<f64>>,
}

impl ParametricSurface {
    pub fn new(comp_id: i32, surf_id: usize, pnts: Vec<Vec<Vec3>>) -> MeshResult<Self> {
        let nu = pnts.len();
        let nw = pnts.first().map_or(0, |row| row.len());
        if nu < 4 || nw < 4 || nu % 3 != 1 || nw % 3 != 1 || pnts.iter().any(|r| r.len() != nw) {
            return Err(MeshError::InvalidControlGrid { nu, nw });
        }

        let bbox = Aabb::from_iter(pnts.iter().flatten());
        let mut surf = Self {
            surf_id,
            comp_id,
            pnts,
            bbox,
            patches: Vec::new(),
            border_curves: Vec::new(),
            u_scale: Vec::new(),
            w_scale: Vec::new(),
            scale_u_flag: false,
            target_map: Vec::new(),
        };
        surf.build_patches();
        surf.build_dist_map();
        surf.find_border_curves();
        Ok(surf)
    }

    pub fn surf_id(&self) -> usize {
        self.surf_id
    }

    pub fn set_surf_id(&mut self, id: usize) {
        self.surf_id = id;
        for c in &mut self.border_curves {
            c.surf = id;
        }
        for p in &mut self.patches {
            p.surf = id;
        }
    }

    pub fn comp_id(&self) -> i32 {
        self.comp_id
    }

    pub fn set_comp_id(&mut self, id: i32) {
        self.comp_id = id;
    }

    pub fn control_points(&self) -> &[Vec<Vec3>] {
        &self.pnts
    }

    pub fn num_u(&self) -> usize {
        self.pnts.len()
    }

    pub fn num_w(&self) -> usize {
        self.pnts[0].len()
    }

    pub fn max_u(&self) -> f64 {
        ((self.num_u() - 1) / 3) as f64
    }

    pub fn max_w(&self) -> f64 {
        ((self.num_w() - 1) / 3) as f64
    }

    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    pub fn patches(&self) -> &[SurfacePatch] {
        &self.patches
    }

    pub fn valid_uw(&self, uw: &Vec2) -> bool {
        const SLOP: f64 = 1e-9;
        uw.x >= -SLOP && uw.x <= self.max_u() + SLOP && uw.y >= -SLOP && uw.y <= self.max_w() + SLOP
    }

    /// Section index and local parameter for `u` along an axis with `n`
    /// control points. Values outside the range are clamped.
    #[inline]
    fn locate(u: f64, n: usize) -> (usize, f64) {
        let max = ((n - 1) / 3) as f64;
        let u = if u.is_nan() { 0.0 } else { u.clamp(0.0, max) };
        let trunc = u.floor();
        let mut ind = trunc as usize * 3;
        let mut t = u - trunc;
        if ind >= n - 1 {
            ind = n - 4;
            t = 1.0;
        }
        (ind, t)
    }

    fn eval(&self, u: f64, w: f64, fu: fn(f64) -> [f64; 4], fw: fn(f64) -> [f64; 4]) -> Vec3 {
        let (iu, tu) = Self::locate(u, self.num_u());
        let (iw, tw) = Self::locate(w, self.num_w());
        let bu = fu(tu);
        let bw = fw(tw);
        let mut p = Vec3::zero();
        for (i, bui) in bu.iter().enumerate() {
            let row = &self.pnts[iu + i];
            let mut acc = Vec3::zero();
            for (j, bwj) in bw.iter().enumerate() {
                acc += row[iw + j] * *bwj;
            }
            p += acc * *bui;
        }
        p
    }

    pub fn comp_pnt(&self, u: f64, w: f64) -> Vec3 {
        self.eval(u, w, blend, blend)
    }

    pub fn comp_pnt_uw(&self, uw: &Vec2) -> Vec3 {
        self.comp_pnt(uw.x, uw.y)
    }

    pub fn comp_pnt01(&self, u01: f64, w01: f64) -> Vec3 {
        self.comp_pnt(u01 * self.max_u(), w01 * self.max_w())
    }

    /// ∂S/∂u, per unit of u.
    pub fn comp_tan_u(&self, u: f64, w: f64) -> Vec3 {
        self.eval(u, w, blend_deriv, blend)
    }

    /// ∂S/∂w, per unit of w.
    pub fn comp_tan_w(&self, u: f64, w: f64) -> Vec3 {
        self.eval(u, w, blend, blend_deriv)
    }

    pub fn comp_norm(&self, u: f64, w: f64) -> Vec3 {
        self.comp_tan_u(u, w).cross(&self.comp_tan_w(u, w)).normalized()
    }

    /// Parameters of the surface point nearest `pnt`, starting at `guess`.
    ///
    /// Newton steps are taken in normalized [0,1]² coordinates. If they end
    /// farther away than the guess, a compass search from the guess is used
    /// instead.
    pub fn closest_uw(&self, pnt: &Vec3, guess: &Vec2) -> Vec2 {
        let (mu, mw) = (self.max_u(), self.max_w());
        let g = Vec2::new((guess.x / mu).clamp(0.0, 1.0), (guess.y / mw).clamp(0.0, 1.0));
        let guess_d2 = self.comp_pnt01(g.x, g.y).dist_squared(pnt);

        let mut uw = g;
        for _ in 0..MAX_NEWTON_ITER {
            let (u, w) = (uw.x * mu, uw.y * mw);
            let r = *pnt - self.comp_pnt(u, w);
            let tu = self.comp_tan_u(u, w) * mu;
            let tw = self.comp_tan_w(u, w) * mw;
            let n = tu.cross(&tw);
            let nn = n.norm_squared();
            if nn <= f64::MIN_POSITIVE {
                break;
            }
            let du = r.cross(&tw).dot(&n) / nn;
            let dw = tu.cross(&r).dot(&n) / nn;
            uw.x = (uw.x + du).clamp(0.0, 1.0);
            uw.y = (uw.y + dw).clamp(0.0, 1.0);
            if du.abs() + dw.abs() < 1e-14 {
                break;
            }
        }

        let newton_d2 = self.comp_pnt01(uw.x, uw.y).dist_squared(pnt);
        if !(newton_d2 <= guess_d2) {
            uw = self.compass_search01(pnt, g, guess_d2);
        }
        Vec2::new(uw.x * mu, uw.y * mw)
    }

    /// Closest point without a caller-provided seed. Seeds from a coarse
    /// grid sample.
    pub fn closest_uw_global(&self, pnt: &Vec3) -> Vec2 {
        let nu = (self.max_u() as usize) * 4;
        let nw = (self.max_w() as usize) * 4;
        let mut best = Vec2::new(0.0, 0.0);
        let mut best_d = f64::MAX;
        for i in 0..=nu {
            let u = self.max_u() * i as f64 / nu as f64;
            for j in 0..=nw {
                let w = self.max_w() * j as f64 / nw as f64;
                let d = self.comp_pnt(u, w).dist_squared(pnt);
                if d < best_d {
                    best_d = d;
                    best = Vec2::new(u, w);
                }
            }
        }
        self.closest_uw(pnt, &best)
    }

    fn compass_search01(&self, pnt: &Vec3, start: Vec2, start_d2: f64) -> Vec2 {
        let mut cur = start;
        let mut cur_d2 = start_d2;
        let mut step = 1e-3;
        let mut fails = 0;
        while fails < MAX_COMPASS_FAILS {
            let mut improved = false;
            for (du, dw) in [(step, 0.0), (-step, 0.0), (0.0, step), (0.0, -step)] {
                let mut cand = Vec2::new(cur.x + du, cur.y + dw);
                // back off toward the boundary instead of stepping past it
                if !(0.0..=1.0).contains(&cand.x) {
                    cand.x = cur.x + du * 0.25;
                }
                if !(0.0..=1.0).contains(&cand.y) {
                    cand.y = cur.y + dw * 0.25;
                }
                cand.x = cand.x.clamp(0.0, 1.0);
                cand.y = cand.y.clamp(0.0, 1.0);
                let d2 = self.comp_pnt01(cand.x, cand.y).dist_squared(pnt);
                if d2 < cur_d2 {
                    cur = cand;
                    cur_d2 = d2;
                    improved = true;
                }
            }
            if improved {
                step *= 2.0;
            } else {
                step *= 0.5;
                fails += 1;
            }
        }
        cur
    }

    fn build_patches(&mut self) {
        self.patches.clear();
        let nsu = self.max_u() as usize;
        let nsw = self.max_w() as usize;
        for su in 0..nsu {
            for sw in 0..nsw {
                let mut cp = [[Vec3::zero(); 4]; 4];
                for (i, row) in cp.iter_mut().enumerate() {
                    for (j, p) in row.iter_mut().enumerate() {
                        *p = self.pnts[su * 3 + i][sw * 3 + j];
                    }
                }
                self.patches.push(SurfacePatch::new(
                    self.surf_id,
                    cp,
                    su as f64,
                    (su + 1) as f64,
                    sw as f64,
                    (sw + 1) as f64,
                ));
            }
        }
    }

    /// Samples the surface to find how much 3D length one unit of u or w
    /// covers, so parametric triangles can be kept close to isotropic.
    pub fn build_dist_map(&mut self) {
        let n = DIST_MAP_SAMPLES;
        let mut grid = vec![vec![Vec3::zero(); n]; n];
        for (i, row) in grid.iter_mut().enumerate() {
            let u01 = i as f64 / (n - 1) as f64;
            for (j, p) in row.iter_mut().enumerate() {
                *p = self.comp_pnt01(u01, j as f64 / (n - 1) as f64);
            }
        }

        // along_u[j]: arc length of the iso-w line j; along_w[i]: iso-u line i
        let mut along_u = vec![0.0; n];
        let mut along_w = vec![0.0; n];
        for j in 0..n {
            along_u[j] = (1..n).map(|i| grid[i - 1][j].dist(&grid[i][j])).sum();
        }
        for i in 0..n {
            along_w[i] = (1..n).map(|j| grid[i][j - 1].dist(&grid[i][j])).sum();
        }

        let max_u_dist = along_u.iter().cloned().fold(0.0, f64::max);
        let max_w_dist = along_w.iter().cloned().fold(0.0, f64::max);
        let min_u_dist = along_u.iter().cloned().fold(f64::MAX, f64::min);
        let min_w_dist = along_w.iter().cloned().fold(f64::MAX, f64::min);

        let (mu, mw) = (self.max_u(), self.max_w());
        const MIN_SCALE: f64 = 1e-5;
        self.u_scale = along_u
            .iter()
            .map(|d| {
                if max_w_dist > 0.0 {
                    ((mw / mu) * d / max_w_dist).max(MIN_SCALE)
                } else {
                    1.0
                }
            })
            .collect();
        self.w_scale = along_w
            .iter()
            .map(|d| {
                if max_u_dist > 0.0 {
                    ((mu / mw) * d / max_u_dist).max(MIN_SCALE)
                } else {
                    1.0
                }
            })
            .collect();

        let ratio = |max: f64, min: f64| if min > 0.0 { max / min } else { f64::MAX };
        let u_ratio = ratio(max_u_dist, min_u_dist);
        let w_ratio = ratio(max_w_dist, min_w_dist);
        self.scale_u_flag = u_ratio > w_ratio;
    }

    fn interp_scale(map: &[f64], t01: f64) -> f64 {
        if map.is_empty() {
            return 1.0;
        }
        let n = map.len() - 1;
        let x = t01.clamp(0.0, 1.0) * n as f64;
        let i = (x.floor() as usize).min(n.saturating_sub(1));
        let f = x - i as f64;
        if n == 0 {
            return map[0];
        }
        map[i] + f * (map[i + 1] - map[i])
    }

    /// Scale applied to u at normalized height `w01`.
    pub fn u_scale(&self, w01: f64) -> f64 {
        if !self.scale_u_flag {
            return 1.0;
        }
        Self::interp_scale(&self.u_scale, w01)
    }

    /// Scale applied to w at normalized position `u01`.
    pub fn w_scale(&self, u01: f64) -> f64 {
        if self.scale_u_flag {
            return 1.0;
        }
        Self::interp_scale(&self.w_scale, u01)
    }

    /// Builds the four parametric border curves. Degenerate (collapsed)
    /// borders are dropped.
    pub fn find_border_curves(&mut self) {
        let (mu, mw) = (self.max_u(), self.max_w());
        let corners = [
            Vec2::new(0.0, 0.0),
            Vec2::new(mu, 0.0),
            Vec2::new(mu, mw),
            Vec2::new(0.0, mw),
        ];
        self.border_curves.clear();
        for side in 0..4 {
            let a = corners[side];
            let b = corners[(side + 1) % 4];
            let mut curve = SCurve::new(self.surf_id, vec![a, b]);
            curve.border_side = Some(side);
            if curve.length(self, 10) > 1e-6 {
                self.border_curves.push(curve);
            } else {
                debug!(
                    "surface {} border {} is degenerate and was dropped",
                    self.surf_id, side
                );
            }
        }
    }

    /// Control row along border `side`, ordered in the direction of the
    /// matching border curve.
    pub fn border_control_points(&self, side: usize) -> Vec<Vec3> {
        let nu = self.num_u();
        let nw = self.num_w();
        match side {
            0 => (0..nu).map(|i| self.pnts[i][0]).collect(),
            1 => (0..nw).map(|j| self.pnts[nu - 1][j]).collect(),
            2 => (0..nu).rev().map(|i| self.pnts[i][nw - 1]).collect(),
            _ => (0..nw).rev().map(|j| self.pnts[0][j]).collect(),
        }
    }

    /// Is any border control row shared with `other`, in either direction?
    pub fn border_match(&self, other: &ParametricSurface) -> bool {
        (0..4).any(|a| {
            let ra = self.border_control_points(a);
            (0..4).any(|b| rows_match(&ra, &other.border_control_points(b)))
        })
    }

    /// Does any of this surface's border curves lie on `other`?
    pub fn border_curve_on_surface(&self, other: &ParametricSurface) -> bool {
        const TOL: f64 = 1e-8;
        for curve in &self.border_curves {
            let Some(side) = curve.border_side else { continue };
            let row = self.border_control_points(side);
            let on = row.iter().all(|p| {
                let uw = other.closest_uw_global(p);
                other.comp_pnt_uw(&uw).dist(p) < TOL
            });
            if on {
                return true;
            }
        }
        false
    }

    /// Every control point has y ≤ `val`.
    pub fn less_than_y(&self, val: f64) -> bool {
        self.pnts.iter().flatten().all(|p| p.y <= val)
    }

    /// Every control point lies on the y = 0 plane.
    pub fn plane_at_y_zero(&self) -> bool {
        self.pnts.iter().flatten().all(|p| p.y.abs() <= 1e-6)
    }

    /// Some border control row lies on y = 0.
    pub fn on_y_zero_plane(&self) -> bool {
        (0..4).any(|side| self.border_control_points(side).iter().all(|p| p.y.abs() <= 1e-7))
    }

    /// Ray parameters in [0, 1] where the segment `p0 → p1` hits the surface.
    pub fn intersect_line_seg(&self, p0: &Vec3, p1: &Vec3) -> Vec<f64> {
        let mut seg_box = Aabb::from_points(p0, p1);
        seg_box.expand(1e-9);
        if !self.bbox.intersects(&seg_box) {
            return Vec::new();
        }
        let mut ts = Vec::new();
        for patch in &self.patches {
            patch.intersect_line_seg(p0, p1, &seg_box, &mut ts);
        }
        ts.sort_by(|a, b| a.total_cmp(b));
        ts.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        ts
    }

    /// Fills the curvature-based target map, already limited by
    /// `min_len`, the sources and `base_len`.
    pub fn build_target_map(&mut self, density: &GridDensity) {
        let nu = self.max_u() as usize * NUM_MAP + 1;
        let nw = self.max_w() as usize * NUM_MAP + 1;
        let mut map = vec![vec![density.base_len(); nw]; nu];
        for (i, row) in map.iter_mut().enumerate() {
            let u = self.max_u() * i as f64 / (nu - 1) as f64;
            for (j, len) in row.iter_mut().enumerate() {
                let w = self.max_w() * j as f64 / (nw - 1) as f64;
                let radius = self.min_curvature_radius(u, w);
                let curv_len = density.curvature_target_len(radius);
                let p = self.comp_pnt(u, w);
                *len = curv_len
                    .max(density.min_len())
                    .min(density.target_len(&p));
            }
        }
        self.target_map = map;
    }

    /// Samples of the target map as (position, length) pairs.
    pub fn target_map_samples(&self) -> Vec<(Vec3, f64)> {
        let mut out = Vec::new();
        let nu = self.target_map.len();
        for (i, row) in self.target_map.iter().enumerate() {
            let nw = row.len();
            let u = self.max_u() * i as f64 / (nu.max(2) - 1) as f64;
            for (j, len) in row.iter().enumerate() {
                let w = self.max_w() * j as f64 / (nw.max(2) - 1) as f64;
                out.push((self.comp_pnt(u, w), *len));
            }
        }
        out
    }

    /// Overwrites the target map with limited values in the order
    /// produced by `target_map_samples`.
    pub fn set_target_map_values(&mut self, vals: &[f64]) {
        let mut k = 0;
        for row in &mut self.target_map {
            for len in row.iter_mut() {
                if let Some(v) = vals.get(k) {
                    *len = *v;
                }
                k += 1;
            }
        }
    }

    /// Bilinear lookup in the target map. Falls back to `default` when the
    /// map was never built.
    pub fn interp_target_map(&self, u: f64, w: f64, default: f64) -> f64 {
        let nu = self.target_map.len();
        if nu < 2 {
            return default;
        }
        let nw = self.target_map[0].len();
        let x = (u / self.max_u()).clamp(0.0, 1.0) * (nu - 1) as f64;
        let y = (w / self.max_w()).clamp(0.0, 1.0) * (nw - 1) as f64;
        let i = (x.floor() as usize).min(nu - 2);
        let j = (y.floor() as usize).min(nw - 2);
        let fx = x - i as f64;
        let fy = y - j as f64;
        let m = &self.target_map;
        let a = m[i][j] + fy * (m[i][j + 1] - m[i][j]);
        let b = m[i + 1][j] + fy * (m[i + 1][j + 1] - m[i + 1][j]);
        a + fx * (b - a)
    }

    /// Smallest principal radius of curvature estimated along the two
    /// parametric directions by finite differences of the tangents.
    fn min_curvature_radius(&self, u: f64, w: f64) -> f64 {
        const H: f64 = 1e-4;
        let tu = self.comp_tan_u(u, w);
        let tw = self.comp_tan_w(u, w);
        let n = tu.cross(&tw).normalized();
        if n.norm_squared() == 0.0 {
            return f64::MAX;
        }
        let (u0, u1) = ((u - H).max(0.0), (u + H).min(self.max_u()));
        let (w0, w1) = ((w - H).max(0.0), (w + H).min(self.max_w()));
        let suu = (self.comp_tan_u(u1, w) - self.comp_tan_u(u0, w)) / (u1 - u0);
        let sww = (self.comp_tan_w(u, w1) - self.comp_tan_w(u, w0)) / (w1 - w0);
        let ku = if tu.norm_squared() > 0.0 {
            n.dot(&suu).abs() / tu.norm_squared()
        } else {
            0.0
        };
        let kw = if tw.norm_squared() > 0.0 {
            n.dot(&sww).abs() / tw.norm_squared()
        } else {
            0.0
        };
        let k = ku.max(kw);
        if k > 1e-12 { 1.0 / k } else { f64::MAX }
    }
}

fn rows_match(a: &[Vec3], b: &[Vec3]) -> bool {
    row_match_dir(a, b).is_some()
}

/// `Some(false)` when two control rows coincide in the same direction,
/// `Some(true)` when one is the other reversed.
pub fn row_match_dir(a: &[Vec3], b: &[Vec3]) -> Option<bool> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    if a.iter().zip(b.iter()).all(|(p, q)| p.dist_squared(q) <= BORDER_MATCH_TOL2) {
        return Some(false);
    }
    if a.iter().zip(b.iter().rev()).all(|(p, q)| p.dist_squared(q) <= BORDER_MATCH_TOL2) {
        return Some(true);
    }
    None
}

/// Control grid of a flat bicubic patch spanning `corners`, listed as
/// (u0,w0), (u1,w0), (u1,w1), (u0,w1).
pub fn planar_grid(corners: [Vec3; 4]) -> Vec<Vec<Vec3>> {
    let mut g = vec![vec![Vec3::zero(); 4]; 4];
    for (i, row) in g.iter_mut().enumerate() {
        let s = i as f64 / 3.0;
        for (j, p) in row.iter_mut().enumerate() {
            let t = j as f64 / 3.0;
            let bottom = corners[0] + (corners[1] - corners[0]) * s;
            let top = corners[3] + (corners[2] - corners[3]) * s;
            *p = bottom + (top - bottom) * t;
        }
    }
    g
}
