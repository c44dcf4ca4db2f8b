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

use crate::geometry::{
    Aabb, Vec2, Vec3,
    tri_tri_intersect::{TriTriIntersectionResult, tri_tri_intersection},
    util::{barycentric_coords, dist_pnt_2_line, dist_pnt_2_plane, tri_seg_intersect},
};

/// Hard cap on subdivision depth. A pair where both patches reached it is
/// treated as flat.
pub const MAX_PATCH_DEPTH: u32 = 12;
/// Flatness tolerance as a fraction of the patch diagonal.
const PLANAR_REL_TOL: f64 = 1e-3;

/// A raw intersection segment between two surfaces, with seeds for the
/// endpoint projections on each of them.
#[derive(Debug, Clone)]
pub struct PatchSegment {
    pub surf_a: usize,
    pub surf_b: usize,
    pub pnts: [Vec3; 2],
    pub uw_a: [Vec2; 2],
    pub uw_b: [Vec2; 2],
}

/// A single bicubic Bezier patch covering `[u_min, u_max] × [w_min, w_max]`
/// of its parent surface.
#[derive(Debug, Clone)]
pub struct SurfacePatch {
    pub surf: usize,
    pub pnts: [[Vec3; 4]; 4],
    pub u_min: f64,
    pub u_max: f64,
    pub w_min: f64,
    pub w_max: f64,
    pub bbox: Aabb,
    pub depth: u32,
}

/// de Casteljau split of a cubic control polygon at t = 0.5.
fn split_cubic(c: [Vec3; 4]) -> ([Vec3; 4], [Vec3; 4]) {
    let m01 = (c[0] + c[1]) * 0.5;
    let m12 = (c[1] + c[2]) * 0.5;
    let m23 = (c[2] + c[3]) * 0.5;
    let m012 = (m01 + m12) * 0.5;
    let m123 = (m12 + m23) * 0.5;
    let mid = (m012 + m123) * 0.5;
    ([c[0], m01, m012, mid], [mid, m123, m23, c[3]])
}

impl SurfacePatch {
    pub fn new(
        surf: usize,
        pnts: [[Vec3; 4]; 4],
        u_min: f64,
        u_max: f64,
        w_min: f64,
        w_max: f64,
    ) -> Self {
        let bbox = Aabb::from_iter(pnts.iter().flatten());
        Self {
            surf,
            pnts,
            u_min,
            u_max,
            w_min,
            w_max,
            bbox,
            depth: 0,
        }
    }

    /// Splits into four sub-patches: (low u, low w), (high u, low w),
    /// (low u, high w), (high u, high w).
    pub fn split(&self) -> [SurfacePatch; 4] {
        // split every u-row in w first
        let mut lo_w = [[Vec3::zero(); 4]; 4];
        let mut hi_w = [[Vec3::zero(); 4]; 4];
        for i in 0..4 {
            let (a, b) = split_cubic(self.pnts[i]);
            lo_w[i] = a;
            hi_w[i] = b;
        }
        let split_u = |half: &[[Vec3; 4]; 4]| {
            let mut lo = [[Vec3::zero(); 4]; 4];
            let mut hi = [[Vec3::zero(); 4]; 4];
            for j in 0..4 {
                let col = [half[0][j], half[1][j], half[2][j], half[3][j]];
                let (a, b) = split_cubic(col);
                for i in 0..4 {
                    lo[i][j] = a[i];
                    hi[i][j] = b[i];
                }
            }
            (lo, hi)
        };
        let (p00, p10) = split_u(&lo_w);
        let (p01, p11) = split_u(&hi_w);

        let um = 0.5 * (self.u_min + self.u_max);
        let wm = 0.5 * (self.w_min + self.w_max);
        let mk = |p, u0, u1, w0, w1| {
            let mut sp = SurfacePatch::new(self.surf, p, u0, u1, w0, w1);
            sp.depth = self.depth + 1;
            sp
        };
        [
            mk(p00, self.u_min, um, self.w_min, wm),
            mk(p10, um, self.u_max, self.w_min, wm),
            mk(p01, self.u_min, um, wm, self.w_max),
            mk(p11, um, self.u_max, wm, self.w_max),
        ]
    }

    pub fn diag(&self) -> f64 {
        self.bbox.diag_dist()
    }

    /// Is the patch within `tol` of the plane through its corners, with
    /// straight edges?
    pub fn test_planar(&self, tol: f64) -> bool {
        let p = &self.pnts;
        let org = p[0][0];
        let n = (p[3][0] - org).cross(&(p[0][3] - org)).normalized();
        if n.norm_squared() == 0.0 {
            return false;
        }
        for q in [p[3][3], p[1][1], p[2][1], p[1][2], p[2][2]] {
            if dist_pnt_2_plane(&org, &n, &q) > tol {
                return false;
            }
        }
        let edges = [
            (p[0][0], p[3][0], p[1][0], p[2][0]),
            (p[3][0], p[3][3], p[3][1], p[3][2]),
            (p[3][3], p[0][3], p[2][3], p[1][3]),
            (p[0][3], p[0][0], p[0][2], p[0][1]),
        ];
        for (a, b, m0, m1) in edges {
            if dist_pnt_2_line(&a, &b, &m0) > tol || dist_pnt_2_line(&a, &b, &m1) > tol {
                return false;
            }
        }
        true
    }

    fn is_flat(&self) -> bool {
        self.test_planar((PLANAR_REL_TOL * self.diag()).max(1e-12))
    }

    /// Corner triangles with their parametric corners.
    fn corner_tris(&self) -> [([Vec3; 3], [Vec2; 3]); 2] {
        let a0 = self.pnts[0][0];
        let a1 = self.pnts[3][0];
        let a2 = self.pnts[3][3];
        let a3 = self.pnts[0][3];
        let u0 = Vec2::new(self.u_min, self.w_min);
        let u1 = Vec2::new(self.u_max, self.w_min);
        let u2 = Vec2::new(self.u_max, self.w_max);
        let u3 = Vec2::new(self.u_min, self.w_max);
        [([a0, a2, a3], [u0, u2, u3]), ([a0, a1, a2], [u0, u1, u2])]
    }

    /// Adds ray hits of `p0 → p1` with this patch to `ts`.
    pub fn intersect_line_seg(&self, p0: &Vec3, p1: &Vec3, seg_box: &Aabb, ts: &mut Vec<f64>) {
        let dir = *p1 - *p0;
        let mut stack = vec![self.clone()];
        while let Some(patch) = stack.pop() {
            if !patch.bbox.intersects(seg_box) {
                continue;
            }
            if patch.depth >= MAX_PATCH_DEPTH || patch.is_flat() {
                for (tri, _) in patch.corner_tris() {
                    if let Some(t) = tri_seg_intersect(&tri[0], &tri[1], &tri[2], p0, &dir) {
                        ts.push(t);
                    }
                }
            } else {
                stack.extend(patch.split());
            }
        }
    }
}

fn interp_uw(p: &Vec3, tri: &[Vec3; 3], uw: &[Vec2; 3]) -> Vec2 {
    match barycentric_coords(p, &tri[0], &tri[1], &tri[2]) {
        Some((a, b, c)) => uw[0] * a + uw[1] * b + uw[2] * c,
        None => uw[0],
    }
}

/// Two flat patches: intersect their corner triangles pairwise.
fn intersect_quads(a: &SurfacePatch, b: &SurfacePatch, sink: &mut impl FnMut(PatchSegment)) {
    let mut found: Vec<[Vec3; 2]> = Vec::new();
    let tol2 = (1e-12 * a.diag().max(b.diag()).max(1.0)).powi(2);
    for (ta, uwa) in a.corner_tris() {
        for (tb, uwb) in b.corner_tris() {
            let (p, q) = match tri_tri_intersection(&ta, &tb) {
                TriTriIntersectionResult::Proper(p, q) => (p, q),
                // coplanar contact yields no segment
                TriTriIntersectionResult::Coplanar | TriTriIntersectionResult::None => continue,
            };
            if p.dist_squared(&q) <= tol2 {
                continue;
            }
            let dup = found.iter().any(|s| {
                (s[0].dist_squared(&p) <= tol2 && s[1].dist_squared(&q) <= tol2)
                    || (s[0].dist_squared(&q) <= tol2 && s[1].dist_squared(&p) <= tol2)
            });
            if dup {
                continue;
            }
            found.push([p, q]);
            sink(PatchSegment {
                surf_a: a.surf,
                surf_b: b.surf,
                pnts: [p, q],
                uw_a: [interp_uw(&p, &ta, &uwa), interp_uw(&q, &ta, &uwa)],
                uw_b: [interp_uw(&p, &tb, &uwb), interp_uw(&q, &tb, &uwb)],
            });
        }
    }
}

/// Adaptive intersection of two patches.
///
/// Pairs are processed from an explicit stack. Every level rejects on
/// bounding boxes; flat pairs are intersected directly, otherwise the
/// non-flat (or larger) patch is split.
pub fn intersect(a: &SurfacePatch, b: &SurfacePatch, sink: &mut impl FnMut(PatchSegment)) {
    let mut stack: Vec<(SurfacePatch, SurfacePatch)> = vec![(a.clone(), b.clone())];
    while let Some((pa, pb)) = stack.pop() {
        if !pa.bbox.intersects(&pb.bbox) {
            continue;
        }
        let a_done = pa.depth >= MAX_PATCH_DEPTH;
        let b_done = pb.depth >= MAX_PATCH_DEPTH;
        let a_flat = a_done || pa.is_flat();
        let b_flat = b_done || pb.is_flat();

        if a_flat && b_flat {
            intersect_quads(&pa, &pb, sink);
            continue;
        }

        let split_a = if a_flat {
            false
        } else if b_flat {
            true
        } else {
            pa.diag() >= pb.diag()
        };

        if split_a {
            for sub in pa.split() {
                stack.push((sub, pb.clone()));
            }
        } else {
            for sub in pb.split() {
                stack.push((pa.clone(), sub));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(surf: usize, corners: [Vec3; 4]) -> SurfacePatch {
        let g = crate::surface::bezier::planar_grid(corners);
        let mut p = [[Vec3::zero(); 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                p[i][j] = g[i][j];
            }
        }
        SurfacePatch::new(surf, p, 0.0, 1.0, 0.0, 1.0)
    }

    #[test]
    fn split_preserves_corners_and_ranges() {
        let p = flat(
            0,
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            ],
        );
        let subs = p.split();
        assert_relative_eq!(subs[3].pnts[3][3].x, 2.0);
        assert_relative_eq!(subs[3].pnts[0][0].x, 1.0);
        assert_relative_eq!(subs[1].u_min, 0.5);
        assert_eq!(subs[2].depth, 1);
        assert!(subs.iter().all(|s| s.test_planar(1e-12)));
    }

    #[test]
    fn curved_patch_is_not_planar() {
        let mut p = flat(
            0,
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
        );
        p.pnts[1][1].z = 0.5;
        assert!(!p.test_planar(1e-3));
    }

    #[test]
    fn crossing_flat_patches_report_one_segment_line() {
        let a = flat(
            0,
            [
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.3, 0.0),
                Vec3::new(-1.0, 1.3, 0.0),
            ],
        );
        let b = flat(
            1,
            [
                Vec3::new(-0.5, 0.2, -1.0),
                Vec3::new(0.5, 0.2, -1.0),
                Vec3::new(0.5, 0.2, 1.3),
                Vec3::new(-0.5, 0.2, 1.3),
            ],
        );
        let mut segs = Vec::new();
        intersect(&a, &b, &mut |s| segs.push(s));
        assert!(!segs.is_empty());
        let total: f64 = segs.iter().map(|s| s.pnts[0].dist(&s.pnts[1])).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        for s in &segs {
            for p in s.pnts {
                assert_relative_eq!(p.y, 0.2, epsilon = 1e-12);
                assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn ray_hits_flat_patch_once() {
        let a = flat(
            0,
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
        );
        let p0 = Vec3::new(0.3, 0.4, -1.0);
        let p1 = Vec3::new(0.3, 0.4, 1.0);
        let mut ts = Vec::new();
        a.intersect_line_seg(&p0, &p1, &Aabb::from_points(&p0, &p1), &mut ts);
        assert_eq!(ts.len(), 1);
        assert_relative_eq!(ts[0], 0.5, epsilon = 1e-12);
    }
}
